//! Runtime configuration: store locations, cache TTL, send pause and bounds.
//!
//! Defaults point at the standard macOS locations; each can be overridden with
//! an environment variable so tests and unusual setups can redirect them.

use std::path::PathBuf;
use std::time::Duration;

/// Freshness window for the contact cache.
pub const CONTACTS_TTL_SECS: u64 = 300;

/// Default fuzzy threshold for contact matching.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Row cap for time-windowed retrieval.
pub const RECENT_LIMIT: u32 = 100;

/// Row cap for fuzzy message search.
pub const SEARCH_WINDOW: u32 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub messages_db: PathBuf,
    pub addressbook_dir: PathBuf,
    pub contacts_ttl: Duration,
    pub send_pause: Duration,
    pub recent_limit: u32,
    pub search_window: u32,
    pub match_threshold: f64,
    pub default_dial_code: String,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            messages_db: home.join("Library").join("Messages").join("chat.db"),
            addressbook_dir: home
                .join("Library")
                .join("Application Support")
                .join("AddressBook"),
            contacts_ttl: Duration::from_secs(CONTACTS_TTL_SECS),
            send_pause: Duration::from_secs(1),
            recent_limit: RECENT_LIMIT,
            search_window: SEARCH_WINDOW,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            default_dial_code: "+1".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `MAC_MESSAGES_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MAC_MESSAGES_DB") {
            config.messages_db = PathBuf::from(shellexpand::tilde(&path).as_ref());
        }
        if let Ok(path) = std::env::var("MAC_MESSAGES_ADDRESSBOOK_DIR") {
            config.addressbook_dir = PathBuf::from(shellexpand::tilde(&path).as_ref());
        }
        if let Some(secs) = env_u64("MAC_MESSAGES_CONTACTS_TTL_SECS") {
            config.contacts_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("MAC_MESSAGES_SEND_PAUSE_SECS") {
            config.send_pause = Duration::from_secs(secs);
        }
        if let Ok(code) = std::env::var("MAC_MESSAGES_DIAL_CODE") {
            if !code.trim().is_empty() {
                config.default_dial_code = code.trim().to_string();
            }
        }

        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring non-numeric override");
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert!(config.messages_db.ends_with("Library/Messages/chat.db"));
        assert!(config
            .addressbook_dir
            .ends_with("Library/Application Support/AddressBook"));
        assert_eq!(config.contacts_ttl, Duration::from_secs(300));
        assert_eq!(config.recent_limit, 100);
        assert_eq!(config.search_window, 500);
    }
}
