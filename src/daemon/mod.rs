//! Daemon mode: one long-lived `MessagesSession` behind a UNIX socket.
//!
//! Keeping the session alive keeps the contact cache warm and lets a
//! `contact:N` selection follow the listing from an earlier request.
//!
//! CHANGELOG:
//! - 10/19/2026 - Session-backed service, shared socket default
//! - 01/10/2026 - Initial module structure

pub mod protocol;
pub mod server;
pub mod service;

/// Socket location used by the daemon and client binaries.
pub const DEFAULT_SOCKET: &str = "~/.mac-messages/daemon.sock";

/// Tilde-expand a socket path.
pub fn expand_socket_path(socket: &str) -> String {
    shellexpand::tilde(socket).to_string()
}

/// PID file written next to the socket.
pub fn pid_file_for(socket_path: &str) -> String {
    format!("{}.pid", socket_path)
}
