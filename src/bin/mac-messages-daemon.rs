//! mac-messages-daemon - long-lived session host.
//!
//! CHANGELOG:
//! - 10/19/2026 - Hosts a MessagesSession, tracing setup, stale PID handling
//! - 01/10/2026 - Initial implementation (Phase 4C)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;

use mac_messages::daemon::server::DaemonServer;
use mac_messages::daemon::service::DaemonService;
use mac_messages::daemon::{expand_socket_path, pid_file_for, DEFAULT_SOCKET};
use mac_messages::{Config, MessagesSession};

#[derive(Parser)]
#[command(name = "mac-messages-daemon")]
#[command(about = "Persistent session daemon for mac-messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon
    Start {
        /// Socket path
        #[arg(long, default_value = DEFAULT_SOCKET)]
        socket: String,

        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the daemon
    Stop {
        #[arg(long, default_value = DEFAULT_SOCKET)]
        socket: String,
    },

    /// Check daemon status
    Status {
        #[arg(long, default_value = DEFAULT_SOCKET)]
        socket: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start { socket, foreground } => cmd_start(&socket, foreground),
        Commands::Stop { socket } => cmd_stop(&socket),
        Commands::Status { socket } => cmd_status(&socket),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run_server(socket_path: &str) -> Result<()> {
    let session = MessagesSession::new(Config::from_env());
    DaemonServer::new(socket_path, DaemonService::new(session)).serve()
}

fn cmd_start(socket: &str, foreground: bool) -> Result<ExitCode> {
    let socket_path = expand_socket_path(socket);

    if let Some(parent) = Path::new(&socket_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    if foreground {
        tracing::info!("starting in foreground");
        run_server(&socket_path)?;
        return Ok(ExitCode::SUCCESS);
    }

    let daemonize = daemonize::Daemonize::new()
        .pid_file(pid_file_for(&socket_path))
        .working_directory("/tmp");

    daemonize
        .start()
        .map_err(|e| anyhow::anyhow!("Failed to daemonize: {}", e))?;
    // Child process from here on
    run_server(&socket_path)?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_stop(socket: &str) -> Result<ExitCode> {
    let socket_path = expand_socket_path(socket);
    let pid_file = pid_file_for(&socket_path);

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .with_context(|| format!("reading {}", pid_file))?
        .trim()
        .parse()
        .with_context(|| format!("parsing {}", pid_file))?;

    // SAFETY: kill(2) with a plain PID and signal number has no memory effects.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        tracing::warn!(pid, error = %std::io::Error::last_os_error(), "daemon was not running");
    }

    let _ = std::fs::remove_file(&pid_file);
    let _ = std::fs::remove_file(&socket_path);

    println!("Daemon stopped (pid {})", pid);
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(socket: &str) -> Result<ExitCode> {
    let socket_path = expand_socket_path(socket);

    match std::os::unix::net::UnixStream::connect(&socket_path) {
        Ok(_) => {
            println!("Daemon running at {}", socket_path);
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => {
            println!("Daemon not running");
            Ok(ExitCode::from(1))
        }
    }
}
