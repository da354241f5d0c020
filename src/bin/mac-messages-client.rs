//! mac-messages-client - thin client for the session daemon.
//!
//! CHANGELOG:
//! - 10/19/2026 - Shared protocol types, error codes on stderr
//! - 01/10/2026 - Initial implementation (Phase 4C)

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::process::ExitCode;
use std::time::Duration;

use mac_messages::daemon::protocol::{Params, Request, Response};
use mac_messages::daemon::{expand_socket_path, DEFAULT_SOCKET};

#[derive(Parser)]
#[command(name = "mac-messages-client")]
#[command(about = "Thin client for mac-messages-daemon")]
struct Cli {
    /// Method to call (health, recent, search, latest, send, find_contact, countries, check_access)
    method: String,

    /// Socket path
    #[arg(long, default_value = DEFAULT_SOCKET)]
    socket: String,

    /// JSON parameters (as string)
    #[arg(long)]
    params: Option<String>,

    /// Request timeout (seconds); sends can take a while
    #[arg(long, default_value = "30.0")]
    timeout: f64,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let params: Params = match cli.params {
        Some(p) => serde_json::from_str(&p).context("--params must be a JSON object")?,
        None => Params::new(),
    };
    let request = Request::new(&cli.method, params);

    let socket_path = expand_socket_path(&cli.socket);
    let stream = UnixStream::connect(&socket_path)
        .with_context(|| format!("connecting to {} (is the daemon running?)", socket_path))?;

    let timeout = Some(Duration::from_secs_f64(cli.timeout));
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;

    (&stream).write_all(request.to_ndjson_line()?.as_bytes())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response = Response::from_ndjson_line(response_line.trim_end())?;

    if response.ok {
        let result = response.result.unwrap_or(serde_json::Value::Null);
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    match response.error {
        Some(error) => eprintln!("Error [{}]: {}", error.code, error.message),
        None => eprintln!("Error: unknown"),
    }
    Ok(ExitCode::from(1))
}
