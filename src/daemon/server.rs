//! UNIX socket server for daemon mode.
//!
//! Listens on a UNIX socket, accepts connections one at a time, and
//! dispatches one NDJSON request per connection to the DaemonService.
//!
//! CHANGELOG:
//! - 10/19/2026 - Malformed requests answered instead of dropped, tracing
//! - 01/10/2026 - Initial implementation (Phase 4C)

use anyhow::Result;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::time::Instant;

use crate::daemon::protocol::{Request, Response};
use crate::daemon::service::DaemonService;

pub struct DaemonServer {
    service: DaemonService,
    socket_path: String,
}

impl DaemonServer {
    pub fn new(socket_path: impl AsRef<Path>, service: DaemonService) -> Self {
        Self {
            service,
            socket_path: socket_path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Start serving requests (blocking).
    pub fn serve(&mut self) -> Result<()> {
        // Clean up stale socket
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(socket = %self.socket_path, "daemon listening");

        // Sequential: the session is single-owner
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.handle_connection(stream) {
                        tracing::warn!(error = %e, "connection error");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "accept error"),
            }
        }

        Ok(())
    }

    fn handle_connection(&mut self, stream: UnixStream) -> Result<()> {
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(&stream);

        let mut line = String::new();
        reader.read_line(&mut line)?;

        if line.trim().is_empty() {
            return Ok(()); // Client disconnected
        }

        let response = self.handle_line(&line);
        writer.write_all(response.to_ndjson_line()?.as_bytes())?;
        writer.flush()?;

        Ok(())
    }

    /// Answer one request line.
    pub fn handle_line(&mut self, line: &str) -> Response {
        let start = Instant::now();
        let elapsed_ms = |start: Instant| start.elapsed().as_secs_f64() * 1000.0;

        let request = match Request::from_ndjson_line(line.trim()) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "malformed request");
                return Response::error(
                    String::new(),
                    "INVALID_INPUT",
                    format!("{:#}", e),
                    elapsed_ms(start),
                );
            }
        };

        tracing::debug!(id = %request.id, method = %request.method, "request");

        match self.service.dispatch(&request.method, &request.params) {
            Ok(result) => Response::success(request.id, result, elapsed_ms(start)),
            Err(e) => Response::from_error(request.id, &e, elapsed_ms(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::MessagesSession;

    fn server() -> DaemonServer {
        let session = MessagesSession::new(Config::default());
        DaemonServer::new("/tmp/unused.sock", DaemonService::new(session))
    }

    #[test]
    fn test_malformed_request_gets_error_response() {
        let response = server().handle_line("not json\n");
        assert!(!response.ok);
        assert_eq!(response.id, "");
        assert_eq!(response.error.unwrap().code, "INVALID_INPUT");
    }

    #[test]
    fn test_unknown_method_echoes_id() {
        let response = server().handle_line(r#"{"id":"req-7","v":1,"method":"bogus","params":{}}"#);
        assert_eq!(response.id, "req-7");
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().message, "Unknown method: bogus");
    }

    #[test]
    fn test_connection_round_trip() {
        let (client, server_side) = UnixStream::pair().unwrap();
        (&client)
            .write_all(b"{\"id\":\"c1\",\"v\":1,\"method\":\"countries\"}\n")
            .unwrap();

        server().handle_connection(server_side).unwrap();

        let mut line = String::new();
        BufReader::new(&client).read_line(&mut line).unwrap();
        let response = Response::from_ndjson_line(line.trim_end()).unwrap();
        assert!(response.ok);
        assert_eq!(response.id, "c1");
        assert!(response.result.unwrap()["countries"].is_array());
    }
}
