//! Unix socket server for the control surface.
//!
//! Connections are accepted on a non-blocking listener so the thread notices
//! shutdown promptly. Each connection carries exactly one request, which is
//! forwarded to the core loop; the answer is written back and the connection
//! closed.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use super::protocol::{Request, Response};
use crate::common::constants::{
    IPC_ACCEPT_INTERVAL_MS, IPC_CLIENT_TIMEOUT_MS, IPC_REPLY_TIMEOUT_MS,
    IPC_REQUEST_READ_TIMEOUT_MS,
};
use crate::core::Command;

pub struct IpcSocketServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcSocketServer {
    /// Bind the control socket, replacing a leftover socket file.
    ///
    /// Only called after the instance lock is held, so an existing socket
    /// cannot belong to a live daemon.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve requests until `running` is cleared.
    pub fn run(
        self,
        commands: mpsc::Sender<Command>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<()> {
        if debug_enabled {
            log_debug!("IPC server listening on {:?}", self.socket_path());
        }

        while running.load(Ordering::SeqCst) {
            loop {
                match self.listener.accept() {
                    Ok((stream, _addr)) => {
                        let started = Instant::now();
                        if let Err(e) = serve(stream, &commands) {
                            if debug_enabled {
                                log_debug!("IPC request failed: {:#}", e);
                            }
                        } else if debug_enabled {
                            log_debug!(
                                "IPC request served in {}ms",
                                started.elapsed().as_millis()
                            );
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        if debug_enabled {
                            log_debug!("Error accepting client connection: {}", e);
                        }
                        break;
                    }
                }
            }

            thread::sleep(Duration::from_millis(IPC_ACCEPT_INTERVAL_MS));
        }

        if debug_enabled {
            log_debug!("IPC server shutting down");
        }

        self.cleanup()
    }

    fn cleanup(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove socket file: {:?}", self.socket_path))?;
        }
        Ok(())
    }
}

/// Read one request line, answer it and close the connection.
fn serve(stream: UnixStream, commands: &mpsc::Sender<Command>) -> Result<()> {
    stream
        .set_nonblocking(false)
        .context("Failed to set client stream to blocking mode")?;
    // Requests are served one at a time, so a silent client must not hold the accept loop
    stream
        .set_read_timeout(Some(Duration::from_millis(IPC_REQUEST_READ_TIMEOUT_MS)))
        .context("Failed to set read timeout on client stream")?;
    stream
        .set_write_timeout(Some(Duration::from_millis(IPC_CLIENT_TIMEOUT_MS)))
        .context("Failed to set write timeout on client stream")?;

    let mut reader = BufReader::new(
        stream
            .try_clone()
            .context("Failed to clone stream for reader")?,
    );
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read request")?;

    let response = handle_line(line.trim(), commands);

    let mut writer = stream;
    let json = serde_json::to_string(&response).context("Failed to serialize response")?;
    writeln!(writer, "{json}").context("Failed to write response")?;
    writer.flush().context("Failed to flush response")
}

/// Forward one request to the core loop and wait for its answer.
pub(crate) fn handle_line(line: &str, commands: &mpsc::Sender<Command>) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Response::failure(format!("invalid request: {e}")),
    };

    let (reply_tx, reply_rx) = mpsc::channel();
    if commands.send(request.into_command(reply_tx)).is_err() {
        return Response::failure("stairlight is shutting down");
    }

    match reply_rx.recv_timeout(Duration::from_millis(IPC_REPLY_TIMEOUT_MS)) {
        Ok(reply) => Response::from(reply),
        Err(_) => Response::failure("stairlight did not answer in time"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModeRejected;

    #[test]
    fn test_server_creation_and_cleanup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("test-stairlight.sock");

        let server = IpcSocketServer::new(socket_path.clone()).unwrap();
        assert!(socket_path.exists());

        server.cleanup().unwrap();
        assert!(!socket_path.exists());
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("stale.sock");
        std::fs::write(&socket_path, "").unwrap();

        let server = IpcSocketServer::new(socket_path.clone()).unwrap();
        assert_eq!(server.socket_path(), socket_path);
    }

    #[test]
    fn test_invalid_json_is_answered_without_core() {
        let (tx, rx) = mpsc::channel();
        let response = handle_line("not json", &tx);
        assert!(!response.ok);
        assert!(response.error.unwrap().starts_with("invalid request"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rejection_is_forwarded() {
        let (tx, rx) = mpsc::channel::<Command>();
        let core = thread::spawn(move || {
            if let Ok(Command::SetMode { mode, reply }) = rx.recv() {
                let _ = reply.send(Err(ModeRejected::UnknownMode {
                    requested: mode,
                    available: "off".to_string(),
                }));
            }
        });

        let response = handle_line(r#"{"command":"set_mode","mode":"disco"}"#, &tx);
        core.join().unwrap();
        assert!(!response.ok);
        assert_eq!(
            response.error.as_deref(),
            Some("unknown mode 'disco' (available: off)")
        );
    }

    #[test]
    fn test_silent_client_is_dropped_quickly() {
        let (server_side, _client_side) = UnixStream::pair().unwrap();
        let (tx, rx) = mpsc::channel::<Command>();

        let started = Instant::now();
        let err = serve(server_side, &tx).unwrap_err();
        let waited = started.elapsed();

        assert!(format!("{err:#}").contains("Failed to read request"), "{err:#}");
        assert!(waited >= Duration::from_millis(IPC_REQUEST_READ_TIMEOUT_MS));
        assert!(waited < Duration::from_millis(IPC_CLIENT_TIMEOUT_MS));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_request_after_silent_client_is_served() {
        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("busy.sock");
        let server = IpcSocketServer::new(socket_path.clone()).unwrap();
        let (tx, rx) = mpsc::channel::<Command>();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || server.run(tx, flag, false));

        let core = thread::spawn(move || {
            if let Ok(Command::SetMode { mode, reply }) = rx.recv() {
                let _ = reply.send(Err(ModeRejected::UnknownMode {
                    requested: mode,
                    available: "off".to_string(),
                }));
            }
        });

        // Connected but never writes
        let _idle = UnixStream::connect(&socket_path).unwrap();

        let started = Instant::now();
        let mut stream = UnixStream::connect(&socket_path).unwrap();
        writeln!(stream, r#"{{"command":"set_mode","mode":"disco"}}"#).unwrap();
        let mut answer = String::new();
        BufReader::new(&stream).read_line(&mut answer).unwrap();
        assert!(answer.contains("unknown mode 'disco'"), "{answer}");
        assert!(started.elapsed() < Duration::from_millis(IPC_CLIENT_TIMEOUT_MS));

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
        core.join().unwrap();
        assert!(!socket_path.exists());
    }

    #[test]
    fn test_closed_core_reports_shutdown() {
        let (tx, rx) = mpsc::channel::<Command>();
        drop(rx);
        let response = handle_line(r#"{"command":"status"}"#, &tx);
        assert_eq!(response.error.as_deref(), Some("stairlight is shutting down"));
    }
}
