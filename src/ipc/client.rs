//! IPC client used by the CLI subcommands to talk to a running daemon.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::protocol::{Request, Response};
use super::socket_path;
use crate::common::constants::IPC_CLIENT_TIMEOUT_MS;
use crate::core::StatusReport;

pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    /// Client for the daemon of the current user.
    pub fn new() -> Self {
        Self::with_socket(socket_path())
    }

    pub fn with_socket(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Whether a daemon is accepting connections on the socket.
    pub fn is_running(&self) -> bool {
        self.socket_path.exists() && UnixStream::connect(&self.socket_path).is_ok()
    }

    /// Send one request and return the daemon's status after it was applied.
    ///
    /// A refused request is returned as an error carrying the daemon's reason.
    pub fn request(&self, request: &Request) -> Result<StatusReport> {
        let response = self.exchange(request)?;
        match (response.ok, response.status) {
            (true, Some(status)) => Ok(status),
            (true, None) => anyhow::bail!("stairlight answered without a status"),
            (false, _) => anyhow::bail!(
                "{}",
                response
                    .error
                    .unwrap_or_else(|| "request refused".to_string())
            ),
        }
    }

    fn exchange(&self, request: &Request) -> Result<Response> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "Failed to connect to stairlight at {:?}. Is stairlight running?",
                self.socket_path
            )
        })?;

        let timeout = Some(Duration::from_millis(IPC_CLIENT_TIMEOUT_MS));
        stream
            .set_read_timeout(timeout)
            .context("Failed to set read timeout on IPC socket")?;
        stream
            .set_write_timeout(timeout)
            .context("Failed to set write timeout on IPC socket")?;

        let json = serde_json::to_string(request).context("Failed to serialize request")?;
        writeln!(stream, "{json}").context("Failed to send request")?;
        stream.flush().context("Failed to send request")?;

        let mut line = String::new();
        BufReader::new(stream)
            .read_line(&mut line)
            .context("Failed to read response from IPC socket")?;

        if line.trim().is_empty() {
            anyhow::bail!("Received empty response from stairlight");
        }

        serde_json::from_str(line.trim())
            .with_context(|| format!("Failed to parse response JSON: {}", line.trim()))
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_socket_is_not_running() {
        let temp_dir = tempdir().unwrap();
        let client = IpcClient::with_socket(temp_dir.path().join("absent.sock"));
        assert!(!client.is_running());

        let err = client.request(&Request::Status).unwrap_err();
        assert!(err.to_string().contains("Is stairlight running?"));
    }
}
