//! Control surface over a Unix domain socket.
//!
//! The daemon listens on `$XDG_RUNTIME_DIR/stairlight.sock`. The CLI
//! subcommands (`status`, `mode`, `trigger`, `test`) connect with
//! [`client::IpcClient`], send one [`protocol::Request`] and print the
//! [`protocol::Response`]. Requests are applied by the core loop, so a
//! response always reflects the state after the request took effect.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use crate::common::constants::SOCKET_FILE_NAME;
use crate::core::Command;

pub mod client;
pub mod protocol;
mod server;

pub use client::IpcClient;
pub use protocol::{Request, Response};

/// Path of the control socket for the current user.
pub fn socket_path() -> PathBuf {
    crate::io::runtime_dir().join(SOCKET_FILE_NAME)
}

/// Background thread serving the control socket.
pub struct IpcServer {
    thread_handle: Option<JoinHandle<()>>,
}

impl IpcServer {
    /// Bind `socket_path` and start serving in a background thread.
    ///
    /// Binding happens on the calling thread so a socket error stops startup.
    /// The thread exits once `running` is cleared.
    pub fn start(
        socket_path: PathBuf,
        commands: mpsc::Sender<Command>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<Self> {
        let socket_server = server::IpcSocketServer::new(socket_path)
            .context("Failed to create IPC socket server")?;

        let thread_handle = std::thread::Builder::new()
            .name("ipc-server".to_string())
            .spawn(move || {
                if let Err(e) = socket_server.run(commands, running, debug_enabled) {
                    log_warning!("IPC server stopped: {:#}", e);
                }
            })
            .context("Failed to spawn IPC server thread")?;

        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    /// Wait for the server thread to finish.
    ///
    /// The running flag is cleared by the core loop or the signal handler.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("IPC server thread panicked"))?;
        }
        Ok(())
    }
}
