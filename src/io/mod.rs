// External I/O operations module
pub mod lock; // Single-instance lock file
pub mod signals; // Unix signal handling

use nix::unistd::getuid;
use std::path::PathBuf;

/// Per-user runtime directory for the lock file and the control socket.
///
/// `$XDG_RUNTIME_DIR`, falling back to `/run/user/<uid>`.
pub fn runtime_dir() -> PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(format!("/run/user/{}", getuid())),
    }
}
