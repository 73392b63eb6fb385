//! Lock file management for single-instance enforcement.
//!
//! Two daemons driving the same GPIO lines would fight over every segment, so
//! the daemon takes an exclusive `fs2` lock on `stairlight.lock` in the
//! runtime directory and writes its PID into it. A lock left behind by a
//! process that no longer exists is removed.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An acquired instance lock. Released on [`LockFile::release`] or drop.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock and remove the lock file.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Acquire the exclusive instance lock at `lock_path`.
///
/// Fails if another live process holds it.
pub fn acquire_lock(lock_path: &Path) -> Result<LockFile> {
    if let Some(file) = try_acquire(lock_path)? {
        return Ok(file);
    }

    // Lock is held - check whether its owner still exists
    let owner = read_owner(lock_path);
    match owner {
        Some(pid) if is_process_running(pid) => {
            bail!("stairlight is already running (PID: {pid})")
        }
        Some(pid) => log_warning!("Removing stale lock file (process {pid} no longer running)"),
        None => log_warning!("Lock file contains invalid PID, removing stale lock"),
    }
    let _ = std::fs::remove_file(lock_path);

    try_acquire(lock_path)?.with_context(|| {
        format!(
            "Failed to acquire lock after cleanup attempt: {}",
            lock_path.display()
        )
    })
}

fn try_acquire(lock_path: &Path) -> Result<Option<LockFile>> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create lock directory: {}", parent.display()))?;
    }

    // Open without truncating so a running owner's PID stays readable
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(&file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(LockFile {
        file,
        path: lock_path.to_path_buf(),
    }))
}

/// PID recorded in the lock file, if it parses.
pub fn read_owner(lock_path: &Path) -> Option<u32> {
    std::fs::read_to_string(lock_path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Check a PID with signal 0.
pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists but belongs to someone else
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
