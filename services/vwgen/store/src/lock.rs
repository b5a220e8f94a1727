//! Whole-file advisory locks held for the lifetime of a guard.
//!
//! Acquisition first probes without blocking. On contention a single notice
//! goes to stderr and the call blocks until the lock is granted; there is no
//! timeout. Dropping the guard unlocks and closes the file on every exit path.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Notice printed while waiting for another process to release the file
pub const WAIT_NOTICE: &str = "The configuration file is being used by another process, waiting.";

/// Strength of an advisory lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    /// Many readers at once
    Shared,
    /// One writer, no readers
    Exclusive,
}

/// Open file holding an advisory lock
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl LockedFile {
    /// Open an existing file and lock it.
    ///
    /// Shared locks open the file read-only, exclusive locks read-write.
    pub fn open(path: &Path, mode: LockMode) -> io::Result<Self> {
        let file = match mode {
            LockMode::Shared => OpenOptions::new().read(true).open(path)?,
            LockMode::Exclusive => OpenOptions::new().read(true).write(true).open(path)?,
        };
        Self::acquire(file, path, mode)
    }

    /// Open or create a file and lock it exclusively.
    ///
    /// Existing contents are left alone until the lock is held.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::acquire(file, path, LockMode::Exclusive)
    }

    fn acquire(file: File, path: &Path, mode: LockMode) -> io::Result<Self> {
        let attempt = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };

        match attempt {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                debug!("Lock on {:?} is contended, blocking", path);
                eprint!("{}", WAIT_NOTICE);
                match mode {
                    LockMode::Shared => FileExt::lock_shared(&file)?,
                    LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
                }
                eprintln!();
            }
            Err(e) => return Err(e),
        }

        debug!("Acquired {:?} lock on {:?}", mode, path);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
        })
    }

    /// Check whether this guard already covers `mode` access to `path`
    pub fn satisfies(&self, path: &Path, mode: LockMode) -> bool {
        self.path == path && self.mode >= mode
    }

    /// Mode the lock was taken in
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the locked file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file from the start
    pub fn read_to_string(&mut self) -> io::Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        self.file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// Replace the file contents with `data`.
    ///
    /// The file is rewritten in place so processes already waiting on this
    /// inode observe the new contents once they get the lock.
    pub fn replace_contents(&mut self, data: &[u8]) -> io::Result<()> {
        if self.mode != LockMode::Exclusive {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is not locked for writing",
            ));
        }
        self.file.seek(SeekFrom::Start(0))?;
        self.file.set_len(0)?;
        self.file.write_all(data)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to unlock {:?}: {}", self.path, e);
        } else {
            debug!("Released lock on {:?}", self.path);
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
