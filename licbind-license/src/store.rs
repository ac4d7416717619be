//! Encrypted on-disk storage of license records.
//!
//! A license file is the raw envelope of the JSON-encoded record. Writes go
//! through a temp file in the same directory that is renamed over the
//! target, so a failed save never leaves a half-written license behind.
//! Read-modify-write sequences hold an advisory lock on a `<file>.lock`
//! sidecar for their duration.

use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseRecord;
use fs2::FileExt;
use licbind_crypto::{open, random_bytes, seal, DerivedKey};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Size of the random block written over a revoked license.
pub const REVOCATION_BLOCK_SIZE: usize = 1024;

/// Reads and decrypts the record at `path`.
///
/// # Errors
///
/// - [`LicenseError::NoSuchLicense`] if the file does not exist
/// - [`LicenseError::CorruptOrRevoked`] if the envelope does not authenticate
/// - [`LicenseError::MalformedRecord`] if the plaintext is not a record
pub fn load_record(path: &Path, key: &DerivedKey) -> LicenseResult<LicenseRecord> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LicenseError::NoSuchLicense(path.display().to_string()),
        _ => LicenseError::Storage(format!("failed to read {}: {e}", path.display())),
    })?;

    let plaintext = open(key, &bytes)?;

    serde_json::from_slice(&plaintext).map_err(|e| LicenseError::MalformedRecord(e.to_string()))
}

/// Encrypts `record` and atomically replaces the file at `path`.
///
/// Parent directories are created as needed. Every failure is reported as
/// [`LicenseError::PersistenceFailed`] and leaves any previous file intact.
pub fn save_record(record: &LicenseRecord, path: &Path, key: &DerivedKey) -> LicenseResult<()> {
    let persist_err = |what: &str, e: &dyn std::fmt::Display| {
        LicenseError::PersistenceFailed(format!("{what} {}: {e}", path.display()))
    };

    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| persist_err("failed to encode", &e))?;
    let sealed = seal(key, &json).map_err(|e| persist_err("failed to encrypt", &e))?;

    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| persist_err("failed to create directory for", &e))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| persist_err("failed to create temp file for", &e))?;
    temp_file
        .write_all(&sealed)
        .map_err(|e| persist_err("failed to write", &e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| persist_err("failed to sync", &e))?;
    temp_file
        .persist(path)
        .map_err(|e| persist_err("failed to replace", &e.error))?;

    debug!(path = %path.display(), bytes = sealed.len(), "License file written");
    Ok(())
}

/// Overwrites the whole file at `path` with random bytes.
///
/// # Errors
///
/// Returns [`LicenseError::NoSuchLicense`] if there is no file to overwrite.
pub fn overwrite_with_random(path: &Path) -> LicenseResult<()> {
    match fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LicenseError::NoSuchLicense(path.display().to_string()));
        }
        Err(e) => {
            return Err(LicenseError::Storage(format!(
                "failed to stat {}: {e}",
                path.display()
            )));
        }
    }

    let garbage = random_bytes(REVOCATION_BLOCK_SIZE)?;

    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| LicenseError::Storage(format!("failed to open {}: {e}", path.display())))?;
    file.write_all(&garbage)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            LicenseError::Storage(format!("failed to overwrite {}: {e}", path.display()))
        })?;
    Ok(())
}

/// Advisory lock on a license file, released on drop.
#[derive(Debug)]
pub struct LicenseLock {
    file: File,
}

impl LicenseLock {
    /// Takes the exclusive lock for `path`, creating the lock file (and its
    /// directory) if needed.
    pub fn exclusive(path: &Path) -> LicenseResult<Self> {
        let lock_path = lock_path(path);
        fs::create_dir_all(parent_dir(path)).map_err(|e| {
            LicenseError::Storage(format!("failed to create directory for {}: {e}", path.display()))
        })?;
        let file = open_lock_file(&lock_path)?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            LicenseError::Storage(format!("failed to lock {}: {e}", lock_path.display()))
        })?;
        Ok(Self { file })
    }

    /// Takes the exclusive lock for a license that must already exist.
    ///
    /// Fails with [`LicenseError::NoSuchLicense`] without creating anything
    /// when there is no file at `path`.
    pub fn exclusive_existing(path: &Path) -> LicenseResult<Self> {
        require_license(path)?;
        Self::exclusive(path)
    }

    /// Takes a shared lock for read-only access.
    ///
    /// Creates the lock file if it is missing, so callers check the license
    /// exists first. Returns `None` when the lock file cannot be created, for example in a
    /// read-only directory; the read then proceeds unlocked.
    pub fn shared(path: &Path) -> Option<Self> {
        let lock_path = lock_path(path);
        let file = match open_lock_file(&lock_path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %lock_path.display(), "Reading without lock: {}", e);
                return None;
            }
        };
        match FileExt::lock_shared(&file) {
            Ok(()) => Some(Self { file }),
            Err(e) => {
                debug!(path = %lock_path.display(), "Reading without lock: {}", e);
                None
            }
        }
    }
}

impl Drop for LicenseLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Fails with [`LicenseError::NoSuchLicense`] when there is no file at `path`.
pub(crate) fn require_license(path: &Path) -> LicenseResult<()> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(LicenseError::NoSuchLicense(path.display().to_string())),
        Err(e) => Err(LicenseError::Storage(format!(
            "failed to stat {}: {e}",
            path.display()
        ))),
    }
}

/// Sidecar lock path: `<path>.lock`.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn open_lock_file(lock_path: &Path) -> LicenseResult<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| {
            LicenseError::Storage(format!("failed to open lock {}: {e}", lock_path.display()))
        })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
