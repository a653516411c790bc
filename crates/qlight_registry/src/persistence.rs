//! Snapshot persistence for the device registry
//!
//! The whole registry is stored as one JSON array of device records. Saves go to a
//! temporary sibling file which is then renamed over the snapshot, so the file on disk
//! is always either the previous complete document or the new one.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::models::DeviceRecord;

/// What a save actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot was replaced with this many records.
    Written(usize),
    /// Nothing to persist; the existing file was left untouched.
    Skipped,
}

/// Storage for the registry snapshot.
///
/// Implementations do blocking I/O; async callers go through `spawn_blocking`.
pub trait SnapshotRepository: Send + Sync {
    /// Read the stored record set. A snapshot that does not exist yet is an empty set.
    fn load_snapshot(&self) -> Result<Vec<DeviceRecord>, RegistryError>;

    /// Replace the stored record set with `records`.
    fn save_snapshot(&self, records: &[DeviceRecord]) -> Result<SaveOutcome, RegistryError>;
}

/// Load the snapshot, treating any failure as an empty registry.
pub fn load_or_empty(repository: &dyn SnapshotRepository) -> Vec<DeviceRecord> {
    match repository.load_snapshot() {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "could not load registry snapshot, starting empty");
            Vec::new()
        }
    }
}

/// JSON snapshot in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<snapshot>.tmp` next to the snapshot, so the rename stays on one filesystem.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn encode(records: &[DeviceRecord]) -> Result<Vec<u8>, RegistryError> {
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
        records
            .serialize(&mut serializer)
            .map_err(RegistryError::Encode)?;
        Ok(out)
    }
}

impl SnapshotRepository for JsonFileSnapshot {
    fn load_snapshot(&self) -> Result<Vec<DeviceRecord>, RegistryError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no registry snapshot yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(RegistryError::io(&self.path, err)),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let records: Option<Vec<DeviceRecord>> =
            serde_json::from_slice(&raw).map_err(RegistryError::Decode)?;
        let records = records.unwrap_or_default();
        info!(path = %self.path.display(), count = records.len(), "loaded registry snapshot");
        Ok(records)
    }

    fn save_snapshot(&self, records: &[DeviceRecord]) -> Result<SaveOutcome, RegistryError> {
        if records.is_empty() {
            debug!(path = %self.path.display(), "no records in registry to save");
            return Ok(SaveOutcome::Skipped);
        }

        let bytes = Self::encode(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| RegistryError::io(parent, err))?;
        }

        let temp_path = self.temp_path();
        let write_temp = || -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()
        };
        if let Err(err) = write_temp() {
            let _ = fs::remove_file(&temp_path);
            return Err(RegistryError::io(&temp_path, err));
        }
        fs::rename(&temp_path, &self.path).map_err(|err| RegistryError::io(&self.path, err))?;

        debug!(path = %self.path.display(), count = records.len(), "saved registry snapshot");
        Ok(SaveOutcome::Written(records.len()))
    }
}
