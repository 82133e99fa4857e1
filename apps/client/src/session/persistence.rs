//! Persisted subset of the session: one named snapshot, overwritten on every commit.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::errors::ClientError;
use crate::models::user::User;

/// What survives a restart. Loading and error state are never part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

pub trait SnapshotStore: Send + Sync {
    /// Returns `None` when nothing has been committed yet.
    fn load(&self) -> Result<Option<SessionSnapshot>, ClientError>;

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), ClientError>;

    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file on disk. Writes go to a temp file in the same directory and are
/// renamed over the target, so readers see the old or the new snapshot, never a torn one.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, ClientError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| storage_error("parse", &self.path, e))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), ClientError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| storage_error("create directory for", &self.path, e))?;

        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| storage_error("stage", &self.path, e))?;
        serde_json::to_writer_pretty(&mut tmp, snapshot)
            .map_err(|e| storage_error("serialize", &self.path, e))?;
        tmp.flush()
            .map_err(|e| storage_error("flush", &self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| storage_error("replace", &self.path, e.error))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, e)),
        }
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Storage(format!("failed to {action} {}: {err}", path.display()))
}

/// In-process snapshot slot. Used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<SessionSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }

    /// Current contents, for inspection.
    pub fn current(&self) -> Option<SessionSnapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<SessionSnapshot>, ClientError> {
        Ok(self.current())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
