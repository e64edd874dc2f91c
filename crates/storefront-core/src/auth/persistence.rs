use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::debug;

use super::SessionData;

/// Fixed key the session record is stored under.
pub const STORAGE_KEY: &str = "user-store";

/// Durable storage for the session record.
///
/// `save` replaces the previous record as a whole; `load` returns `None`
/// when nothing has been stored yet.
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<SessionData>>;
    fn save(&self, record: &SessionData) -> Result<()>;
}

/// Stores the record as JSON in `<dir>/user-store.json`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileStore {
    fn load(&self) -> Result<Option<SessionData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let record = serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(record)?;

        // Write beside the record, then rename over it so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        debug!(path = ?self.path, "Session record saved");
        Ok(())
    }
}

/// Keeps the record in process memory only.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw serialized contents, as if written by an earlier process.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(raw.into())),
        }
    }

    /// The last record written, in its serialized form.
    pub fn raw(&self) -> Option<String> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionPersistence for MemoryStore {
    fn load(&self) -> Result<Option<SessionData>> {
        match self.raw() {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).context("Failed to parse stored session")?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, record: &SessionData) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }
}

impl<P: SessionPersistence + ?Sized> SessionPersistence for Box<P> {
    fn load(&self) -> Result<Option<SessionData>> {
        (**self).load()
    }

    fn save(&self, record: &SessionData) -> Result<()> {
        (**self).save(record)
    }
}

// Lets a caller keep a handle on the store it hands to the session.
impl<P: SessionPersistence + ?Sized> SessionPersistence for std::sync::Arc<P> {
    fn load(&self) -> Result<Option<SessionData>> {
        (**self).load()
    }

    fn save(&self, record: &SessionData) -> Result<()> {
        (**self).save(record)
    }
}
