//! Durable key-value state shared with the extension.
//!
//! Only two keys are ever written:
//!
//! | Key           | Value                                   |
//! |---------------|-----------------------------------------|
//! | `mode`        | `"none"`, `"useful"` or `"useless"`     |
//! | `junkWindows` | array of window ids created by a burst  |
//!
//! [`JsonFileStore`] keeps them in one JSON object on disk so a later
//! clear-chaos (possibly after a restart) still knows which windows to
//! close.  [`MemoryStore`] is the volatile equivalent.

use crate::command::{Mode, WindowId};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Key holding the persisted [`Mode`].
pub const MODE_KEY: &str = "mode";

/// Key holding the junk window registry.
pub const JUNK_WINDOWS_KEY: &str = "junkWindows";

/// Errors produced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state file {0} does not hold a JSON object")]
    NotAnObject(PathBuf),
}

/// A durable key-value store.
///
/// Backends implement [`get`](Store::get) / [`set`](Store::set); the typed
/// accessors are shared.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Current mode; missing or unreadable values count as [`Mode::None`].
    fn mode(&self) -> Result<Mode, StoreError> {
        match self.get(MODE_KEY)? {
            None => Ok(Mode::None),
            Some(value) => Ok(serde_json::from_value(value.clone()).unwrap_or_else(|_| {
                warn!("ignoring unknown mode {}", value);
                Mode::None
            })),
        }
    }

    fn set_mode(&mut self, mode: Mode) -> Result<(), StoreError> {
        self.set(MODE_KEY, serde_json::to_value(mode)?)
    }

    /// Registered junk windows in creation order.
    fn junk_windows(&self) -> Result<Vec<WindowId>, StoreError> {
        match self.get(JUNK_WINDOWS_KEY)? {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value.clone()).unwrap_or_else(|_| {
                warn!("ignoring malformed junk window list {}", value);
                Vec::new()
            })),
        }
    }

    fn set_junk_windows(&mut self, ids: &[WindowId]) -> Result<(), StoreError> {
        self.set(JUNK_WINDOWS_KEY, serde_json::to_value(ids)?)
    }
}

/// Volatile store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every [`set`](Store::set) rewrites the file through a temporary sibling
/// and a rename, so a crash never leaves a half-written state file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`.  A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => map,
                _ => return Err(StoreError::NotAnObject(path)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no state file at {}, starting empty", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    /// The filesystem path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.persist()
    }
}

//  Tests
