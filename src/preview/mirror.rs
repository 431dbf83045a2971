//! Local persisted toggle mirror
//!
//! Remembers `line → checked` for the preview so that a preview rebuilt
//! from a document that has not caught up with the latest edit still shows
//! what the user clicked. Everything here is advisory: unreadable,
//! malformed or foreign contents read as "nothing mirrored", and write
//! failures are reported as [`Failure::Storage`] for the caller to absorb.

use crate::error::{BestEffort, Failure};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Storage key holding the mirror's JSON object.
pub const MIRROR_STORAGE_KEY: &str = "md-checkboxes-state";

/// A string key-value store that outlives the preview surface.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), String>;
}

/// Mirrored checkbox states, keyed by line identifier.
pub type MirroredStates = BTreeMap<String, bool>;

/// The mirror itself, over any storage backend.
#[derive(Debug)]
pub struct ToggleMirror<S> {
    storage: S,
}

impl<S: KeyValueStorage> ToggleMirror<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read all mirrored states.
    ///
    /// Only an unreadable store is a failure; missing or malformed contents
    /// and non-boolean entries are skipped.
    pub fn load(&self) -> BestEffort<MirroredStates> {
        let raw = self
            .storage
            .get_item(MIRROR_STORAGE_KEY)
            .map_err(Failure::Storage)?;
        Ok(raw.as_deref().map(parse_states).unwrap_or_default())
    }

    /// Read all mirrored states, treating any failure as an empty mirror.
    pub fn states(&self) -> MirroredStates {
        self.load().unwrap_or_default()
    }

    /// Record the latest state for a line. Last write wins per line.
    pub fn record(&self, line: &str, checked: bool) -> BestEffort<()> {
        let mut states = self.load()?;
        states.insert(line.to_string(), checked);
        let object: Map<String, Value> = states
            .into_iter()
            .map(|(line, checked)| (line, Value::Bool(checked)))
            .collect();
        let json = Value::Object(object).to_string();
        self.storage
            .set_item(MIRROR_STORAGE_KEY, &json)
            .map_err(Failure::Storage)
    }
}

fn parse_states(raw: &str) -> MirroredStates {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(line, value)| value.as_bool().map(|checked| (line, checked)))
            .collect(),
        _ => MirroredStates::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local storage, for hosts without persistent storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::KeyValueStorage;
    use crate::config::get_data_dir;
    use crate::error::Result;
    use serde_json::{Map, Value};
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Storage backed by one JSON file holding a string-to-string object.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// Storage file inside the platform data directory.
        pub fn in_data_dir(file_name: &str) -> Result<Self> {
            Ok(Self::new(get_data_dir()?.join(file_name)))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn read_items(&self) -> std::result::Result<Map<String, Value>, String> {
            match fs::read_to_string(&self.path) {
                Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                    Ok(Value::Object(map)) => Ok(map),
                    _ => Ok(Map::new()),
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
                Err(e) => Err(format!("{}: {}", self.path.display(), e)),
            }
        }
    }

    impl KeyValueStorage for FileStorage {
        fn get_item(&self, key: &str) -> std::result::Result<Option<String>, String> {
            Ok(self
                .read_items()?
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string))
        }

        fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), String> {
            let mut items = self.read_items()?;
            items.insert(key.to_string(), Value::String(value.to_string()));
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            fs::write(&self.path, Value::Object(items).to_string())
                .map_err(|e| format!("{}: {}", self.path.display(), e))
        }
    }
}
