//! Key-value storage for the rule state between sessions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::classification::{parse_rule_set, serialize_rule_set, RuleState};
use crate::error::PersistenceError;

/// The single key the rule state is stored under.
pub const STORAGE_KEY: &str = "pipeline-analyzer.rule-state";

/// A minimal string store.
pub trait KeyValueStorage {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// In-process storage, lost when dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: FxHashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(self.path_for(key), value).map_err(io_err)
    }
}

/// Load the stored rule state.
///
/// Missing, unreadable or corrupt state all load as `RuleState::default()`;
/// the cause is logged and otherwise ignored.
pub fn load_rule_state<S: KeyValueStorage + ?Sized>(storage: &S) -> RuleState {
    match storage.read(STORAGE_KEY) {
        Ok(Some(text)) => parse_rule_set(&text).unwrap_or_else(|err| {
            tracing::warn!("Ignoring stored rule state: {}", err);
            RuleState::default()
        }),
        Ok(None) => RuleState::default(),
        Err(err) => {
            tracing::warn!("Could not read stored rule state: {}", err);
            RuleState::default()
        }
    }
}

/// Store the rule state under `STORAGE_KEY`.
pub fn save_rule_state<S: KeyValueStorage + ?Sized>(
    storage: &mut S,
    state: &RuleState,
) -> Result<(), PersistenceError> {
    let text = serialize_rule_set(state)?;
    storage.write(STORAGE_KEY, &text)
}
