use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

pub const PREFERENCES_KEY: &str = "preferences";
pub const STATS_KEY: &str = "stats";

/// Key-value durable store holding opaque JSON records
pub trait Storage {
    /// `None` when the record is absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per record under a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            dir: AppDirs::data_dir(),
        }
    }

    pub fn with_dir<P: AsRef<Path>>(p: P) -> Self {
        Self {
            dir: p.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data dir {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Volatile store, used by tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .records
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        storage
    }

    /// Number of successful `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.records.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.records
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }
}

/// Load `key`, merging each stored field over the defaults independently.
///
/// Fields that are missing or fail to deserialize keep their default value.
/// A record that is not a JSON object yields `T::default()`.
pub fn load_merged<T, S>(storage: &S, key: &str) -> T
where
    T: Serialize + DeserializeOwned + Default,
    S: Storage + ?Sized,
{
    match storage.read(key) {
        Some(raw) => merge_over_defaults(key, &raw),
        None => T::default(),
    }
}

pub fn merge_over_defaults<T>(key: &str, raw: &str) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => merge_value_over_defaults(key, value),
        Err(e) => {
            log::warn!("stored {key} record is corrupt ({e}), using defaults");
            T::default()
        }
    }
}

/// Field-by-field merge of an already parsed JSON value over `T::default()`.
pub fn merge_value_over_defaults<T>(key: &str, value: Value) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    let Value::Object(stored) = value else {
        log::warn!("stored {key} record is not an object, using defaults");
        return T::default();
    };

    let mut merged: Map<String, Value> = match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => map,
        _ => return T::default(),
    };

    for (field, value) in stored {
        let mut candidate = merged.clone();
        candidate.insert(field.clone(), value);
        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            merged = candidate;
        } else {
            log::warn!("dropping malformed field {key}.{field}");
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

pub fn save<T, S>(storage: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize,
    S: Storage + ?Sized,
{
    let data = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {key}"))?;
    storage.write(key, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Sample {
        count: u32,
        label: String,
        enabled: bool,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                count: 7,
                label: "seven".into(),
                enabled: true,
            }
        }
    }

    #[test]
    fn file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::with_dir(dir.path().join("nested"));
        let value = Sample {
            count: 1,
            label: "one".into(),
            enabled: false,
        };

        save(&storage, "sample", &value).unwrap();
        assert!(storage.path_for("sample").exists());

        let loaded: Sample = load_merged(&storage, "sample");
        assert_eq!(loaded, value);
    }

    #[test]
    fn missing_record_is_default() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::with_dir(dir.path());
        let loaded: Sample = load_merged(&storage, "absent");
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn corrupt_record_is_default() {
        let storage = MemoryStorage::with_record("sample", "{not json");
        let loaded: Sample = load_merged(&storage, "sample");
        assert_eq!(loaded, Sample::default());

        let storage = MemoryStorage::with_record("sample", "[1, 2]");
        let loaded: Sample = load_merged(&storage, "sample");
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn partial_record_merges_over_defaults() {
        let storage = MemoryStorage::with_record("sample", r#"{"label":"custom"}"#);
        let loaded: Sample = load_merged(&storage, "sample");
        assert_eq!(
            loaded,
            Sample {
                label: "custom".into(),
                ..Sample::default()
            }
        );
    }

    #[test]
    fn malformed_field_keeps_default_others_survive() {
        let storage =
            MemoryStorage::with_record("sample", r#"{"count":"lots","enabled":false,"extra":1}"#);
        let loaded: Sample = load_merged(&storage, "sample");
        assert_eq!(loaded.count, 7);
        assert!(!loaded.enabled);
        assert_eq!(loaded.label, "seven");
    }

    #[test]
    fn memory_storage_overwrites() {
        let storage = MemoryStorage::new();
        storage.write("k", "1").unwrap();
        storage.write("k", "2").unwrap();
        assert_eq!(storage.read("k").as_deref(), Some("2"));
        assert_eq!(storage.writes(), 2);
    }
}
