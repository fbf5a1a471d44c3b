//! Client preferences and the key/value store they persist to

use replay_core::{ReplayError, Result, DEFAULT_MATCH_COUNT};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Store key for the saved credential
pub const KEY_API_KEY: &str = "PG_KEY";

/// Store key for the saved match count
pub const KEY_MATCH_COUNT: &str = "PG_MATCH_COUNT";

/// Expected credential length for the default provider
pub const DEFAULT_CREDENTIAL_LENGTH: usize = 51;

/// Key/value persistence for client preferences
pub trait SettingsStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; absent keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ReplayError {
    ReplayError::config("settings store lock poisoned")
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk
///
/// The whole file is rewritten on every change. A missing file reads as empty.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!("Wrote settings to {}", self.path.display());
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Well-formedness check applied before a credential enables search or is saved
///
/// Provider key formats change; the length is configurable for that reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialRule {
    /// Exact length a credential must have
    pub expected_len: usize,
}

impl Default for CredentialRule {
    fn default() -> Self {
        Self {
            expected_len: DEFAULT_CREDENTIAL_LENGTH,
        }
    }
}

impl CredentialRule {
    /// Whether `key` is well-formed; surrounding whitespace counts
    pub fn is_valid(&self, key: &str) -> bool {
        key.chars().count() == self.expected_len
    }
}

/// User preferences for the search client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Embedding provider key as typed by the user
    pub api_key: String,
    /// Number of matches to request
    pub match_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            match_count: DEFAULT_MATCH_COUNT,
        }
    }
}

impl Settings {
    /// Load saved preferences, falling back to defaults for anything absent
    pub fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(key) = store.get(KEY_API_KEY)?.filter(|k| !k.is_empty()) {
            settings.api_key = key;
        }

        if let Some(raw) = store.get(KEY_MATCH_COUNT)? {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => settings.match_count = n,
                _ => warn!("Ignoring saved match count {:?}", raw),
            }
        }

        Ok(settings)
    }

    /// Persist both preferences, rejecting a malformed credential
    pub fn save(&self, store: &dyn SettingsStore, rule: &CredentialRule) -> Result<()> {
        if !rule.is_valid(&self.api_key) {
            return Err(ReplayError::validation("Please enter a valid API key."));
        }
        store.set(KEY_API_KEY, &self.api_key)?;
        store.set(KEY_MATCH_COUNT, &self.match_count.to_string())?;
        Ok(())
    }

    /// Forget saved preferences and reset to defaults
    pub fn clear(&mut self, store: &dyn SettingsStore) -> Result<()> {
        store.remove(KEY_API_KEY)?;
        store.remove(KEY_MATCH_COUNT)?;
        *self = Self::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_key() -> String {
        format!("sk-{}", "a".repeat(48))
    }

    #[test]
    fn test_credential_rule() {
        let rule = CredentialRule::default();
        assert!(rule.is_valid(&valid_key()));
        assert!(!rule.is_valid(&format!("  {}  ", valid_key())));
        assert!(!rule.is_valid(&format!(" {}", &valid_key()[..50])));
        assert!(!rule.is_valid(""));
        assert!(!rule.is_valid(&valid_key()[..50]));
        assert!(!rule.is_valid(&format!("{}b", valid_key())));

        let custom = CredentialRule { expected_len: 8 };
        assert!(custom.is_valid("12345678"));
    }

    #[test]
    fn test_load_defaults_from_empty_store() {
        let store = MemoryStore::new();
        let settings = Settings::load(&store).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.match_count, 3);
    }

    #[test]
    fn test_save_then_load_restores_values() {
        let store = MemoryStore::new();
        let settings = Settings {
            api_key: valid_key(),
            match_count: 7,
        };
        settings.save(&store, &CredentialRule::default()).unwrap();

        assert_eq!(Settings::load(&store).unwrap(), settings);
    }

    #[test]
    fn test_save_rejects_wrong_length() {
        let store = MemoryStore::new();
        for len in [0, 1, 50, 52] {
            let settings = Settings {
                api_key: "k".repeat(len),
                match_count: 5,
            };
            let err = settings
                .save(&store, &CredentialRule::default())
                .unwrap_err();
            assert_eq!(err.to_string(), "Please enter a valid API key.");
        }
        assert_eq!(store.get(KEY_API_KEY).unwrap(), None);
        assert_eq!(store.get(KEY_MATCH_COUNT).unwrap(), None);
    }

    #[test]
    fn test_padded_key_is_not_saved() {
        let store = MemoryStore::new();
        let settings = Settings {
            api_key: format!(" {} ", "k".repeat(51)),
            match_count: 3,
        };
        assert!(settings.save(&store, &CredentialRule::default()).is_err());
        assert_eq!(store.get(KEY_API_KEY).unwrap(), None);
    }

    #[test]
    fn test_saved_key_is_stored_verbatim() {
        let store = MemoryStore::new();
        let settings = Settings {
            api_key: format!("sk-{}  x", "b".repeat(45)),
            match_count: 6,
        };
        settings.save(&store, &CredentialRule::default()).unwrap();

        assert_eq!(store.get(KEY_API_KEY).unwrap(), Some(settings.api_key.clone()));
        assert_eq!(Settings::load(&store).unwrap(), settings);
    }

    #[test]
    fn test_clear_removes_keys_and_resets() {
        let store = MemoryStore::new();
        let mut settings = Settings {
            api_key: valid_key(),
            match_count: 9,
        };
        settings.save(&store, &CredentialRule::default()).unwrap();

        settings.clear(&store).unwrap();
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.match_count, 3);
        assert_eq!(store.get(KEY_API_KEY).unwrap(), None);
        assert_eq!(store.get(KEY_MATCH_COUNT).unwrap(), None);
        assert_eq!(Settings::load(&store).unwrap(), Settings::default());
    }

    #[test]
    fn test_unparseable_match_count_falls_back() {
        let store = MemoryStore::new();
        store.set(KEY_MATCH_COUNT, "lots").unwrap();
        assert_eq!(Settings::load(&store).unwrap().match_count, 3);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get(KEY_API_KEY).unwrap(), None);

        let settings = Settings {
            api_key: valid_key(),
            match_count: 4,
        };
        settings.save(&store, &CredentialRule::default()).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(Settings::load(&reopened).unwrap(), settings);

        let mut settings = settings;
        settings.clear(&reopened).unwrap();
        assert_eq!(Settings::load(&FileStore::new(&path)).unwrap(), Settings::default());
    }
}
