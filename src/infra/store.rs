//! File-backed local state store.
//!
//! A flat string-keyed map persisted as one JSON object in a single file,
//! playing the role browser localStorage plays for the original site: a
//! handful of known keys holding preference flags, cached spreadsheet rows,
//! locally edited content lists, and the admin credential record.

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::infra::error::InfraError;
use crate::util::lock::{rw_read, rw_write};

/// Registry of known store keys.
pub mod keys {
    pub const THEME: &str = "theme";
    pub const LANGUAGE: &str = "language";
    pub const POSTS: &str = "posts";
    pub const EXPERIENCE: &str = "experience";
    pub const CACHED_SHEET_POSTS: &str = "cached_sheet_posts";
    pub const ADMIN_CREDENTIAL: &str = "admin_credential";
}

const SOURCE: &str = "infra::store";
const SECURE_PREFIX: &str = "secure.";
// Demo-grade obfuscation, not encryption; the payload under a secure key is
// already a salted hash record.
const OBFUSCATION_KEY: &[u8] = b"vetrina_secure_key_v1";

pub struct LocalStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl LocalStore {
    /// Open the store, reading the state file when present. A missing file
    /// is an empty store; a malformed one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(
                        target = "vetrina::store",
                        path = %path.display(),
                        error = %err,
                        "state file is not a valid JSON object, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(InfraError::Io(err)),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), InfraError> {
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), value.into());
        self.persist()
    }

    pub fn remove(&self, key: &str) -> Result<(), InfraError> {
        rw_write(&self.entries, SOURCE, "remove").remove(key);
        self.persist()
    }

    /// Decode the JSON value under a key. A corrupt value is logged and
    /// read as absent rather than surfaced as an error.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = "vetrina::store",
                    key,
                    error = %err,
                    "stored value is not valid JSON, ignoring"
                );
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), InfraError> {
        let raw = serde_json::to_string(value)
            .map_err(|err| InfraError::store(format!("failed to encode `{key}`: {err}")))?;
        self.set(key, raw)
    }

    /// Read an obfuscated entry. An undecodable payload reads as absent.
    pub fn get_secure(&self, key: &str) -> Option<String> {
        let raw = self.get(&format!("{SECURE_PREFIX}{key}"))?;
        match deobfuscate(&raw) {
            Some(value) => Some(value),
            None => {
                warn!(
                    target = "vetrina::store",
                    key,
                    "secure entry could not be decoded, ignoring"
                );
                None
            }
        }
    }

    pub fn set_secure(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.set(&format!("{SECURE_PREFIX}{key}"), obfuscate(value))
    }

    /// Number of persisted entries; used by the health probe.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self) -> Result<(), InfraError> {
        let raw = {
            let entries = rw_read(&self.entries, SOURCE, "persist");
            serde_json::to_string_pretty(&*entries)
                .map_err(|err| InfraError::store(format!("failed to encode state file: {err}")))?
        };
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(raw.as_bytes())?;
        staged
            .persist(&self.path)
            .map_err(|err| InfraError::Io(err.error))?;
        Ok(())
    }
}

fn obfuscate(value: &str) -> String {
    let mixed: Vec<u8> = value
        .bytes()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect();
    BASE64.encode(mixed)
}

fn deobfuscate(value: &str) -> Option<String> {
    let decoded = BASE64.decode(value).ok()?;
    let mixed: Vec<u8> = decoded
        .iter()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect();
    String::from_utf8(mixed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::open(dir.path().join("state.json")).expect("open store");
        (dir, store)
    }

    #[test]
    fn values_survive_a_reopen() {
        let (dir, store) = temp_store();
        store.set(keys::THEME, "dark").expect("set");
        drop(store);

        let reopened = LocalStore::open(dir.path().join("state.json")).expect("reopen");
        assert_eq!(reopened.get(keys::THEME).as_deref(), Some("dark"));
    }

    #[test]
    fn malformed_state_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write garbage");

        let store = LocalStore::open(&path).expect("open despite garbage");
        assert!(store.is_empty());

        // The store stays writable afterwards.
        store.set(keys::LANGUAGE, "es").expect("set");
        assert_eq!(store.get(keys::LANGUAGE).as_deref(), Some("es"));
    }

    #[test]
    fn removed_keys_stay_gone_after_reopen() {
        let (dir, store) = temp_store();
        store.set(keys::LANGUAGE, "es").expect("set");
        store.remove(keys::LANGUAGE).expect("remove");
        drop(store);

        let reopened = LocalStore::open(dir.path().join("state.json")).expect("reopen");
        assert!(reopened.get(keys::LANGUAGE).is_none());
    }

    #[test]
    fn corrupt_json_value_reads_as_absent() {
        let (_dir, store) = temp_store();
        store.set(keys::POSTS, "[{broken").expect("set");
        assert!(store.get_json::<Vec<String>>(keys::POSTS).is_none());
    }

    #[test]
    fn secure_entries_round_trip_and_never_store_plaintext() {
        let (_dir, store) = temp_store();
        store
            .set_secure(keys::ADMIN_CREDENTIAL, "hunter2-record")
            .expect("set secure");

        let raw = store.get("secure.admin_credential").expect("raw entry");
        assert_ne!(raw, "hunter2-record");
        assert_eq!(
            store.get_secure(keys::ADMIN_CREDENTIAL).as_deref(),
            Some("hunter2-record")
        );
    }

    #[test]
    fn undecodable_secure_entry_reads_as_absent() {
        let (_dir, store) = temp_store();
        store
            .set("secure.admin_credential", "%%% not base64 %%%")
            .expect("set");
        assert!(store.get_secure(keys::ADMIN_CREDENTIAL).is_none());
    }
}
