//! Persistence for the single provider credential.
//!
//! The store behaves like one key in a local key/value bucket: `get` returns
//! what the last `set` wrote, nothing ever deletes it, and an unusable medium
//! degrades to "no credential" instead of failing. An empty stored value
//! counts as absent.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::errors::{ResolverError, Result};

/// Fixed key under which the credential is stored.
pub const CREDENTIAL_KEY: &str = "openai-api-key";

/// Single-credential store. There is intentionally no `clear`.
pub trait CredentialStore: Send + Sync + Debug {
    /// Stored credential, `None` if never set or unreadable.
    fn get(&self) -> Option<String>;

    /// Stores `value` verbatim. Failures are logged and swallowed.
    fn set(&self, value: &str);

    fn has_credential(&self) -> bool {
        self.get().is_some()
    }
}

/// Type alias for Arc-wrapped CredentialStore trait objects
pub type CredentialStoreRef = Arc<dyn CredentialStore>;

/// Builds the store selected by `CREDENTIAL_STORE` (`file` | `memory`),
/// reading variables through `lookup`.
///
/// `file` uses `CREDENTIAL_STORE_PATH`, falling back to
/// [`FileCredentialStore::default_path`].
///
/// # Errors
/// [`ResolverError::InvalidConfig`] for an unknown kind or when no path can
/// be determined.
pub fn store_from_lookup<F>(lookup: F) -> Result<CredentialStoreRef>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = lookup("CREDENTIAL_STORE")
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| "file".to_string());

    match kind.as_str() {
        "memory" => {
            info!("credential store: in-memory (credential is lost on restart)");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
        "file" => {
            let path = lookup("CREDENTIAL_STORE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(|p| PathBuf::from(p.trim()))
                .or_else(FileCredentialStore::default_path)
                .ok_or_else(|| {
                    ResolverError::InvalidConfig(
                        "CREDENTIAL_STORE_PATH is unset and no config directory is available".into(),
                    )
                })?;
            info!(path = %path.display(), "credential store: file");
            Ok(Arc::new(FileCredentialStore::new(path)))
        }
        other => Err(ResolverError::InvalidConfig(format!(
            "CREDENTIAL_STORE must be `file` or `memory`, got `{other}`"
        ))),
    }
}

/* ------------------------------------------------------------------------- */
/* File-backed store                                                         */
/* ------------------------------------------------------------------------- */

/// JSON object file holding `{ "openai-api-key": "<value>" }`.
///
/// Other keys already present in the file are preserved on write. On Unix
/// the file is readable by its owner only.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<config dir>/faq-assistant/credentials.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("faq-assistant").join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as an empty bucket.
    fn read_bucket(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(ResolverError::StorageIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| ResolverError::StorageFormat {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes through a uniquely named, owner-only sibling temp file and
    /// renames it into place.
    fn write_bucket(&self, bucket: &BTreeMap<String, String>) -> Result<()> {
        let io_err = |source| ResolverError::StorageIo {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(io_err)?;
                parent
            }
            None => Path::new("."),
        };

        let body = serde_json::to_vec_pretty(bucket).map_err(|source| {
            ResolverError::StorageFormat {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        match self.read_bucket() {
            Ok(bucket) => bucket.get(CREDENTIAL_KEY).filter(|v| !v.is_empty()).cloned(),
            Err(e) => {
                warn!(error = %e, "credential storage unavailable; continuing without credential");
                None
            }
        }
    }

    fn set(&self, value: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut bucket = match self.read_bucket() {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!(error = %e, "existing credential storage unreadable; starting a fresh bucket");
                BTreeMap::new()
            }
        };
        bucket.insert(CREDENTIAL_KEY.to_string(), value.to_string());

        match self.write_bucket(&bucket) {
            Ok(()) => debug!(path = %self.path.display(), "credential stored"),
            Err(e) => warn!(error = %e, "credential storage unavailable; credential not persisted"),
        }
    }
}

/* ------------------------------------------------------------------------- */
/* In-memory store                                                           */
/* ------------------------------------------------------------------------- */

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    value: RwLock<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(value: &str) -> Self {
        Self {
            value: RwLock::new(Some(value.to_string())),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|v| !v.is_empty())
    }

    fn set(&self, value: &str) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn in_memory_set_then_get() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.get(), None);
        assert!(!store.has_credential());

        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));
        assert!(store.has_credential());

        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));

        store.set("xyz");
        assert_eq!(store.get().as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_value_counts_as_absent() {
        let store = InMemoryCredentialStore::with_credential("");
        assert!(!store.has_credential());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.get(), None);
        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get().as_deref(), Some("abc"));
        assert!(reopened.has_credential());

        let raw = fs::read_to_string(&path).unwrap();
        let bucket: HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(bucket.get(CREDENTIAL_KEY).map(String::as_str), Some("abc"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_writes_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::new(&path);
        store.set("sk-secret");
        store.set("sk-other");

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(store.get().as_deref(), Some("sk-other"));

        // No temp files left next to the bucket.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n != "credentials.json")
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.set("abc");

        let bucket: HashMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(bucket.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(bucket.get(CREDENTIAL_KEY).map(String::as_str), Some("abc"));
    }

    #[test]
    fn unavailable_medium_degrades_silently() {
        // A regular file used as a directory makes every read and write fail.
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let store = FileCredentialStore::new(blocker.path().join("credentials.json"));

        store.set("abc");
        assert_eq!(store.get(), None);
        assert!(!store.has_credential());
    }

    #[test]
    fn corrupt_file_reads_as_absent_and_is_repaired_by_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.get(), None);

        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));
    }

    #[test]
    fn store_kind_selection() {
        let lookup = |pairs: Vec<(&'static str, String)>| {
            let map: HashMap<&str, String> = pairs.into_iter().collect();
            move |name: &str| map.get(name).cloned()
        };

        let mem = store_from_lookup(lookup(vec![("CREDENTIAL_STORE", "memory".into())])).unwrap();
        mem.set("abc");
        assert_eq!(mem.get().as_deref(), Some("abc"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        let file = store_from_lookup(lookup(vec![
            ("CREDENTIAL_STORE", "File".into()),
            ("CREDENTIAL_STORE_PATH", path.display().to_string()),
        ]))
        .unwrap();
        file.set("abc");
        assert!(path.exists());

        let bad = store_from_lookup(lookup(vec![("CREDENTIAL_STORE", "cookie".into())]));
        assert!(matches!(bad, Err(ResolverError::InvalidConfig(_))));
    }
}
