//! File-backed session storage.
//!
//! All keys live in one JSON document so that multi-key writes and `clear`
//! are a single atomic replace (temp file + rename). On Unix the file is
//! created with 0600 permissions. With a `Sealer` the document is
//! encrypted at rest.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::seal::{SealedDocument, Sealer};
use super::{KeyValueBackend, StoreError};

/// File permissions for the session file (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

type Document = BTreeMap<String, String>;

pub struct FileBackend {
    path: PathBuf,
    sealer: Option<Sealer>,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sealer: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Encrypt the document at rest with a passphrase-derived key
    pub fn sealed(path: impl Into<PathBuf>, sealer: Sealer) -> Self {
        Self {
            sealer: Some(sealer),
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_sealed(&self) -> bool {
        self.sealer.is_some()
    }

    /// Read the document. A missing, empty or unreadable document is empty.
    fn load(&self) -> Result<Document, StoreError> {
        if !self.path.exists() {
            return Ok(Document::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Document::new());
        }

        let parsed = match &self.sealer {
            Some(sealer) => serde_json::from_str::<SealedDocument>(&contents)
                .map_err(StoreError::from)
                .and_then(|doc| sealer.open(&doc))
                .and_then(|plain| serde_json::from_slice::<Document>(&plain).map_err(StoreError::from)),
            None => serde_json::from_str::<Document>(&contents).map_err(StoreError::from),
        };

        match parsed {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Session file unreadable, treating as empty");
                Ok(Document::new())
            }
        }
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = match &self.sealer {
            Some(sealer) => {
                let plain = serde_json::to_vec(doc)?;
                serde_json::to_string_pretty(&sealer.seal(&plain)?)?
            }
            None => serde_json::to_string_pretty(doc)?,
        };

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), keys = doc.len(), "Session file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = self.load()?;
        apply(&mut doc);
        if doc.is_empty() && !self.path.exists() {
            return Ok(());
        }
        self.save(&doc)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let doc = self.load()?;
        Ok(keys.iter().map(|key| doc.get(*key).cloned()).collect())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        self.update(|doc| {
            for (key, value) in entries {
                doc.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.update(|doc| {
            for key in keys {
                doc.remove(*key);
            }
        })
    }

    fn name(&self) -> &str {
        if self.is_sealed() {
            "sealed-file"
        } else {
            "file"
        }
    }
}

impl fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBackend")
            .field("path", &self.path)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
