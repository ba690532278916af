//! Persistence for the single bearer token.
//!
//! The [`TokenStore`] trait hides where the token lives so the bootstrapper
//! and dispatcher can be exercised against [`MemoryTokenStore`] and run
//! against [`FileTokenStore`] in the terminal client.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Key under which the free token is persisted.
pub const TOKEN_KEY: &str = "veritlyai_free_token";

/// Storage for at most one bearer token.
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, if any.  Empty strings count as absent.
    fn get(&self) -> Option<String>;

    /// Stores `token`, replacing any previous value.
    fn set(&self, token: &str) -> Result<()>;

    /// Returns true if a token is stored.
    fn has(&self) -> bool {
        self.get().is_some()
    }
}

/// A token store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot().clone().filter(|t| !t.is_empty())
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }
}

/// A token store backed by a small JSON key/value file.
///
/// Other keys in the file are preserved on write.  A missing, unreadable or
/// malformed file reads as "no token".
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Creates a store using [`TOKEN_KEY`] in the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, TOKEN_KEY)
    }

    /// Creates a store using a custom key.
    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(Error::io("failed to read token file", err)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::validation(
                "token file does not hold a JSON object",
                Some(self.path.display().to_string()),
            )),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|err| Error::io("failed to create token directory", err))?;
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|err| Error::io("failed to create token file", err))?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.as_file_mut().sync_all())
            .map_err(|err| Error::io("failed to write token file", err))?;
        tmp.persist(&self.path)
            .map_err(|err| Error::io("failed to replace token file", err.error))?;
        Ok(())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let _guard = self.guard();
        let entries = self.read_entries().ok()?;
        entries
            .get(&self.key)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from)
    }

    fn set(&self, token: &str) -> Result<()> {
        let _guard = self.guard();
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }
}
