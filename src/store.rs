//! File-backed register storage.
//!
//! One register maps to one file, `<state_dir>/<name>.json`, whose entire
//! content is the serialized current value. The store distinguishes an
//! *absent* register (no file) from one holding JSON `null`; callers decide
//! how to fold the two together.
//!
//! Writes are direct overwrites with no temp-and-rename step. Callers only
//! invoke `write` while holding the register's wait-entry lock, so this
//! process never writes a file concurrently with itself; a crash mid-write
//! can still truncate a file.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;
use snafu::{ensure, ResultExt};

use crate::error::{CorruptSnafu, InvalidNameSnafu, IoSnafu, RegisterError, SerializeSnafu};

/// Maximum length of a register name.
pub const MAX_NAME_LEN: usize = 32;

/// Check a register name against `^[A-Za-z0-9]{0,32}$`.
pub fn is_valid_register_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Reads and writes the persisted value of named registers.
#[derive(Debug, Clone)]
pub struct RegisterStore {
    state_dir: PathBuf,
}

impl RegisterStore {
    /// Create a store rooted at `state_dir`.
    ///
    /// The directory is expected to exist; a single process owns it (no
    /// cross-process locking is performed).
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Directory holding the register files.
    pub fn state_dir(&self) -> &std::path::Path {
        &self.state_dir
    }

    /// Resolve the file backing `name`.
    ///
    /// Names are validated here as well as at the dispatch layer, so a bad
    /// name can never reach the filesystem.
    fn register_path(&self, name: &str) -> Result<PathBuf, RegisterError> {
        ensure!(is_valid_register_name(name), InvalidNameSnafu { name });
        Ok(self.state_dir.join(format!("{name}.json")))
    }

    /// Load the persisted value of `name`, or `None` if it was never written.
    pub async fn read(&self, name: &str) -> Result<Option<Value>, RegisterError> {
        let path = self.register_path(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context(IoSnafu { path }),
        };
        let value = serde_json::from_slice(&bytes).context(CorruptSnafu { name })?;
        Ok(Some(value))
    }

    /// Serialize `value` and overwrite the persisted content for `name`.
    pub async fn write(&self, name: &str, value: &Value) -> Result<(), RegisterError> {
        let path = self.register_path(name)?;
        let bytes = serde_json::to_vec(value).context(SerializeSnafu { name })?;
        tokio::fs::write(&path, bytes).await.context(IoSnafu { path })
    }
}
