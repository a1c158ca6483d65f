//! JSON file credential store.
//!
//! Keeps the bearer token between invocations at
//! `PARTSTORE_CREDENTIAL_FILE`, or `$HOME/.partstore/credential.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use partstore_client::{CredentialStore, StoredCredential};

use crate::error::CliError;

const CREDENTIAL_FILE_VAR: &str = "PARTSTORE_CREDENTIAL_FILE";

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the configured location.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidInput` when neither `PARTSTORE_CREDENTIAL_FILE`
    /// nor `HOME` is set.
    pub fn from_env() -> Result<Self, CliError> {
        if let Some(path) = std::env::var_os(CREDENTIAL_FILE_VAR) {
            return Ok(Self::new(PathBuf::from(path)));
        }

        let home = std::env::var_os("HOME").ok_or_else(|| {
            CliError::InvalidInput(format!("set {CREDENTIAL_FILE_VAR} or HOME"))
        })?;
        Ok(Self::new(
            PathBuf::from(home).join(".partstore").join("credential.json"),
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> std::io::Result<Option<StoredCredential>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }

    fn save(&self, credential: &StoredCredential) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
