//! Storage configuration.
//!
//! Paths are explicit values handed to the store at construction. The
//! environment-derived default (`$HOME/.local/share/relaysms/storage`) is
//! resolved once by the binary via [`StorageConfig::resolve`]; nothing below
//! this module reads the environment.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::ConfigError;

/// Default session database file name
pub const DEFAULT_STATE_DB: &str = "state.db";

/// Default file name of the ratchet primitive's auxiliary keystore
pub const DEFAULT_AUX_DB: &str = "ratchet.db";

/// How long a writer waits for another process's lock before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where session state lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding the session database and the auxiliary keystore
    pub base_dir: PathBuf,
    /// Session database file name
    pub state_db_name: String,
    /// Auxiliary keystore file name
    pub aux_db_name: String,
    /// SQLite busy timeout
    pub busy_timeout: Duration,
}

impl StorageConfig {
    /// Configuration rooted at `base_dir` with default file names.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            state_db_name: DEFAULT_STATE_DB.to_string(),
            aux_db_name: DEFAULT_AUX_DB.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Resolve the configuration from an explicit directory or the user's
    /// home directory.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingHome` if `base_dir` is `None` and `home` is
    ///   unset or empty
    pub fn resolve(base_dir: Option<PathBuf>, home: Option<OsString>) -> Result<Self, ConfigError> {
        match base_dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Ok(Self::new(Self::default_base_dir(home.as_deref().map(Path::new))?)),
        }
    }

    /// Per-user default: `<home>/.local/share/relaysms/storage`.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingHome` if `home` is `None` or empty
    pub fn default_base_dir(home: Option<&Path>) -> Result<PathBuf, ConfigError> {
        match home {
            Some(home) if !home.as_os_str().is_empty() => {
                Ok(home.join(".local").join("share").join("relaysms").join("storage"))
            },
            _ => Err(ConfigError::MissingHome),
        }
    }

    /// Full path of the session database.
    pub fn state_db_path(&self) -> PathBuf {
        self.base_dir.join(&self.state_db_name)
    }

    /// Full path of the auxiliary keystore.
    pub fn aux_db_path(&self) -> PathBuf {
        self.base_dir.join(&self.aux_db_name)
    }
}
