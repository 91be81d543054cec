// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` for fanout runners (uses platform config dir).
//!
//! Every key maps to `{key}.json` under the base directory, so the runner
//! config lives in `runner.json`.

use directories::ProjectDirs;
use fanout::{ConfigError, ConfigStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store configs as JSON files under a base directory.
#[derive(Clone, Debug)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g., `~/.config/fanout`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "fanout")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir())
    }

    /// Create a store rooted at `dir`, creating it if needed.
    pub fn at(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = dir.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the config files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "config loaded");
                Ok(bytes)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        debug!(path = %path.display(), bytes = data.len(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use fanout::{ConfigService, Priority, RunnerConfig};

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        assert!(matches!(store.load_raw("absent"), Err(ConfigError::NotFound)));
    }

    #[test]
    fn keys_map_to_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path().join("nested")).unwrap();
        store.save_raw("runner", b"{}").unwrap();
        assert!(store.base().join("runner.json").is_file());
        assert_eq!(store.path_for("runner"), store.base().join("runner.json"));
    }

    #[test]
    fn runner_config_persists_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig {
            default_priority: Some(Priority::Medium),
            trace_units: false,
        };
        ConfigService::new(FsConfigStore::at(dir.path()).unwrap())
            .save_runner(&config)
            .unwrap();

        let reopened = ConfigService::new(FsConfigStore::at(dir.path()).unwrap());
        assert_eq!(reopened.load_runner().unwrap(), config);
    }

    #[test]
    fn unreadable_entry_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path()).unwrap();
        // A directory where the file should be cannot be read as bytes.
        fs::create_dir_all(store.path_for("runner")).unwrap();
        assert!(matches!(store.load_raw("runner"), Err(ConfigError::Io(_))));
    }
}
