//! # Instance Record Store
//!
//! Persists one JSON descriptor per instance:
//!
//! ```text
//! ~/.codespawn/instances/
//! ├── codespawn-demo-1a2b3c4d.json
//! └── codespawn-api-9f8e7d6c.json
//! ```
//!
//! A record is written before the container is launched and stays in place
//! when the launch or startup verification fails, so every attempt leaves
//! a trail. The orchestrator removes it only when the engine reports a
//! port collision at launch time.
//!
//! ## Atomic Writes
//!
//! Records are written to a uniquely named temp file in the same directory
//! and renamed into place, so a crash never leaves a truncated record.

use crate::constants::RECORD_EXTENSION;
use crate::error::{Error, Result};
use crate::instance::ResolvedInstance;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filesystem store of instance records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    /// Creates a store rooted at `base_dir`. The directory is created
    /// lazily on first save.
    pub fn with_path(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the record path for a derived instance name.
    pub fn record_path(&self, instance_name: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", instance_name, RECORD_EXTENSION))
    }

    /// Writes the record for `instance`, returning its path.
    pub fn save(&self, instance: &ResolvedInstance) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).map_err(|e| Error::StorageWriteFailed {
            path: self.base_dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.record_path(&instance.instance_name);
        let json = serde_json::to_string_pretty(instance)?;

        let temp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
        fs::write(&temp_path, json).map_err(|e| Error::StorageWriteFailed {
            path: temp_path.clone(),
            reason: e.to_string(),
        })?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::StorageWriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        info!("Wrote instance record {}", path.display());
        Ok(path)
    }

    /// Removes a record. Failures are logged and swallowed.
    pub fn delete(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed instance record {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Instance record {} already gone", path.display())
            }
            Err(e) => warn!("Failed to remove instance record {}: {}", path.display(), e),
        }
    }

    /// Loads the record of a derived instance name.
    pub fn load(&self, instance_name: &str) -> Result<ResolvedInstance> {
        let path = self.record_path(instance_name);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::RecordNotFound(instance_name.to_string()),
            _ => Error::Io(e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Lists the derived names of all stored records, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineKind;
    use crate::instance::ResourceLimits;
    use chrono::Utc;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn instance() -> ResolvedInstance {
        ResolvedInstance {
            id: "1a2b3c4d".to_string(),
            name: "demo".to_string(),
            instance_name: "codespawn-demo-1a2b3c4d".to_string(),
            runtime: EngineKind::Docker,
            port: 12345,
            workspace_path: PathBuf::from("/tmp/ws"),
            password: String::new(),
            extensions: Vec::new(),
            limits: ResourceLimits {
                cpu: "2".to_string(),
                memory: "4g".to_string(),
            },
            environment: IndexMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_creates_nested_dir() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::with_path(temp.path().join("a").join("b"));

        let path = store.save(&instance()).unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap(), "codespawn-demo-1a2b3c4d.json");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::with_path(temp.path());
        store.save(&instance()).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_delete_missing_is_silent() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::with_path(temp.path());
        store.delete(&temp.path().join("nope.json"));
    }
}
