//! JSON file document store.

use crate::error::DatabaseError;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::DocumentStore;

/// Stores each document as `<dir>/<name>.json`
///
/// Saves write a sibling temp file and rename it over the target, so a
/// concurrent reader sees either the old or the new document.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn new(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to create store directory {}: {}",
                dir.display(),
                e
            )))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, name: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read document '{}': {}",
                name, e
            )))),
        }
    }

    async fn save(&self, name: &str, body: &str) -> Result<()> {
        let target = self.path_for(name);
        let temp = self.dir.join(format!(".{name}.json.tmp"));

        tokio::fs::write(&temp, body).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write document '{}': {}",
                name, e
            )))
        })?;
        tokio::fs::rename(&temp, &target).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to replace document '{}': {}",
                name, e
            )))
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
