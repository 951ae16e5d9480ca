//! File-backed session persistence
//!
//! Stores a [`SessionMapping`] as versioned JSON, written through a temp file
//! and renamed into place.

use super::SessionMapping;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Current on-disk format version
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    session: SessionMapping,
}

/// Persists one session mapping to a JSON file
///
/// # Example
///
/// ```rust,no_run
/// use inpost_client::{SessionMapping, SessionStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SessionStore::new("inpost-session.json");
///     store.save(&SessionMapping::default()).await?;
///     let restored = store.load().await?;
///     assert!(restored.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored mapping, `None` if nothing was saved yet
    pub async fn load(&self) -> Result<Option<SessionMapping>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        let stored: StoredSession = serde_json::from_str(&contents)
            .map_err(|e| Error::Persistence(format!("{}: {}", self.path.display(), e)))?;

        if stored.version != STORE_VERSION {
            return Err(Error::Persistence(format!(
                "version mismatch: expected {}, found {}",
                STORE_VERSION, stored.version
            )));
        }

        Ok(Some(stored.session))
    }

    /// Save the mapping, replacing any previous contents
    pub async fn save(&self, mapping: &SessionMapping) -> Result<()> {
        let stored = StoredSession {
            version: STORE_VERSION,
            session: mapping.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "session saved");

        Ok(())
    }

    /// Delete the stored mapping
    pub async fn clear(&self) -> Result<()> {
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
