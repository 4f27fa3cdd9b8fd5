// Uploaded files: bytes on disk under the upload directory, metadata in memory

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub file_id: Uuid,
    #[serde(skip_serializing)]
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    entries: Arc<RwLock<HashMap<Uuid, StoredFile>>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Writes the bytes to `<root>/<file_id>_<filename>` and records the metadata.
    /// `filename` must already be sanitized.
    pub async fn save(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create upload directory {}", self.root.display()))?;

        let file_id: Uuid = Uuid::new_v4();
        let path: PathBuf = self.root.join(format!("{}_{}", file_id.simple(), filename));

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload {}", path.display()))?;

        let stored: StoredFile = StoredFile {
            file_id,
            owner_id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
            uploaded_at: Utc::now(),
            path,
        };

        self.entries.write().insert(file_id, stored.clone());
        Ok(stored)
    }

    /// The owner's uploads, newest first
    pub fn list_for(&self, owner_id: &Uuid) -> Vec<StoredFile> {
        let mut files: Vec<StoredFile> = self
            .entries
            .read()
            .values()
            .filter(|f| &f.owner_id == owner_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        files
    }

    /// Looks up a file, visible only to its owner
    pub fn get_owned(&self, file_id: &Uuid, owner_id: &Uuid) -> Option<StoredFile> {
        self.entries
            .read()
            .get(file_id)
            .filter(|f| &f.owner_id == owner_id)
            .cloned()
    }

    pub async fn read(&self, file: &StoredFile) -> Result<Vec<u8>> {
        tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Failed to read upload {}", file.path.display()))
    }
}
