// Upload directory for spreadsheets awaiting import

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::errors::AdminError;
use crate::loader::spreadsheet::{allowed_file, file_extension};

static UPLOAD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{32}\.(csv|xlsx|xls)$").expect("static regex")
});

/// Stored uploads, addressed by generated tokens
///
/// Files are saved as `<uuid>.<ext>`. Tokens coming back from a form are
/// checked against that shape before touching the filesystem, so a token
/// can never name anything outside the directory.
///
/// Uploads that were previewed but never imported are swept once they are
/// older than `max_age`.
pub struct UploadDir {
    root: PathBuf,
    max_age: Duration,
}

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` under a fresh token; the client filename only picks the extension.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, AdminError> {
        if !allowed_file(filename) {
            return Err(AdminError::InvalidUpload(
                "Please upload a valid Excel or CSV file.".to_string(),
            ));
        }
        let ext = file_extension(filename).unwrap_or_default();
        let token = format!("{}.{}", Uuid::new_v4().simple(), ext);

        tokio::fs::create_dir_all(&self.root).await?;
        self.sweep_expired().await;
        tokio::fs::write(self.root.join(&token), bytes).await?;

        debug!(token = %token, size = bytes.len(), "Stored upload");
        Ok(token)
    }

    /// Path of a previously saved upload
    pub async fn resolve(&self, token: &str) -> Result<PathBuf, AdminError> {
        if !UPLOAD_TOKEN.is_match(token) {
            return Err(AdminError::InvalidUpload("Invalid upload reference".to_string()));
        }
        let path = self.root.join(token);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AdminError::InvalidUpload(
                "Uploaded file not found. Please upload it again.".to_string(),
            ));
        }
        Ok(path)
    }

    /// Delete stored uploads older than `max_age`; returns how many went.
    ///
    /// Only token-shaped names are considered, other files in the directory
    /// are left alone.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not list upload directory");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(token) = name.to_str() else {
                continue;
            };
            if !UPLOAD_TOKEN.is_match(token) {
                continue;
            }
            let expired = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => now
                    .duration_since(modified)
                    .map(|age| age > self.max_age)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if !expired {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(token = %token, error = %e, "Failed to remove stale upload"),
            }
        }

        if removed > 0 {
            debug!(removed, "Swept stale uploads");
        }
        removed
    }

    /// Delete an upload once imported
    pub async fn remove(&self, token: &str) {
        if !UPLOAD_TOKEN.is_match(token) {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(token)).await {
            warn!(token = %token, error = %e, "Failed to remove imported upload");
        }
    }
}
