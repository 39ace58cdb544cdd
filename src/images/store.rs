//! File-backed image artifact storage
//!
//! Generated and uploaded images are written under a single directory with
//! freshly generated uuid filenames and served back by reference. The store
//! is append-only for the process lifetime; deleting a conversation does not
//! remove its artifacts.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Map a stored filename's extension to its MIME type
pub fn mime_for(reference: &str) -> &'static str {
    let ext = Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// File extension for a generated image's MIME type
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// A reference must be a bare filename that cannot escape the store root
fn valid_reference(reference: &str) -> bool {
    !reference.is_empty()
        && !reference.starts_with('.')
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Image artifact store rooted at a directory
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store at `root`
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Store a generated image, returning its reference
    pub async fn store(&self, data: &[u8], mime_type: &str) -> io::Result<String> {
        let reference = format!(
            "generated-{}.{}",
            uuid::Uuid::new_v4(),
            extension_for(mime_type)
        );
        fs::write(self.root.join(&reference), data).await?;
        debug!("stored artifact {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    /// Store an uploaded image, keeping the original file extension
    pub async fn store_upload(&self, data: &[u8], original_name: &str) -> io::Result<String> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "jpg".to_string());
        let reference = format!("upload-{}.{}", uuid::Uuid::new_v4(), ext);
        fs::write(self.root.join(&reference), data).await?;
        debug!("stored upload {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    /// Resolve a reference to its bytes; `None` when unknown or malformed
    pub async fn resolve(&self, reference: &str) -> io::Result<Option<Vec<u8>>> {
        if !valid_reference(reference) {
            return Ok(None);
        }
        match fs::read(self.root.join(reference)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check that the store directory is still reachable
    pub async fn probe(&self) -> io::Result<()> {
        fs::metadata(&self.root).await.map(|_| ())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
