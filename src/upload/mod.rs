//! Transient upload staging
//!
//! Each upload endpoint accepts exactly one file field. The file is written
//! to the staging directory under a randomized name and handed to the caller
//! as a [`StagedUpload`] guard; dropping the guard deletes the file, so the
//! transient copy is gone once the handler returns, whether the upstream call
//! succeeded or failed.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    /// The expected file field was absent from the multipart body.
    #[error("No file uploaded in field '{0}'")]
    MissingFile(&'static str),

    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A staged upload file, deleted when the guard drops.
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Pull the file out of `field` and stage it under `dir`.
    ///
    /// Other fields in the body are skipped. Returns `MissingFile` when no
    /// matching field carried data.
    pub async fn receive(
        dir: &Path,
        field: &'static str,
        multipart: &mut Multipart,
    ) -> Result<Self, UploadError> {
        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Malformed(e.to_string()))?
        {
            if part.name() != Some(field) {
                continue;
            }

            let original_name = part.file_name().unwrap_or("upload").to_string();
            let bytes = part
                .bytes()
                .await
                .map_err(|e| UploadError::Malformed(e.to_string()))?;

            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!(
                "{}_{}",
                Uuid::new_v4(),
                sanitize_filename(&original_name)
            ));
            tokio::fs::write(&path, &bytes).await?;

            debug!(
                path = %path.display(),
                original_name = %original_name,
                size_bytes = bytes.len(),
                "staged uploaded file"
            );
            return Ok(Self { path });
        }

        Err(UploadError::MissingFile(field))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to delete staged upload");
        } else {
            debug!(path = %self.path.display(), "deleted staged upload");
        }
    }
}

/// Keep staged names flat: no separators, no traversal.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("voice note.wav"), "voice_note.wav");
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
    }

    #[test]
    fn drop_deletes_the_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged_upload");
        std::fs::write(&path, b"data").unwrap();

        let staged = StagedUpload { path: path.clone() };
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }
}
