//! Per-request scratch directory.
//!
//! Every request gets its own `studyrec-*` temp directory holding the staged
//! upload, converted audio, the extracted text and the summary artifact.
//! Concurrent requests never share file names, and the directory is removed
//! when the [`SessionWorkspace`] is dropped.

use crate::config::RecommenderConfig;
use crate::error::StudyError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

pub const TRANSCRIPT_FILE: &str = "transcription.txt";
pub const SUMMARY_FILE: &str = "summary.txt";

pub struct SessionWorkspace {
    dir: TempDir,
}

impl SessionWorkspace {
    /// Create a fresh directory under `config.work_dir` or the system temp dir.
    pub fn create(config: &RecommenderConfig) -> Result<Self, StudyError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("studyrec-");
        let dir = match config.work_dir {
            Some(ref parent) => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StudyError::Internal(format!(
                        "Cannot create work dir '{}': {e}",
                        parent.display()
                    ))
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| StudyError::Internal(format!("Cannot create workspace: {e}")))?;
        debug!("Workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where an upload named `filename` is stored inside the workspace.
    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(sanitize_filename(filename))
    }

    /// Write uploaded bytes under a sanitised version of `filename`.
    pub async fn stage_bytes(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StudyError> {
        let path = self.upload_path(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StudyError::Internal(format!("Failed to stage upload: {e}")))?;
        Ok(path)
    }

    /// Copy a local file into the workspace.
    pub async fn stage_file(&self, src: &Path) -> Result<PathBuf, StudyError> {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let dest = self.upload_path(&name);
        tokio::fs::copy(src, &dest).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => StudyError::PermissionDenied {
                path: src.to_path_buf(),
            },
            _ => StudyError::Internal(format!("Failed to stage '{}': {e}", src.display())),
        })?;
        Ok(dest)
    }

    /// Persist the extracted text as `transcription.txt`.
    pub async fn write_text(&self, text: &str) -> Result<PathBuf, StudyError> {
        self.write(TRANSCRIPT_FILE, text).await
    }

    /// Persist the summary as `summary.txt`.
    pub async fn write_summary(&self, summary: &str) -> Result<PathBuf, StudyError> {
        self.write(SUMMARY_FILE, summary).await
    }

    async fn write(&self, name: &str, contents: &str) -> Result<PathBuf, StudyError> {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StudyError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}

/// Keep the final path component and replace anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\my notes.txt"), "my_notes.txt");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn uploads_never_land_on_converted_audio() {
        use crate::pipeline::transcribe::CONVERTED_WAV;

        let ws = SessionWorkspace::create(&RecommenderConfig::default()).unwrap();
        for name in ["audio.wav", CONVERTED_WAV, "./.studyrec-16k.wav"] {
            assert_ne!(ws.upload_path(name), ws.path().join(CONVERTED_WAV), "{name}");
        }
    }

    #[tokio::test]
    async fn workspaces_are_isolated_and_cleaned_up() {
        let parent = tempfile::tempdir().unwrap();
        let config = RecommenderConfig::builder()
            .work_dir(parent.path())
            .build()
            .unwrap();

        let a = SessionWorkspace::create(&config).unwrap();
        let b = SessionWorkspace::create(&config).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("studyrec-"));

        let summary = a.write_summary("short summary").await.unwrap();
        assert_eq!(std::fs::read_to_string(&summary).unwrap(), "short summary");
        assert!(!b.path().join(SUMMARY_FILE).exists());

        let kept = a.path().to_path_buf();
        drop(a);
        assert!(!kept.exists());
    }

    #[tokio::test]
    async fn stage_bytes_uses_sanitised_name() {
        let ws = SessionWorkspace::create(&RecommenderConfig::default()).unwrap();
        let path = ws.stage_bytes("../notes.txt", b"hello").await.unwrap();
        assert_eq!(path, ws.path().join("notes.txt"));
    }
}
