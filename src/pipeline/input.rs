//! Input resolution: validate an upload and stage it in the request workspace.
//!
//! Three entry shapes converge here: raw bytes with a client-supplied
//! filename, a local path, and an HTTP(S) URL. All three go through
//! [`validate_upload`] before any bytes are parsed, so a rejected upload
//! never reaches a parser or a transcriber.

use crate::config::RecommenderConfig;
use crate::error::StudyError;
use crate::pipeline::extract::{DocumentKind, ALLOWED_EXTENSIONS};
use crate::workspace::SessionWorkspace;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An upload that passed validation and now lives in the workspace.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// Staged copy inside the workspace.
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// Original filename, path or URL, for reporting.
    pub source: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Validate filename and size against the allow-list and upload limit.
pub fn validate_upload(
    filename: &str,
    size: u64,
    config: &RecommenderConfig,
) -> Result<DocumentKind, StudyError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(StudyError::EmptyFilename);
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let kind = DocumentKind::from_extension(&extension).ok_or_else(|| {
        StudyError::UnsupportedExtension {
            filename: filename.to_string(),
            extension: extension.clone(),
            allowed: ALLOWED_EXTENSIONS.join(", "),
        }
    })?;

    if size > config.max_upload_bytes {
        return Err(StudyError::FileTooLarge {
            filename: filename.to_string(),
            size,
            limit: config.max_upload_bytes,
        });
    }
    Ok(kind)
}

/// Validate and stage an in-memory upload.
pub async fn stage_upload(
    filename: &str,
    bytes: &[u8],
    workspace: &SessionWorkspace,
    config: &RecommenderConfig,
) -> Result<ResolvedInput, StudyError> {
    let kind = validate_upload(filename, bytes.len() as u64, config)?;
    let path = workspace.stage_bytes(filename, bytes).await?;
    debug!("Staged upload '{}' ({} bytes)", filename, bytes.len());
    Ok(ResolvedInput {
        path,
        kind,
        source: filename.to_string(),
    })
}

/// Resolve a path or URL into a validated, staged input.
pub async fn resolve_input(
    input: &str,
    workspace: &SessionWorkspace,
    config: &RecommenderConfig,
) -> Result<ResolvedInput, StudyError> {
    if is_url(input) {
        download_url(input, workspace, config).await
    } else {
        resolve_local(input, workspace, config).await
    }
}

async fn resolve_local(
    path_str: &str,
    workspace: &SessionWorkspace,
    config: &RecommenderConfig,
) -> Result<ResolvedInput, StudyError> {
    let path = PathBuf::from(path_str);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(StudyError::InvalidInput { input: path_str.to_string() }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StudyError::PermissionDenied { path });
        }
        Err(_) => return Err(StudyError::FileNotFound { path }),
    };

    let filename = file_name_of(&path);
    let kind = validate_upload(&filename, metadata.len(), config)?;
    let staged = workspace.stage_file(&path).await?;
    debug!("Resolved local file: {}", path.display());

    Ok(ResolvedInput {
        path: staged,
        kind,
        source: path_str.to_string(),
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn download_url(
    url: &str,
    workspace: &SessionWorkspace,
    config: &RecommenderConfig,
) -> Result<ResolvedInput, StudyError> {
    info!("Downloading: {}", url);
    let timeout_secs = config.download_timeout_secs;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StudyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            StudyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StudyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;
    if !response.status().is_success() {
        return Err(StudyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url, &response);

    // Declared length first; chunked bodies are capped while streaming.
    let kind = validate_upload(&filename, response.content_length().unwrap_or(0), config)?;

    let mut bytes: Vec<u8> = Vec::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(map_err)?;
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > config.max_upload_bytes {
            return Err(StudyError::FileTooLarge {
                filename,
                size: bytes.len() as u64,
                limit: config.max_upload_bytes,
            });
        }
    }
    let path = workspace.stage_bytes(&filename, &bytes).await?;
    info!("Downloaded {} bytes to {}", bytes.len(), path.display());

    Ok(ResolvedInput {
        path,
        kind,
        source: url.to_string(),
    })
}

/// Filename from the URL path, else an extension guessed from Content-Type.
fn extract_filename(url: &str, response: &reqwest::Response) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    format!("download.{}", extension_for_mime(content_type))
}

fn extension_for_mime(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => "pdf",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "text/markdown" => "md",
        "text/plain" => "txt",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecommenderConfig {
        RecommenderConfig::builder()
            .max_upload_bytes(1024)
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn empty_filename_rejected() {
        assert!(matches!(
            validate_upload("  ", 10, &config()),
            Err(StudyError::EmptyFilename)
        ));
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(
            validate_upload("Lecture.PDF", 10, &config()).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            validate_upload("talk.m4a", 10, &config()).unwrap(),
            DocumentKind::Media
        );
        let err = validate_upload("setup.exe", 10, &config()).unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, StudyError::UnsupportedExtension { ref extension, .. } if extension == "exe"));
        assert!(validate_upload("README", 10, &config()).is_err());
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate_upload("a.txt", 1024, &config()).is_ok());
        let err = validate_upload("a.txt", 1025, &config()).unwrap_err();
        assert!(matches!(err, StudyError::FileTooLarge { size: 1025, limit: 1024, .. }));
    }

    #[test]
    fn mime_fallback() {
        assert_eq!(extension_for_mime("application/pdf"), "pdf");
        assert_eq!(extension_for_mime("text/plain; charset=utf-8"), "txt");
        assert_eq!(extension_for_mime("application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let ws = SessionWorkspace::create(&config()).unwrap();
        let err = resolve_input("/no/such/notes.txt", &ws, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_is_staged_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.md");
        std::fs::write(&src, "# Graphs").unwrap();

        let ws = SessionWorkspace::create(&config()).unwrap();
        let resolved = resolve_input(src.to_str().unwrap(), &ws, &config())
            .await
            .unwrap();
        assert_eq!(resolved.kind, DocumentKind::Text);
        assert!(resolved.path.starts_with(ws.path()));
        assert_eq!(std::fs::read_to_string(&resolved.path).unwrap(), "# Graphs");
    }

    #[tokio::test]
    async fn url_download_uses_content_type() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/notes")
            .with_status(200)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body("graphs and trees")
            .create_async()
            .await;

        let ws = SessionWorkspace::create(&config()).unwrap();
        let resolved = resolve_input(&format!("{}/notes", server.url()), &ws, &config())
            .await
            .unwrap();
        assert_eq!(resolved.kind, DocumentKind::Text);
        assert_eq!(resolved.path.file_name().unwrap(), "download.txt");
    }

    #[tokio::test]
    async fn oversized_download_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.txt")
            .with_status(200)
            .with_body("x".repeat(2048))
            .create_async()
            .await;

        let ws = SessionWorkspace::create(&config()).unwrap();
        let err = resolve_input(&format!("{}/big.txt", server.url()), &ws, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn chunked_download_stops_at_limit() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.txt")
            .with_status(200)
            .with_chunked_body(|w| {
                let block = [b'x'; 512];
                for _ in 0..2048 {
                    w.write_all(&block)?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let ws = SessionWorkspace::create(&config()).unwrap();
        let err = resolve_input(&format!("{}/big.txt", server.url()), &ws, &config())
            .await
            .unwrap_err();
        match err {
            StudyError::FileTooLarge { size, limit, .. } => {
                assert_eq!(limit, 1024);
                assert!(size > limit);
                assert!(size < 1024 * 1024, "body was buffered in full: {size} bytes");
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(ws.path()).unwrap().count(), 0);
    }
}
