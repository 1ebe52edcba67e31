//! Speech-to-text for audio and video uploads.
//!
//! Media is first converted to 16 kHz mono PCM WAV with ffmpeg, then handed
//! to the [`Transcriber`] chosen by [`TranscriptionBackend`]. Which backend
//! runs is decided by configuration alone.

use crate::config::{RecommenderConfig, TranscriptionBackend, INPUT_PLACEHOLDER};
use crate::error::StudyError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Turns a WAV file into plain text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: &Path) -> Result<String, StudyError>;

    fn name(&self) -> &str;
}

/// Build the transcriber selected by `config.transcription`.
pub fn build_transcriber(config: &RecommenderConfig) -> Result<Arc<dyn Transcriber>, StudyError> {
    match &config.transcription {
        TranscriptionBackend::Command { program, args } => {
            Ok(Arc::new(CommandTranscriber::new(program.clone(), args.clone())))
        }
        TranscriptionBackend::Http {
            endpoint,
            model,
            api_key,
        } => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.download_timeout_secs.max(1)))
                .build()
                .map_err(|e| StudyError::Internal(format!("Failed to build HTTP client: {e}")))?;
            Ok(Arc::new(HttpTranscriber {
                client,
                endpoint: endpoint.clone(),
                model: model.clone(),
                api_key: api_key.clone(),
            }))
        }
    }
}

/// Name of the converted audio inside the workspace. Staged uploads never
/// start with a dot, so this cannot collide with the input.
pub const CONVERTED_WAV: &str = ".studyrec-16k.wav";

/// Convert any ffmpeg-readable media file to `<out_dir>/.studyrec-16k.wav`.
pub async fn convert_to_wav(
    ffmpeg: &str,
    input: &Path,
    out_dir: &Path,
) -> Result<PathBuf, StudyError> {
    let wav = out_dir.join(CONVERTED_WAV);
    debug!("ffmpeg: {} → {}", input.display(), wav.display());

    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
        .arg(&wav)
        .output()
        .await
        .map_err(|e| spawn_error(ffmpeg, e, "Install ffmpeg and make sure it is on PATH, or pass --ffmpeg."))?;

    if !output.status.success() {
        return Err(StudyError::TranscriptionFailed {
            detail: format!(
                "ffmpeg exited with {}: {}",
                output.status,
                last_line(&output.stderr)
            ),
        });
    }
    Ok(wav)
}

fn spawn_error(tool: &str, e: std::io::Error, hint: &str) -> StudyError {
    if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied {
        StudyError::DependencyUnavailable {
            tool: tool.to_string(),
            hint: hint.to_string(),
        }
    } else {
        StudyError::TranscriptionFailed {
            detail: format!("could not run {tool}: {e}"),
        }
    }
}

fn last_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

// ── Local program ────────────────────────────────────────────────────────

/// Runs a local speech-to-text program and reads the transcript from stdout.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn render_args(&self, wav: &Path) -> Vec<String> {
        let input = wav.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn transcribe(&self, wav: &Path) -> Result<String, StudyError> {
        info!("Transcribing {} with {}", wav.display(), self.program);
        let output = Command::new(&self.program)
            .args(self.render_args(wav))
            .output()
            .await
            .map_err(|e| {
                spawn_error(
                    &self.program,
                    e,
                    "Install whisper.cpp (whisper-cli) and a ggml model, or use --transcriber http.",
                )
            })?;

        if !output.status.success() {
            return Err(StudyError::TranscriptionFailed {
                detail: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    last_line(&output.stderr)
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

// ── OpenAI-compatible HTTP ───────────────────────────────────────────────

/// Posts audio to an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
    fn bearer(&self) -> Result<String, StudyError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StudyError::ProviderNotConfigured {
                provider: "transcription".to_string(),
                hint: "Set OPENAI_API_KEY or configure an API key for the transcription endpoint."
                    .to_string(),
            })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: &Path) -> Result<String, StudyError> {
        let key = self.bearer()?;
        let bytes = tokio::fs::read(wav)
            .await
            .map_err(|e| StudyError::TranscriptionFailed {
                detail: format!("cannot read {}: {e}", wav.display()),
            })?;
        info!("Uploading {} bytes of audio to {}", bytes.len(), self.endpoint);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| StudyError::Internal(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StudyError::TranscriptionFailed {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudyError::TranscriptionFailed {
                detail: e.to_string(),
            })?;
        if !status.is_success() {
            return Err(StudyError::TranscriptionFailed {
                detail: format!("HTTP {status}: {}", body.trim()),
            });
        }
        Ok(body.trim().to_string())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_substituted() {
        let t = CommandTranscriber::new("whisper-cli", vec!["-f".into(), "{input}".into()]);
        assert_eq!(
            t.render_args(Path::new("/tmp/a.wav")),
            vec!["-f".to_string(), "/tmp/a.wav".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_program_is_dependency_error() {
        let t = CommandTranscriber::new("definitely-not-a-real-whisper", vec!["{input}".into()]);
        let err = t.transcribe(Path::new("x.wav")).await.unwrap_err();
        assert!(matches!(err, StudyError::DependencyUnavailable { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_the_transcript() {
        let t = CommandTranscriber::new("echo", vec!["hello".into(), "{input}".into()]);
        let text = t.transcribe(Path::new("clip.wav")).await.unwrap();
        assert_eq!(text, "hello clip.wav");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_transcription_error() {
        let t = CommandTranscriber::new("false", vec!["{input}".into()]);
        let err = t.transcribe(Path::new("clip.wav")).await.unwrap_err();
        assert!(matches!(err, StudyError::TranscriptionFailed { .. }));
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_dependency_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_to_wav("no-such-ffmpeg-binary", Path::new("a.mp3"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::DependencyUnavailable { ref tool, .. } if tool == "no-such-ffmpeg-binary"));
    }

    #[tokio::test]
    async fn http_transcriber_posts_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/audio/transcriptions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::Regex("response_format".into()))
            .with_status(200)
            .with_body("Plants convert light energy.\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("audio.wav");
        std::fs::write(&wav, b"RIFF....WAVE").unwrap();

        let config = RecommenderConfig::builder()
            .transcription(TranscriptionBackend::Http {
                endpoint: format!("{}/v1/audio/transcriptions", server.url()),
                model: "whisper-1".into(),
                api_key: Some("test-key".into()),
            })
            .build()
            .unwrap();
        let t = build_transcriber(&config).unwrap();
        assert_eq!(t.transcribe(&wav).await.unwrap(), "Plants convert light energy.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_is_transcription_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/t")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("audio.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let t = HttpTranscriber {
            client: reqwest::Client::new(),
            endpoint: format!("{}/t", server.url()),
            model: "whisper-1".into(),
            api_key: Some("k".into()),
        };
        let err = t.transcribe(&wav).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
