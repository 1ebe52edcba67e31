//! LLM interaction: provider resolution and text completion with retry.
//!
//! Both the keyword extractor and the chunk summariser go through
//! [`complete`], so retry and error-handling policy lives in one place and
//! prompt wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) with a 500 ms base and 2 retries waits
//! 500 ms → 1 s before giving up on a call.

use crate::config::RecommenderConfig;
use crate::error::StudyError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Sampling and retry settings for one kind of call.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl CallSettings {
    /// Deterministic settings (temperature 0) with the config's retry policy.
    pub fn deterministic(config: &RecommenderConfig, max_tokens: usize) -> Self {
        Self {
            temperature: 0.0,
            max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// Send a system + user exchange and return the reply text.
///
/// Retries with exponential backoff; returns the last error message once
/// retries are exhausted. Empty replies count as failures.
pub async fn complete(
    provider: &Arc<dyn LLMProvider>,
    system: &str,
    user: &str,
    settings: &CallSettings,
) -> Result<String, String> {
    let start = Instant::now();
    let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
    let options = settings.options();

    let mut last_err: Option<String> = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let backoff = settings.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "LLM retry {}/{} after {}ms",
                attempt, settings.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) if !response.content.trim().is_empty() => {
                debug!(
                    "LLM call: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(response.content);
            }
            Ok(_) => {
                warn!("LLM attempt {} returned an empty reply", attempt + 1);
                last_err = Some("empty reply".to_string());
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("LLM attempt {} failed — {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "Unknown error".to_string()))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** — prefer OpenAI when several keys are set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &RecommenderConfig) -> Result<Arc<dyn LLMProvider>, StudyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StudyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_settings_disable_sampling() {
        let config = RecommenderConfig::default();
        let settings = CallSettings::deterministic(&config, 256);
        let opts = settings.options();
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(256));
        assert_eq!(settings.max_retries, 2);
    }
}
