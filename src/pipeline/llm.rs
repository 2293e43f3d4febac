//! Vision-model OCR: provider resolution and the per-page call.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! spreads retries out: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s. Each attempt is additionally bounded by
//! `api_timeout_secs`, so a hung connection counts as a failed attempt
//! instead of stalling the document.

use crate::config::VisionConfig;
use crate::error::PageError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. a pre-built provider in the config;
/// 2. `provider_name` (+ `model`), reading the provider's API key from the
///    environment;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set;
/// 4. OpenAI, when `OPENAI_API_KEY` is set;
/// 5. whatever [`ProviderFactory::from_env`] detects.
///
/// The error is a human-readable hint.
pub fn resolve_provider(config: &VisionConfig) -> Result<Arc<dyn LLMProvider>, String> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
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

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        format!(
            "no provider could be auto-detected; set OPENAI_API_KEY, ANTHROPIC_API_KEY \
             or pass --provider ({e})"
        )
    })?;
    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, String> {
    debug!("Creating vision provider {}/{}", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| format!("{name}: {e}"))
}

/// OCR one rendered page.
///
/// The request is a system message (prompt plus language hint) followed by
/// a user turn carrying only the page image.
pub async fn ocr_page(
    provider: &Arc<dyn LLMProvider>,
    page_num: usize,
    image: ImageData,
    system_prompt: &str,
    config: &VisionConfig,
) -> Result<String, PageError> {
    let start = Instant::now();
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image]),
    ];
    let options = build_options(config);
    let per_call = Duration::from_secs(config.api_timeout_secs);

    let mut last_err = String::from("no attempt made");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(config.retry_backoff_ms, attempt);
            warn!(
                "Page {}: retry {}/{} after {:?}",
                page_num, attempt, config.max_retries, delay
            );
            sleep(delay).await;
        }

        match timeout(per_call, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(response.content);
            }
            Ok(Err(e)) => {
                last_err = e.to_string();
                warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, last_err);
            }
            Err(_) => {
                last_err = format!("timed out after {}s", config.api_timeout_secs);
                warn!("Page {}: attempt {} {}", page_num, attempt + 1, last_err);
            }
        }
    }

    Err(PageError::OcrFailed {
        page: page_num,
        attempts: config.max_retries + 1,
        detail: last_err,
    })
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

fn build_options(config: &VisionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
