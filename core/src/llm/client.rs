use crate::{KoboldError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::config::KoboldConfig;
use super::request::{extract_text, trim_stop_sequences, GenerateRequest};

/// HTTP client for a KoboldCpp-compatible `/api/v1/generate` endpoint.
///
/// Cheap to clone; clones share the same read-only configuration and
/// connection pool, so concurrent `generate` calls need no locking.
#[derive(Debug, Clone)]
pub struct KoboldClient {
    http: Client,
    cfg: Arc<KoboldConfig>,
}

impl KoboldClient {
    pub fn new(cfg: KoboldConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(ms) = cfg.request_timeout_ms() {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder
            .build()
            .map_err(|e| KoboldError::HttpClient(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            cfg: Arc::new(cfg),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(KoboldConfig::from_env())
    }

    pub fn config(&self) -> &KoboldConfig {
        &self.cfg
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/v1/generate", self.cfg.uri())
    }

    /// Complete `prompt` with a single POST to the generate endpoint.
    /// Contract:
    /// - Input: prompt text + tokens to hold back from `max_length`
    /// - Output: `results[0].text`, whitespace-trimmed, trailing stop sequence removed
    /// - Error: `Transport` on send failure or non-success status (body left unread),
    ///   `Format` when a successful body lacks `results[0].text`
    pub async fn generate(&self, prompt: &str, reserved_tokens: i64) -> Result<String> {
        let url = self.generate_url();
        let body = GenerateRequest::build(&self.cfg, prompt, reserved_tokens);
        debug!(
            target: "kobold_client",
            url = %url,
            max_length = body.max_length,
            prompt_chars = body.prompt.chars().count(),
            "POST generate"
        );

        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            error!(target: "kobold_client", error = %e, "Generate request failed");
            KoboldError::Transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(target: "kobold_client", %status, "Generate returned non-success status");
        }
        let resp = resp.error_for_status()?;

        let raw = resp.text().await?;
        let val: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "kobold_client", error = %e, "Generate response is not JSON");
                return Err(KoboldError::Format(raw));
            }
        };
        let Some(text) = extract_text(&val) else {
            warn!(target: "kobold_client", body = %raw, "Missing results[0].text in generate response");
            return Err(KoboldError::Format(raw));
        };

        let text = trim_stop_sequences(text, self.cfg.stop_sequence());
        debug!(target: "kobold_client", chars = text.chars().count(), "Generate complete");
        Ok(text)
    }
}
