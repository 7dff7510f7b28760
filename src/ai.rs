//! Optional prompt-to-text helper over the OpenRouter chat API.
//!
//! A thin black-box client: one prompt in, one completion out, no retries.
//! Constructed only when the `openrouter` config section is present; the
//! pipeline runs fine without it.

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, instrument};

use crate::config::OpenRouterConfig;
use crate::error::{PosterError, Result};

pub struct OpenRouterClient {
    config: OpenRouterConfig,
    http: reqwest::Client,
    /// Requests issued by this instance. Process-local bookkeeping against
    /// the configured daily limit; resets on restart.
    requests: AtomicU32,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        debug!(limit = config.requests_limit_per_day, model = %config.model, "AI helper ready");
        Ok(Self {
            config,
            http: builder.build()?,
            requests: AtomicU32::new(0),
        })
    }

    /// Number of requests issued by this instance since construction.
    pub fn requests_issued(&self) -> u32 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Send `prompt` and return the completion text.
    #[instrument(level = "debug", skip_all)]
    pub async fn get_answer(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response: serde_json::Value = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let answer = extract_answer(&response)?;
        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!(requests = self.requests_issued(), "Completion received");
        Ok(answer)
    }
}

fn extract_answer(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PosterError::Ai("malformed completion response".to_string()))
}
