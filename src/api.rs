//! LLM API interaction for translation requests.
//!
//! This module provides the client for communicating with an
//! OpenAI-compatible chat-completions API.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`Generate`]: Core trait defining one async chat exchange
//! - [`ChatClient`]: Implementation over an OpenAI-compatible HTTP endpoint
//!
//! Failure handling lives a level up: the translation coordinator owns
//! retries, failover between providers, and the cool-down between attempts,
//! so a [`ChatClient`] makes exactly one request per call and reports
//! whatever happened.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::utils::truncate_for_log;

/// Errors produced by one chat-completion exchange.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connect failure, timeout, bad TLS, ...).
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The provider answered 200 but the choices array was empty.
    #[error("provider response contained no choices")]
    EmptyResponse,
}

/// Trait for one async chat exchange with an LLM.
///
/// Implementors send a system prompt and a user prompt and return the
/// assistant's reply as plain text. This abstraction keeps the translation
/// coordinator testable without network access.
pub trait Generate {
    /// Send one system/user prompt pair and return the assistant's reply.
    ///
    /// # Arguments
    ///
    /// * `system` - The system prompt framing the exchange
    /// * `user` - The user prompt carrying the text to translate
    ///
    /// # Returns
    ///
    /// The assistant's reply with surrounding whitespace trimmed, or an
    /// error if the request failed.
    async fn generate(&self, system: &str, user: &str) -> Result<String, ApiError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Chat-completions client for one OpenAI-compatible provider.
///
/// Each configured provider gets its own `ChatClient` with its own
/// endpoint, key, and model. Translation requests can take a while on
/// slow backends, hence the generous total timeout.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    /// Build a client for one provider endpoint.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the provider
    /// * `base_url` - API root, e.g. `https://api.openai.com/v1`
    /// * `model` - Model identifier to request
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("arxiv_digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// The model this client requests, for logging.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generate for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String, ApiError> {
        let t0 = Instant::now();
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                %status,
                "chat request rejected"
            );
            return Err(ApiError::Status {
                status,
                body: truncate_for_log(&body, 200),
            });
        }

        let body: ChatResponse = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ApiError::EmptyResponse)?;
        Ok(content.trim().to_string())
    }
}
