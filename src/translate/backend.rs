// src/translate/backend.rs
//! Provider abstraction over LLM text-completion backends. New providers
//! implement `TranslationBackend` and get a line in `build_backend`; the
//! pipeline call contract never changes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// One text-completion round trip.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn TranslationBackend>;

/// Factory keyed on the configured provider name. Missing credentials are a
/// construction error: callers treat that as "translation unavailable", not
/// as a fatal pipeline error.
pub fn build_backend(provider: &str, model: Option<&str>) -> Result<DynBackend> {
    match provider.trim().to_ascii_lowercase().as_str() {
        "claude" | "anthropic" => Ok(Arc::new(ClaudeBackend::new(model)?)),
        "openai" => Ok(Arc::new(OpenAiBackend::new(model)?)),
        other => bail!("unsupported translation provider: {other}"),
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(crate::ingest::USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("reqwest client")
}

// ------------------------------------------------------------
// Claude (Anthropic messages API)
// ------------------------------------------------------------

pub struct ClaudeBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeBackend {
    pub fn new(model_override: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .or_else(|_| std::env::var("CLAUDE_API_KEY"))
            .context("missing ANTHROPIC_API_KEY env var")?;
        Ok(Self {
            http: http_client(),
            api_key,
            model: model_override.unwrap_or(DEFAULT_CLAUDE_MODEL).to_string(),
        })
    }
}

#[async_trait]
impl TranslationBackend for ClaudeBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            model: &self.model,
            max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&req)
            .send()
            .await
            .context("claude request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("claude returned {status}");
        }
        let body: Resp = resp.json().await.context("claude response body")?;
        let text = body
            .content
            .first()
            .map(|b| b.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            bail!("claude returned an empty completion");
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions API)
// ------------------------------------------------------------

pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(model_override: Option<&str>) -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").context("missing OPENAI_API_KEY env var")?;
        Ok(Self {
            http: http_client(),
            api_key,
            model: model_override.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
        })
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            max_tokens,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("openai returned {status}");
        }
        let body: Resp = resp.json().await.context("openai response body")?;
        let text = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            bail!("openai returned an empty completion");
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Test doubles
// ------------------------------------------------------------

/// Deterministic backend for tests: fixed reply, counts calls.
pub struct MockBackend {
    reply: String,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Backend that always errors; exercises the per-text fallback paths.
pub struct FailingBackend;

#[async_trait]
impl TranslationBackend for FailingBackend {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        bail!("backend unavailable")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
