//! Chat-completion gateway over the four supported text providers.
//!
//! Every provider speaks the same OpenAI-style chat-completions shape; they
//! differ only in URL and auth headers. The gateway absorbs all provider
//! failures: callers get `Some(text)` or `None`, never an error.

use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const SYSTEM_INSTRUCTION: &str = "You write one- or two-sentence recaps of FIRST Robotics \
Competition matches. Sentence one states who won and by how much. Sentence two is optional and \
names the deciding factors, using only the supplied statistics. Do not open with the raw score. \
Never repeat match or event key codes verbatim. Turn machine-style field names such as \
autoPoints or endGameBargePoints into natural phrases. Do not speculate beyond the structured data.";

pub const MAX_TOKENS: u32 = 160;
pub const TEMPERATURE: f32 = 0.5;
pub const AZURE_API_VERSION: &str = "2024-02-15-preview";

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    Azure,
    OpenAi,
    Groq,
}

impl Provider {
    /// Selection order: the first configured provider wins.
    pub const PRECEDENCE: [Provider; 4] =
        [Provider::OpenRouter, Provider::Azure, Provider::OpenAi, Provider::Groq];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::Azure => "azure",
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OpenRouterCredentials {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub site_url: Option<String>,
    pub app_name: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AzureCredentials {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroqCredentials {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// One optional credential set per provider. Holds no policy of its own
/// beyond "are the required fields present".
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openrouter: OpenRouterCredentials,
    pub azure: AzureCredentials,
    pub openai: OpenAiCredentials,
    pub groq: GroqCredentials,
}

impl ProviderCredentials {
    pub fn is_configured(&self, provider: Provider) -> bool {
        match provider {
            Provider::OpenRouter => {
                present(&self.openrouter.api_key).is_some() && present(&self.openrouter.model).is_some()
            }
            Provider::Azure => {
                present(&self.azure.endpoint).is_some()
                    && present(&self.azure.deployment).is_some()
                    && present(&self.azure.api_key).is_some()
            }
            Provider::OpenAi => present(&self.openai.api_key).is_some(),
            Provider::Groq => {
                present(&self.groq.api_key).is_some() && present(&self.groq.model).is_some()
            }
        }
    }

    /// Configured providers, in precedence order.
    pub fn configured(&self) -> Vec<Provider> {
        Provider::PRECEDENCE
            .into_iter()
            .filter(|p| self.is_configured(*p))
            .collect()
    }

    pub fn select(&self) -> Option<Provider> {
        Provider::PRECEDENCE.into_iter().find(|p| self.is_configured(*p))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ProviderFailure {
    NotConfigured,
    Network(reqwest::Error),
    Status(u16),
    Parsing(reqwest::Error),
    Empty,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::NotConfigured => write!(f, "credentials missing"),
            ProviderFailure::Network(e) if e.is_timeout() => write!(f, "request timed out: {e}"),
            ProviderFailure::Network(e) => write!(f, "network error: {e}"),
            ProviderFailure::Status(code) => write!(f, "provider returned HTTP {code}"),
            ProviderFailure::Parsing(e) => write!(f, "unreadable completion: {e}"),
            ProviderFailure::Empty => write!(f, "completion had no text"),
        }
    }
}

/// Receives every absorbed provider failure.
pub trait ProviderObserver: Send + Sync {
    fn on_failure(&self, provider: Provider, failure: &ProviderFailure);
}

/// Default observer: a `warn` line per failure.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProviderObserver for LogObserver {
    fn on_failure(&self, provider: Provider, failure: &ProviderFailure) {
        warn!("{provider} summary call failed: {failure}");
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Provider-specific request target: where to POST and which headers to send.
#[derive(Debug)]
struct ChatTarget<'a> {
    url: String,
    model: Option<&'a str>,
    headers: Vec<(&'static str, String)>,
}

impl<'a> ChatTarget<'a> {
    fn resolve(provider: Provider, creds: &'a ProviderCredentials) -> Result<Self, ProviderFailure> {
        if !creds.is_configured(provider) {
            return Err(ProviderFailure::NotConfigured);
        }
        let missing = || ProviderFailure::NotConfigured;

        let target = match provider {
            Provider::OpenRouter => {
                let c = &creds.openrouter;
                let key = present(&c.api_key).ok_or_else(missing)?;
                let mut headers = vec![("Authorization", format!("Bearer {key}"))];
                if let Some(site) = present(&c.site_url) {
                    headers.push(("HTTP-Referer", site.to_owned()));
                }
                if let Some(app) = present(&c.app_name) {
                    headers.push(("X-Title", app.to_owned()));
                }
                ChatTarget {
                    url: completions_url(present(&c.base_url).unwrap_or(OPENROUTER_BASE_URL)),
                    model: present(&c.model),
                    headers,
                }
            }
            Provider::Azure => {
                let c = &creds.azure;
                let endpoint = present(&c.endpoint).ok_or_else(missing)?;
                let deployment = present(&c.deployment).ok_or_else(missing)?;
                let key = present(&c.api_key).ok_or_else(missing)?;
                ChatTarget {
                    url: format!(
                        "{}/openai/deployments/{deployment}/chat/completions?api-version={AZURE_API_VERSION}",
                        endpoint.trim_end_matches('/')
                    ),
                    // The deployment pins the model.
                    model: None,
                    headers: vec![("api-key", key.to_owned())],
                }
            }
            Provider::OpenAi => {
                let c = &creds.openai;
                let key = present(&c.api_key).ok_or_else(missing)?;
                ChatTarget {
                    url: completions_url(present(&c.base_url).unwrap_or(OPENAI_BASE_URL)),
                    model: Some(present(&c.model).unwrap_or(OPENAI_MODEL)),
                    headers: vec![("Authorization", format!("Bearer {key}"))],
                }
            }
            Provider::Groq => {
                let c = &creds.groq;
                let key = present(&c.api_key).ok_or_else(missing)?;
                ChatTarget {
                    url: completions_url(present(&c.base_url).unwrap_or(GROQ_BASE_URL)),
                    model: present(&c.model),
                    headers: vec![("Authorization", format!("Bearer {key}"))],
                }
            }
        };
        Ok(target)
    }
}

/// Same instruction, budget and temperature for every provider; only the
/// model field varies, and Azure leaves it out.
fn chat_body<'a>(model: Option<&'a str>, prompt: &'a str) -> ChatBody<'a> {
    ChatBody {
        model,
        messages: [
            ChatMessage { role: "system", content: SYSTEM_INSTRUCTION },
            ChatMessage { role: "user", content: prompt },
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

fn completions_url(base: &str) -> String {
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProviderGateway {
    client: Client,
    timeout: Duration,
    observer: Arc<dyn ProviderObserver>,
}

impl Default for ProviderGateway {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("frc-summary/0.1 (match recap service)")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(10),
            observer: Arc::new(LogObserver),
        }
    }
}

impl fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProviderObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Ask one provider for a summary of `prompt`.
    ///
    /// `None` covers every way the call can go wrong: missing credentials,
    /// network error, timeout, non-2xx, malformed body, or blank text. Each
    /// of those is reported to the observer first.
    pub async fn call_provider(
        &self,
        provider: Provider,
        prompt: &str,
        creds: &ProviderCredentials,
    ) -> Option<String> {
        match self.try_call(provider, prompt, creds).await {
            Ok(text) => Some(text),
            Err(failure) => {
                self.observer.on_failure(provider, &failure);
                None
            }
        }
    }

    async fn try_call(
        &self,
        provider: Provider,
        prompt: &str,
        creds: &ProviderCredentials,
    ) -> Result<String, ProviderFailure> {
        let target = ChatTarget::resolve(provider, creds)?;
        debug!("calling {provider} at {}", target.url);

        let body = chat_body(target.model, prompt);
        let mut request = self.client.post(&target.url).timeout(self.timeout).json(&body);
        for (name, value) in &target.headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(ProviderFailure::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderFailure::Status(status.as_u16()));
        }

        let completion: ChatCompletion = response.json().await.map_err(ProviderFailure::Parsing)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or(ProviderFailure::Empty)
    }
}
