use frc_api::client::{TBA_BASE_URL, TbaApi};
use frc_api::provider::{
    AzureCredentials, GroqCredentials, OpenAiCredentials, OpenRouterCredentials,
    ProviderCredentials, ProviderGateway,
};
use frc_api::summary::MatchSummarizer;
use log::LevelFilter;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub timeout: Duration,
    pub log_level: LevelFilter,
    pub tba_base_url: String,
    pub tba_api_key: Option<String>,
    pub credentials: ProviderCredentials,
}

impl Settings {
    /// Environment, seeded from `.env.local` then `.env` when present.
    /// Variables already set in the process win over both files.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Blank values count as unset.
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = var("FRC_SUMMARY_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let credentials = ProviderCredentials {
            openrouter: OpenRouterCredentials {
                api_key: var("OPENROUTER_API_KEY"),
                model: var("OPENROUTER_MODEL").or_else(|| Some(DEFAULT_OPENROUTER_MODEL.to_owned())),
                site_url: var("OPENROUTER_SITE_URL"),
                app_name: var("OPENROUTER_APP_NAME"),
                base_url: var("OPENROUTER_BASE_URL"),
            },
            azure: AzureCredentials {
                endpoint: var("AZURE_OPENAI_ENDPOINT"),
                deployment: var("AZURE_OPENAI_DEPLOYMENT"),
                api_key: var("AZURE_OPENAI_API_KEY"),
            },
            openai: OpenAiCredentials {
                api_key: var("OPENAI_API_KEY"),
                base_url: var("OPENAI_BASE_URL"),
                model: var("OPENAI_MODEL"),
            },
            groq: GroqCredentials {
                api_key: var("GROQ_API_KEY"),
                model: var("GROQ_MODEL").or_else(|| Some(DEFAULT_GROQ_MODEL.to_owned())),
                base_url: var("GROQ_BASE_URL"),
            },
        };

        Self {
            bind: var("FRC_SUMMARY_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            timeout: Duration::from_secs(timeout_secs),
            log_level: var("LOG_LEVEL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(LevelFilter::Info),
            tba_base_url: var("TBA_BASE_URL").unwrap_or_else(|| TBA_BASE_URL.to_owned()),
            tba_api_key: var("TBA_API_KEY"),
            credentials,
        }
    }

    pub fn summarizer(&self) -> MatchSummarizer {
        let tba = TbaApi::new()
            .with_base_url(self.tba_base_url.as_str())
            .with_api_key(self.tba_api_key.clone())
            .with_timeout(self.timeout);
        let gateway = ProviderGateway::new().with_timeout(self.timeout);
        MatchSummarizer::new(tba, gateway, self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frc_api::provider::Provider;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&[]);
        assert_eq!(s.bind, DEFAULT_BIND);
        assert_eq!(s.timeout, Duration::from_secs(10));
        assert_eq!(s.log_level, LevelFilter::Info);
        assert_eq!(s.tba_base_url, TBA_BASE_URL);
        assert_eq!(s.tba_api_key, None);
        assert_eq!(s.credentials.select(), None);
    }

    #[test]
    fn router_key_alone_is_enough_thanks_to_default_model() {
        let s = settings(&[("OPENROUTER_API_KEY", "or-key"), ("OPENAI_API_KEY", "sk")]);
        assert_eq!(s.credentials.select(), Some(Provider::OpenRouter));
        assert_eq!(
            s.credentials.openrouter.model.as_deref(),
            Some(DEFAULT_OPENROUTER_MODEL)
        );
    }

    #[test]
    fn blank_values_are_unset() {
        let s = settings(&[
            ("OPENROUTER_API_KEY", "   "),
            ("GROQ_API_KEY", "gsk"),
            ("TBA_API_KEY", ""),
            ("FRC_SUMMARY_BIND", " "),
        ]);
        assert_eq!(s.credentials.select(), Some(Provider::Groq));
        assert_eq!(s.tba_api_key, None);
        assert_eq!(s.bind, DEFAULT_BIND);
    }

    #[test]
    fn timeout_and_log_level_parse_with_fallbacks() {
        let s = settings(&[("FRC_SUMMARY_TIMEOUT_SECS", "8"), ("LOG_LEVEL", "debug")]);
        assert_eq!(s.timeout, Duration::from_secs(8));
        assert_eq!(s.log_level, LevelFilter::Debug);

        let s = settings(&[("FRC_SUMMARY_TIMEOUT_SECS", "0"), ("LOG_LEVEL", "chatty")]);
        assert_eq!(s.timeout, Duration::from_secs(10));
        assert_eq!(s.log_level, LevelFilter::Info);
    }

    #[test]
    fn azure_needs_all_three_fields() {
        let s = settings(&[
            ("AZURE_OPENAI_ENDPOINT", "https://team.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "az"),
        ]);
        assert_eq!(s.credentials.select(), None);

        let s = settings(&[
            ("AZURE_OPENAI_ENDPOINT", "https://team.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "recaps"),
            ("AZURE_OPENAI_API_KEY", "az"),
            ("GROQ_API_KEY", "gsk"),
        ]);
        assert_eq!(s.credentials.select(), Some(Provider::Azure));
    }
}
