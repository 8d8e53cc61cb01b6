//! Match summary pipeline: resolve the match, normalize it, then make at
//! most one provider call with the deterministic line as the safety net.

use crate::client::TbaApi;
use crate::fallback::FETCH_FAILED_SUMMARY;
use crate::normalize::{NormalizedMatch, normalize};
use crate::provider::{ProviderCredentials, ProviderGateway};
use crate::{MatchRecord, MatchSummaryResult};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer};
use std::fmt;

pub const FALLBACK_MODEL: &str = "fallback";

/// Request body: `{ match_key?, match? }`. An inline match wins over a key.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryRequest {
    #[serde(default, deserialize_with = "lenient_key")]
    pub match_key: Option<String>,
    #[serde(rename = "match", default, deserialize_with = "crate::tba::lenient_match")]
    pub record: Option<MatchRecord>,
}

fn lenient_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned))
}

#[derive(Debug, PartialEq, Eq)]
pub enum SummaryError {
    Validation(String),
}

impl fmt::Display for SummaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryError::Validation(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SummaryError {}

#[derive(Debug, Clone)]
pub struct MatchSummarizer {
    tba: TbaApi,
    gateway: ProviderGateway,
    credentials: ProviderCredentials,
}

impl MatchSummarizer {
    pub fn new(tba: TbaApi, gateway: ProviderGateway, credentials: ProviderCredentials) -> Self {
        Self { tba, gateway, credentials }
    }

    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    /// Run one pipeline pass.
    ///
    /// Only a request with neither a match nor a key is an error. A failed
    /// lookup still yields a result, flagged `fallback_used`.
    pub async fn summarize(
        &self,
        request: SummaryRequest,
    ) -> Result<MatchSummaryResult, SummaryError> {
        let record = match (request.record, request.match_key) {
            (Some(record), _) => record,
            (None, Some(key)) => match self.tba.fetch_match(&key).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("match lookup for {key} failed: {e}");
                    return Ok(fetch_failed());
                }
            },
            (None, None) => {
                return Err(SummaryError::Validation("match_key or match is required".into()));
            }
        };
        Ok(self.summarize_record(&record).await)
    }

    pub async fn summarize_record(&self, record: &MatchRecord) -> MatchSummaryResult {
        let normalized = normalize(Some(record));

        let Some(provider) = self.credentials.select() else {
            debug!("no provider credentials configured, using fallback");
            let result = fallback_result(normalized, FALLBACK_MODEL);
            info!("summary for {}: model=fallback fallbackUsed=true", record.key);
            return result;
        };

        debug!("selected provider {provider}");
        let reply = self
            .gateway
            .call_provider(provider, &normalized.prompt_text, &self.credentials)
            .await;

        let result = match reply {
            Some(text) if text != normalized.fallback_summary => MatchSummaryResult {
                summary: text,
                model: provider.name().to_owned(),
                prompt_used: Some(normalized.prompt_text),
                fallback_used: false,
                factors: normalized.factors,
            },
            _ => fallback_result(normalized, provider.name()),
        };
        info!(
            "summary for {}: model={} fallbackUsed={}",
            record.key, result.model, result.fallback_used
        );
        result
    }
}

fn fallback_result(normalized: NormalizedMatch, model: &str) -> MatchSummaryResult {
    MatchSummaryResult {
        summary: normalized.fallback_summary,
        model: model.to_owned(),
        prompt_used: Some(normalized.prompt_text),
        fallback_used: true,
        factors: normalized.factors,
    }
}

fn fetch_failed() -> MatchSummaryResult {
    MatchSummaryResult {
        summary: FETCH_FAILED_SUMMARY.to_owned(),
        model: FALLBACK_MODEL.to_owned(),
        prompt_used: None,
        fallback_used: true,
        factors: Vec::new(),
    }
}
