use crate::MatchRecord;
use crate::tba::match_from_value;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const TBA_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";
const TBA_AUTH_HEADER: &str = "X-TBA-Auth-Key";

/// Client for The Blue Alliance read API.
#[derive(Debug, Clone)]
pub struct TbaApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl Default for TbaApi {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent("frc-summary/0.1 (match recap service)")
                .build()
                .unwrap_or_default(),
            base_url: TBA_BASE_URL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Why a match lookup failed. Every variant carries the match key.
#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    InvalidKey(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, key) if e.is_timeout() => {
                write!(f, "TBA lookup for {key} timed out")
            }
            ApiError::Network(e, key) => write!(f, "TBA unreachable for {key}: {e}"),
            ApiError::Api(e, key) => match e.status() {
                Some(status) => write!(f, "TBA answered {status} for {key}"),
                None => write!(f, "TBA rejected {key}: {e}"),
            },
            ApiError::Parsing(e, key) => write!(f, "unreadable match document for {key}: {e}"),
            ApiError::NotFound(key) => write!(f, "no match {key} on TBA"),
            ApiError::InvalidKey(key) => write!(f, "{key:?} is not a match key"),
        }
    }
}

impl std::error::Error for ApiError {}

impl TbaApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch a single match by key, e.g. `2024casj_qm12`.
    ///
    /// TBA answers unknown keys with either a 404 or a literal `null`
    /// body; both come back as `NotFound`.
    pub async fn fetch_match(&self, key: &str) -> ApiResult<MatchRecord> {
        let key = key.trim();
        if !is_match_key(key) {
            return Err(ApiError::InvalidKey(key.to_owned()));
        }
        let raw: Value = self.get(&format!("{}/match/{key}", self.base_url), key).await?;
        if raw.is_null() {
            return Err(ApiError::NotFound(key.to_owned()));
        }
        Ok(match_from_value(raw))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str, key: &str) -> ApiResult<T> {
        let mut request = self.client.get(url).timeout(self.timeout);
        if let Some(auth) = &self.api_key {
            request = request.header(TBA_AUTH_HEADER, auth);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e, key.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, key.to_owned())),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                Err(ApiError::NotFound(key.to_owned()))
            }
            Err(e) => Err(ApiError::Api(e, key.to_owned())),
        }
    }
}

/// Match keys are `<year><event>_<level><set>m<match>`: ASCII letters,
/// digits and underscores only. Anything else would change the URL path.
fn is_match_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompLevel, Winner};

    const MATCH_JSON: &str = r#"{
        "key": "2024casj_sf2m1",
        "comp_level": "sf",
        "set_number": 2,
        "match_number": 1,
        "winning_alliance": "red",
        "alliances": {
            "blue": { "team_keys": ["frc254", "frc846", "frc5940"], "score": 98 },
            "red": { "team_keys": ["frc1678", "frc604", "frc8033"], "score": 104 }
        },
        "score_breakdown": {
            "blue": { "autoPoints": 22, "foulPoints": 0, "totalPoints": 98 },
            "red": { "autoPoints": 30, "foulPoints": 6, "totalPoints": 104 }
        }
    }"#;

    #[test]
    fn match_keys_are_validated() {
        assert!(is_match_key("2024casj_qm12"));
        assert!(is_match_key("2025txhou_f1m2"));
        assert!(!is_match_key(""));
        assert!(!is_match_key("../event/2024casj"));
        assert!(!is_match_key("2024casj_qm1?x=1"));
    }

    #[tokio::test]
    async fn fetch_match_sends_auth_key_and_maps_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/match/2024casj_sf2m1")
            .match_header("x-tba-auth-key", "tba-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(MATCH_JSON)
            .create_async()
            .await;

        let api = TbaApi::new()
            .with_base_url(server.url())
            .with_api_key(Some("tba-secret".into()));
        let record = api.fetch_match("2024casj_sf2m1").await.unwrap();

        assert_eq!(record.comp_level, CompLevel::SemiFinal);
        assert_eq!(record.winner, Winner::Red);
        assert_eq!(record.red.teams, vec!["1678", "604", "8033"]);
        assert_eq!(record.red.breakdown.get("autoPoints"), Some(30.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_status_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/match/2024casj_qm999")
            .with_status(404)
            .with_body(r#"{"Errors":[{"match_key":"2024casj_qm999 does not exist"}]}"#)
            .create_async()
            .await;

        let api = TbaApi::new().with_base_url(server.url());
        let err = api.fetch_match("2024casj_qm999").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)), "got {err}");
        assert_eq!(err.to_string(), "no match 2024casj_qm999 on TBA");
    }

    #[tokio::test]
    async fn null_body_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/match/2024casj_qm1")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let api = TbaApi::new().with_base_url(server.url());
        let err = api.fetch_match("2024casj_qm1").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_error_and_bad_json_are_distinguished() {
        let mut server = mockito::Server::new_async().await;
        let _down = server
            .mock("GET", "/match/2024casj_qm2")
            .with_status(500)
            .create_async()
            .await;
        let _html = server
            .mock("GET", "/match/2024casj_qm3")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let api = TbaApi::new().with_base_url(format!("{}/", server.url()));
        let err = api.fetch_match("2024casj_qm2").await.unwrap_err();
        assert!(matches!(err, ApiError::Api(_, _)));
        assert_eq!(err.to_string(), "TBA answered 500 Internal Server Error for 2024casj_qm2");
        assert!(matches!(
            api.fetch_match("2024casj_qm3").await,
            Err(ApiError::Parsing(_, _))
        ));
    }

    #[tokio::test]
    async fn invalid_key_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

        let api = TbaApi::new().with_base_url(server.url());
        let err = api.fetch_match(" 2024casj/../qm1").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidKey(_)));
        assert_eq!(err.to_string(), r#""2024casj/../qm1" is not a match key"#);
        mock.assert_async().await;
    }
}
