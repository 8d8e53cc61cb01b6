use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use frc_api::summary::{MatchSummarizer, SummaryRequest};
use log::{debug, info};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn router(summarizer: Arc<MatchSummarizer>) -> Router {
    Router::new()
        .route("/api/match-summary", post(handle_summary))
        .route("/health", get(handle_health))
        .with_state(summarizer)
}

pub async fn serve(bind: &str, summarizer: MatchSummarizer) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("match summary service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(Arc::new(summarizer))).await?;
    Ok(())
}

async fn handle_summary(
    State(summarizer): State<Arc<MatchSummarizer>>,
    body: Bytes,
) -> Response {
    // An empty body is the same as `{}`: rejected below for missing input.
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SummaryRequest::default()
    } else {
        match serde_json::from_slice::<SummaryRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                debug!("rejecting malformed summary request: {e}");
                return error_response(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"));
            }
        }
    };

    match summarizer.summarize(request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn handle_health(State(summarizer): State<Arc<MatchSummarizer>>) -> Response {
    let providers: Vec<&str> = summarizer
        .credentials()
        .configured()
        .into_iter()
        .map(|p| p.name())
        .collect();
    Json(json!({ "status": "ok", "providers": providers })).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use frc_api::MatchSummaryResult;
    use serde_json::Value;

    async fn spawn(settings: Settings) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(settings.summarizer()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn no_providers() -> Settings {
        Settings::from_lookup(|_| None)
    }

    #[tokio::test]
    async fn inline_match_returns_fallback_summary() {
        let base = spawn(no_providers()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/match-summary"))
            .json(&json!({
                "match": {
                    "key": "2025txhou_qm40",
                    "comp_level": "qm",
                    "winning_alliance": "red",
                    "alliances": {
                        "blue": { "team_keys": ["frc118", "frc148", "frc3310"], "score": 88 },
                        "red": { "team_keys": ["frc2468", "frc624", "frc5414"], "score": 91 }
                    },
                    "score_breakdown": {
                        "blue": { "autoPoints": 20, "foulPoints": 0 },
                        "red": { "autoPoints": 18, "foulPoints": 6 }
                    }
                }
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let result: MatchSummaryResult = response.json().await.unwrap();
        assert!(result.fallback_used);
        assert_eq!(result.model, "fallback");
        assert_eq!(result.summary, "Red alliance edges out Blue: 88 - 91 (factor: penalties)");
        assert_eq!(result.factors[0].name, "foulPoints");
        assert_eq!(result.factors[0].impact_rank, Some(1));
    }

    #[tokio::test]
    async fn missing_input_is_a_client_error() {
        let base = spawn(no_providers()).await;
        let client = reqwest::Client::new();

        for body in ["", "{}", r#"{"match": null}"#] {
            let response = client
                .post(format!("{base}/api/match-summary"))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "body {body:?}");
            let json: Value = response.json().await.unwrap();
            assert_eq!(json["error"], "match_key or match is required");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let base = spawn(no_providers()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/match-summary"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let json: Value = response.json().await.unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn health_lists_configured_providers_in_order() {
        let settings = Settings::from_lookup(|name| match name {
            "GROQ_API_KEY" => Some("gsk".into()),
            "OPENAI_API_KEY" => Some("sk".into()),
            _ => None,
        });
        let base = spawn(settings).await;
        let json: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["providers"], json!(["openai", "groq"]));
    }
}
