//! HTTP/JSON client for the game service.
//!
//! All routes are `POST` with a JSON body, relative to the configured base URL:
//!
//! | route          | request                              | response       |
//! |----------------|--------------------------------------|----------------|
//! | `/api/position`| `{positionString?}`                  | `GameState`    |
//! | `/api/move`    | `{positionString, moveNotation}`     | `MoveApplied`  |
//! | `/api/analyze` | `{positionString}`                   | `Analysis`     |
//! | `/api/explain` | `{positionString, lastMove?, analysis}` | `{explanation}` |
//!
//! A 2xx body of the form `{"error": "..."}` is a rejection, not a decode failure.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::service::{Analysis, ExplainRequest, GameService, GameState, MoveApplied, ServiceError};

const ROUTE_POSITION: &str = "/api/position";
const ROUTE_MOVE: &str = "/api/move";
const ROUTE_ANALYZE: &str = "/api/analyze";
const ROUTE_EXPLAIN: &str = "/api/explain";

#[derive(Debug, Serialize)]
struct PositionRequest<'a> {
    #[serde(rename = "positionString", skip_serializing_if = "Option::is_none")]
    position: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    #[serde(rename = "positionString")]
    position: &'a str,
    #[serde(rename = "moveNotation")]
    notation: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    #[serde(rename = "positionString")]
    position: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    explanation: String,
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

/// Game service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGameService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGameService {
    /// Build a client whose connect timeout follows the request timeout.
    ///
    /// Whole-request bounds are applied by the caller per operation.
    pub fn from_config(config: &ServiceConfig) -> Result<HttpGameService, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(&config.base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> HttpGameService {
        HttpGameService {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn post<B, R>(&self, route: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(route);
        debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!("POST {url} -> {status} ({} bytes)", text.len());
        decode_response(status, &text)
    }
}

/// Map a raw HTTP status and body to a typed result.
fn decode_response<R: DeserializeOwned>(status: u16, body: &str) -> Result<R, ServiceError> {
    if !(200..300).contains(&status) {
        return Err(ServiceError::Status {
            status,
            body: body.to_string(),
        });
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    if let Some(message) = value.get("error").and_then(serde_json::Value::as_str) {
        return Err(ServiceError::Rejected(message.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ServiceError::Decode(e.to_string()))
}

impl GameService for HttpGameService {
    async fn fetch_state(&self, position: Option<&str>) -> Result<GameState, ServiceError> {
        self.post(ROUTE_POSITION, &PositionRequest { position }).await
    }

    async fn apply_move(&self, position: &str, notation: &str) -> Result<MoveApplied, ServiceError> {
        self.post(ROUTE_MOVE, &MoveRequest { position, notation }).await
    }

    async fn analyze(&self, position: &str) -> Result<Analysis, ServiceError> {
        self.post(ROUTE_ANALYZE, &AnalyzeRequest { position }).await
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ServiceError> {
        let response: ExplainResponse = self.post(ROUTE_EXPLAIN, request).await?;
        Ok(response.explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    #[test]
    fn test_url_joining() {
        let service = HttpGameService::with_client("http://localhost:8787/", reqwest::Client::new());
        assert_eq!(service.base_url(), "http://localhost:8787");
        assert_eq!(service.url(ROUTE_MOVE), "http://localhost:8787/api/move");
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_value(PositionRequest { position: None }).unwrap();
        assert_eq!(body, serde_json::json!({}));

        let body = serde_json::to_value(MoveRequest {
            position: "startpos",
            notation: "7g7f",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"positionString": "startpos", "moveNotation": "7g7f"}));
    }

    #[test]
    fn test_decode_success() {
        let state: GameState = decode_response(
            200,
            r#"{"positionString": "9/9/9/9/9/9/9/9/9 b - 1", "sideToMove": "sente"}"#,
        )
        .unwrap();
        assert_eq!(state.side_to_move, Color::Black);
    }

    #[test]
    fn test_decode_status_error() {
        let err = decode_response::<GameState>(503, "unavailable").unwrap_err();
        assert_eq!(
            err,
            ServiceError::Status {
                status: 503,
                body: "unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejection() {
        let err = decode_response::<MoveApplied>(200, r#"{"error": "illegal move"}"#).unwrap_err();
        assert_eq!(err, ServiceError::Rejected("illegal move".to_string()));
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode_response::<Analysis>(200, "not json").unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));

        let err = decode_response::<Analysis>(200, r#"{"scoreCp": 10}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[test]
    fn test_decode_explanation() {
        let response: ExplainResponse =
            decode_response(200, r#"{"explanation": "角道を開ける手です。"}"#).unwrap();
        assert_eq!(response.explanation, "角道を開ける手です。");
    }
}
