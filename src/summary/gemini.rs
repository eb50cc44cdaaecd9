//! Gemini `generateContent` backend for summaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{SummaryError, SummaryGenerator};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Text generator backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(api_key: &str, model: &str) -> Result<Self, SummaryError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, model)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str, model: &str) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SummaryError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl SummaryGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummaryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Request(e.to_string()))?;

        parsed.text().ok_or(SummaryError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_response_text() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Good " }, { "text": "link." }] } }]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Good link."));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn test_generate_against_local_backend() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|Path(call): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(call, "test-model:generateContent");
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": format!("echo: {}", prompt) }] } }]
                }))
            }),
        );
        let endpoint = serve(router).await;

        let generator = GeminiGenerator::with_endpoint(&endpoint, "key", "test-model").unwrap();
        let text = generator.generate("hello").await.unwrap();
        assert_eq!(text, "echo: hello");
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async { (StatusCode::FORBIDDEN, "no") }),
        );
        let endpoint = serve(router).await;

        let generator = GeminiGenerator::with_endpoint(&endpoint, "bad", "m").unwrap();
        let err = generator.generate("hello").await.unwrap_err();
        assert!(matches!(err, SummaryError::Status(403)), "got {:?}", err);
    }
}
