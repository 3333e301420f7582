use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::parser::parse_findings_response;
use super::prompt::{build_user_message, ANALYSIS_SYSTEM_PROMPT};
use super::{AnalysisError, TranscriptAnalyzer};
use crate::config;
use crate::pipeline::reconcile::RawFinding;

/// Gemini `generateContent` client for transcript analysis.
///
/// The API key is supplied by the caller at construction time; this client
/// never reads or stores settings itself.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: config::ANALYSIS_TEMPERATURE,
            client,
            timeout_secs,
        })
    }

    /// Client against the public endpoint with the default timeout.
    pub fn with_key(api_key: &str, model: &str) -> Result<Self, AnalysisError> {
        Self::new(
            config::GEMINI_BASE_URL,
            api_key,
            model,
            config::ANALYSIS_TIMEOUT_SECS,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AnalysisError::Connection(self.base_url.clone())
        } else {
            AnalysisError::HttpClient(e.to_string())
        }
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

/// Response body from `generateContent`
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Text of the first part of the first candidate, if any.
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

/// Human-readable message from an error body, falling back to a generic one.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "API Error".to_string())
}

#[async_trait]
impl TranscriptAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        file_name: &str,
        text: &str,
    ) -> Result<Vec<RawFinding>, AnalysisError> {
        let start = Instant::now();
        let user_message = build_user_message(file_name, text);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &user_message,
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: ANALYSIS_SYSTEM_PROMPT,
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.temperature,
            },
        };

        tracing::debug!(
            model = %self.model,
            file_name,
            chars = text.chars().count(),
            "Sending analysis request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        let findings = match first_candidate_text(parsed) {
            Some(text) if !text.is_empty() => parse_findings_response(&text)?,
            _ => {
                tracing::debug!("Analysis response carried no candidate text");
                Vec::new()
            }
        };

        tracing::debug!(
            count = findings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis pass complete"
        );
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    /// Serve one canned HTTP response on a loopback port. The join handle
    /// yields the raw request that was received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Client against a local server, bypassing any proxy set in the environment.
    fn local_client(base_url: &str) -> GeminiClient {
        GeminiClient {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            temperature: config::ANALYSIS_TEMPERATURE,
            client: reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap(),
            timeout_secs: 10,
        }
    }

    #[tokio::test]
    async fn analyze_posts_prompt_and_parses_candidate_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"[{\"receptionNumber\":\"88\",\"type\":\"モノローグ\",\"excerpt\":\"患者: 眠れない\",\"summary\":\"【睡眠】\"}]"}]}}]}"#,
        )
        .await;

        let findings = local_client(&url)
            .analyze("2025-03-07_88.txt", "患者: 眠れない")
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, "モノローグ");
        assert_eq!(findings[0].excerpt, "患者: 眠れない");
        assert_eq!(findings[0].reception_number.to_string(), "88");

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-test:generateContent?key=test-key HTTP/1.1"
        ));
        assert!(request.contains("ファイル名: 2025-03-07_88.txt"));
        assert!(request.contains("\"responseMimeType\":\"application/json\""));
        assert!(request.contains("\"systemInstruction\""));
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error_with_body_message() {
        let (url, server) = serve_once(
            "400 Bad Request",
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        )
        .await;

        let err = local_client(&url).analyze("a.txt", "text").await.unwrap_err();
        match err {
            AnalysisError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_status_without_json_body_uses_generic_message() {
        let (url, server) = serve_once("503 Service Unavailable", "upstream down").await;

        let err = local_client(&url).analyze("a.txt", "text").await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Api { status: 503, ref message } if message == "API Error"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn response_without_candidates_is_zero_findings() {
        let (url, server) = serve_once("200 OK", "{}").await;

        let findings = local_client(&url).analyze("a.txt", "text").await.unwrap();
        assert!(findings.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn candidate_text_that_is_not_an_array_is_malformed() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"findings\":[]}"}]}}]}"#,
        )
        .await;

        let err = local_client(&url).analyze("a.txt", "text").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        server.await.unwrap();
    }

    #[test]
    fn debug_output_redacts_key() {
        let client =
            GeminiClient::new("https://example.test", "AIza-very-secret", "m", 30).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("example.test"));
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = GeminiClient::new("https://example.test/", "k", "m", 30).unwrap();
        assert_eq!(client.base_url, "https://example.test");
        assert_eq!(client.timeout_secs, 30);
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("https://example.test", "k", "gemini-x", 30).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-x:generateContent"
        );
    }

    #[test]
    fn with_key_uses_public_endpoint() {
        let client = GeminiClient::with_key("k", config::DEFAULT_MODEL).unwrap();
        assert_eq!(client.base_url, config::GEMINI_BASE_URL);
        assert_eq!(client.model(), config::DEFAULT_MODEL);
    }

    #[test]
    fn request_body_uses_camel_case_wire_names() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            system_instruction: Content {
                parts: vec![Part { text: "sys" }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.2,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn candidate_text_is_first_part_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[]"},{"text":"ignored"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(response).as_deref(), Some("[]"));
    }

    #[test]
    fn missing_candidates_yield_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(first_candidate_text(response).is_none());

        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(first_candidate_text(response).is_none());
    }

    #[test]
    fn api_error_message_prefers_body_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
    }

    #[test]
    fn api_error_message_falls_back() {
        assert_eq!(api_error_message("<html>bad gateway</html>"), "API Error");
        assert_eq!(api_error_message(r#"{"error":{}}"#), "API Error");
    }

    #[tokio::test]
    async fn unreachable_host_is_an_analysis_error() {
        // Port 9 on localhost is the discard port; nothing listens there in CI.
        let client = GeminiClient::new("http://127.0.0.1:9", "k", "m", 2).unwrap();
        let result = client.analyze("a.txt", "text").await;
        assert!(result.is_err());
    }
}
