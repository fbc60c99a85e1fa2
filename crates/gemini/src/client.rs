//! HTTP client for `models/{model}:generateContent`
//!
//! The request is a single-part text prompt plus generation and safety
//! configuration; the credential travels as the `key` query parameter.
//! Each call is bounded by the configured timeout and is never retried
//! internally.

use common::Secret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default public endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Safety categories relaxed for curriculum generation. Lesson content
/// about e.g. security topics otherwise trips the default filters.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Client tuning: endpoint, model, and the per-call timeout.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout: Duration::from_secs(45),
            temperature: 0.7,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Generation endpoint client.
///
/// Cheap to clone; the inner `reqwest::Client` is already shared.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Per-call timeout, exposed for dispatcher logging.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Issue one generation call and return the generated text.
    ///
    /// Non-success outcomes: network failure, timeout, non-2xx status
    /// (body preserved for diagnostics), and a 2xx payload with no
    /// usable text.
    pub async fn generate(&self, api_key: &Secret<String>, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key.expose_str())])
            .json(&request)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout)
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generation call rejected");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(Error::Http)?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let text = extract_text(parsed).ok_or(Error::EmptyResponse)?;
        debug!(chars = text.len(), "generation call succeeded");
        Ok(text)
    }
}

/// Pull the first candidate's first non-empty text part.
fn extract_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|p| p.text)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GenerateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn extract_text_happy_path() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"subject\":\"Python\"}"}]}}]}"#,
        );
        assert_eq!(
            extract_text(response).unwrap(),
            r#"{"subject":"Python"}"#
        );
    }

    #[test]
    fn extract_text_no_candidates() {
        let response = parse(r#"{"candidates":[]}"#);
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn extract_text_missing_candidates_field() {
        let response = parse(r#"{}"#);
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn extract_text_empty_parts() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#);
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn extract_text_empty_string_is_none() {
        let response = parse(r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#);
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn extract_text_skips_textless_parts() {
        let response =
            parse(r#"{"candidates":[{"content":{"parts":[{},{"text":"hello"}]}}]}"#);
        assert_eq!(extract_text(response).unwrap(), "hello");
    }

    #[test]
    fn request_body_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "make a roadmap" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 8192,
            },
            safety_settings: vec![SafetySetting {
                category: "HARM_CATEGORY_HARASSMENT",
                threshold: "BLOCK_NONE",
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "make a roadmap");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(
            value["safetySettings"][0]["category"],
            "HARM_CATEGORY_HARASSMENT"
        );
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn default_config_uses_public_endpoint() {
        let config = ClientConfig::default();
        assert!(config.base_url.starts_with("https://"));
        assert_eq!(config.timeout, Duration::from_secs(45));
    }
}
