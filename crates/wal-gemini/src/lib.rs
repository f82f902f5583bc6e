//! Gemini adapter (phone number extraction).
//!
//! Uses the `generateContent` endpoint with a JSON response schema so the
//! model answers with `{found, phoneNumber, confidence, countryCodeDetected}`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use wal_core::{
    config::Config, domain::Extraction, errors::Error, ports::ExtractionGateway, Result,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Debug)]
pub struct GeminiExtractor {
    api_key: Option<String>,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("gemini client build error: {e}")))?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.gemini_api_key.clone(),
            cfg.gemini_model.clone(),
            cfg.extraction_timeout,
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The key travels in a header, never in this URL.
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn request(&self, api_key: &str, text: &str) -> Result<Option<Extraction>> {
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(text))
            .send()
            .await
            .map_err(|e| Error::External(format!("gemini request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "gemini extraction failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("gemini json error: {e}")))?;

        parse_response(&v)
    }
}

#[async_trait]
impl ExtractionGateway for GeminiExtractor {
    async fn extract(&self, text: &str) -> Option<Extraction> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("GEMINI_API_KEY is missing, AI extraction skipped");
            return None;
        };

        match self.request(api_key, text).await {
            Ok(Some(x)) => Some(x),
            Ok(None) => {
                tracing::info!("gemini found no phone number");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "gemini extraction error");
                None
            }
        }
    }
}

pub fn build_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following text and extract the primary phone number.
Format the output as a clean string of digits suitable for the WhatsApp API (international format).

Formatting rules:
1. Remove all non-digit characters.
2. If the number starts with "05" (Israeli mobile format), replace the leading "0" with "972". (Example: 0501234567 -> 972501234567).
3. If the number implies a specific country code (e.g. starts with +, 1, 44, 91), keep it without the +.
4. If multiple numbers exist, choose the most likely mobile number.

Input text: "{text}""#
    )
}

pub fn request_body(text: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": build_prompt(text) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "found": { "type": "BOOLEAN" },
                    "phoneNumber": { "type": "STRING", "description": "The cleaned digits only." },
                    "confidence": { "type": "NUMBER", "description": "Confidence score between 0 and 1." },
                    "countryCodeDetected": { "type": "BOOLEAN" }
                },
                "required": ["found", "phoneNumber", "confidence", "countryCodeDetected"]
            }
        }
    })
}

/// Pull the structured answer out of a `generateContent` response.
///
/// `Ok(None)` means the model answered but found nothing usable.
pub fn parse_response(v: &Value) -> Result<Option<Extraction>> {
    let text = v
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::External("gemini response has no text part".to_string()))?;

    let answer: Value = serde_json::from_str(text)?;

    let found = answer.get("found").and_then(|f| f.as_bool()).unwrap_or(false);
    let phone_number = answer
        .get("phoneNumber")
        .and_then(|p| p.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if !found || phone_number.is_empty() {
        return Ok(None);
    }

    Ok(Some(Extraction {
        phone_number,
        confidence: answer
            .get("confidence")
            .and_then(|c| c.as_f64())
            .unwrap_or(0.0),
        country_code_detected: answer
            .get("countryCodeDetected")
            .and_then(|c| c.as_bool())
            .unwrap_or(false),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn parses_found_number() {
        let v = response_with(
            r#"{"found":true,"phoneNumber":"972501234567","confidence":0.93,"countryCodeDetected":false}"#,
        );
        let x = parse_response(&v).unwrap().unwrap();
        assert_eq!(x.phone_number, "972501234567");
        assert!((x.confidence - 0.93).abs() < f64::EPSILON);
        assert!(!x.country_code_detected);
    }

    #[test]
    fn not_found_or_blank_number_is_none() {
        let not_found = response_with(
            r#"{"found":false,"phoneNumber":"123","confidence":0.1,"countryCodeDetected":false}"#,
        );
        assert_eq!(parse_response(&not_found).unwrap(), None);

        let blank = response_with(
            r#"{"found":true,"phoneNumber":"  ","confidence":0.5,"countryCodeDetected":true}"#,
        );
        assert_eq!(parse_response(&blank).unwrap(), None);
    }

    #[test]
    fn malformed_responses_are_errors() {
        assert!(parse_response(&json!({})).is_err());
        assert!(parse_response(&json!({"candidates": []})).is_err());
        assert!(parse_response(&response_with("not json")).is_err());
    }

    #[test]
    fn request_carries_prompt_and_schema() {
        let body = request_body("Dana, mobile 050-1234567");
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Dana, mobile 050-1234567"));
        assert!(prompt.contains("972"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn endpoint_keeps_key_out_of_url() {
        let x = GeminiExtractor::new(
            Some("secret-key".to_string()),
            "gemini-2.5-flash",
            Duration::from_secs(1),
        )
        .unwrap()
        .with_base_url("http://localhost:8080/");
        let url = x.endpoint();
        assert_eq!(
            url,
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!url.contains("secret-key"));
    }

    #[tokio::test]
    async fn missing_key_skips_request() {
        let x = GeminiExtractor::new(
            Some("   ".to_string()),
            "gemini-2.5-flash",
            Duration::from_secs(1),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
        assert!(!x.is_configured());
        assert_eq!(x.extract("call +1 415 555 2671").await, None);
    }

    #[tokio::test]
    async fn transport_error_is_none() {
        let x = GeminiExtractor::new(
            Some("key".to_string()),
            "gemini-2.5-flash",
            Duration::from_secs(1),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
        assert!(x.is_configured());
        assert_eq!(x.extract("call +1 415 555 2671").await, None);
    }
}
