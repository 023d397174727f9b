//! Structured shipment extraction from TMS screenshots.
//!
//! Sends the screenshot plus a column-mapping prompt to a Gemini
//! `generateContent` endpoint in JSON mode and parses the returned
//! `{"shipments": [...]}` payload. The model is an opaque collaborator:
//! everything downstream only depends on the output shape.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{self, ConfigError};
use crate::model::RawShipmentRecord;

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const EXTRACTION_PROMPT: &str = r#"You are analyzing a TMS (Transportation Management System) screenshot showing a table of shipment data.

Process the table ONE ROW AT A TIME; never mix data from adjacent rows. Extract ALL visible rows.

Return JSON of the form {"shipments": [...]} where each shipment has:
- "bol": the BOL/PO number (e.g. "919628907", "H0752257"). If the cell is empty or contains only the customer name, use "N/A"
- "customer": full customer name (e.g. "VITAAUTX - Vital Farms")
- "brokerageStatus": status value (COVRD, DISPATCH, IN-TRANS, DLVD, Accepted, etc.)
- "lastCallinCity": current truck location, may include state (e.g. "South Amboy, NJ"). Use "N/A" if empty or unclear
- "originZip": shipper zip code
- "destZip": receiver zip code
- "reeferTemp": reefer temperature requirement (e.g. "34F") - OMIT this field entirely when the cell is blank

If any other cell is empty or unclear, use "N/A" for that field only."#;

/// Extraction failures are hard errors: without rows there is nothing to
/// enrich, so the whole run surfaces the failure to the caller.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("extraction API error: {0}")]
    Api(String),
    #[error("extraction response contained no text")]
    Empty,
    #[error("extraction output is not valid shipment JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Vision extraction client.
pub struct ShipmentExtractor {
    http: reqwest::Client,
    api_key: String,
}

impl ShipmentExtractor {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: config::gemini_api_key()?,
        })
    }

    /// Extract shipment rows from one screenshot.
    pub async fn extract(&self, image_bytes: &[u8]) -> Result<Vec<RawShipmentRecord>, ExtractError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: STANDARD.encode(image_bytes),
                        },
                    },
                    Part::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .http
            .post(GENERATE_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api(format!("{status}: {body}")));
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or(ExtractError::Empty)?;

        let payload: ExtractedPayload = serde_json::from_str(strip_code_fence(text))?;
        tracing::info!(count = payload.shipments.len(), "extracted shipments");
        Ok(payload.shipments)
    }
}

/// The model sometimes wraps its JSON in a markdown code fence even in
/// JSON mode; unwrap it before parsing.
fn strip_code_fence(text: &str) -> &str {
    let fence = Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").unwrap();
    match fence.captures(text) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(text),
        None => text.trim(),
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ExtractedPayload {
    shipments: Vec<RawShipmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"shipments": [{
        "bol": "919628907",
        "customer": "VITAAUTX - Vital Farms",
        "lastCallinCity": "South Amboy, NJ",
        "brokerageStatus": "IN-TRANS",
        "originZip": "65802",
        "destZip": "08832",
        "reeferTemp": "34F"
    }]}"#;

    #[test]
    fn fenced_and_bare_payloads_parse_identically() {
        let fenced = format!("```json\n{PAYLOAD}\n```");
        let a: ExtractedPayload = serde_json::from_str(strip_code_fence(PAYLOAD)).unwrap();
        let b: ExtractedPayload = serde_json::from_str(strip_code_fence(&fenced)).unwrap();
        assert_eq!(a.shipments.len(), 1);
        assert_eq!(b.shipments.len(), 1);
        assert_eq!(b.shipments[0].bol, "919628907");
        assert_eq!(b.shipments[0].reefer_temp.as_deref(), Some("34F"));
    }

    #[test]
    fn missing_reefer_temp_means_dry() {
        let json = r#"{"shipments": [{
            "bol": "N/A",
            "customer": "ACME - Acme Foods",
            "lastCallinCity": "N/A",
            "brokerageStatus": "COVRD",
            "originZip": "97070",
            "destZip": "06002"
        }]}"#;
        let payload: ExtractedPayload = serde_json::from_str(json).unwrap();
        assert!(payload.shipments[0].reefer_temp.is_none());
    }

    #[test]
    fn unfenced_whitespace_is_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }
}
