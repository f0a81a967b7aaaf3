use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::config::VisionConfig;
use crate::error::AppError;

/// Image label detection. Returns raw label descriptions in the order the
/// service ranked them; verification against the food catalog happens in the
/// service layer.
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect(&self, image: Bytes) -> Result<Vec<String>, AppError>;
}

const MAX_LABELS: u32 = 10;

/// Vision annotate-API client.
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl LabelDetector for VisionClient {
    async fn detect(&self, image: Bytes) -> Result<Vec<String>, AppError> {
        let url = format!("{}/v1/images:annotate", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&annotate_request(&image))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response
            .json()
            .await
            .map_err(|_| AppError::Parse("label detection"))?;
        parse_annotate_response(&body)
    }
}

pub(crate) fn annotate_request(image: &[u8]) -> Value {
    json!({
        "requests": [{
            "image": { "content": BASE64_STANDARD.encode(image) },
            "features": [{ "type": "LABEL_DETECTION", "maxResults": MAX_LABELS }]
        }]
    })
}

/// Labels live at `responses[0].labelAnnotations[].description`. A response
/// with no annotations means the image produced no labels; a body without a
/// `responses` array is malformed.
pub(crate) fn parse_annotate_response(body: &Value) -> Result<Vec<String>, AppError> {
    let first = body
        .get("responses")
        .and_then(Value::as_array)
        .and_then(|responses| responses.first())
        .ok_or(AppError::Parse("label detection"))?;

    let Some(annotations) = first.get("labelAnnotations").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    Ok(annotations
        .iter()
        .filter_map(|a| a.get("description").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_asks_for_label_detection() {
        let body = annotate_request(b"jpeg-bytes");
        let feature = &body["requests"][0]["features"][0];
        assert_eq!(feature["type"], "LABEL_DETECTION");
        assert_eq!(feature["maxResults"], 10);

        let content = body["requests"][0]["image"]["content"].as_str().unwrap();
        assert_eq!(BASE64_STANDARD.decode(content).unwrap(), b"jpeg-bytes");
    }

    #[test]
    fn parses_label_descriptions_in_order() {
        let body = json!({
            "responses": [{
                "labelAnnotations": [
                    {"description": "Banana", "score": 0.98},
                    {"description": "Fruit", "score": 0.95},
                    {"description": "Yellow", "score": 0.80}
                ]
            }]
        });
        let labels = parse_annotate_response(&body).unwrap();
        assert_eq!(labels, ["Banana", "Fruit", "Yellow"]);
    }

    #[test]
    fn missing_annotations_means_no_labels() {
        let labels = parse_annotate_response(&json!({"responses": [{}]})).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn body_without_responses_is_a_parse_failure() {
        let err = parse_annotate_response(&json!({"error": "bad"})).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }
}
