use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{is_transient_status, is_transient_transport, GenerationError};
use crate::llm::{GenerateOptions, GeneratedAsset, GeneratedImage, GenerativeModel, OutputMode};
use crate::utils::timing::log_provider_timing;
use crate::utils::truncate_for_log;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    predictions: Option<Vec<ImagenPrediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    shoot_model: String,
    aspect_ratio: String,
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn summarize_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let summarized: Vec<Value> = contents
            .iter()
            .map(|content| {
                let parts = content
                    .get("parts")
                    .and_then(|value| value.as_array())
                    .map(|parts| summarize_parts(parts))
                    .unwrap_or_default();
                json!({ "parts": parts })
            })
            .collect();
        summary.insert("contents".to_string(), Value::Array(summarized));
    }

    if let Some(instances) = payload.get("instances") {
        summary.insert("instances".to_string(), instances.clone());
    }

    for key in ["generationConfig", "parameters"] {
        if let Some(config) = payload.get(key) {
            summary.insert(key.to_string(), config.clone());
        }
    }

    Value::Object(summary)
}

fn decode_image(data: &str, mime_type: &str) -> Result<GeneratedImage, GenerationError> {
    let bytes = general_purpose::STANDARD.decode(data).map_err(|err| {
        GenerationError::MalformedResponse(format!("image data is not valid base64: {err}"))
    })?;
    if bytes.is_empty() {
        return Err(GenerationError::MalformedResponse(
            "image data is empty".to_string(),
        ));
    }
    Ok(GeneratedImage {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

fn split_first_candidate(response: GeminiResponse) -> Result<GeneratedAsset, GenerationError> {
    let parts = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("response has no candidates".into()))?
        .content
        .and_then(|content| content.parts)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("first candidate has no content parts".into())
        })?;

    let mut text = String::new();
    let mut image = None;
    for part in parts {
        match part {
            GeminiPart::Text { text: chunk } => text.push_str(&chunk),
            GeminiPart::InlineData { inline_data } => {
                if image.is_none() && inline_data.mime_type.starts_with("image/") {
                    image = Some(decode_image(&inline_data.data, &inline_data.mime_type)?);
                }
            }
            GeminiPart::Other(_) => {}
        }
    }

    Ok(GeneratedAsset {
        text: if text.is_empty() { None } else { Some(text) },
        image,
    })
}

fn first_prediction_image(response: ImagenResponse) -> Result<GeneratedImage, GenerationError> {
    let prediction = response
        .predictions
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse("response has no predictions".into()))?;

    match prediction.bytes_base64_encoded {
        Some(data) => decode_image(
            &data,
            prediction.mime_type.as_deref().unwrap_or("image/jpeg"),
        ),
        None => Err(GenerationError::MalformedResponse(match prediction.rai_filtered_reason {
            Some(reason) => format!("image was filtered: {reason}"),
            None => "prediction carries no image bytes".to_string(),
        })),
    }
}

impl GeminiClient {
    pub fn new(http: Client, config: &Config) -> Self {
        GeminiClient {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_api_base_url.clone(),
            text_model: config.gemini_text_model.clone(),
            image_model: config.gemini_image_model.clone(),
            shoot_model: config.gemini_shoot_model.clone(),
            aspect_ratio: config.background_aspect_ratio.clone(),
        }
    }

    fn redact(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    async fn call_model<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        payload: Value,
    ) -> Result<T, GenerationError> {
        let url = format!("{}/v1beta/models/{}:{}", self.base_url, model, method);

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "llm.gemini", model = model, method = method, payload = %summarize_payload(&payload));
        }

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                GenerationError::ModelInvocation {
                    message: err_text,
                    transient: is_transient_transport(&err),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = self.redact(&message.unwrap_or(body_summary));
            return Err(GenerationError::ModelInvocation {
                message: format!("status {status}: {detail}"),
                transient: is_transient_status(status),
            });
        }

        response.json::<T>().await.map_err(|err| {
            GenerationError::MalformedResponse(format!("could not decode {method} response: {err}"))
        })
    }

    async fn generate_text(&self, prompt: &str) -> Result<GeneratedAsset, GenerationError> {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let model = self.text_model.as_str();
        let asset = log_provider_timing("gemini", model, "generate_text", || async move {
            let response: GeminiResponse = self.call_model(model, "generateContent", payload).await?;
            split_first_candidate(response)
        })
        .await?;

        if asset.text.is_none() {
            return Err(GenerationError::MalformedResponse(
                "first candidate has no text".to_string(),
            ));
        }
        Ok(GeneratedAsset {
            text: asset.text,
            image: None,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedAsset, GenerationError> {
        let payload = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": self.aspect_ratio,
                "includeRaiReason": true,
                "outputOptions": { "mimeType": "image/jpeg" },
            },
        });
        let model = self.image_model.as_str();
        let image = log_provider_timing("gemini", model, "generate_image", || async move {
            let response: ImagenResponse = self.call_model(model, "predict", payload).await?;
            first_prediction_image(response)
        })
        .await?;

        Ok(GeneratedAsset {
            text: None,
            image: Some(image),
        })
    }

    async fn transform_image(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedAsset, GenerationError> {
        let mut parts = Vec::new();
        if let Some(seed) = &options.seed_image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": seed.mime_type,
                    "data": general_purpose::STANDARD.encode(&seed.bytes),
                }
            }));
        }
        parts.push(json!({ "text": prompt }));

        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });
        let model = self.shoot_model.as_str();
        let asset = log_provider_timing("gemini", model, "transform_image", || async move {
            let response: GeminiResponse = self.call_model(model, "generateContent", payload).await?;
            split_first_candidate(response)
        })
        .await?;

        if asset.image.is_none() {
            return Err(GenerationError::MalformedResponse(format!(
                "no image returned by {model}"
            )));
        }
        Ok(asset)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedAsset, GenerationError> {
        match options.mode {
            OutputMode::Text => self.generate_text(prompt).await,
            OutputMode::Image => {
                if options.seed_image.is_some() {
                    warn!("Seed image ignored for image-only generation");
                }
                self.generate_image(prompt).await
            }
            OutputMode::Mixed => self.transform_image(prompt, options).await,
        }
    }
}
