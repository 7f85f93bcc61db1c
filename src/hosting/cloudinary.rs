use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{is_transient_status, is_transient_transport, GenerationError};
use crate::hosting::{HostedAsset, ImageHost};
use crate::llm::media::detect_mime_type;
use crate::utils::timing::log_provider_timing;
use crate::utils::truncate_for_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorResponse {
    error: CloudinaryErrorDetail,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorDetail {
    message: String,
}

pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign(params: &[(&str, String)], api_secret: &str, algorithm: SignatureAlgorithm) -> String {
    let payload = format!("{}{}", string_to_sign(params), api_secret);
    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}

fn upload_error(message: impl Into<String>, transient: bool) -> GenerationError {
    GenerationError::Upload {
        message: message.into(),
        transient,
    }
}

#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    http: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
    algorithm: SignatureAlgorithm,
}

impl CloudinaryUploader {
    pub fn new(http: Client, config: &Config) -> Self {
        CloudinaryUploader {
            http,
            base_url: config.cloudinary_api_base_url.clone(),
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
            folder: config.cloudinary_folder.clone(),
            algorithm: config.cloudinary_signature_algorithm,
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.base_url, self.cloud_name)
    }

    async fn send(&self, path: &Path, timestamp: i64) -> Result<HostedAsset, GenerationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| GenerationError::Scratch(format!("read {}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.png".to_string());
        let mime_type = detect_mime_type(&bytes).unwrap_or_else(|| "image/png".to_string());

        let mut params = vec![("timestamp", timestamp.to_string())];
        if let Some(folder) = &self.folder {
            params.push(("folder", folder.clone()));
        }
        let signature = sign(&params, &self.api_secret, self.algorithm);

        let file_part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|err| upload_error(format!("invalid mime type {mime_type}: {err}"), false))?;
        let mut form = Form::new()
            .part("file", file_part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!("Cloudinary upload failed to send: {err}");
                upload_error(err.to_string(), is_transient_transport(&err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CloudinaryErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or_else(|_| truncate_for_log(body.trim(), 500));
            warn!("Cloudinary upload failed with status {}: {}", status, message);
            return Err(upload_error(
                format!("status {status}: {message}"),
                is_transient_status(status),
            ));
        }

        let parsed = response
            .json::<CloudinaryUploadResponse>()
            .await
            .map_err(|err| upload_error(format!("could not decode upload response: {err}"), false))?;

        match parsed.secure_url.filter(|url| !url.trim().is_empty()) {
            Some(secure_url) => {
                info!("Uploaded image to Cloudinary: {}", secure_url);
                Ok(HostedAsset {
                    secure_url,
                    public_id: parsed.public_id,
                })
            }
            None => Err(upload_error("response carried no secure_url", false)),
        }
    }
}

#[async_trait]
impl ImageHost for CloudinaryUploader {
    async fn upload(&self, path: &Path) -> Result<HostedAsset, GenerationError> {
        let timestamp = chrono::Utc::now().timestamp();
        log_provider_timing("cloudinary", &self.cloud_name, "upload", || {
            self.send(path, timestamp)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::llm::media::tiny_png;

    fn uploader_for(server: &MockServer, folder: Option<&str>) -> CloudinaryUploader {
        CloudinaryUploader {
            http: Client::new(),
            base_url: server.uri(),
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: "secret".to_string(),
            folder: folder.map(str::to_string),
            algorithm: SignatureAlgorithm::Sha1,
        }
    }

    fn scratch_png() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), tiny_png()).unwrap();
        file
    }

    #[test]
    fn signs_sorted_parameters() {
        let params = vec![
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
            ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string()),
        ];
        assert_eq!(
            sign(&params, "abcd", SignatureAlgorithm::Sha1),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn blank_parameters_are_not_signed() {
        let params = vec![
            ("timestamp", "1700000000".to_string()),
            ("folder", "artisans".to_string()),
            ("public_id", String::new()),
        ];
        assert_eq!(string_to_sign(&params), "folder=artisans&timestamp=1700000000");
        assert_eq!(
            sign(&params, "secret", SignatureAlgorithm::Sha256),
            "ea9bcbb05a1c08878f650232ceeebd5319645cbe42b29ac201ea6cacd939fb8a"
        );
    }

    #[tokio::test]
    async fn returns_secure_url_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "artisans/abc",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/artisans/abc.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = scratch_png();
        let hosted = uploader_for(&server, Some("artisans"))
            .upload(file.path())
            .await
            .unwrap();
        assert_eq!(
            hosted.secure_url,
            "https://res.cloudinary.com/demo/image/upload/artisans/abc.png"
        );
        assert_eq!(hosted.public_id.as_deref(), Some("artisans/abc"));
    }

    #[tokio::test]
    async fn rejected_upload_is_an_explicit_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let file = scratch_png();
        let err = uploader_for(&server, None).upload(file.path()).await.unwrap_err();
        match err {
            GenerationError::Upload { message, transient } => {
                assert!(message.contains("Invalid Signature"));
                assert!(!transient);
            }
            other => panic!("expected upload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_secure_url_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "abc",
                "secure_url": ""
            })))
            .mount(&server)
            .await;

        let file = scratch_png();
        let err = uploader_for(&server, None).upload(file.path()).await.unwrap_err();
        assert_eq!(err.error_type(), "upload_error");
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let file = scratch_png();
        let err = uploader_for(&server, None).upload(file.path()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
