use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{is_transient_status, is_transient_transport, GenerationError};
use crate::utils::truncate_for_log;

const SEED_ERROR_BODY_LIMIT: usize = 800;

#[derive(Debug, Clone)]
pub struct SeedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

fn seed_error(url: &str, message: impl Into<String>, transient: bool) -> GenerationError {
    GenerationError::SeedFetch {
        url: url.to_string(),
        message: message.into(),
        transient,
    }
}

pub async fn fetch_seed_image(client: &Client, url: &str) -> Result<SeedImage, GenerationError> {
    let response = client.get(url).send().await.map_err(|err| {
        warn!(
            "Failed to fetch seed image {url}: {err} (timeout={}, connect={})",
            err.is_timeout(),
            err.is_connect()
        );
        seed_error(url, err.to_string(), is_transient_transport(&err))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Seed image download failed for {url} with status {}: {}",
            status,
            truncate_for_log(&body, SEED_ERROR_BODY_LIMIT)
        );
        return Err(seed_error(
            url,
            format!("status {status}"),
            is_transient_status(status),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| seed_error(url, format!("failed to read body: {err}"), true))?
        .to_vec();

    if bytes.is_empty() {
        return Err(seed_error(url, "empty response body", false));
    }

    if let Err(err) = image::load_from_memory(&bytes) {
        return Err(seed_error(url, format!("not a decodable image: {err}"), false));
    }

    let mime_type = detect_mime_type(&bytes).unwrap_or_else(|| "image/png".to_string());
    debug!(url = url, mime_type = %mime_type, bytes = bytes.len(), "Fetched seed image");
    Ok(SeedImage { bytes, mime_type })
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    use std::io::Cursor;

    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 120, 40]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}
