use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::hosting::cloudinary::SignatureAlgorithm;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_text_model: String,
    pub gemini_image_model: String,
    pub gemini_shoot_model: String,
    pub background_aspect_ratio: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    pub cloudinary_api_base_url: String,
    pub cloudinary_folder: Option<String>,
    pub cloudinary_signature_algorithm: SignatureAlgorithm,
    pub model_timeout_secs: u64,
    pub seed_fetch_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub outbound_max_retries: u32,
    pub outbound_retry_base_delay_ms: u64,
    pub cors_allowed_origins: Vec<String>,
    pub load_warnings: Vec<String>,
}

fn env_string<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    env_optional(lookup, name).ok_or_else(|| anyhow!("{name} is required"))
}

fn env_u64<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_csv<F>(lookup: &F, name: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .unwrap_or_default()
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn normalize_signature_algorithm(value: &str) -> Result<SignatureAlgorithm, String> {
    match value.to_lowercase().as_str() {
        "sha1" | "sha-1" => Ok(SignatureAlgorithm::Sha1),
        "sha256" | "sha-256" => Ok(SignatureAlgorithm::Sha256),
        _ => Err(format!(
            "Unknown CLOUDINARY_SIGNATURE_ALGORITHM value '{value}'; defaulting to sha1."
        )),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_raw = env_string(&lookup, "PORT", "8000");
        let port = port_raw
            .parse::<u16>()
            .with_context(|| format!("Invalid PORT value: {port_raw}"))?;

        let mut load_warnings = Vec::new();
        let algorithm_raw = env_string(&lookup, "CLOUDINARY_SIGNATURE_ALGORITHM", "sha1");
        let cloudinary_signature_algorithm = normalize_signature_algorithm(&algorithm_raw)
            .unwrap_or_else(|warning| {
                load_warnings.push(warning);
                SignatureAlgorithm::Sha1
            });

        Ok(Config {
            host: env_string(&lookup, "HOST", "0.0.0.0"),
            port,
            log_level: env_string(&lookup, "LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string(&lookup, "LOG_DIR", "logs")),
            scratch_dir: PathBuf::from(env_string(&lookup, "SCRATCH_DIR", "public")),
            gemini_api_key: env_required(&lookup, "GEMINI_API_KEY")?,
            gemini_api_base_url: env_string(
                &lookup,
                "GEMINI_API_BASE_URL",
                "https://generativelanguage.googleapis.com",
            )
            .trim_end_matches('/')
            .to_string(),
            gemini_text_model: env_string(&lookup, "GEMINI_TEXT_MODEL", "gemini-1.5-flash"),
            gemini_image_model: env_string(
                &lookup,
                "GEMINI_IMAGE_MODEL",
                "imagen-3.0-generate-002",
            ),
            gemini_shoot_model: env_string(
                &lookup,
                "GEMINI_SHOOT_MODEL",
                "gemini-2.0-flash-preview-image-generation",
            ),
            background_aspect_ratio: env_string(&lookup, "BACKGROUND_ASPECT_RATIO", "16:9"),
            cloudinary_cloud_name: env_required(&lookup, "CLOUDINARY_CLOUD_NAME")?,
            cloudinary_api_key: env_required(&lookup, "CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: env_required(&lookup, "CLOUDINARY_API_SECRET")?,
            cloudinary_api_base_url: env_string(
                &lookup,
                "CLOUDINARY_API_BASE_URL",
                "https://api.cloudinary.com/v1_1",
            )
            .trim_end_matches('/')
            .to_string(),
            cloudinary_folder: env_optional(&lookup, "CLOUDINARY_FOLDER"),
            cloudinary_signature_algorithm,
            model_timeout_secs: env_u64(&lookup, "MODEL_TIMEOUT_SECS", 90).max(1),
            seed_fetch_timeout_secs: env_u64(&lookup, "SEED_FETCH_TIMEOUT_SECS", 30).max(1),
            upload_timeout_secs: env_u64(&lookup, "UPLOAD_TIMEOUT_SECS", 60).max(1),
            outbound_max_retries: env_u64(&lookup, "OUTBOUND_MAX_RETRIES", 1).min(1) as u32,
            outbound_retry_base_delay_ms: env_u64(&lookup, "OUTBOUND_RETRY_BASE_DELAY_MS", 900),
            cors_allowed_origins: env_csv(&lookup, "CORS_ALLOWED_ORIGINS"),
            load_warnings,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn seed_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.seed_fetch_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}
