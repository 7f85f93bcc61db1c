pub mod gemini;
pub mod media;

use async_trait::async_trait;

use crate::error::GenerationError;

pub use gemini::GeminiClient;
pub use media::{fetch_seed_image, SeedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Image,
    Mixed,
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub mode: OutputMode,
    pub seed_image: Option<SeedImage>,
}

impl GenerateOptions {
    pub fn text() -> Self {
        GenerateOptions {
            mode: OutputMode::Text,
            seed_image: None,
        }
    }

    pub fn image() -> Self {
        GenerateOptions {
            mode: OutputMode::Image,
            seed_image: None,
        }
    }

    pub fn mixed(seed_image: SeedImage) -> Self {
        GenerateOptions {
            mode: OutputMode::Mixed,
            seed_image: Some(seed_image),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedAsset {
    pub text: Option<String>,
    pub image: Option<GeneratedImage>,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedAsset, GenerationError>;
}
