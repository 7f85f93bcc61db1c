pub mod cloudinary;
pub mod scratch;

use std::path::Path;

use async_trait::async_trait;

use crate::error::GenerationError;

pub use cloudinary::CloudinaryUploader;
pub use scratch::TransientAssetStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedAsset {
    pub secure_url: String,
    pub public_id: Option<String>,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<HostedAsset, GenerationError>;
}
