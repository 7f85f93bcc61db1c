pub mod product;
pub mod profile;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub use product::{
    KeywordsResponse, ProductDescriptionRequest, ProductKeywordsRequest, ShootRequest,
    ShootResponse,
};
pub use profile::{BackgroundResponse, ProfileBackgroundRequest, ProfileDescriptionRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionResponse {
    pub description: String,
    pub plain_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        HealthResponse {
            status: "ok".to_string(),
        }
    }
}

pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), GenerationError> {
    if value.trim().is_empty() {
        return Err(GenerationError::validation(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
