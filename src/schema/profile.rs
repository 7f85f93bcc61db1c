use serde::{Deserialize, Serialize};

use super::require_non_blank;
use crate::error::GenerationError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileDescriptionRequest {
    pub profession: String,
    pub location: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub custom_request: Option<String>,
    // Accepted but not used in the prompt.
    #[serde(default)]
    pub previous_descriptions: Option<Vec<String>>,
}

impl ProfileDescriptionRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        require_non_blank("profession", &self.profession)?;
        require_non_blank("location", &self.location)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileBackgroundRequest {
    pub profession: String,
    pub location: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub custom_request: Option<String>,
}

impl ProfileBackgroundRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        require_non_blank("profession", &self.profession)?;
        require_non_blank("location", &self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundResponse {
    pub background_url: String,
}
