use serde::{Deserialize, Serialize};
use url::Url;

use super::require_non_blank;
use crate::error::GenerationError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShootRequest {
    pub art_form: String,
    pub product_image_url: String,
    #[serde(default)]
    pub product_description: Option<String>,
}

impl ShootRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        require_non_blank("art_form", &self.art_form)?;
        require_non_blank("product_image_url", &self.product_image_url)?;
        let parsed = Url::parse(self.product_image_url.trim()).map_err(|err| {
            GenerationError::validation("product_image_url", format!("not a valid URL: {err}"))
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(GenerationError::validation(
                "product_image_url",
                format!("unsupported scheme '{other}', expected http or https"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShootResponse {
    pub generated_product_image_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductKeywordsRequest {
    pub profession: String,
    pub product_name: String,
    pub location: String,
    pub artist_name: String,
}

impl ProductKeywordsRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        require_non_blank("profession", &self.profession)?;
        require_non_blank("product_name", &self.product_name)?;
        require_non_blank("location", &self.location)?;
        require_non_blank("artist_name", &self.artist_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductDescriptionRequest {
    pub profession: String,
    pub product_name: String,
    pub product_description: String,
    #[serde(default)]
    pub custom_req: Option<String>,
    pub location: String,
    pub background: String,
}

impl ProductDescriptionRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        require_non_blank("profession", &self.profession)?;
        require_non_blank("product_name", &self.product_name)?;
        require_non_blank("product_description", &self.product_description)?;
        require_non_blank("location", &self.location)?;
        require_non_blank("background", &self.background)
    }
}
