pub mod hashtags;
pub mod markdown;
pub mod prompts;

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::hosting::{ImageHost, TransientAssetStore};
use crate::llm::{fetch_seed_image, GenerateOptions, GeneratedAsset, GeneratedImage, GenerativeModel};
use crate::schema::{
    BackgroundResponse, DescriptionResponse, KeywordsResponse, ProductDescriptionRequest,
    ProductKeywordsRequest, ProfileBackgroundRequest, ProfileDescriptionRequest, ShootRequest,
    ShootResponse,
};
use crate::utils::retry::{call_with_retry, OutboundPolicy};
use crate::utils::truncate_for_log;

const BACKGROUND_LABEL: &str = "background";
const SHOOT_LABEL: &str = "professional-shoot";

pub struct Pipeline {
    model: Arc<dyn GenerativeModel>,
    host: Arc<dyn ImageHost>,
    store: TransientAssetStore,
    http: Client,
    policy: OutboundPolicy,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        host: Arc<dyn ImageHost>,
        store: TransientAssetStore,
        http: Client,
        policy: OutboundPolicy,
    ) -> Self {
        Pipeline {
            model,
            host,
            store,
            http,
            policy,
        }
    }

    async fn invoke_model(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedAsset, GenerationError> {
        debug!(mode = ?options.mode, "Model prompt: {}", truncate_for_log(prompt, 400));
        call_with_retry(
            "model.generate",
            self.policy.model_timeout,
            &self.policy.retry,
            || self.model.generate(prompt, options),
        )
        .await
    }

    async fn generate_markdown(
        &self,
        prompt: &str,
        strip: bool,
    ) -> Result<DescriptionResponse, GenerationError> {
        let asset = self.invoke_model(prompt, &GenerateOptions::text()).await?;
        let text = require_text(asset)?;
        let description = if strip { text.trim().to_string() } else { text };
        let plain_text = markdown::to_plain_text(&description);
        Ok(DescriptionResponse {
            description,
            plain_text,
        })
    }

    async fn host_image(&self, image: &GeneratedImage, label: &str) -> Result<String, GenerationError> {
        let hosted = self
            .store
            .persist_and_upload(
                self.host.as_ref(),
                image,
                label,
                self.policy.upload_timeout,
                &self.policy.retry,
            )
            .await?;
        debug!(label = label, public_id = ?hosted.public_id, "Image hosted at {}", hosted.secure_url);
        Ok(hosted.secure_url)
    }

    pub async fn generate_profile_description(
        &self,
        request: &ProfileDescriptionRequest,
    ) -> Result<DescriptionResponse, GenerationError> {
        if let Some(previous) = &request.previous_descriptions {
            info!(
                count = previous.len(),
                "previous_descriptions supplied; not used for prompt construction"
            );
        }
        let prompt = prompts::profile_description_prompt(request);
        self.generate_markdown(&prompt, false).await
    }

    pub async fn generate_profile_background(
        &self,
        request: &ProfileBackgroundRequest,
    ) -> Result<BackgroundResponse, GenerationError> {
        let prompt = prompts::background_prompt(request);
        info!("Background prompt: {}", prompt);
        let asset = self.invoke_model(&prompt, &GenerateOptions::image()).await?;
        let image = require_image(asset)?;
        let background_url = self.host_image(&image, BACKGROUND_LABEL).await?;
        Ok(BackgroundResponse { background_url })
    }

    pub async fn generate_professional_shoot(
        &self,
        request: &ShootRequest,
    ) -> Result<ShootResponse, GenerationError> {
        let url = request.product_image_url.trim();
        let seed = call_with_retry(
            "seed.fetch",
            self.policy.seed_fetch_timeout,
            &self.policy.retry,
            || fetch_seed_image(&self.http, url),
        )
        .await?;

        let prompt = prompts::shoot_prompt(request);
        let asset = self
            .invoke_model(&prompt, &GenerateOptions::mixed(seed))
            .await?;
        if let Some(text) = asset.text.as_deref().filter(|text| !text.trim().is_empty()) {
            info!("Shoot model commentary: {}", truncate_for_log(text, 500));
        }
        let image = require_image(asset)?;
        let generated_product_image_url = self.host_image(&image, SHOOT_LABEL).await?;
        Ok(ShootResponse {
            generated_product_image_url,
        })
    }

    pub async fn generate_product_keywords(
        &self,
        request: &ProductKeywordsRequest,
    ) -> Result<KeywordsResponse, GenerationError> {
        let prompt = prompts::keywords_prompt(request);
        let asset = self.invoke_model(&prompt, &GenerateOptions::text()).await?;
        let raw = require_text(asset)?;
        let keywords = hashtags::normalize_hashtags(raw.trim());
        if keywords.is_empty() {
            return Err(GenerationError::MalformedResponse(format!(
                "no hashtags in model output: {}",
                truncate_for_log(&raw, 200)
            )));
        }
        Ok(KeywordsResponse { keywords })
    }

    pub async fn generate_product_description(
        &self,
        request: &ProductDescriptionRequest,
    ) -> Result<DescriptionResponse, GenerationError> {
        let prompt = prompts::product_description_prompt(request);
        self.generate_markdown(&prompt, true).await
    }
}

fn require_text(asset: GeneratedAsset) -> Result<String, GenerationError> {
    asset
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| GenerationError::MalformedResponse("model returned no text".to_string()))
}

fn require_image(asset: GeneratedAsset) -> Result<GeneratedImage, GenerationError> {
    asset
        .image
        .filter(|image| !image.bytes.is_empty())
        .ok_or_else(|| GenerationError::MalformedResponse("model returned no image".to_string()))
}
