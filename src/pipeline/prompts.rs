use crate::schema::present;
use crate::schema::{
    ProductDescriptionRequest, ProductKeywordsRequest, ProfileBackgroundRequest,
    ProfileDescriptionRequest, ShootRequest,
};

pub const BACKGROUND_FALLBACK: &str = "A professional background image";

pub const PROFILE_DESCRIPTION_FALLBACK: &str = "Create a professional and engaging profile \
description for an artisan. Make it appealing for an AI marketplace where customers look for \
unique and authentic crafts. Format the output using markdown.";

pub const SHOOT_FALLBACK: &str = "Transform this product into a professional studio photograph. \
Keep it fully intact and realistic, apply soft, natural lighting, and use a clean, neutral background.";

pub const KEYWORDS_FALLBACK: &str = "Generate Instagram/Tumblr style hashtags for artisan \
marketing. Prefix every keyword with '#', no spaces, only lowercase. Return only the hashtags \
separated by spaces.";

pub const PRODUCT_DESCRIPTION_FALLBACK: &str = "Write a **Markdown formatted** product \
description for marketing in 3-4 sentences highlighting craftsmanship, uniqueness, and cultural value.";

fn trimmed(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn detail_lines(prefix: &str, fields: &[(&str, Option<&str>)]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|(label, value)| value.map(|value| format!("{prefix}{label}: {value}")))
        .collect()
}

pub fn background_prompt(request: &ProfileBackgroundRequest) -> String {
    let mut clauses = Vec::new();
    if let Some(profession) = trimmed(&request.profession) {
        clauses.push(format!("A professional {profession}"));
    }
    if let Some(location) = trimmed(&request.location) {
        clauses.push(format!("set in {location}"));
    }
    if let Some(background) = present(&request.background) {
        clauses.push(format!("with a {background} background"));
    }
    if let Some(experience) = present(&request.experience) {
        clauses.push(format!("showcasing {experience} of experience"));
    }
    if let Some(description) = present(&request.description) {
        clauses.push(format!("depicting {description}"));
    }
    if let Some(custom) = present(&request.custom_request) {
        clauses.push(custom.to_string());
    }

    if clauses.is_empty() {
        return BACKGROUND_FALLBACK.to_string();
    }
    clauses.join(", ")
}

pub fn profile_description_prompt(request: &ProfileDescriptionRequest) -> String {
    let details = detail_lines(
        "- ",
        &[
            ("Profession", trimmed(&request.profession)),
            ("Location", trimmed(&request.location)),
            ("Background", present(&request.background)),
            ("Experience", present(&request.experience)),
        ],
    );
    let custom = present(&request.custom_request);
    if details.is_empty() && custom.is_none() {
        return PROFILE_DESCRIPTION_FALLBACK.to_string();
    }

    let mut prompt = String::from(
        "Create a professional and engaging profile description for an artisan.",
    );
    if !details.is_empty() {
        prompt.push_str(" The artisan's details are:\n");
        prompt.push_str(&details.join("\n"));
    }
    prompt.push_str(
        "\n\nMake it appealing for an AI marketplace where customers look for unique and authentic crafts.\n\
         Format the output using markdown.",
    );
    if let Some(custom) = custom {
        prompt.push_str("\nAdditional request: ");
        prompt.push_str(custom);
    }
    prompt
}

pub fn shoot_prompt(request: &ShootRequest) -> String {
    let Some(art_form) = trimmed(&request.art_form) else {
        return SHOOT_FALLBACK.to_string();
    };

    let mut prompt = format!("Transform this {art_form} into a professional studio photograph. ");
    if let Some(description) = present(&request.product_description) {
        prompt.push_str(&format!("The piece is {description}. "));
    }
    prompt.push_str(&format!(
        "Keep the {art_form} fully intact and realistic. Place it on a subtle, elegant surface \
         with complementary props, such as minimal decorative items that enhance the scene \
         without distracting from the {art_form}. Apply soft, natural lighting to highlight textures and colors. \
         Use a clean, uncluttered, and aesthetically pleasing background, such as a light gradient or soft neutral tones. \
         Enhance colors, contrast, and details to make the {art_form} look high-quality and visually appealing, \
         like a professional product photo."
    ));
    prompt
}

pub fn keywords_prompt(request: &ProductKeywordsRequest) -> String {
    let details = detail_lines(
        "",
        &[
            ("Profession", trimmed(&request.profession)),
            ("Product", trimmed(&request.product_name)),
            ("Artist", trimmed(&request.artist_name)),
            ("Location", trimmed(&request.location)),
        ],
    );
    if details.is_empty() {
        return KEYWORDS_FALLBACK.to_string();
    }

    format!(
        "Generate Instagram/Tumblr style hashtags for artisan marketing.\n{}\n\n\
         Rules:\n\
         - Prefix every keyword with '#'\n\
         - No spaces, only lowercase\n\
         - Make them catchy, aesthetic, and social-media friendly\n\
         - Include product-specific, artist branding, and location-based hashtags\n\
         - Return only the hashtags separated by spaces",
        details.join("\n")
    )
}

pub fn product_description_prompt(request: &ProductDescriptionRequest) -> String {
    let details = detail_lines(
        "",
        &[
            ("Product", trimmed(&request.product_name)),
            ("Profession", trimmed(&request.profession)),
            ("Location", trimmed(&request.location)),
            ("Background/Story", trimmed(&request.background)),
            ("Given Description", trimmed(&request.product_description)),
            ("Custom Request", present(&request.custom_req)),
        ],
    );
    if details.is_empty() {
        return PRODUCT_DESCRIPTION_FALLBACK.to_string();
    }

    format!(
        "Write a **Markdown formatted** product description for marketing.\n\n{}\n\n\
         Guidelines:\n\
         - Use a heading for the product name\n\
         - Use italics/bold for emphasis where needed\n\
         - Write 3-4 sentences highlighting craftsmanship, uniqueness, and cultural value\n\
         - Make it aesthetic and suitable for online stores, blogs, or social media",
        details.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("'{needle}' missing from prompt: {haystack}"))
    }

    fn potter() -> ProfileDescriptionRequest {
        ProfileDescriptionRequest {
            profession: "potter".to_string(),
            location: "Jaipur".to_string(),
            background: Some("20 years in a family workshop".to_string()),
            experience: Some("20 years".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn background_prompt_joins_clauses_in_order() {
        let request = ProfileBackgroundRequest {
            profession: "potter".to_string(),
            location: "Jaipur".to_string(),
            background: Some("terracotta".to_string()),
            experience: Some("20 years".to_string()),
            description: Some("a wheel at dusk".to_string()),
            custom_request: Some("warm tones".to_string()),
        };
        assert_eq!(
            background_prompt(&request),
            "A professional potter, set in Jaipur, with a terracotta background, \
             showcasing 20 years of experience, depicting a wheel at dusk, warm tones"
        );
    }

    #[test]
    fn background_prompt_falls_back_when_everything_is_blank() {
        let request = ProfileBackgroundRequest {
            background: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(background_prompt(&request), BACKGROUND_FALLBACK);
    }

    #[test]
    fn background_prompt_skips_absent_optionals() {
        let request = ProfileBackgroundRequest {
            profession: "weaver".to_string(),
            location: "Kashmir".to_string(),
            ..Default::default()
        };
        assert_eq!(background_prompt(&request), "A professional weaver, set in Kashmir");
    }

    #[test]
    fn profile_prompt_keeps_field_order() {
        let prompt = profile_description_prompt(&potter());
        let profession = position(&prompt, "- Profession: potter");
        let location = position(&prompt, "- Location: Jaipur");
        let background = position(&prompt, "- Background: 20 years in a family workshop");
        let experience = position(&prompt, "- Experience: 20 years");
        assert!(profession < location && location < background && background < experience);
    }

    #[test]
    fn profile_prompt_puts_custom_request_last() {
        let mut request = potter();
        request.custom_request = Some("mention blue pottery".to_string());
        let prompt = profile_description_prompt(&request);
        assert!(position(&prompt, "mention blue pottery") > position(&prompt, "markdown"));
    }

    #[test]
    fn profile_prompt_ignores_previous_descriptions() {
        let mut request = potter();
        request.previous_descriptions = Some(vec!["an older bio".to_string()]);
        assert_eq!(profile_description_prompt(&request), profile_description_prompt(&potter()));
    }

    #[test]
    fn profile_prompt_fallback() {
        let request = ProfileDescriptionRequest::default();
        assert_eq!(profile_description_prompt(&request), PROFILE_DESCRIPTION_FALLBACK);
    }

    #[test]
    fn shoot_prompt_omits_missing_description() {
        let mut request = ShootRequest {
            art_form: "blue pottery vase".to_string(),
            product_image_url: "https://cdn.example.com/vase.png".to_string(),
            product_description: None,
        };
        let prompt = shoot_prompt(&request);
        assert!(prompt.starts_with("Transform this blue pottery vase into"));
        assert!(!prompt.contains("The piece is"));

        request.product_description = Some("hand painted with cobalt glaze".to_string());
        assert!(shoot_prompt(&request).contains("The piece is hand painted with cobalt glaze. "));
    }

    #[test]
    fn shoot_prompt_fallback() {
        assert_eq!(shoot_prompt(&ShootRequest::default()), SHOOT_FALLBACK);
    }

    #[test]
    fn keywords_prompt_lists_every_value() {
        let request = ProductKeywordsRequest {
            profession: "weaver".to_string(),
            product_name: "shawl".to_string(),
            location: "Kashmir".to_string(),
            artist_name: "Asha".to_string(),
        };
        let prompt = keywords_prompt(&request);
        let profession = position(&prompt, "Profession: weaver");
        let product = position(&prompt, "Product: shawl");
        let artist = position(&prompt, "Artist: Asha");
        let location = position(&prompt, "Location: Kashmir");
        assert!(profession < product && product < artist && artist < location);
        assert_eq!(keywords_prompt(&ProductKeywordsRequest::default()), KEYWORDS_FALLBACK);
    }

    #[test]
    fn product_description_prompt_skips_blank_custom_request() {
        let mut request = ProductDescriptionRequest {
            profession: "weaver".to_string(),
            product_name: "shawl".to_string(),
            product_description: "pashmina with sozni embroidery".to_string(),
            custom_req: Some(" ".to_string()),
            location: "Kashmir".to_string(),
            background: "third generation".to_string(),
        };
        let prompt = product_description_prompt(&request);
        assert!(!prompt.contains("Custom Request"));
        assert!(position(&prompt, "Product: shawl") < position(&prompt, "Given Description"));

        request.custom_req = Some("mention winter gifting".to_string());
        assert!(product_description_prompt(&request).contains("Custom Request: mention winter gifting"));
        assert_eq!(
            product_description_prompt(&ProductDescriptionRequest::default()),
            PRODUCT_DESCRIPTION_FALLBACK
        );
    }
}
