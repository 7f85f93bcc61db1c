use std::collections::HashSet;

pub fn normalize_hashtags(raw: &str) -> Vec<String> {
    let tokens: Vec<&str> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect();
    let tagged_only = tokens.iter().any(|token| token.contains('#'));

    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| !tagged_only || token.contains('#'))
        .filter_map(|token| {
            let body: String = token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .flat_map(char::to_lowercase)
                .collect();
            (!body.is_empty()).then(|| format!("#{body}"))
        })
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
