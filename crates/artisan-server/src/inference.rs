//! Client for an OpenAI-compatible chat completions API, used to suggest
//! custom product compositions from a client's free-text preferences.

use std::time::Duration;

use artisan_core::IngredientKind;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference API returned status {0}")]
    Status(u16),

    #[error("inference API response is missing {0}")]
    Malformed(&'static str),

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Ingredient names suggested by the model, one field per kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Suggestion {
    pub mold: String,
    pub color: String,
    #[serde(alias = "scent")]
    pub aroma: String,
    pub essences: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

impl Suggestion {
    /// Every suggested name paired with the kind it was suggested for.
    #[must_use]
    pub fn picks(&self) -> Vec<(IngredientKind, &str)> {
        let mut picks = vec![
            (IngredientKind::Mold, self.mold.as_str()),
            (IngredientKind::Color, self.color.as_str()),
            (IngredientKind::Aroma, self.aroma.as_str()),
        ];
        picks.extend(
            self.essences
                .iter()
                .map(|e| (IngredientKind::Essence, e.as_str())),
        );
        picks
    }
}

/// An ingredient the model may choose from.
#[derive(Debug, Clone, Copy)]
pub struct IngredientOption<'a> {
    pub kind: IngredientKind,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

pub struct InferenceClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    model: String,
}

impl InferenceClient {
    /// # Errors
    ///
    /// Returns [`InferenceError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`InferenceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("artisan/0.1 (custom-product-recommendation)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|_| InferenceError::InvalidBaseUrl(base_url.to_owned()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.map(ToOwned::to_owned),
            model: model.to_owned(),
        })
    }

    /// Ask the model for one ingredient combination from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] on transport failure, a non-2xx status, or
    /// a reply that is not the expected JSON object.
    pub async fn suggest(
        &self,
        category_name: &str,
        options: &[IngredientOption<'_>],
        preferences: &str,
    ) -> Result<Suggestion, InferenceError> {
        let url = self
            .base_url
            .join("v1/chat/completions")
            .map_err(|_| InferenceError::InvalidBaseUrl(self.base_url.to_string()))?;

        let req_body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": user_prompt(category_name, options, preferences) }
            ],
            "temperature": 0.4
        });

        let mut request = self.client.post(url).json(&req_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(InferenceError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        let content = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .ok_or(InferenceError::Malformed("choices[0].message.content"))?;

        parse_suggestion(content)
    }
}

fn system_prompt() -> &'static str {
    "You design artisanal soaps and candles. Pick exactly one mold, one color, \
     one aroma and two different essences from the ingredient list you are given. \
     Use the ingredient names exactly as listed. Reply with a JSON object with keys: \
     mold, color, aroma, essences (array of two names), explanation."
}

fn user_prompt(category_name: &str, options: &[IngredientOption<'_>], preferences: &str) -> String {
    let mut prompt = format!("Category: {category_name}\nAvailable ingredients:\n");
    for option in options {
        prompt.push_str(&format!("- [{}] {}", option.kind, option.name));
        if let Some(desc) = option.description.filter(|d| !d.trim().is_empty()) {
            prompt.push_str(&format!(": {}", desc.trim()));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("\nClient preferences: {}", preferences.trim()));
    prompt
}

/// Parse the model's reply, tolerating a surrounding Markdown code fence.
fn parse_suggestion(content: &str) -> Result<Suggestion, InferenceError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim()).map_err(|e| InferenceError::Deserialize {
        context: "chat completion content".to_string(),
        source: e,
    })
}

#[cfg(test)]
#[path = "inference_test.rs"]
mod tests;
