//! services/content_service.rs
//! Generación de copy con IA (API compatible con OpenAI chat/completions).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    config::app_config::AiConfig,
    errors::GenerationError,
    models::content_model::{CustomerSummary, GeneratedContent},
};

const GENERATE_SYSTEM_PROMPT: &str = "You are a marketing expert specializing in crafting \
engaging and humorous marketing emails. Write content that is short (under 150 words) and \
sounds like it's written by a funny internet-savvy brand. Include references to modern pop \
culture, Gen Z slang, and emojis. Use the customer data, if provided, to personalize the \
email. Reply ONLY with a JSON object of the form {\"subject\": \"...\", \"body\": \"...\"}.";

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are an expert marketing analyst. You will analyze \
customer purchase history data and generate a summary that identifies key insights and trends.";

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        customer_context: &str,
    ) -> Result<GeneratedContent, GenerationError>;

    async fn summarize(&self, customer_data_text: &str)
        -> Result<CustomerSummary, GenerationError>;
}

#[derive(Clone)]
pub struct HttpContentGenerator {
    config: AiConfig,
    http_client: Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl HttpContentGenerator {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("AI_BASE_URL is not set".into()))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("AI_API_KEY is not set".into()))?;

        let url = format!("{}/chat/completions", base_url);
        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.config.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }))
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse("empty completion".into()))
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(
        &self,
        prompt: &str,
        customer_context: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        let user = format!("{}\n\nPrompt: {}", customer_context, prompt);
        let raw = self.chat(GENERATE_SYSTEM_PROMPT, &user).await?;
        parse_generated(&raw)
    }

    async fn summarize(
        &self,
        customer_data_text: &str,
    ) -> Result<CustomerSummary, GenerationError> {
        let user = format!(
            "Here is the customer purchase history data:\n{}\n\nSummary of customer data:",
            customer_data_text
        );
        let summary = self.chat(SUMMARIZE_SYSTEM_PROMPT, &user).await?;
        Ok(CustomerSummary {
            summary: summary.trim().to_string(),
        })
    }
}

/// Extrae `{subject, body}` de la respuesta del modelo. Tolera bloques ```json.
pub fn parse_generated(raw: &str) -> Result<GeneratedContent, GenerationError> {
    let trimmed = raw.trim();
    let json_text = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => {
            return Err(GenerationError::InvalidResponse(
                "no JSON object in completion".into(),
            ))
        }
    };

    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match (field("subject"), field("body")) {
        (Some(subject), Some(body)) => Ok(GeneratedContent { subject, body }),
        _ => Err(GenerationError::InvalidResponse(
            "completion is missing subject or body".into(),
        )),
    }
}
