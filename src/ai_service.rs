use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

/// External text-completion provider: one prompt in, one completion out.
/// Single attempt per call; failures surface to the caller unretried.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<AIMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AIMessage,
}

/// -----------------------------
/// AI client (Groq / OpenAI compatible)
/// -----------------------------
pub struct AIService {
    client: Client,
    model: String,
    api_key: String,
}

impl AIService {
    pub fn new(model: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl CompletionService for AIService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GroqRequest {
            model: self.model.clone(),
            messages: vec![AIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.7,
            max_tokens: 500,
        };

        let response = self
            .client
            .post("https://api.groq.com/openai/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("User-Agent", "genai-chat/1.0")
            .json(&request)
            .send()
            .await
            .context("AI request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("AI API error {}: {}", status, body);
            anyhow::bail!("AI API returned status {}", status);
        }

        let ai_response: GroqResponse = response
            .json()
            .await
            .context("Failed to parse AI response JSON")?;

        ai_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("No AI response choices"))
    }
}
