use crate::types::{DigestError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// A chat-completion service. The pipeline only ever needs one round trip:
/// system text plus user prompt in, raw assistant text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Groq-hosted chat client (OpenAI-compatible wire format).
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            model,
        }
    }

    /// Read `GROQ_API_KEY` from the environment. A missing key is a fatal
    /// configuration error, raised here so no network call ever starts
    /// without credentials.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GROQ_API_KEY")
            .map_err(|_| DigestError::MissingCredential("GROQ_API_KEY"))?;
        Ok(Self::new(api_key, DEFAULT_MODEL.to_string()))
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.3,
            max_tokens: 4096,
        };

        debug!("Sending chat completion request ({} chars)", user.len());

        let response = self
            .client
            .post(GROQ_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::Chat(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DigestError::Chat("response contained no choices".to_string()))?;

        Ok(content.trim().to_string())
    }
}

/// Models often wrap JSON in a fenced code block despite being told not to.
/// Extract the inner text of a ```json or ``` fence; otherwise return the
/// raw text trimmed. JSON parsing downstream is the failure detector.
pub fn extract_json(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let inner = &raw[start + 7..];
        if let Some(end) = inner.find("```") {
            return inner[..end].trim();
        }
        return inner.trim();
    }
    if let Some(start) = raw.find("```") {
        let inner = &raw[start + 3..];
        if let Some(end) = inner.find("```") {
            return inner[..end].trim();
        }
        return inner.trim();
    }
    raw.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_json_fence() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nHope this helps!";
        assert_eq!(extract_json(raw), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_strips_bare_fence() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_json(raw), "[1, 2, 3]");
    }

    #[test]
    fn extract_json_passes_plain_text_through() {
        assert_eq!(extract_json("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn extract_json_handles_unterminated_fence() {
        assert_eq!(extract_json("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }
}
