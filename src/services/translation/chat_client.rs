// Chat-completions translation client
// Speaks the OpenAI-compatible /v1/chat/completions API.
// One attempt per call: failures are reported to the caller, never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::TranslationConfig;
use crate::core::errors::{TranslateResult, TranslationError};
use crate::services::translation::TranslationBackend;

/// Fixed translator persona sent as the system message
const SYSTEM_PERSONA: &str =
    "You are a professional Japanese-English manga translator. Translate faithfully.";

/// Chat-completions client used as the translation backend
pub struct ChatTranslationClient {
    api_key: Option<String>,
    api_url: String,
    model: String,
    temperature: f32,
    target_language: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatTranslationClient {
    pub fn new(config: &TranslationConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            target_language: config.target_language.clone(),
            http_client,
        })
    }

    /// Cache namespace: a translation is only reusable for the same model and target
    pub fn cache_namespace(&self) -> String {
        format!("{}:{}", self.model, self.target_language)
    }

    fn build_request(&self, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PERSONA.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Translate this manga/dialogue text to {}: '{}'",
                        self.target_language, text
                    ),
                },
            ],
            temperature: self.temperature,
        }
    }
}

/// Pull the first choice's content out of a chat-completions reply
fn extract_translation(body: &str) -> TranslateResult<String> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TranslationError::InvalidResponse("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let translated = content.trim();
    if translated.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(translated.to_string())
}

#[async_trait]
impl TranslationBackend for ChatTranslationClient {
    #[instrument(skip(self, text), fields(model = %self.model, chars = text.chars().count()))]
    async fn translate(&self, text: &str) -> TranslateResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(TranslationError::NotConfigured)?;

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&self.build_request(text))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranslationError::Backend {
                status: status.as_u16(),
                message: body,
            });
        }

        let translated = extract_translation(&body)?;
        debug!("Translated {:?} -> {:?}", text, translated);
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn test_request_carries_persona_and_temperature() {
        let client = ChatTranslationClient::new(&Config::default().translation).unwrap();
        let request = client.build_request("こんにちは");

        assert_eq!(request.model, "gpt-4-1106-preview");
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, SYSTEM_PERSONA);
        assert_eq!(
            request.messages[1].content,
            "Translate this manga/dialogue text to English: 'こんにちは'"
        );
    }

    #[test]
    fn test_extract_translation_trims() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello!\n"}}]}"#;
        assert_eq!(extract_translation(body).unwrap(), "Hello!");
    }

    #[test]
    fn test_extract_translation_errors() {
        assert!(matches!(
            extract_translation(r#"{"choices":[]}"#),
            Err(TranslationError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_translation(r#"{"choices":[{"message":{"content":"   "}}]}"#),
            Err(TranslationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_translation(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(TranslationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_translation("quota exceeded"),
            Err(TranslationError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = ChatTranslationClient::new(&Config::default().translation).unwrap();
        let err = client.translate("テスト").await.unwrap_err();
        assert!(matches!(err, TranslationError::NotConfigured));
    }
}
