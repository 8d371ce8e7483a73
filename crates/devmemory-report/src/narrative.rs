//! Optional AI narrative via any OpenAI-compatible chat-completions endpoint.
//!
//! The narrative is decoration: callers log a failure and render the report
//! without it.

use std::time::Duration;

use devmemory_core::config::AiConfig;
use devmemory_core::{DailyReport, DevMemoryError, Result};
use serde::Serialize;
use serde_json::{Value, json};

pub struct NarrativeClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl NarrativeClient {
    /// `None` when the narrative is disabled or no endpoint is configured.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        if !config.enabled || config.endpoint.trim().is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Some(Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            api_key: config.api_key.trim().to_string(),
            model: config.model.clone(),
        })
    }

    /// Send one user prompt and return the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DevMemoryError::Http(format!("LLM connection failed ({}): {e}", self.endpoint)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DevMemoryError::Http(format!("LLM API error {status}: {text}")));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| DevMemoryError::Http(e.to_string()))?;
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(DevMemoryError::Http("No content in LLM response".into()));
        }
        Ok(content.to_string())
    }

    /// Best-effort wrapper: any failure is logged and yields `None`.
    pub async fn narrate(&self, prompt: &str) -> Option<String> {
        match self.complete(prompt).await {
            Ok(text) => {
                tracing::info!("🤖 AI narrative generated ({} chars)", text.len());
                Some(text)
            }
            Err(e) => {
                tracing::warn!("⚠️ AI narrative generation failed: {e}");
                None
            }
        }
    }
}

fn data_block<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".into())
}

pub fn daily_prompt(report: &DailyReport) -> String {
    [
        "You are a senior software engineer writing a professional daily standup summary.",
        "",
        "Here is structured data:",
        data_block(report).as_str(),
        "",
        "Write:",
        "- 1 paragraph executive summary",
        "- Bullet list of major contributions",
        "- Clear statement of carry-over work",
        "- Professional tone, no emojis, no exaggeration",
        "- Only use the given data; do not invent metrics",
    ]
    .join("\n")
}

pub fn monthly_prompt<T: Serialize>(summary: &T) -> String {
    [
        "You are a senior software engineer writing a professional monthly report.",
        "",
        "Use only the following structured data:",
        data_block(summary).as_str(),
        "",
        "Write:",
        "1. An executive summary paragraph",
        "2. Main areas of impact",
        "3. Engineering pattern (feature vs bugfix vs refactor ratio)",
        "4. Focus areas for next month",
        "",
        "Do not invent metrics, exaggerate, or use data that is not given.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> AiConfig {
        AiConfig {
            enabled: true,
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            api_key: "sk-test".into(),
            model: "test-model".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_disabled_yields_none() {
        assert!(NarrativeClient::from_config(&AiConfig::default()).is_none());
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Shipped billing.  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = NarrativeClient::from_config(&config(&server)).unwrap();
        assert_eq!(client.complete("prompt").await.unwrap(), "Shipped billing.");
    }

    #[tokio::test]
    async fn test_failures_are_swallowed_by_narrate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = NarrativeClient::from_config(&config(&server)).unwrap();
        assert!(matches!(client.complete("p").await, Err(DevMemoryError::Http(_))));
        assert!(client.narrate("p").await.is_none());
    }
}
