// Kubesage Engine — OpenAI-Compatible Provider
// Handles: OpenAI, Ollama, OpenRouter, and any OpenAI-compatible REST API.
// One blocking (non-streaming) chat-completions call per parse; the parser
// needs the whole JSON object before it can decode anyway.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::CompletionPort;
use crate::atoms::types::{CompletionOptions, Message, ProviderConfig};

pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.kind.default_base_url().to_string());
        OpenAiCompatProvider {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn format_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect()
    }

    fn build_body(&self, messages: &[Message], options: &CompletionOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": Self::format_messages(messages),
            "stream": false,
        });
        if let Some(t) = options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(m) = options.max_tokens {
            body["max_tokens"] = json!(m);
        }
        if let Some(p) = options.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(p) = options.frequency_penalty {
            body["frequency_penalty"] = json!(p);
        }
        if let Some(p) = options.presence_penalty {
            body["presence_penalty"] = json!(p);
        }
        if !options.stop.is_empty() {
            body["stop"] = json!(options.stop);
        }
        body
    }
}

#[async_trait]
impl CompletionPort for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        if !messages.iter().any(|m| matches!(m.role, crate::atoms::types::Role::System))
            || !messages.iter().any(|m| matches!(m.role, crate::atoms::types::Role::User))
        {
            return Err(EngineError::completion(
                self.name(),
                "at least one system and one user message required",
            ));
        }

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_body(messages, options);
        debug!("[provider] POST {} model={}", url, self.model);

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let resp = tokio::select! {
            r = request.send() => r?,
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::completion(
                self.name(),
                format!("{} — {}", status, text),
            ));
        }

        let v: Value = tokio::select! {
            r = resp.json::<Value>() => r?,
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                EngineError::completion(self.name(), "no choices[0].message.content in response")
            })?
            .to_string();

        if let Some(usage) = v.get("usage") {
            info!(
                "[provider] completion ok: {} prompt + {} completion tokens",
                usage["prompt_tokens"].as_u64().unwrap_or(0),
                usage["completion_tokens"].as_u64().unwrap_or(0),
            );
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::ProviderKind;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(&ProviderConfig {
            kind: ProviderKind::Ollama,
            api_key: String::new(),
            base_url: None,
            model: "llama3".into(),
        })
    }

    #[test]
    fn body_carries_all_sampling_options() {
        let p = provider();
        let opts = CompletionOptions {
            temperature: Some(0.1),
            max_tokens: Some(512),
            top_p: Some(0.9),
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
            stop: vec!["```".into()],
        };
        let body = p.build_body(&[Message::system("s"), Message::user("u")], &opts);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["temperature"], 0.1);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["top_p"], 0.9);
        assert_eq!(body["stop"][0], "```");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn body_omits_unset_options() {
        let p = provider();
        let body = p.build_body(&[Message::user("u")], &CompletionOptions::default());
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stop").is_none());
    }

    #[tokio::test]
    async fn rejects_missing_system_message() {
        let p = provider();
        let cancel = CancellationToken::new();
        let err = p
            .complete(&[Message::user("u")], &CompletionOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Completion { .. }));
    }
}
