// Kubesage Engine — Embedding Client
// Calls Ollama or an OpenAI-compatible embedding API to produce vector
// representations of text. Used by the retrieval port and the doc indexer.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::atoms::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL for the embedding API (Ollama: http://localhost:11434).
    pub base_url: String,
    /// Embedding model name (e.g. "nomic-embed-text").
    pub model: String,
    /// Bearer token for OpenAI-compatible endpoints; empty for Ollama.
    pub api_key: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            api_key: String::new(),
        }
    }
}

/// Embedding client — tries the Ollama wire format first, then falls back
/// to the OpenAI-compatible /v1/embeddings shape.
pub struct EmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        EmbeddingClient {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Get the embedding vector for a text string.
    pub async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let ollama_err = match self.embed_ollama(text).await {
            Ok(vec) => return Ok(vec),
            Err(e) => e,
        };

        match self.embed_openai(text).await {
            Ok(vec) => Ok(vec),
            Err(openai_err) => Err(EngineError::Retrieval(format!(
                "embedding failed. Ollama: {} | OpenAI: {}",
                ollama_err, openai_err
            ))),
        }
    }

    /// Ollama: POST /api/embed { model, input } → { embeddings: [[f32…]] }.
    async fn embed_ollama(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/api/embed", self.config.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.config.model, "input": text });
        debug!("[retrieval] embed via {}", url);

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Retrieval(format!("Ollama embed {} — {}", status, text)));
        }

        let v: Value = resp.json().await?;

        // { embeddings: [[…]] }, with some versions returning singular
        // { embedding: […] } even on /api/embed.
        if let Some(first) = v["embeddings"].as_array().and_then(|e| e.first()) {
            if let Some(vec) = parse_vector(first) {
                return Ok(vec);
            }
        }
        if let Some(vec) = parse_vector(&v["embedding"]) {
            return Ok(vec);
        }

        Err(EngineError::Retrieval("no embedding array in Ollama response".into()))
    }

    /// OpenAI-compatible: POST /v1/embeddings { model, input }.
    async fn embed_openai(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.config.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.config.model, "input": text });

        let mut request = self.client.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Retrieval(format!("embeddings {} — {}", status, text)));
        }

        let v: Value = resp.json().await?;
        parse_vector(&v["data"][0]["embedding"])
            .ok_or_else(|| EngineError::Retrieval("no data[0].embedding in response".into()))
    }
}

fn parse_vector(v: &Value) -> Option<Vec<f32>> {
    let arr = v.as_array()?;
    let vec: Vec<f32> = arr.iter().filter_map(|x| x.as_f64().map(|f| f as f32)).collect();
    if vec.is_empty() {
        None
    } else {
        Some(vec)
    }
}
