// CLI configuration: one JSON file under the user config dir, every field
// optional with working local defaults (Ollama for both completion and
// embeddings). Command-line flags and environment variables override it.

use std::path::PathBuf;

use kubesage_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Completion provider base URL.
    pub base_url: String,
    /// Completion model name.
    pub model: String,
    /// Bearer token; empty for local providers.
    pub api_key: String,
    /// Embedding API base URL.
    pub embedding_base_url: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Default namespace for new sessions.
    pub namespace: String,
    /// kubectl binary to invoke.
    pub kubectl_binary: String,
    /// Engine database path; empty means the platform data dir.
    pub db_path: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            base_url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
            api_key: String::new(),
            embedding_base_url: "http://localhost:11434".into(),
            embedding_model: "nomic-embed-text".into(),
            namespace: "default".into(),
            kubectl_binary: "kubectl".into(),
            db_path: String::new(),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kubesage")
        .join("config.json")
}

impl CliConfig {
    /// Load the config file, falling back to defaults when it is missing.
    /// A present-but-broken file is an error: silently ignoring it would
    /// hide typos in provider settings.
    pub fn load() -> EngineResult<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(CliConfig::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("cannot read {:?}: {}", path, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("invalid config {:?}: {}", path, e)))
    }

    /// Write the current values to the config file, creating parents.
    pub fn save(&self) -> EngineResult<PathBuf> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::Config(format!("cannot create {:?}: {}", parent, e)))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text)
            .map_err(|e| EngineError::Config(format!("cannot write {:?}: {}", path, e)))?;
        Ok(path)
    }
}
