// Kubesage Engine — Completion Provider Registry
// AnyProvider wraps Box<dyn CompletionPort> so adding a new provider never
// requires touching the parser — just implement the trait.

pub mod openai;

pub use openai::OpenAiCompatProvider;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::atoms::error::EngineResult;
use crate::atoms::traits::CompletionPort;
use crate::atoms::types::{CompletionOptions, Message, ProviderConfig};

// ── Provider factory ───────────────────────────────────────────────────────

/// Type-erased completion provider. Callers hold `AnyProvider` and call
/// `.complete()` without knowing which concrete backend is in use.
pub struct AnyProvider(Box<dyn CompletionPort>);

impl AnyProvider {
    /// Construct the right concrete provider from a `ProviderConfig`.
    /// Every currently supported backend (OpenAI, Ollama, OpenRouter,
    /// custom base URLs) speaks the OpenAI chat-completions wire format;
    /// a provider with a unique wire format gets its own module and a
    /// match arm here.
    pub fn from_config(config: &ProviderConfig) -> Self {
        AnyProvider(Box::new(OpenAiCompatProvider::new(config)))
    }

    /// Wrap an already-built port. Used by tests to inject mocks.
    pub fn from_port(port: Box<dyn CompletionPort>) -> Self {
        AnyProvider(port)
    }
}

#[async_trait]
impl CompletionPort for AnyProvider {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> EngineResult<String> {
        self.0.complete(messages, options, cancel).await
    }
}
