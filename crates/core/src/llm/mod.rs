pub mod chat;
pub mod error;
pub mod json;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chat-completions vendor. All three speak the OpenAI wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Perplexity,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAI, Provider::Perplexity, Provider::OpenRouter];

    pub fn key(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Perplexity => "perplexity",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Perplexity => "Perplexity AI",
            Provider::OpenRouter => "OpenRouter",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/chat/completions",
            Provider::Perplexity => "https://api.perplexity.ai/chat/completions",
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            Provider::OpenAI => &["gpt-5.1", "gpt-5-mini", "gpt-4o"],
            Provider::Perplexity => &["sonar-pro", "sonar-reasoning-pro"],
            Provider::OpenRouter => &[
                "x-ai/grok-4.1-fast:free",
                "perplexity/sonar-deep-research",
                "openai/gpt-4o",
                "google/gemma-3-27b-it",
                "anthropic/claude-sonnet-4.5",
            ],
        }
    }

    pub fn default_model(self) -> &'static str {
        self.models()[0]
    }

    /// Environment variable holding this provider's key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Perplexity => "PERPLEXITY_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.key() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown provider: {s} (expected openai, perplexity or openrouter)"))
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the raw text of the first completion choice.
    async fn complete(&self, req: CompletionRequest) -> Result<String, error::AnalysisError>;
}
