use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "es" | "spanish" | "español" => Ok(Language::Es),
            other => anyhow::bail!("unsupported language: {other} (expected en or es)"),
        }
    }
}

/// Audience the analysis is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Technical,
    Simple,
}

impl FromStr for Complexity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" | "expert" => Ok(Complexity::Technical),
            "simple" | "beginner" => Ok(Complexity::Simple),
            other => anyhow::bail!("unsupported complexity: {other} (expected technical or simple)"),
        }
    }
}

/// Provider/model/key selection for one session.
///
/// The key only ever lives in memory; `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub complexity: Complexity,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenRouter,
            api_key: String::new(),
            model: "openai/gpt-4o".to_string(),
            language: Language::En,
            complexity: Complexity::Technical,
        }
    }
}

impl ApiConfig {
    /// Switches provider, selecting its first model and dropping the previous key.
    pub fn with_provider(self, provider: Provider) -> Self {
        Self {
            provider,
            api_key: String::new(),
            model: provider.default_model().to_string(),
            ..self
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("provider", &self.provider)
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<empty>" })
            .field("model", &self.model)
            .field("language", &self.language)
            .field("complexity", &self.complexity)
            .finish()
    }
}

pub const DEFAULT_GOAL: &str = "Long-term compounding";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInputs {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub thesis: String,
    #[serde(default = "default_goal")]
    pub goal: String,
}

fn default_goal() -> String {
    DEFAULT_GOAL.to_string()
}

impl Default for PromptInputs {
    fn default() -> Self {
        Self {
            ticker: String::new(),
            thesis: String::new(),
            goal: default_goal(),
        }
    }
}

impl PromptInputs {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }
}

/// Preset strategy goals offered next to free-form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalOption {
    ValueInvesting,
    Growth,
    Bearish,
    Income,
}

impl GoalOption {
    pub const ALL: [GoalOption; 4] = [
        GoalOption::ValueInvesting,
        GoalOption::Growth,
        GoalOption::Bearish,
        GoalOption::Income,
    ];

    /// Short name accepted on the command line.
    pub fn key(self) -> &'static str {
        match self {
            GoalOption::ValueInvesting => "value",
            GoalOption::Growth => "growth",
            GoalOption::Bearish => "bearish",
            GoalOption::Income => "income",
        }
    }

    /// Value sent to the model.
    pub fn value(self) -> &'static str {
        match self {
            GoalOption::ValueInvesting => "Value Investing",
            GoalOption::Growth => "Growth",
            GoalOption::Bearish => "Bearish",
            GoalOption::Income => "Income",
        }
    }

    /// Preset named by `goal`, matching either its key or its value.
    pub fn find(goal: &str) -> Option<Self> {
        let goal = goal.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.key().eq_ignore_ascii_case(goal) || g.value().eq_ignore_ascii_case(goal))
    }
}

impl PromptInputs {
    /// Goal sent to the model: a preset's value, free text, or the default when blank.
    pub fn resolve_goal(goal: Option<&str>) -> String {
        match goal.map(str::trim).filter(|g| !g.is_empty()) {
            Some(goal) => GoalOption::find(goal)
                .map(|preset| preset.value().to_string())
                .unwrap_or_else(|| goal.to_string()),
            None => DEFAULT_GOAL.to_string(),
        }
    }
}
