use crate::llm::Provider;
use std::fmt;

pub const MISSING_KEY_MESSAGE: &str = "API Key missing. Please configure settings.";
pub const INVALID_KEY_MESSAGE: &str = "API Key is not valid. Please configure settings.";
pub const NETWORK_MESSAGE: &str =
    "Network Error (CORS). Direct browser access to this API might be blocked. Try using OpenRouter.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to fetch analysis.";

/// Terminal failure of one analysis request. Nothing is retried.
#[derive(Debug)]
pub enum AnalysisError {
    /// No key configured; raised before any network traffic.
    MissingCredential { provider: Provider },
    /// The key cannot be sent as an HTTP header (control characters, non-ASCII bytes).
    InvalidCredential { provider: Provider, detail: String },
    /// The request never produced an HTTP response.
    Network { provider: Provider, detail: String },
    /// Non-2xx response. `message` is the provider's `error.message` when it sent one.
    Http {
        provider: Provider,
        status: u16,
        message: Option<String>,
    },
    /// The completion could not be turned into an analysis.
    Parse {
        provider: Option<Provider>,
        detail: String,
        raw_output: Option<String>,
    },
}

impl AnalysisError {
    pub fn parse(detail: impl Into<String>, raw_output: Option<String>) -> Self {
        AnalysisError::Parse {
            provider: None,
            detail: detail.into(),
            raw_output,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::MissingCredential { .. } | AnalysisError::InvalidCredential { .. } => {
                "credentials"
            }
            AnalysisError::Network { .. } => "network",
            AnalysisError::Http { .. } => "http",
            AnalysisError::Parse { .. } => "parse",
        }
    }

    /// Whether the fix is in configuration rather than in the request.
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingCredential { .. } | AnalysisError::InvalidCredential { .. }
        )
    }

    /// Message shown to the person who pressed "analyze".
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::MissingCredential { .. } => MISSING_KEY_MESSAGE.to_string(),
            AnalysisError::InvalidCredential { .. } => INVALID_KEY_MESSAGE.to_string(),
            AnalysisError::Network { .. } => NETWORK_MESSAGE.to_string(),
            AnalysisError::Http {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            AnalysisError::Http { status, .. } => format!("API Error: {status}"),
            AnalysisError::Parse { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AnalysisError::Parse { raw_output, .. } => raw_output.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn with_provider(self, provider: Provider) -> Self {
        match self {
            AnalysisError::Parse {
                detail, raw_output, ..
            } => AnalysisError::Parse {
                provider: Some(provider),
                detail,
                raw_output,
            },
            other => other,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingCredential { provider } => {
                write!(f, "no API key configured for provider={}", provider.key())
            }
            AnalysisError::InvalidCredential { provider, detail } => {
                write!(f, "API key for provider={} is not a valid header value: {detail}", provider.key())
            }
            AnalysisError::Network { provider, detail } => {
                write!(f, "request to provider={} failed: {detail}", provider.key())
            }
            AnalysisError::Http {
                provider,
                status,
                message,
            } => write!(
                f,
                "provider={} returned status={status}: {}",
                provider.key(),
                message.as_deref().unwrap_or("<no message>")
            ),
            AnalysisError::Parse {
                provider, detail, ..
            } => match provider {
                Some(p) => write!(f, "completion from provider={} is not valid analysis JSON: {detail}", p.key()),
                None => write!(f, "completion is not valid analysis JSON: {detail}"),
            },
        }
    }
}

impl std::error::Error for AnalysisError {}
