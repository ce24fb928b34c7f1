use crate::domain::analysis::AnalysisResponse;
use crate::domain::settings::{ApiConfig, PromptInputs};
use crate::llm::chat::Transport;
use crate::llm::error::AnalysisError;
use crate::llm::{json, prompt, CompletionRequest, LlmClient};
use chrono::Datelike;

/// Builds both prompts, calls the model once, and parses its completion.
pub async fn run_analysis<C>(
    client: &C,
    config: &ApiConfig,
    inputs: &PromptInputs,
    current_year: i32,
) -> Result<AnalysisResponse, AnalysisError>
where
    C: LlmClient + ?Sized,
{
    let req = CompletionRequest {
        model: config.model.clone(),
        system_prompt: prompt::build_system_prompt(config, current_year),
        user_prompt: prompt::build_user_prompt(inputs),
    };

    let provider = client.provider();
    let started = std::time::Instant::now();
    let text = client.complete(req).await?;
    tracing::info!(
        provider = provider.key(),
        model = %config.model,
        ticker = %inputs.ticker,
        completion_len = text.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "completion received"
    );

    json::parse_analysis(&text).map_err(|e| e.with_provider(provider))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Analyzing,
    Ready(AnalysisResponse),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to analyze (blank ticker).
    Ignored,
    /// A request is already in flight.
    Busy,
    /// No key; the caller should send the user to configuration.
    NeedsConfiguration,
    Completed,
    Failed,
}

/// One person's working session: configuration, form inputs and the latest result.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    pub config: ApiConfig,
    pub inputs: PromptInputs,
    state: SessionState,
}

impl AnalysisSession {
    pub fn new(config: ApiConfig, inputs: PromptInputs) -> Self {
        Self {
            config,
            inputs,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn result(&self) -> Option<&AnalysisResponse> {
        match &self.state {
            SessionState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.state, SessionState::Analyzing)
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Runs one analysis against the configured provider through `transport`.
    pub async fn submit(&mut self, transport: &Transport) -> SubmitOutcome {
        self.submit_with(|config| transport.connect(config)).await
    }

    /// Runs one analysis with a client built by `connect` once the guards pass.
    pub async fn submit_with<F, C>(&mut self, connect: F) -> SubmitOutcome
    where
        F: FnOnce(&ApiConfig) -> Result<C, AnalysisError>,
        C: LlmClient,
    {
        if self.inputs.ticker.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.is_analyzing() {
            return SubmitOutcome::Busy;
        }
        if !self.config.has_api_key() {
            let err = AnalysisError::MissingCredential {
                provider: self.config.provider,
            };
            tracing::warn!(error = %err, "analysis blocked until a key is configured");
            self.state = SessionState::Failed(err.user_message());
            return SubmitOutcome::NeedsConfiguration;
        }

        self.state = SessionState::Analyzing;
        let current_year = chrono::Local::now().year();

        let result = match connect(&self.config) {
            Ok(client) => run_analysis(&client, &self.config, &self.inputs, current_year).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(analysis) => {
                self.state = SessionState::Ready(analysis);
                SubmitOutcome::Completed
            }
            Err(err) => {
                tracing::error!(stage = err.stage(), error = %err, ticker = %self.inputs.ticker, "analysis failed");
                self.state = SessionState::Failed(err.user_message());
                if err.is_credential() {
                    SubmitOutcome::NeedsConfiguration
                } else {
                    SubmitOutcome::Failed
                }
            }
        }
    }
}
