use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aether_core::config::Settings;
use aether_core::dashboard::{render_html, Dashboard, DashboardOptions};
use aether_core::domain::analysis::AnalysisResponse;
use aether_core::domain::settings::{ApiConfig, Language, PromptInputs};
use aether_core::llm::chat::Transport;
use aether_core::report::{generate_report, report_file_name, ReportInput};
use aether_core::session::{AnalysisSession, SessionState, SubmitOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let transport = Transport::from_settings(&settings)?;
    let port = settings.port.unwrap_or(3000);
    let state = AppState {
        transport,
        settings: Arc::new(settings),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .route("/dashboard", post(dashboard))
        .route("/report", post(report))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    transport: Transport,
    settings: Arc<Settings>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    config: Option<ApiConfig>,
    inputs: PromptInputs,
}

/// Uses the request's configuration when given, falling back to the server's own key.
fn resolve_config(settings: &Settings, requested: Option<ApiConfig>) -> anyhow::Result<ApiConfig> {
    let Some(mut config) = requested else {
        return settings.api_config();
    };
    if !config.has_api_key() {
        if let Some(key) = settings.api_key(config.provider) {
            config.api_key = key.trim().to_string();
        }
    }
    Ok(config)
}

fn outcome_status(outcome: SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Completed => StatusCode::OK,
        SubmitOutcome::Ignored => StatusCode::BAD_REQUEST,
        SubmitOutcome::Busy => StatusCode::CONFLICT,
        SubmitOutcome::NeedsConfiguration => StatusCode::UNAUTHORIZED,
        SubmitOutcome::Failed => StatusCode::BAD_GATEWAY,
    }
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let config = resolve_config(&state.settings, req.config)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("{e:#}")))?;

    let labels = aether_core::i18n::labels(config.language);
    let mut inputs = req.inputs;
    inputs.goal = PromptInputs::resolve_goal(Some(inputs.goal.as_str()));

    let mut session = AnalysisSession::new(config, inputs);
    let outcome = session.submit(&state.transport).await;

    match (outcome, session.state()) {
        (SubmitOutcome::Completed, SessionState::Ready(result)) => Ok(Json(result.clone())),
        (SubmitOutcome::Ignored, _) => Err(ApiError::new(
            outcome_status(outcome),
            "ticker is required",
        )),
        (_, SessionState::Failed(message)) => {
            Err(ApiError::new(
                outcome_status(outcome),
                labels.failure_message(Some(message)),
            ))
        }
        (outcome, current) => {
            let err = anyhow::anyhow!("unexpected session state {current:?} after {outcome:?}");
            sentry_anyhow::capture_anyhow(&err);
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    analysis: AnalysisResponse,
    inputs: PromptInputs,
    #[serde(default)]
    language: Language,
    #[serde(default)]
    options: DashboardOptions,
    #[serde(default)]
    issued: Option<NaiveDate>,
}

async fn dashboard(Json(req): Json<RenderRequest>) -> Html<String> {
    let view = Dashboard::build(&req.analysis, &req.inputs, req.language, req.options);
    Html(render_html(&view))
}

async fn report(Json(req): Json<RenderRequest>) -> Result<Response, ApiError> {
    let file_name = report_file_name(&req.inputs.ticker);
    let issued = req
        .issued
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let rendered = tokio::task::spawn_blocking(move || {
        generate_report(&ReportInput {
            analysis: &req.analysis,
            inputs: &req.inputs,
            language: req.language,
            issued,
        })
    })
    .await
    .map_err(anyhow::Error::new)
    .and_then(|r| r);

    let bytes = rendered.map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "report rendering failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to render report")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::llm::Provider;

    #[test]
    fn request_key_wins_and_server_key_fills_blanks() {
        let settings = Settings {
            openai_api_key: Some("server-key".to_string()),
            ..Settings::default()
        };

        let blank = ApiConfig::default().with_provider(Provider::OpenAI);
        let resolved = resolve_config(&settings, Some(blank)).unwrap();
        assert_eq!(resolved.api_key, "server-key");

        let own = ApiConfig {
            api_key: "client-key".to_string(),
            ..ApiConfig::default().with_provider(Provider::OpenAI)
        };
        assert_eq!(resolve_config(&settings, Some(own)).unwrap().api_key, "client-key");
    }

    #[test]
    fn missing_config_uses_environment_defaults() {
        let resolved = resolve_config(&Settings::default(), None).unwrap();
        assert_eq!(resolved.provider, Provider::OpenRouter);
        assert!(!resolved.has_api_key());
    }

    #[test]
    fn outcomes_map_to_http_statuses() {
        assert_eq!(outcome_status(SubmitOutcome::NeedsConfiguration), StatusCode::UNAUTHORIZED);
        assert_eq!(outcome_status(SubmitOutcome::Failed), StatusCode::BAD_GATEWAY);
        assert_eq!(outcome_status(SubmitOutcome::Ignored), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn render_request_defaults_language_and_flags() {
        let req: RenderRequest = serde_json::from_value(serde_json::json!({
            "analysis": {"verdict": "BULLISH"},
            "inputs": {"ticker": "NVDA"},
        }))
        .unwrap();
        assert_eq!(req.language, Language::En);
        assert_eq!(req.options, DashboardOptions::default());
        assert!(req.issued.is_none());
        assert_eq!(req.inputs.goal, "Long-term compounding");
    }
}
