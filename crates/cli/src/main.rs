use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aether_core::config::Settings;
use aether_core::dashboard::{render_html, render_text, Dashboard, DashboardOptions};
use aether_core::domain::analysis::AnalysisResponse;
use aether_core::domain::settings::{ApiConfig, Complexity, GoalOption, Language, PromptInputs};
use aether_core::llm::chat::Transport;
use aether_core::llm::Provider;
use aether_core::report::{generate_report, report_file_name, ReportInput};
use aether_core::session::{AnalysisSession, SessionState, SubmitOutcome};

#[derive(Debug, Parser)]
#[command(name = "aether", about = "Equity research briefs from a ticker and a thesis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask the configured model for an analysis and write the artifacts.
    Analyze(AnalyzeArgs),
    /// Render a saved analysis (or raw completion) without calling a model.
    Render(RenderArgs),
    /// List the preset strategy goals accepted by --goal.
    Goals {
        #[arg(long)]
        language: Option<Language>,
    },
}

#[derive(Debug, clap::Args)]
struct AnalyzeArgs {
    #[arg(long)]
    ticker: String,

    #[arg(long)]
    thesis: Option<String>,

    /// Preset key (see `aether goals`) or free text. Defaults to "Long-term compounding".
    #[arg(long)]
    goal: Option<String>,

    /// openai, perplexity or openrouter. Overrides AETHER_PROVIDER.
    #[arg(long)]
    provider: Option<Provider>,

    #[arg(long)]
    model: Option<String>,

    /// technical or simple.
    #[arg(long)]
    complexity: Option<Complexity>,

    /// Key for the selected provider. Overrides the provider's environment variable.
    #[arg(long)]
    api_key: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, clap::Args)]
struct RenderArgs {
    /// JSON file holding an analysis, or a raw completion with --raw.
    #[arg(long)]
    input: PathBuf,

    /// Treat the input as an unprocessed model completion.
    #[arg(long)]
    raw: bool,

    #[arg(long)]
    ticker: String,

    #[arg(long)]
    thesis: Option<String>,

    #[arg(long)]
    goal: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, clap::Args)]
struct OutputArgs {
    /// en or es. Overrides AETHER_LANGUAGE.
    #[arg(long)]
    language: Option<Language>,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write an HTML dashboard.
    #[arg(long)]
    html: bool,

    /// Skip the PDF report.
    #[arg(long)]
    no_pdf: bool,

    /// Also write the parsed analysis as JSON.
    #[arg(long)]
    json: bool,

    /// Issue date printed on the report cover (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    issued: Option<chrono::NaiveDate>,
}

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

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze(args) => analyze(&settings, args).await,
        Command::Render(args) => render(&settings, args),
        Command::Goals { language } => {
            print!("{}", goal_listing(language.unwrap_or_default()));
            Ok(())
        }
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "aether run failed");
    }
    result
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

fn prompt_inputs(ticker: &str, thesis: Option<String>, goal: Option<String>) -> PromptInputs {
    PromptInputs {
        ticker: ticker.trim().to_uppercase(),
        thesis: thesis.unwrap_or_default(),
        goal: PromptInputs::resolve_goal(goal.as_deref()),
    }
}

fn goal_listing(language: Language) -> String {
    let labels = aether_core::i18n::labels(language);
    GoalOption::ALL
        .into_iter()
        .map(|goal| format!("{:<10}{}\n", goal.key(), labels.goal_option(goal)))
        .collect()
}

/// Environment settings first, then command-line overrides.
fn resolve_config(settings: &Settings, args: &AnalyzeArgs) -> anyhow::Result<ApiConfig> {
    let mut config = settings.api_config()?;

    if let Some(provider) = args.provider.filter(|p| *p != config.provider) {
        config = config.with_provider(provider);
        if let Some(key) = settings.api_key(provider) {
            config.api_key = key.trim().to_string();
        }
    }
    if let Some(model) = &args.model {
        config.model = model.trim().to_string();
    }
    if let Some(language) = args.output.language {
        config.language = language;
    }
    if let Some(complexity) = args.complexity {
        config.complexity = complexity;
    }
    if let Some(key) = &args.api_key {
        config.api_key = key.trim().to_string();
    }
    Ok(config)
}

async fn analyze(settings: &Settings, args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = resolve_config(settings, &args)?;
    let labels = aether_core::i18n::labels(config.language);
    let inputs = prompt_inputs(&args.ticker, args.thesis.clone(), args.goal.clone());
    let language = config.language;
    let provider = config.provider;

    tracing::info!(
        ticker = %inputs.ticker,
        provider = provider.display_name(),
        model = %config.model,
        "starting analysis"
    );

    let transport = Transport::from_settings(settings)?;
    let mut session = AnalysisSession::new(config, inputs);
    let outcome = session.submit(&transport).await;

    let analysis = match (outcome, session.state()) {
        (SubmitOutcome::Completed, SessionState::Ready(analysis)) => analysis.clone(),
        (SubmitOutcome::Ignored, _) => anyhow::bail!("--ticker must not be blank"),
        (SubmitOutcome::NeedsConfiguration, _) => anyhow::bail!(
            "{} Set {} or pass --api-key.",
            labels.failure_message(session.error()),
            provider.api_key_env()
        ),
        (_, SessionState::Failed(message)) => {
            anyhow::bail!("{}", labels.failure_message(Some(message)))
        }
        (outcome, state) => anyhow::bail!("analysis ended as {outcome:?} with state {state:?}"),
    };

    write_outputs(&analysis, &session.inputs, language, &args.output)
}

fn render(settings: &Settings, args: RenderArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let analysis: AnalysisResponse = if args.raw {
        aether_core::llm::json::parse_analysis(&text)
            .with_context(|| format!("{} is not a parseable completion", args.input.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("{} is not an analysis document", args.input.display()))?
    };

    let language = match args.output.language {
        Some(language) => language,
        None => settings.api_config()?.language,
    };
    let inputs = prompt_inputs(&args.ticker, args.thesis, args.goal);
    write_outputs(&analysis, &inputs, language, &args.output)
}

fn artifact_path(dir: &Path, ticker: &str, suffix: &str) -> PathBuf {
    let stem = match ticker.trim() {
        "" => "analysis",
        t => t,
    };
    dir.join(format!("{stem}-{suffix}"))
}

fn write_outputs(
    analysis: &AnalysisResponse,
    inputs: &PromptInputs,
    language: Language,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&output.out_dir)
        .with_context(|| format!("failed to create {}", output.out_dir.display()))?;

    let options = DashboardOptions {
        localized_units: true,
        info_tooltips: output.html,
        pdf_export: !output.no_pdf,
    };

    if !output.no_pdf {
        let issued = output
            .issued
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let bytes = generate_report(&ReportInput {
            analysis,
            inputs,
            language,
            issued,
        })?;
        let path = output.out_dir.join(report_file_name(&inputs.ticker));
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    if output.html {
        let view = Dashboard::build(analysis, inputs, language, options);
        let path = artifact_path(&output.out_dir, &inputs.ticker, "dashboard.html");
        std::fs::write(&path, render_html(&view))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "dashboard written");
    }

    if output.json {
        let path = artifact_path(&output.out_dir, &inputs.ticker, "analysis.json");
        let body = serde_json::to_string_pretty(analysis)?;
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "analysis json written");
    }

    let view = Dashboard::build(analysis, inputs, language, options);
    println!("{}", render_text(&view));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn analyze_flags_parse_into_typed_values() {
        let cli = parse(&[
            "aether", "analyze", "--ticker", "nvda", "--provider", "perplexity", "--language", "es",
            "--complexity", "simple", "--html", "--no-pdf", "--issued", "2026-10-18",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.provider, Some(Provider::Perplexity));
        assert_eq!(args.output.language, Some(Language::Es));
        assert_eq!(args.complexity, Some(Complexity::Simple));
        assert!(args.output.html && args.output.no_pdf && !args.output.json);
        assert_eq!(args.output.out_dir, PathBuf::from("."));
        assert_eq!(
            args.output.issued,
            chrono::NaiveDate::from_ymd_opt(2026, 10, 18)
        );
    }

    #[test]
    fn goals_lists_localized_presets_by_key() {
        let cli = parse(&["aether", "goals", "--language", "es"]);
        let Command::Goals { language } = cli.command else {
            panic!("expected goals");
        };
        let listing = goal_listing(language.unwrap_or_default());
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "value     Value Investing (Largo Plazo)");
        assert!(lines[2].starts_with("bearish") && lines[2].ends_with("Short / Bajista"));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["aether", "analyze", "--ticker", "X", "--provider", "bedrock"]).is_err());
    }

    #[test]
    fn command_line_overrides_environment() {
        let settings = Settings {
            openai_api_key: Some("env-openai".to_string()),
            openrouter_api_key: Some("env-or".to_string()),
            ..Settings::default()
        };

        let cli = parse(&["aether", "analyze", "--ticker", "NVDA", "--provider", "openai"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = resolve_config(&settings, &args).unwrap();
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.model, "gpt-5.1");
        assert_eq!(config.api_key, "env-openai");

        let cli = parse(&["aether", "analyze", "--ticker", "NVDA", "--api-key", "flag-key", "--model", "google/gemma-3-27b-it"]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = resolve_config(&settings, &args).unwrap();
        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.api_key, "flag-key");
        assert_eq!(config.model, "google/gemma-3-27b-it");
    }

    #[test]
    fn inputs_normalize_ticker_and_goal() {
        let inputs = prompt_inputs(" nvda ", None, Some("  ".to_string()));
        assert_eq!(inputs.ticker, "NVDA");
        assert_eq!(inputs.thesis, "");
        assert_eq!(inputs.goal, aether_core::domain::settings::DEFAULT_GOAL);

        let preset = prompt_inputs("NVDA", None, Some("bearish".to_string()));
        assert_eq!(preset.goal, "Bearish");
        assert_eq!(
            artifact_path(Path::new("out"), "", "dashboard.html"),
            PathBuf::from("out/analysis-dashboard.html")
        );
    }

    #[test]
    fn render_writes_report_and_dashboard_from_a_raw_completion() {
        let dir = std::env::temp_dir().join(format!("aether-render-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("completion.txt");
        std::fs::write(
            &input,
            "<think>draft</think>```json\n{\"verdict\":\"BEARISH\",\"confidence\":\"Low\",\"summary\":[\"Margins compress\"]}\n```",
        )
        .unwrap();

        let cli = parse(&[
            "aether",
            "render",
            "--raw",
            "--input",
            input.to_str().unwrap(),
            "--ticker",
            "XYZ",
            "--html",
            "--json",
            "--language",
            "en",
            "--out-dir",
            dir.to_str().unwrap(),
        ]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        render(&Settings::default(), args).unwrap();

        assert!(std::fs::read(dir.join("XYZ-report.pdf")).unwrap().starts_with(b"%PDF"));
        let html = std::fs::read_to_string(dir.join("XYZ-dashboard.html")).unwrap();
        assert!(html.contains("badge bearish"));
        assert!(html.contains("href=\"XYZ-report.pdf\""));
        let json = std::fs::read_to_string(dir.join("XYZ-analysis.json")).unwrap();
        assert!(json.contains("\"confidence\": \"Low\""));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
