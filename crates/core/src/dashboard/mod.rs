//! Dashboard view model shared by the HTML and terminal renderers.
//!
//! One view with feature flags replaces the per-variant layouts: units, tooltips and the
//! export hint are switched on [`DashboardOptions`].

mod html;
mod text;

pub use html::{escape_html, render_html};
pub use text::render_text;

use serde::{Deserialize, Serialize};

use crate::domain::analysis::{format_multiple, AnalysisResponse};
use crate::domain::settings::{Language, PromptInputs};
use crate::i18n::{self, Labels};
use crate::report::format::format_compact;
use crate::report::report_file_name;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardOptions {
    /// Compact localized units (`60.9B`, `60,9 mil M`) instead of raw figures.
    pub localized_units: bool,
    /// Inline help text next to the chart and valuation matrix.
    pub info_tooltips: bool,
    /// Link to the PDF report written alongside the dashboard.
    pub pdf_export: bool,
}

impl DashboardOptions {
    pub fn all() -> Self {
        Self {
            localized_units: true,
            info_tooltips: true,
            pdf_export: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictTone {
    Bullish,
    Bearish,
    Neutral,
}

impl VerdictTone {
    /// `BULL`/`ALCI` (alcista) read as bullish, `BEAR`/`BAJI` (bajista) as bearish.
    pub fn classify(verdict: &str) -> Self {
        let upper = verdict.to_uppercase();
        if upper.contains("BULL") || upper.contains("ALCI") {
            VerdictTone::Bullish
        } else if upper.contains("BEAR") || upper.contains("BAJI") {
            VerdictTone::Bearish
        } else {
            VerdictTone::Neutral
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            VerdictTone::Bullish => "bullish",
            VerdictTone::Bearish => "bearish",
            VerdictTone::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Buy,
    Sell,
    Neutral,
    /// No action was given.
    Muted,
}

impl ActionClass {
    pub fn css_class(self) -> &'static str {
        match self {
            ActionClass::Buy => "action-buy",
            ActionClass::Sell => "action-sell",
            ActionClass::Neutral => "action-neutral",
            ActionClass::Muted => "action-muted",
        }
    }
}

/// Case-insensitive keyword match on the recommended action, English and Spanish.
pub fn classify_action(action: Option<&str>) -> ActionClass {
    let Some(action) = action.filter(|a| !a.trim().is_empty()) else {
        return ActionClass::Muted;
    };
    let upper = action.to_uppercase();
    if ["BUY", "COMPRA", "COMPRAR"].iter().any(|k| upper.contains(k)) {
        ActionClass::Buy
    } else if ["SELL", "VENTA", "VENDER"].iter().any(|k| upper.contains(k)) {
        ActionClass::Sell
    } else {
        ActionClass::Neutral
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub year: String,
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub revenue_label: String,
    pub ebitda_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationBar {
    pub metric: String,
    pub value_label: String,
    pub peer_label: String,
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationPanel {
    pub action: String,
    pub class: ActionClass,
    pub price_target: String,
    pub allocation_limit: String,
    pub entry_strategy: String,
    pub justification: String,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub ticker: String,
    pub thesis: String,
    pub verdict: String,
    pub tone: VerdictTone,
    pub confidence: String,
    pub chart: Vec<ChartPoint>,
    pub valuation: Vec<ValuationBar>,
    pub sector_context: String,
    pub summary: Vec<String>,
    pub primary_risk: String,
    pub next_catalyst: String,
    pub recommendation: Option<RecommendationPanel>,
    pub export_file: Option<String>,
    pub labels: &'static Labels,
    pub language: Language,
    pub options: DashboardOptions,
}

impl Dashboard {
    pub fn build(
        analysis: &AnalysisResponse,
        inputs: &PromptInputs,
        language: Language,
        options: DashboardOptions,
    ) -> Self {
        let labels = i18n::labels(language);
        let figure = |value: Option<f64>| -> String {
            match value {
                Some(v) if options.localized_units => format_compact(Some(v), language),
                Some(v) if v.is_finite() => format!("{v}"),
                _ => crate::report::format::PLACEHOLDER.to_string(),
            }
        };

        let chart = analysis
            .fundamentals
            .iter()
            .map(|entry| ChartPoint {
                year: entry.year.clone(),
                revenue: entry.revenue,
                ebitda: entry.ebitda,
                revenue_label: figure(entry.revenue),
                ebitda_label: figure(entry.ebitda),
            })
            .collect();

        let valuation = analysis
            .valuation
            .iter()
            .map(|item| ValuationBar {
                metric: item.metric.clone(),
                value_label: format_multiple(item.value),
                peer_label: format!("{}: {}", labels.peer_avg, format_multiple(item.peer_avg)),
                width_pct: item.relative_width_pct(),
            })
            .collect();

        let recommendation = analysis.final_recommendation.as_ref().map(|rec| RecommendationPanel {
            action: rec.action.clone(),
            class: classify_action(Some(&rec.action)),
            price_target: rec.price_target.clone(),
            allocation_limit: rec.allocation_limit.clone(),
            entry_strategy: rec.entry_strategy.clone(),
            justification: rec.justification.clone(),
        });

        let thesis = match inputs.thesis.trim() {
            "" => labels.analysis_fallback.to_string(),
            thesis => thesis.to_string(),
        };

        Self {
            ticker: inputs.ticker.trim().to_string(),
            thesis,
            verdict: analysis.verdict.clone(),
            tone: VerdictTone::classify(&analysis.verdict),
            confidence: analysis.confidence.clone(),
            chart,
            valuation,
            sector_context: analysis.sector_context.clone(),
            summary: analysis.summary.clone(),
            primary_risk: analysis.primary_risk.clone(),
            next_catalyst: analysis.next_catalyst.clone(),
            recommendation,
            export_file: options.pdf_export.then(|| report_file_name(&inputs.ticker)),
            labels,
            language,
            options,
        }
    }
}
