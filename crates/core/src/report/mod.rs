//! Multi-page PDF report: cover, "Intelligence Brief" and "Valuation Playbook".

pub mod canvas;
pub mod chart;
pub mod format;
pub mod lanes;
pub mod layout;
pub mod metrics;
pub mod pdf;

pub use layout::{layout_report, summary_block_height, ReportInput, ReportLayout};

pub fn generate_report(input: &ReportInput<'_>) -> anyhow::Result<Vec<u8>> {
    let layout = layout_report(input);
    let ticker = input.inputs.ticker.trim();
    let title = if ticker.is_empty() {
        "Equity research report".to_string()
    } else {
        format!("{ticker} equity research report")
    };

    let bytes = pdf::write_pdf(&layout.pages, &title)?;
    tracing::info!(
        ticker,
        pages = layout.pages.len(),
        bytes = bytes.len(),
        "report rendered"
    );
    Ok(bytes)
}

/// `{TICKER}-report.pdf`, or `analysis-report.pdf` when no ticker was given.
pub fn report_file_name(ticker: &str) -> String {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        "analysis-report.pdf".to_string()
    } else {
        format!("{ticker}-report.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::AnalysisResponse;
    use crate::domain::settings::{Language, PromptInputs};
    use chrono::NaiveDate;

    #[test]
    fn file_name_falls_back_without_ticker() {
        assert_eq!(report_file_name("NVDA"), "NVDA-report.pdf");
        assert_eq!(report_file_name("  "), "analysis-report.pdf");
    }

    #[test]
    fn renders_three_pages_for_a_full_analysis() {
        let analysis = crate::domain::analysis::tests::nvda();
        let inputs = PromptInputs::new("NVDA");
        let bytes = generate_report(&ReportInput {
            analysis: &analysis,
            inputs: &inputs,
            language: Language::En,
            issued: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        })
        .unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn empty_analysis_still_renders() {
        let analysis = AnalysisResponse::default();
        let inputs = PromptInputs::default();
        let bytes = generate_report(&ReportInput {
            analysis: &analysis,
            inputs: &inputs,
            language: Language::Es,
            issued: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        })
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
