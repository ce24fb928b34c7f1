use super::Dashboard;
use crate::report::format::PLACEHOLDER;

const RULE_WIDTH: usize = 60;
const BAR_WIDTH: usize = 20;

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        PLACEHOLDER
    } else {
        text
    }
}

fn heading(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n", title.to_uppercase()));
    out.push_str(&format!("{}\n", "-".repeat(40)));
}

/// Plain-text dashboard for terminals.
pub fn render_text(dashboard: &Dashboard) -> String {
    let l = dashboard.labels;
    let mut out = String::new();

    out.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH)));
    out.push_str(&format!(
        "{}  [{}]\n",
        or_placeholder(&dashboard.ticker),
        or_placeholder(&dashboard.verdict).to_uppercase()
    ));
    out.push_str(&format!("{}\n", dashboard.thesis));
    out.push_str(&format!("{}: {}\n", l.confidence, or_placeholder(&dashboard.confidence)));
    out.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH)));

    if !dashboard.chart.is_empty() {
        heading(&mut out, l.chart_title);
        if dashboard.options.info_tooltips {
            out.push_str(&format!("({})\n", l.chart_info));
        }
        out.push_str(&format!(
            "{:<14}{:>16}{:>16}\n",
            "", l.revenue_label, l.ebitda_label
        ));
        for point in &dashboard.chart {
            out.push_str(&format!(
                "{:<14}{:>16}{:>16}\n",
                point.year, point.revenue_label, point.ebitda_label
            ));
        }
    }

    if !dashboard.valuation.is_empty() {
        heading(&mut out, l.val_matrix);
        if dashboard.options.info_tooltips {
            out.push_str(&format!("({})\n", l.valuation_info));
        }
        for bar in &dashboard.valuation {
            let filled = ((bar.width_pct / 100.0) * BAR_WIDTH as f64).round() as usize;
            let filled = filled.min(BAR_WIDTH);
            out.push_str(&format!(
                "{:<14}{:>8}  [{}{}]  {}\n",
                or_placeholder(&bar.metric),
                bar.value_label,
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled),
                bar.peer_label
            ));
        }
    }

    heading(&mut out, l.sector_title);
    out.push_str(&format!("{}\n", or_placeholder(&dashboard.sector_context)));

    if !dashboard.summary.is_empty() {
        heading(&mut out, l.exec_summary);
        for point in &dashboard.summary {
            out.push_str(&format!("  * {point}\n"));
        }
    }

    heading(&mut out, l.risk_title);
    out.push_str(&format!("{}\n", or_placeholder(&dashboard.primary_risk)));
    heading(&mut out, l.catalyst_title);
    out.push_str(&format!("{}\n", or_placeholder(&dashboard.next_catalyst)));

    if let Some(rec) = &dashboard.recommendation {
        heading(&mut out, l.verdict_title);
        out.push_str(&format!("{}\n", or_placeholder(&rec.action).to_uppercase()));
        out.push_str(&format!("{}: {}\n", l.price_target, or_placeholder(&rec.price_target)));
        out.push_str(&format!("{}: {}\n", l.alloc_limit, or_placeholder(&rec.allocation_limit)));
        out.push_str(&format!("{}: {}\n", l.entry_strat, or_placeholder(&rec.entry_strategy)));
        if !rec.justification.trim().is_empty() {
            out.push_str(&format!("\"{}\"\n", rec.justification));
        }
    }

    if let Some(file) = &dashboard.export_file {
        out.push_str(&format!("\n{}: {file}\n", l.export_pdf));
    }

    out
}
