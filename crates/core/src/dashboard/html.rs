use super::Dashboard;
use crate::domain::analysis::FundEntry;
use crate::report::chart::{self, PlotArea, Series};
use crate::report::format::PLACEHOLDER;

const CHART_WIDTH: f64 = 760.0;
const CHART_HEIGHT: f64 = 320.0;

const STYLE: &str = "\
body { background: #050505; color: #e5e7eb; font-family: Helvetica, Arial, sans-serif; margin: 0; padding: 32px; }
main { max-width: 1600px; margin: 0 auto; }
header { display: flex; justify-content: space-between; align-items: flex-end; border-bottom: 1px solid #222; padding-bottom: 24px; margin-bottom: 48px; }
h1 { font-family: Georgia, serif; font-size: 60px; margin: 0 16px 8px 0; display: inline-block; }
h3 { font-size: 18px; font-weight: 500; margin: 0 0 24px; }
.grid { display: grid; grid-template-columns: repeat(12, 1fr); gap: 24px; }
.card { background: #111; border: 1px solid #1f1f1f; border-radius: 16px; padding: 24px; }
.span-8 { grid-column: span 8; } .span-4 { grid-column: span 4; } .span-12 { grid-column: span 12; }
.badge { border-radius: 999px; padding: 4px 12px; font-size: 12px; font-weight: 700; text-transform: uppercase; letter-spacing: 0.1em; }
.badge.bullish { background: #10b981; color: #000; } .badge.bearish { background: #ef4444; color: #fff; } .badge.neutral { background: #6b7280; color: #fff; }
.muted { color: #9ca3af; } .label { font-size: 12px; text-transform: uppercase; letter-spacing: 0.1em; color: #6b7280; }
.confidence { font-family: monospace; font-size: 24px; text-align: right; }
.bar { height: 4px; background: #1f2937; border-radius: 999px; } .bar > div { height: 100%; background: #10b981; border-radius: 999px; }
.bar-legend { display: flex; justify-content: space-between; font-size: 10px; color: #4b5563; margin-top: 4px; }
.metric { display: flex; justify-content: space-between; align-items: flex-end; margin: 24px 0 8px; }
.metric .value { font-family: monospace; font-size: 20px; font-weight: 700; }
.info { font-size: 12px; color: #6b7280; margin: -16px 0 16px; }
.risk { border-left: 4px solid #f59e0b; } .catalyst { border-left: 4px solid #3b82f6; }
.recommendation { border: 2px solid; } .recommendation h2 { font-size: 48px; font-weight: 900; text-transform: uppercase; margin: 0 0 16px; }
.action-buy { border-color: #10b981; color: #34d399; } .action-sell { border-color: #ef4444; color: #f87171; }
.action-neutral { border-color: #f59e0b; color: #fbbf24; } .action-muted { border-color: #6b7280; color: #6b7280; }
.export { color: #10b981; font-size: 14px; }
table.figures { width: 100%; font-size: 12px; border-collapse: collapse; margin-top: 12px; } table.figures td, table.figures th { padding: 4px 8px; text-align: right; }
";

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn or_placeholder(text: &str) -> String {
    if text.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        escape_html(text)
    }
}

pub fn render_html(dashboard: &Dashboard) -> String {
    let l = dashboard.labels;
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n");
    out.push_str(&format!("<html lang=\"{}\">\n<head>\n", dashboard.language.code()));
    out.push_str("<meta charset=\"UTF-8\">\n");
    out.push_str(&format!(
        "<title>{} | {}</title>\n",
        escape_html(&dashboard.ticker),
        escape_html(l.app_title)
    ));
    out.push_str(&format!("<style>\n{STYLE}</style>\n</head>\n<body>\n<main>\n"));

    // Header: ticker, verdict badge, thesis, confidence.
    out.push_str("<header>\n<div>\n");
    out.push_str(&format!(
        "<h1>{}</h1><span class=\"badge {}\">{}</span>\n",
        escape_html(&dashboard.ticker),
        dashboard.tone.css_class(),
        escape_html(&dashboard.verdict)
    ));
    out.push_str(&format!("<p class=\"muted\">{}</p>\n", escape_html(&dashboard.thesis)));
    if let Some(file) = &dashboard.export_file {
        out.push_str(&format!(
            "<a class=\"export\" href=\"{}\" download>{}</a>\n",
            escape_html(file),
            escape_html(l.export_pdf)
        ));
    }
    out.push_str("</div>\n<div>\n");
    out.push_str(&format!("<div class=\"label\">{}</div>\n", escape_html(l.confidence)));
    out.push_str(&format!(
        "<div class=\"confidence\">{}</div>\n",
        or_placeholder(&dashboard.confidence)
    ));
    out.push_str("</div>\n</header>\n<div class=\"grid\">\n");

    out.push_str("<section class=\"card span-8\">\n");
    out.push_str(&format!("<h3>{}</h3>\n", escape_html(l.chart_title)));
    if dashboard.options.info_tooltips {
        out.push_str(&format!("<p class=\"info\">{}</p>\n", escape_html(l.chart_info)));
    }
    out.push_str(&area_chart(dashboard));
    if dashboard.options.localized_units && !dashboard.chart.is_empty() {
        out.push_str(&figures_table(dashboard));
    }
    out.push_str("</section>\n");

    out.push_str("<section class=\"card span-4\">\n");
    out.push_str(&format!("<h3>{}</h3>\n", escape_html(l.val_matrix)));
    if dashboard.options.info_tooltips {
        out.push_str(&format!("<p class=\"info\">{}</p>\n", escape_html(l.valuation_info)));
    }
    for bar in &dashboard.valuation {
        out.push_str(&format!(
            "<div class=\"metric\"><span class=\"muted\">{}</span><span class=\"value\">{}</span></div>\n",
            escape_html(&bar.metric),
            escape_html(&bar.value_label)
        ));
        out.push_str(&format!(
            "<div class=\"bar\"><div style=\"width: {:.1}%\"></div></div>\n",
            bar.width_pct
        ));
        out.push_str(&format!(
            "<div class=\"bar-legend\"><span>{}</span><span>{}</span></div>\n",
            escape_html(l.company_short),
            escape_html(&bar.peer_label)
        ));
    }
    out.push_str("</section>\n");

    out.push_str("<section class=\"card span-12\">\n");
    out.push_str(&format!("<h3>{}</h3>\n", escape_html(l.sector_title)));
    out.push_str(&format!("<p>{}</p>\n", escape_html(&dashboard.sector_context)));
    out.push_str("</section>\n");

    out.push_str("<section class=\"card span-8\">\n");
    out.push_str(&format!("<h3>{}</h3>\n<ul>\n", escape_html(l.exec_summary)));
    for point in &dashboard.summary {
        out.push_str(&format!("<li>{}</li>\n", escape_html(point)));
    }
    out.push_str("</ul>\n</section>\n");

    out.push_str("<div class=\"span-4\">\n");
    out.push_str(&format!(
        "<section class=\"card risk\"><div class=\"label\">{}</div><p>{}</p></section>\n",
        escape_html(l.risk_title),
        escape_html(&dashboard.primary_risk)
    ));
    out.push_str(&format!(
        "<section class=\"card catalyst\"><div class=\"label\">{}</div><p>{}</p></section>\n",
        escape_html(l.catalyst_title),
        escape_html(&dashboard.next_catalyst)
    ));
    out.push_str("</div>\n");

    if let Some(rec) = &dashboard.recommendation {
        out.push_str(&format!(
            "<section class=\"card span-12 recommendation {}\">\n",
            rec.class.css_class()
        ));
        out.push_str(&format!("<div class=\"label\">{}</div>\n", escape_html(l.verdict_title)));
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(&rec.action)));
        out.push_str(&format!("<p>&quot;{}&quot;</p>\n", escape_html(&rec.justification)));
        for (label, value) in [
            (l.price_target, &rec.price_target),
            (l.alloc_limit, &rec.allocation_limit),
            (l.entry_strat, &rec.entry_strategy),
        ] {
            out.push_str(&format!(
                "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
                escape_html(label),
                escape_html(value)
            ));
        }
        out.push_str("</section>\n");
    }

    out.push_str("</div>\n</main>\n</body>\n</html>\n");
    out
}

fn area_chart(dashboard: &Dashboard) -> String {
    let area = PlotArea {
        x: 48.0,
        y: 16.0,
        width: CHART_WIDTH - 72.0,
        height: CHART_HEIGHT - 48.0,
    };
    let baseline = area.y + area.height;
    let mut svg = format!(
        "<svg class=\"area-chart\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" width=\"100%\" role=\"img\">\n"
    );
    svg.push_str(
        "<defs>\
<linearGradient id=\"colorRev\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\"><stop offset=\"5%\" stop-color=\"#10b981\" stop-opacity=\"0.3\"/><stop offset=\"95%\" stop-color=\"#10b981\" stop-opacity=\"0\"/></linearGradient>\
<linearGradient id=\"colorEbit\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\"><stop offset=\"5%\" stop-color=\"#3b82f6\" stop-opacity=\"0.3\"/><stop offset=\"95%\" stop-color=\"#3b82f6\" stop-opacity=\"0\"/></linearGradient>\
</defs>\n",
    );

    for i in 0..=3u32 {
        let y = area.y + area.height / 3.0 * f64::from(i);
        svg.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#333\" stroke-dasharray=\"3 3\"/>\n",
            area.x,
            area.x + area.width
        ));
    }

    let entries: Vec<_> = dashboard
        .chart
        .iter()
        .map(|p| FundEntry {
            year: p.year.clone(),
            revenue: p.revenue,
            ebitda: p.ebitda,
        })
        .collect();
    let max = chart::shared_max(&entries).unwrap_or(0.0);

    let series = [
        (Series::Revenue, "revenue", "#10b981", "url(#colorRev)"),
        (Series::Ebitda, "ebitda", "#3b82f6", "url(#colorEbit)"),
    ];
    for (kind, class, stroke, fill) in series {
        let points = chart::plot_series(&entries, kind, max, &area);
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            continue;
        };
        let line: Vec<String> = points.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
        svg.push_str(&format!(
            "<path class=\"area {class}\" d=\"M{} L{:.1},{baseline:.1} L{:.1},{baseline:.1} Z\" fill=\"{fill}\" stroke=\"none\"/>\n",
            line.join(" L"),
            last.0,
            first.0
        ));
        svg.push_str(&format!(
            "<polyline class=\"line {class}\" points=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2\"/>\n",
            line.join(" ")
        ));
        for ((x, y), point) in points.iter().zip(&dashboard.chart) {
            let value = match kind {
                Series::Revenue => &point.revenue_label,
                Series::Ebitda => &point.ebitda_label,
            };
            svg.push_str(&format!(
                "<circle class=\"point {class}\" cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"3\" fill=\"{stroke}\"><title>{}: {}</title></circle>\n",
                escape_html(&point.year),
                escape_html(value)
            ));
        }
    }

    for (i, point) in dashboard.chart.iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" fill=\"#666\" font-size=\"12\" text-anchor=\"middle\">{}</text>\n",
            chart::point_x(&area, i, dashboard.chart.len()),
            CHART_HEIGHT - 8.0,
            escape_html(&point.year)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

fn figures_table(dashboard: &Dashboard) -> String {
    let l = dashboard.labels;
    let mut table = String::from("<table class=\"figures\">\n<tr><th></th>");
    for point in &dashboard.chart {
        table.push_str(&format!("<th>{}</th>", escape_html(&point.year)));
    }
    table.push_str("</tr>\n");
    for (label, pick) in [
        (l.revenue_label, Series::Revenue),
        (l.ebitda_label, Series::Ebitda),
    ] {
        table.push_str(&format!("<tr><th>{}</th>", escape_html(label)));
        for point in &dashboard.chart {
            let value = match pick {
                Series::Revenue => &point.revenue_label,
                Series::Ebitda => &point.ebitda_label,
            };
            table.push_str(&format!("<td>{}</td>", escape_html(value)));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</table>\n");
    table
}
