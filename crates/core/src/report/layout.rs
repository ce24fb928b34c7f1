use crate::dashboard::{classify_action, ActionClass};
use crate::domain::analysis::{format_multiple, AnalysisResponse, FinalRecommendation};
use crate::domain::settings::{Language, PromptInputs};
use crate::i18n::{self, Labels};
use crate::report::canvas::{Align, Canvas, Page, Rgb};
use crate::report::chart::{self, PlotArea, Series};
use crate::report::format::{format_compact, PLACEHOLDER};
use crate::report::lanes::{block_height, ColumnCursors};
use crate::report::metrics::{fit_font_size, wrap_text, Font};

/// A4 portrait in points.
pub const PAGE_WIDTH: f64 = 595.28;
pub const PAGE_HEIGHT: f64 = 841.89;

const BG_NIGHT: Rgb = [3, 7, 18];
const BG_MID: Rgb = [6, 10, 20];
const PAPER: Rgb = [10, 15, 26];
const CARD: Rgb = [14, 21, 36];
const SIDEBAR: Rgb = [13, 19, 32];
const ACCENT: Rgb = [16, 185, 129];
const ACCENT_BLUE: Rgb = [59, 130, 246];
const SELL_RED: Rgb = [239, 68, 68];
const HOLD_AMBER: Rgb = [245, 158, 11];
const TEXT: Rgb = [248, 250, 252];
const TEXT_MUTED: Rgb = [148, 163, 184];

const SUMMARY_PADDING: f64 = 28.0;
const SUMMARY_BULLET_SPACING: f64 = 12.0;
const SUMMARY_LINE_HEIGHT: f64 = 15.0;
const SUMMARY_FONT_SIZE: f64 = 11.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    margin: f64,
    top: f64,
    bottom: f64,
    sidebar_width: f64,
    gutter: f64,
    main_x: f64,
    main_width: f64,
}

impl Geometry {
    fn a4() -> Self {
        let margin = 60.0;
        let content_width = PAGE_WIDTH - margin * 2.0;
        let sidebar_width = (PAGE_WIDTH * 0.33)
            .round()
            .min((content_width * 0.38).round())
            .max((content_width * 0.3).round());
        let gutter = (content_width * 0.045).max(36.0);
        let main_x = margin + sidebar_width + gutter;
        Self {
            margin,
            top: 150.0,
            bottom: 80.0,
            sidebar_width,
            gutter,
            main_x,
            main_width: PAGE_WIDTH - main_x - margin,
        }
    }

    fn span_x(&self) -> f64 {
        self.margin - 24.0
    }

    fn span_width(&self) -> f64 {
        PAGE_WIDTH - self.span_x() * 2.0
    }

    fn column_bottom(&self) -> f64 {
        PAGE_HEIGHT - self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Sidebar,
    Main,
    Spanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    SidebarCard,
    Quote,
    MetricRow,
    GrowthCard,
    Summary,
    Chart,
    Sector,
    PlaybookNote,
    ValuationGrid,
    FinalRecommendation,
}

/// Where a block landed; kept so placement can be checked without reading drawing output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBlock {
    /// Zero-based; the cover is page 0.
    pub page: usize,
    pub lane: Lane,
    pub kind: BlockKind,
    pub top: f64,
    pub height: f64,
}

impl PlacedBlock {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub analysis: &'a AnalysisResponse,
    pub inputs: &'a PromptInputs,
    pub language: Language,
    pub issued: chrono::NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
    pub blocks: Vec<PlacedBlock>,
}

pub fn layout_report(input: &ReportInput<'_>) -> ReportLayout {
    let mut builder = ReportBuilder::new(input);
    builder.cover();

    builder.content_page(builder.labels.brief_title, builder.labels.brief_subtitle, BG_NIGHT);
    builder.brief_sidebar();
    builder.quote_block();
    builder.highlight_row();
    builder.cursors.step_sidebar_to_main(12.0);
    builder.summary_block();
    builder.mini_chart();
    builder.sector_block();
    builder.check_overflow();

    builder.content_page(builder.labels.playbook_title, builder.labels.playbook_subtitle, BG_MID);
    builder.playbook_sidebar();
    builder.playbook_note();
    builder.valuation_grid();
    builder.final_block();
    builder.check_overflow();

    ReportLayout {
        pages: builder.canvas.into_pages(),
        blocks: builder.blocks,
    }
}

/// Height of the executive-summary block for `summary` wrapped at `text_width`.
pub fn summary_block_height(summary: &[String], text_width: f64) -> f64 {
    let wrapped: Vec<Vec<String>> = summary
        .iter()
        .map(|point| wrap_text(point, Font::Helvetica, SUMMARY_FONT_SIZE, text_width))
        .collect();
    summary_height_for(&wrapped)
}

fn summary_height_for(wrapped: &[Vec<String>]) -> f64 {
    let content: f64 = wrapped
        .iter()
        .map(|lines| lines.len() as f64 * SUMMARY_LINE_HEIGHT)
        .sum::<f64>()
        + SUMMARY_BULLET_SPACING * wrapped.len().saturating_sub(1) as f64;
    SUMMARY_PADDING * 2.0 + content + 12.0
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        PLACEHOLDER
    } else {
        text
    }
}

fn action_color(action: &str) -> Rgb {
    match classify_action(Some(action)) {
        ActionClass::Buy => ACCENT,
        ActionClass::Sell => SELL_RED,
        ActionClass::Neutral | ActionClass::Muted => HOLD_AMBER,
    }
}

struct ReportBuilder<'a> {
    input: &'a ReportInput<'a>,
    labels: &'static Labels,
    geo: Geometry,
    canvas: Canvas,
    cursors: ColumnCursors,
    blocks: Vec<PlacedBlock>,
    subtitle: String,
    goal: String,
}

impl<'a> ReportBuilder<'a> {
    fn new(input: &'a ReportInput<'a>) -> Self {
        let labels = i18n::labels(input.language);
        let geo = Geometry::a4();
        let subtitle = match input.inputs.thesis.trim() {
            "" => labels.analysis_fallback.to_string(),
            thesis => thesis.to_string(),
        };
        let goal = match input.inputs.goal.trim() {
            "" => labels.analysis_fallback.to_string(),
            goal => goal.to_string(),
        };
        Self {
            input,
            labels,
            geo,
            canvas: Canvas::new(),
            cursors: ColumnCursors::new(geo.top),
            blocks: Vec::new(),
            subtitle,
            goal,
        }
    }

    fn analysis(&self) -> &'a AnalysisResponse {
        self.input.analysis
    }

    fn page_index(&self) -> usize {
        self.canvas.page_number() - 1
    }

    fn record(&mut self, lane: Lane, kind: BlockKind, top: f64, height: f64) {
        self.blocks.push(PlacedBlock {
            page: self.page_index(),
            lane,
            kind,
            top,
            height,
        });
    }

    fn pen(&mut self, font: Font, size: f64, color: Rgb) {
        self.canvas.set_font(font, size);
        self.canvas.set_color(color);
    }

    fn cover(&mut self) {
        let m = self.geo.margin;
        self.canvas.rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, BG_NIGHT);
        self.canvas.rect(-20.0, PAGE_HEIGHT * 0.35, PAGE_WIDTH + 40.0, PAGE_HEIGHT, [8, 24, 47]);
        self.canvas.circle(PAGE_WIDTH - 140.0, 140.0, 90.0, ACCENT_BLUE);
        self.canvas.circle(PAGE_WIDTH - 240.0, 220.0, 40.0, ACCENT);

        self.pen(Font::HelveticaBold, 14.0, TEXT_MUTED);
        self.canvas.text("AETHER EQUITY RESEARCH", m, m);

        let ticker = match self.input.inputs.ticker.trim() {
            "" => "TICKER",
            t => t,
        };
        self.pen(Font::TimesBold, 96.0, TEXT);
        self.canvas.text(ticker, m, PAGE_HEIGHT / 2.0 - 20.0);

        let title_width = PAGE_WIDTH * 0.55;
        let title = self.labels.cover_title;
        let title_size = fit_font_size(title, Font::HelveticaBold, title_width, 28.0, 18.0);
        self.pen(Font::HelveticaBold, title_size, TEXT);
        let title_lines = wrap_text(title, Font::HelveticaBold, title_size, title_width);
        self.canvas
            .lines(&title_lines, m, PAGE_HEIGHT / 2.0 + 20.0, title_size + 4.0);

        self.pen(Font::Helvetica, 14.0, TEXT_MUTED);
        let thesis_lines = wrap_text(&self.subtitle, Font::Helvetica, 14.0, PAGE_WIDTH * 0.6);
        let thesis_height = self
            .canvas
            .lines(&thesis_lines, m, PAGE_HEIGHT / 2.0 + 60.0, 18.0);

        let (badge_w, badge_h) = (260.0, 180.0);
        let bx = m;
        let by = (PAGE_HEIGHT / 2.0 + 60.0 + thesis_height + 24.0).min(PAGE_HEIGHT - badge_h - m);
        self.canvas.rounded_rect(bx, by, badge_w, badge_h, 18.0, [12, 20, 36]);

        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas.text(&self.labels.goal_label.to_uppercase(), bx + 24.0, by + 28.0);
        self.pen(Font::Helvetica, 16.0, TEXT);
        let goal_lines = wrap_text(&self.goal, Font::Helvetica, 16.0, badge_w - 48.0);
        self.canvas.lines(&goal_lines, bx + 24.0, by + 52.0, 16.0);

        self.canvas
            .line((bx + 24.0, by + 80.0), (bx + badge_w - 24.0, by + 80.0), 2.0, ACCENT);

        self.pen(Font::HelveticaBold, 10.0, TEXT_MUTED);
        self.canvas.text(&self.labels.issued.to_uppercase(), bx + 24.0, by + 108.0);
        self.pen(Font::Helvetica, 14.0, TEXT);
        let issued = i18n::long_date(self.input.issued, self.input.language);
        self.canvas.text(&issued, bx + 24.0, by + 128.0);

        let verdict = match self.analysis().verdict.trim() {
            "" => self.labels.verdict_title.to_uppercase(),
            v => v.to_uppercase(),
        };
        self.pen(Font::HelveticaBold, 20.0, TEXT);
        self.canvas.text(&verdict, bx + 24.0, by + 162.0);
    }

    fn content_page(&mut self, title: &str, subtitle: &str, background: Rgb) {
        self.canvas.add_page();
        self.cursors = ColumnCursors::new(self.geo.top);

        let g = self.geo;
        let m = g.margin;
        self.canvas.rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, background);

        let header_y = m - 26.0;
        self.canvas
            .rounded_rect(m, header_y, PAGE_WIDTH - m * 2.0, 76.0, 18.0, PAPER);
        self.pen(Font::HelveticaBold, 14.0, TEXT_MUTED);
        self.canvas.text(&title.to_uppercase(), m + 26.0, header_y + 26.0);
        self.pen(Font::Helvetica, 12.0, TEXT);
        self.canvas.text(subtitle, m + 26.0, header_y + 46.0);
        self.pen(Font::Helvetica, 8.0, TEXT_MUTED);
        self.canvas
            .text(&self.labels.app_title.to_uppercase(), m + 26.0, header_y - 10.0);

        let column_height = PAGE_HEIGHT - g.top - g.bottom + 60.0;
        self.canvas.rounded_rect(
            g.span_x(),
            g.top - 40.0,
            g.span_width(),
            column_height + 40.0,
            28.0,
            [6, 12, 24],
        );
        self.canvas.rounded_rect(
            m - 2.0,
            g.top - 20.0,
            g.sidebar_width + 4.0,
            column_height,
            18.0,
            [12, 20, 34],
        );
        self.canvas.rounded_rect(
            g.main_x - g.gutter / 2.0,
            g.top - 20.0,
            g.main_width + g.gutter / 2.0 + 2.0,
            column_height,
            18.0,
            [12, 20, 34],
        );

        self.pen(Font::Helvetica, 9.0, TEXT_MUTED);
        self.canvas
            .text_vertical("AETHER RESEARCH", m - 28.0, PAGE_HEIGHT - g.bottom);

        self.pen(Font::HelveticaBold, 46.0, [30, 41, 59]);
        let number = format!("{:02}", self.canvas.page_number());
        self.canvas.text_aligned(
            &number,
            PAGE_WIDTH - m,
            PAGE_HEIGHT - g.bottom + 10.0,
            Align::Right,
        );
    }

    fn sidebar_card(&mut self, title: &str, content: &str, accent: bool) {
        let (m, width) = (self.geo.margin, self.geo.sidebar_width);
        let lines = wrap_text(or_placeholder(content), Font::Helvetica, 12.0, width - 32.0);
        let height = block_height(56.0, 32.0, lines.len(), 14.0);
        let top = self.cursors.place_sidebar(height, 16.0);

        self.canvas
            .rounded_rect(m, top, width, height, 12.0, if accent { CARD } else { SIDEBAR });
        self.pen(Font::HelveticaBold, 9.0, TEXT_MUTED);
        self.canvas.text(&title.to_uppercase(), m + 16.0, top + 18.0);
        self.pen(Font::Helvetica, 12.0, TEXT);
        self.canvas.lines(&lines, m + 16.0, top + 38.0, 14.0);

        self.record(Lane::Sidebar, BlockKind::SidebarCard, top, height);
    }

    fn brief_sidebar(&mut self) {
        let analysis = self.analysis();
        let labels = self.labels;
        let verdict = format!(
            "{} / {}: {}",
            or_placeholder(&analysis.verdict),
            labels.confidence,
            or_placeholder(&analysis.confidence)
        );
        let goal = self.goal.clone();
        self.sidebar_card(labels.verdict_title, &verdict, true);
        self.sidebar_card(labels.goal_label, &goal, false);
        self.sidebar_card(labels.risk_title, &analysis.primary_risk, false);
        self.sidebar_card(labels.catalyst_title, &analysis.next_catalyst, false);
    }

    fn quote_block(&mut self) {
        let (x, width) = (self.geo.main_x, self.geo.main_width);
        let lines = wrap_text(&self.subtitle, Font::Helvetica, 13.0, width - 80.0);
        let height = block_height(120.0, 70.0, lines.len(), 16.0);
        let top = self.cursors.place_main(height, 30.0);

        self.canvas.rounded_rect(x, top, width, height, 18.0, [12, 18, 32]);
        self.pen(Font::TimesItalic, 22.0, ACCENT);
        self.canvas.text("\"", x + 20.0, top + 50.0);
        self.canvas.text("\"", x + width - 30.0, top + height - 20.0);
        self.pen(Font::Helvetica, 13.0, TEXT);
        self.canvas.lines(&lines, x + 50.0, top + 34.0, 16.0);
        self.pen(Font::HelveticaBold, 10.0, TEXT_MUTED);
        self.canvas
            .text(&self.labels.thesis_label.to_uppercase(), x + 50.0, top + height - 18.0);

        self.record(Lane::Main, BlockKind::Quote, top, height);
    }

    fn metric_card_height(value: &str, width: f64) -> (Vec<String>, f64) {
        let lines = wrap_text(value, Font::HelveticaBold, 20.0, width - 40.0);
        let height = block_height(90.0, 58.0, lines.len(), 20.0);
        (lines, height)
    }

    fn metric_card(&mut self, label: &str, lines: &[String], x: f64, y: f64, width: f64, height: f64) {
        self.canvas.rounded_rect(x, y, width, height, 14.0, CARD);
        self.pen(Font::HelveticaBold, 10.0, TEXT_MUTED);
        self.canvas.text(&label.to_uppercase(), x + 20.0, y + 24.0);
        self.pen(Font::HelveticaBold, 20.0, TEXT);
        self.canvas.lines(lines, x + 20.0, y + 48.0, 20.0);
    }

    fn highlight_row(&mut self) {
        let analysis = self.analysis();
        let language = self.input.language;
        let labels = self.labels;
        let latest = analysis.latest_fundamentals();

        let usd = |value: Option<f64>| match value {
            Some(v) if v.is_finite() => format!("USD {}", format_compact(Some(v), language)),
            _ => PLACEHOLDER.to_string(),
        };
        let revenue = usd(latest.and_then(|f| f.revenue));
        let ebitda = usd(latest.and_then(|f| f.ebitda));

        let anchor_year = analysis
            .anchor_fundamentals()
            .map(|f| f.year.trim().to_string())
            .filter(|y| !y.is_empty());
        let growth_label = match &anchor_year {
            Some(year) => format!("{} {year}", labels.growth_vs),
            None => labels.growth_vs.to_string(),
        };
        let growth = analysis
            .revenue_growth_pct()
            .map(|pct| format!("{}%", pct as i64))
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let (x, width) = (self.geo.main_x, self.geo.main_width);
        let column_gap = 18.0;
        let card_width = (width - column_gap) / 2.0;

        let top = self.cursors.main;
        let (rev_lines, rev_h) = Self::metric_card_height(&revenue, card_width);
        let (ebitda_lines, ebitda_h) = Self::metric_card_height(&ebitda, card_width);
        self.metric_card(labels.revenue_label, &rev_lines, x, top, card_width, rev_h);
        self.metric_card(
            labels.ebitda_label,
            &ebitda_lines,
            x + card_width + column_gap,
            top,
            card_width,
            ebitda_h,
        );
        let row_height = rev_h.max(ebitda_h);
        self.cursors.place_main(row_height, 18.0);
        self.record(Lane::Main, BlockKind::MetricRow, top, row_height);

        let (growth_lines, growth_h) = Self::metric_card_height(&growth, width);
        let top = self.cursors.place_main(growth_h, 28.0);
        self.metric_card(&growth_label, &growth_lines, x, top, width, growth_h);
        self.record(Lane::Main, BlockKind::GrowthCard, top, growth_h);
    }

    fn summary_block(&mut self) {
        let summary = &self.analysis().summary;
        if summary.is_empty() {
            return;
        }

        let x = self.geo.span_x();
        let width = self.geo.span_width();
        let bullet_indent = 16.0;
        let text_width = width - SUMMARY_PADDING * 2.0 - bullet_indent;
        let wrapped: Vec<Vec<String>> = summary
            .iter()
            .map(|point| wrap_text(point, Font::Helvetica, SUMMARY_FONT_SIZE, text_width))
            .collect();
        let height = summary_height_for(&wrapped);
        let top = self.cursors.place_spanning(self.geo.top, height, 24.0);

        self.canvas.rounded_rect(x, top, width, height, 18.0, [11, 17, 30]);
        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas.text(
            &self.labels.exec_summary.to_uppercase(),
            x + SUMMARY_PADDING,
            top + SUMMARY_PADDING - 4.0,
        );

        self.pen(Font::Helvetica, SUMMARY_FONT_SIZE, TEXT);
        let bullet_x = x + SUMMARY_PADDING;
        let mut y = top + SUMMARY_PADDING + 16.0;
        for (i, lines) in wrapped.iter().enumerate() {
            self.canvas.text("•", bullet_x, y);
            self.canvas
                .lines(lines, bullet_x + bullet_indent, y, SUMMARY_LINE_HEIGHT);
            y += lines.len() as f64 * SUMMARY_LINE_HEIGHT;
            if i + 1 != wrapped.len() {
                y += SUMMARY_BULLET_SPACING;
            }
        }

        self.record(Lane::Spanning, BlockKind::Summary, top, height);
    }

    fn mini_chart(&mut self) {
        let fundamentals = &self.analysis().fundamentals;
        if fundamentals.is_empty() {
            return;
        }

        let (x, width) = (self.geo.main_x, self.geo.main_width);
        let height = 170.0;
        let (pad_x, pad_y) = (36.0, 32.0);
        let top = self.cursors.place_main(height, 30.0);
        let area = PlotArea {
            x: x + pad_x,
            y: top + pad_y,
            width: width - pad_x * 2.0,
            height: height - pad_y * 2.0,
        };

        self.canvas.rounded_rect(x, top, width, height, 16.0, [10, 16, 30]);
        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas
            .text(&self.labels.chart_title.to_uppercase(), area.x, area.y - 14.0);

        for i in 0..=3u32 {
            let y = area.y + area.height / 3.0 * f64::from(i);
            self.canvas
                .line((area.x, y), (area.x + area.width, y), 0.7, [31, 41, 55]);
        }

        if let Some(max) = chart::shared_max(fundamentals) {
            for (series, color) in [(Series::Revenue, ACCENT), (Series::Ebitda, ACCENT_BLUE)] {
                let points = chart::plot_series(fundamentals, series, max, &area);
                for pair in points.windows(2) {
                    self.canvas.line(pair[0], pair[1], 2.0, color);
                }
            }
        }

        self.pen(Font::HelveticaBold, 9.0, TEXT_MUTED);
        for (i, entry) in fundamentals.iter().enumerate() {
            let px = chart::point_x(&area, i, fundamentals.len());
            self.canvas
                .text_aligned(&entry.year, px, top + height - 12.0, Align::Center);
        }

        self.record(Lane::Main, BlockKind::Chart, top, height);
    }

    fn sector_block(&mut self) {
        let sector = &self.analysis().sector_context;
        if sector.trim().is_empty() {
            return;
        }

        let (x, width) = (self.geo.main_x, self.geo.main_width);
        let lines = wrap_text(sector, Font::Helvetica, 11.0, width - 48.0);
        let height = block_height(140.0, 70.0, lines.len(), 15.0);
        let top = self.cursors.place_main(height, 30.0);

        self.canvas.rounded_rect(x, top, width, height, 18.0, [13, 21, 38]);
        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas
            .text(&self.labels.sector_title.to_uppercase(), x + 24.0, top + 30.0);
        self.pen(Font::Helvetica, 11.0, TEXT);
        self.canvas.lines(&lines, x + 24.0, top + 54.0, 15.0);

        self.record(Lane::Main, BlockKind::Sector, top, height);
    }

    fn playbook_sidebar(&mut self) {
        let analysis = self.analysis();
        let labels = self.labels;
        let latest_ebitda = analysis.latest_fundamentals().and_then(|f| f.ebitda);
        let ebitda = match latest_ebitda {
            Some(v) if v.is_finite() => format!("USD {}", format_compact(Some(v), self.input.language)),
            _ => PLACEHOLDER.to_string(),
        };
        self.sidebar_card(labels.ebitda_label, &ebitda, true);

        let rec: Option<&FinalRecommendation> = analysis.final_recommendation.as_ref();
        if let Some(rec) = rec {
            self.sidebar_card(labels.price_target, &rec.price_target, false);
            self.sidebar_card(labels.alloc_limit, &rec.allocation_limit, false);
        }
        let entry = match rec.map(|r| r.entry_strategy.trim()) {
            Some(entry) if !entry.is_empty() => entry.to_string(),
            _ => self.goal.clone(),
        };
        self.sidebar_card(labels.entry_strat, &entry, false);
    }

    fn playbook_note(&mut self) {
        let (x, width) = (self.geo.main_x, self.geo.main_width);
        let lines = wrap_text(self.labels.playbook_note, Font::Helvetica, 11.0, width - 40.0);
        let height = block_height(110.0, 56.0, lines.len(), 15.0);
        let top = self.cursors.place_main(height, 20.0);

        self.canvas.rounded_rect(x, top, width, height, 16.0, [12, 18, 32]);
        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas
            .text(&self.labels.playbook_note_title.to_uppercase(), x + 20.0, top + 24.0);
        self.pen(Font::Helvetica, 11.0, TEXT);
        self.canvas.lines(&lines, x + 20.0, top + 46.0, 15.0);

        self.record(Lane::Main, BlockKind::PlaybookNote, top, height);
    }

    fn valuation_grid(&mut self) {
        let valuation = &self.analysis().valuation;
        if valuation.is_empty() {
            return;
        }

        let (x0, width) = (self.geo.main_x, self.geo.main_width);
        let (padding, columns, row_gap) = (24.0, 2usize, 20.0);
        let card_width = (width - padding) / columns as f64;
        let peer_lines: Vec<Vec<String>> = valuation
            .iter()
            .map(|item| {
                let peer = format!("{}: {}", self.labels.peer_avg, format_multiple(item.peer_avg));
                wrap_text(&peer, Font::Helvetica, 11.0, card_width - 40.0)
            })
            .collect();
        let max_peer_lines = peer_lines.iter().map(|l| l.len().max(1)).max().unwrap_or(1);
        let card_height = block_height(120.0, 100.0, max_peer_lines, 12.0);
        let rows = valuation.len().div_ceil(columns);
        let grid_height = rows as f64 * (card_height + row_gap) - row_gap;
        let top = self.cursors.place_main(grid_height, row_gap);

        for (idx, (item, lines)) in valuation.iter().zip(&peer_lines).enumerate() {
            let x = x0 + (idx % columns) as f64 * (card_width + padding);
            let y = top + (idx / columns) as f64 * (card_height + row_gap);
            self.canvas
                .rounded_rect(x, y, card_width, card_height, 16.0, [12, 18, 32]);
            self.pen(Font::HelveticaBold, 10.0, TEXT_MUTED);
            self.canvas
                .text(&or_placeholder(&item.metric).to_uppercase(), x + 20.0, y + 22.0);
            self.pen(Font::HelveticaBold, 28.0, TEXT);
            self.canvas.text(&format_multiple(item.value), x + 20.0, y + 60.0);
            self.pen(Font::Helvetica, 11.0, TEXT_MUTED);
            self.canvas.lines(lines, x + 20.0, y + 88.0, 12.0);
        }

        self.record(Lane::Main, BlockKind::ValuationGrid, top, grid_height);
    }

    fn final_block(&mut self) {
        let Some(rec) = self.analysis().final_recommendation.as_ref() else {
            return;
        };
        let labels = self.labels;
        let x = self.geo.margin;
        let width = PAGE_WIDTH - self.geo.margin * 2.0;

        let metrics = [
            (labels.price_target, or_placeholder(&rec.price_target)),
            (labels.alloc_limit, or_placeholder(&rec.allocation_limit)),
            (labels.entry_strat, or_placeholder(&rec.entry_strategy)),
        ];
        let metric_width = (width - 48.0) / metrics.len() as f64;
        let metric_lines: Vec<Vec<String>> = metrics
            .iter()
            .map(|(_, value)| wrap_text(value, Font::Helvetica, 12.0, metric_width - 18.0))
            .collect();
        let metric_section = metric_lines
            .iter()
            .map(|lines| (lines.len() as f64 * 15.0).max(26.0))
            .fold(0.0, f64::max)
            + 16.0;
        let justification = wrap_text(&rec.justification, Font::HelveticaOblique, 11.0, width - 48.0);

        let label_offset = 130.0;
        let values_offset = label_offset + 20.0;
        let justification_offset = values_offset + metric_section + 18.0;
        let height = block_height(230.0, justification_offset + 24.0, justification.len(), 14.0);
        let top = self
            .cursors
            .place_spanning_within(30.0, height, 18.0, self.geo.column_bottom());

        self.canvas.rounded_rect(x, top, width, height, 20.0, [12, 26, 27]);
        self.pen(Font::HelveticaBold, 12.0, TEXT_MUTED);
        self.canvas
            .text(&labels.verdict_title.to_uppercase(), x + 24.0, top + 28.0);

        let action = or_placeholder(&rec.action);
        let action_size = fit_font_size(action, Font::HelveticaBold, width - 48.0, 40.0, 28.0);
        self.pen(Font::HelveticaBold, action_size, action_color(action));
        self.canvas.text(action, x + 24.0, top + 78.0);
        self.canvas
            .line((x + 24.0, top + 96.0), (x + width - 24.0, top + 96.0), 1.0, ACCENT);

        for (idx, ((label, _), lines)) in metrics.iter().zip(&metric_lines).enumerate() {
            let mx = x + 24.0 + idx as f64 * metric_width;
            self.pen(Font::HelveticaBold, 10.0, TEXT_MUTED);
            self.canvas.text(&label.to_uppercase(), mx, top + label_offset);
            self.pen(Font::Helvetica, 12.0, TEXT);
            self.canvas.lines(lines, mx, top + values_offset, 15.0);
        }

        self.pen(Font::HelveticaOblique, 11.0, TEXT);
        self.canvas
            .lines(&justification, x + 24.0, top + justification_offset, 14.0);

        self.record(Lane::Spanning, BlockKind::FinalRecommendation, top, height);
    }

    fn check_overflow(&self) {
        let page = self.page_index();
        let bottom = self
            .blocks
            .iter()
            .filter(|b| b.page == page)
            .map(PlacedBlock::bottom)
            .fold(0.0, f64::max);
        if bottom > self.geo.column_bottom() {
            tracing::warn!(
                page,
                bottom,
                limit = self.geo.column_bottom(),
                "report content runs past the page column"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::tests::nvda;
    use chrono::NaiveDate;

    fn layout(analysis: &AnalysisResponse, thesis: &str) -> ReportLayout {
        let inputs = PromptInputs {
            ticker: "NVDA".to_string(),
            thesis: thesis.to_string(),
            goal: "Growth".to_string(),
        };
        layout_report(&ReportInput {
            analysis,
            inputs: &inputs,
            language: Language::En,
            issued: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        })
    }

    fn overlaps(a: &PlacedBlock, b: &PlacedBlock) -> bool {
        a.top < b.bottom() - 1e-9 && b.top < a.bottom() - 1e-9
    }

    fn assert_no_overlap(blocks: &[PlacedBlock]) {
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                if a.page != b.page {
                    continue;
                }
                let shares_column = a.lane == b.lane || a.lane == Lane::Spanning || b.lane == Lane::Spanning;
                assert!(
                    !(shares_column && overlaps(a, b)),
                    "{a:?} overlaps {b:?}"
                );
            }
        }
    }

    #[test]
    fn lays_out_cover_and_two_content_pages() {
        let analysis = nvda();
        let report = layout(&analysis, "AI capex cycle is underestimated");
        assert_eq!(report.pages.len(), 3);

        let cover: Vec<&str> = report.pages[0].texts().collect();
        assert!(cover.contains(&"NVDA"));
        assert!(cover.contains(&"BULLISH"));
        assert!(cover.contains(&"October 18, 2026"));

        let brief: Vec<&str> = report.pages[1].texts().collect();
        assert!(brief.contains(&"02"));
        assert!(brief.contains(&"EXECUTIVE ANALYSIS"));
        assert!(brief.contains(&"240B"));
        assert!(brief.contains(&"GROWTH VS 2022"));

        let playbook: Vec<&str> = report.pages[2].texts().collect();
        assert!(playbook.contains(&"03"));
        assert!(playbook.contains(&"$165 - $180"));
        assert!(playbook.contains(&"48.2x"));
        assert!(playbook.contains(&"STRONG BUY"));
    }

    #[test]
    fn blocks_never_overlap_within_a_column() {
        let analysis = nvda();
        let report = layout(&analysis, "AI capex cycle is underestimated");
        assert_no_overlap(&report.blocks);
    }

    #[test]
    fn long_sidebar_pushes_spanning_summary_down() {
        let mut analysis = nvda();
        analysis.primary_risk = "Export controls ".repeat(40);
        analysis.next_catalyst = "Product launch ".repeat(30);
        let report = layout(&analysis, "");

        let sidebar_bottom = report
            .blocks
            .iter()
            .filter(|b| b.page == 1 && b.lane == Lane::Sidebar)
            .map(PlacedBlock::bottom)
            .fold(0.0, f64::max);
        let main_bottom = report
            .blocks
            .iter()
            .filter(|b| b.page == 1 && b.lane == Lane::Main && b.kind != BlockKind::Chart && b.kind != BlockKind::Sector)
            .map(PlacedBlock::bottom)
            .fold(0.0, f64::max);
        let summary = report
            .blocks
            .iter()
            .find(|b| b.kind == BlockKind::Summary)
            .unwrap();

        assert!(sidebar_bottom > main_bottom);
        assert!(summary.top >= sidebar_bottom);
        assert_no_overlap(&report.blocks);
    }

    #[test]
    fn empty_analysis_skips_data_driven_blocks() {
        let report = layout(&AnalysisResponse::default(), "");
        let kinds: Vec<BlockKind> = report.blocks.iter().map(|b| b.kind).collect();
        for skipped in [
            BlockKind::Summary,
            BlockKind::Chart,
            BlockKind::Sector,
            BlockKind::ValuationGrid,
            BlockKind::FinalRecommendation,
        ] {
            assert!(!kinds.contains(&skipped), "{skipped:?} should be skipped");
        }
        assert!(kinds.contains(&BlockKind::Quote));
        assert!(kinds.contains(&BlockKind::PlaybookNote));

        let brief: Vec<&str> = report.pages[1].texts().collect();
        assert!(brief.contains(&PLACEHOLDER));
        let cover: Vec<&str> = report.pages[0].texts().collect();
        assert!(cover.contains(&"Independent automated analysis."));
        assert!(cover.contains(&"FINAL VERDICT"));
    }

    #[test]
    fn summary_height_grows_with_wrapped_lines() {
        let short: Vec<String> = (0..5).map(|i| format!("Point {i}")).collect();
        let long: Vec<String> = (0..5)
            .map(|i| format!("Point {i} explains in considerable detail why the margin structure should hold through the cycle"))
            .collect();
        let width = 300.0;
        for point in &long {
            assert!(wrap_text(point, Font::Helvetica, SUMMARY_FONT_SIZE, width).len() > 1);
        }
        assert!(summary_block_height(&long, width) > summary_block_height(&short, width));
    }

    #[test]
    fn chart_draws_one_segment_per_interval_per_series() {
        let analysis = nvda();
        let report = layout(&analysis, "");
        let chart = report
            .blocks
            .iter()
            .find(|b| b.kind == BlockKind::Chart)
            .unwrap();
        let thick_lines = report.pages[chart.page]
            .elements
            .iter()
            .filter(|e| matches!(e, crate::report::canvas::Element::Line { width, .. } if *width == 2.0))
            .count();
        // 5 intervals x 2 series.
        assert_eq!(thick_lines, 10);
    }

    #[test]
    fn spanish_report_uses_localized_copy() {
        let analysis = nvda();
        let inputs = PromptInputs::new("NVDA");
        let report = layout_report(&ReportInput {
            analysis: &analysis,
            inputs: &inputs,
            language: Language::Es,
            issued: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        });
        let cover: Vec<&str> = report.pages[0].texts().collect();
        assert!(cover.contains(&"18 de octubre de 2026"));
        let brief: Vec<&str> = report.pages[1].texts().collect();
        assert!(brief.contains(&"INFORME TÁCTICO"));
    }
}
