use crate::domain::analysis::FundEntry;

/// Share of the plot height used by the largest value.
pub const HEADROOM: f64 = 0.9;

/// Plot rectangle in top-left-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Revenue,
    Ebitda,
}

impl Series {
    pub fn value(self, entry: &FundEntry) -> Option<f64> {
        match self {
            Series::Revenue => entry.revenue,
            Series::Ebitda => entry.ebitda,
        }
    }
}

/// Largest value across both series; `None` when nothing positive was reported.
pub fn shared_max(entries: &[FundEntry]) -> Option<f64> {
    entries
        .iter()
        .flat_map(|e| [e.revenue, e.ebitda])
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .filter(|m| *m > 0.0)
}

/// X position of point `index` out of `count`, spread edge to edge.
pub fn point_x(area: &PlotArea, index: usize, count: usize) -> f64 {
    if count <= 1 {
        return area.x;
    }
    area.x + index as f64 / (count - 1) as f64 * area.width
}

/// Maps one series onto the plot. The scale is linear from a zero baseline to `max`;
/// negatives and gaps sit on the baseline.
pub fn plot_series(entries: &[FundEntry], series: Series, max: f64, area: &PlotArea) -> Vec<(f64, f64)> {
    let baseline = area.y + area.height;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let value = series.value(entry).filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0);
            let y = if max > 0.0 {
                baseline - value / max * area.height * HEADROOM
            } else {
                baseline
            };
            (point_x(area, i, entries.len()), y)
        })
        .collect()
}
