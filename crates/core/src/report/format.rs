use crate::domain::settings::Language;

pub const PLACEHOLDER: &str = "—";

const EN_UNITS: [&str; 4] = ["K", "M", "B", "T"];
const ES_UNITS: [&str; 4] = [" mil", " M", " mil M", " B"];

/// Short-scale compact notation with at most one fractional digit.
///
/// `1_234_567.0` renders as `1.2M` in English and `1,2 M` in Spanish; thousands of millions
/// are `mil M` in Spanish. Missing or non-finite values render as the placeholder.
pub fn format_compact(value: Option<f64>, language: Language) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_string();
    };

    let units = match language {
        Language::En => &EN_UNITS,
        Language::Es => &ES_UNITS,
    };

    let sign = if value < 0.0 { "-" } else { "" };
    let mut magnitude = value.abs();
    let mut unit: Option<usize> = None;
    while magnitude >= 1000.0 && unit.map_or(true, |u| u + 1 < units.len()) {
        magnitude /= 1000.0;
        unit = Some(unit.map_or(0, |u| u + 1));
    }

    // 999.96K rounds to 1000.0K; carry into the next unit.
    let mut rounded = (magnitude * 10.0).round() / 10.0;
    if rounded >= 1000.0 && unit.map_or(true, |u| u + 1 < units.len()) {
        rounded /= 1000.0;
        unit = Some(unit.map_or(0, |u| u + 1));
    }

    let number = one_decimal(rounded, language);
    match unit {
        Some(u) => format!("{sign}{number}{}", units[u]),
        None => format!("{sign}{number}"),
    }
}

fn one_decimal(value: f64, language: Language) -> String {
    let text = if (value - value.trunc()).abs() < 1e-9 {
        format!("{}", value.trunc() as i64)
    } else {
        format!("{value:.1}")
    };
    match language {
        Language::En => text,
        Language::Es => text.replace('.', ","),
    }
}
