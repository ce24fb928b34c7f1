use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Equity-research payload returned by the model.
///
/// Every key is optional on the wire. The model is instructed to follow the schema but
/// nothing enforces it, so missing keys, `null`s, numbers-as-strings and a lone value where
/// a list belongs all deserialize to something renderable instead of failing the whole
/// response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(default, deserialize_with = "lenient_records")]
    pub fundamentals: Vec<FundEntry>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub valuation: Vec<ValuationItem>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub verdict: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub confidence: String,
    #[serde(default, deserialize_with = "lenient_text_list")]
    pub summary: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub primary_risk: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub next_catalyst: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sector_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_recommendation: Option<FinalRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub year: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ebitda: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub metric: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub peer_avg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRecommendation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub price_target: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub allocation_limit: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub entry_strategy: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub justification: String,
}

impl AnalysisResponse {
    pub fn latest_fundamentals(&self) -> Option<&FundEntry> {
        self.fundamentals.last()
    }

    pub fn anchor_fundamentals(&self) -> Option<&FundEntry> {
        self.fundamentals.first()
    }

    /// Revenue growth of the latest entry against the first (anchor) entry, in percent.
    ///
    /// Returns `None` when either revenue is missing or the anchor revenue is not strictly
    /// positive; a ratio against a zero or negative base has no meaningful sign.
    pub fn revenue_growth_pct(&self) -> Option<f64> {
        let anchor = self.anchor_fundamentals()?;
        let latest = self.latest_fundamentals()?;
        let (base, last) = (anchor.revenue?, latest.revenue?);
        if base <= 0.0 || !base.is_finite() || !last.is_finite() {
            tracing::warn!(
                anchor_year = %anchor.year,
                anchor_revenue = base,
                "anchor revenue is not positive; growth metric left blank"
            );
            return None;
        }
        Some(((last - base) / base * 100.0).round())
    }
}

impl ValuationItem {
    /// Company multiple as a share of the peer average, capped at 100%.
    ///
    /// A missing or zero peer average falls back to `value * 1.5`.
    pub fn relative_width_pct(&self) -> f64 {
        let Some(value) = self.value else {
            return 0.0;
        };
        let denom = match self.peer_avg {
            Some(peer) if peer != 0.0 => peer,
            _ => value * 1.5,
        };
        if denom == 0.0 || !denom.is_finite() {
            return 0.0;
        }
        (value / denom * 100.0).clamp(0.0, 100.0)
    }
}

/// Formats a multiple the way the model wrote it: `24.5x`, `30x`, or `—` when absent.
pub fn format_multiple(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v}x"),
        _ => "—".to_string(),
    }
}

/// Array items with `null`s dropped. A lone value counts as a one-item list.
fn lenient_items<'de, D>(de: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
        single => vec![single],
    })
}

/// Object rows of a table; anything that is not an object is skipped.
fn lenient_records<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    lenient_items(de)?
        .into_iter()
        .filter(Value::is_object)
        .map(|item| T::deserialize(item).map_err(D::Error::custom))
        .collect()
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(de)?))
}

fn lenient_text_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_items(de)?
        .into_iter()
        .map(value_to_text)
        .filter(|text| !text.trim().is_empty())
        .collect())
}

fn lenient_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    })
}
