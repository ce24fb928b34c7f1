use crate::domain::analysis::AnalysisResponse;
use crate::llm::error::AnalysisError;
use regex::Regex;
use std::sync::OnceLock;

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // (?s) lets `.` cross newlines; `*?` keeps each match to a single tag pair.
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"))
}

/// Strips reasoning traces and Markdown fences, then narrows to the outermost braces.
///
/// Best-effort only: text without a `{ ... }` pair is returned trimmed and left for the
/// JSON parser to reject.
pub fn sanitize_completion(text: &str) -> String {
    let without_think = think_block().replace_all(text, "");
    let without_fences = without_think.replace("```json", "").replace("```", "");
    let trimmed = without_fences.trim();

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end >= start => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResponse, AnalysisError> {
    let json_str = sanitize_completion(text);
    serde_json::from_str::<AnalysisResponse>(&json_str)
        .map_err(|e| AnalysisError::parse(e.to_string(), Some(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_think_block_and_fences() {
        let raw = "<think>x</think>```json\n{\"verdict\":\"BULL\"}\n```";
        let parsed = parse_analysis(raw).unwrap();
        assert_eq!(parsed.verdict, "BULL");
    }

    #[test]
    fn strips_every_multiline_think_block() {
        let raw = "<think>step 1\n{\"verdict\":\"WRONG\"}\n</think>\nSure! {\"verdict\":\"NEUTRAL\"}<think>more</think> hope this helps";
        assert_eq!(sanitize_completion(raw), "{\"verdict\":\"NEUTRAL\"}");
    }

    #[test]
    fn extraction_is_idempotent_on_clean_json() {
        let clean = "{\"a\":1}";
        assert_eq!(sanitize_completion(clean), clean);

        let direct: serde_json::Value = serde_json::from_str(clean).unwrap();
        let extracted: serde_json::Value =
            serde_json::from_str(&sanitize_completion(clean)).unwrap();
        assert_eq!(direct, extracted);
    }

    #[test]
    fn discards_surrounding_prose() {
        let raw = "Here is the analysis:\n{\"confidence\":\"High\",\"summary\":[\"a\"]}\nLet me know!";
        let parsed = parse_analysis(raw).unwrap();
        assert_eq!(parsed.confidence, "High");
        assert_eq!(parsed.summary, vec!["a"]);
    }

    #[test]
    fn fails_without_braces() {
        let err = parse_analysis("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { .. }));
        assert_eq!(err.raw_output(), Some("I cannot help with that."));
    }

    #[test]
    fn fails_on_truncated_json() {
        let raw = "```json\n{\"verdict\": \"BULLISH\", \"summary\": [\"a\", }\n```";
        assert!(parse_analysis(raw).is_err());
    }

    #[test]
    fn nested_braces_survive_extraction() {
        let raw = "prefix {\"finalRecommendation\":{\"action\":\"BUY\",\"priceTarget\":\"$150\"}} suffix";
        let parsed = parse_analysis(raw).unwrap();
        let rec = parsed.final_recommendation.unwrap();
        assert_eq!(rec.action, "BUY");
        assert_eq!(rec.price_target, "$150");
    }
}
