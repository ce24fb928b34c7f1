use crate::domain::settings::{ApiConfig, Complexity, Language, PromptInputs};

const ROLE_TECHNICAL: &str = "ROLE: Elite Equity Research Analyst & Macro Strategist. Use professional financial jargon, focus on metrics, derivatives, and sophisticated market mechanics.";
const ROLE_SIMPLE: &str = "ROLE: Financial Educator & Investment Guide. Use clear, simple language suitable for a beginner investor. Avoid heavy jargon or explain it simply. Focus on the 'story' of the company and actionable advice.";

const LANG_ES: &str = "You MUST respond in SPANISH. Translate all qualitative analysis to Spanish.";
const LANG_EN: &str = "You MUST respond in ENGLISH.";

/// Trailing five reported years plus next year's estimate.
pub fn fiscal_year_labels(current_year: i32) -> Vec<String> {
    let mut labels: Vec<String> = (current_year - 4..=current_year)
        .map(|y| y.to_string())
        .collect();
    labels.push(format!("{} (Est)", current_year + 1));
    labels
}

fn role_directive(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Technical => ROLE_TECHNICAL,
        Complexity::Simple => ROLE_SIMPLE,
    }
}

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::Es => LANG_ES,
        Language::En => LANG_EN,
    }
}

pub fn build_system_prompt(config: &ApiConfig, current_year: i32) -> String {
    let fundamentals_schema = fiscal_year_labels(current_year)
        .iter()
        .map(|label| format!("    {{\"year\": \"{label}\", \"revenue\": number, \"ebitda\": number}}"))
        .collect::<Vec<_>>()
        .join(",\n");

    let values_language = match config.language {
        Language::Es => "Spanish",
        Language::En => "English",
    };
    let closing = match config.complexity {
        Complexity::Simple => "Keep explanations educational and easy to digest.",
        Complexity::Technical => "Ensure deep technical accuracy.",
    };

    let lines: Vec<String> = vec![
        String::new(),
        role_directive(config.complexity).to_string(),
        "TASK: Analyze the requested company ticker. You MUST access real-time data (if capable) or use your internal knowledge base.".to_string(),
        language_directive(config.language).to_string(),
        String::new(),
        format!(
            "Ensure quantitative data stays current through {current_year} with {} shown as an estimate.",
            current_year + 1
        ),
        String::new(),
        "OUTPUT FORMAT: You must respond with ONLY valid JSON. Do not include markdown formatting like ```json. ".to_string(),
        format!(
            "IMPORTANT: The JSON object KEYS (e.g., \"fundamentals\", \"revenue\", \"verdict\") MUST remain in ENGLISH exactly as shown below for the code to work. The VALUES (strings) should be in {values_language}."
        ),
        String::new(),
        "JSON Schema:".to_string(),
        "{".to_string(),
        "  \"fundamentals\": [".to_string(),
        fundamentals_schema,
        "  ],".to_string(),
        "  \"valuation\": [".to_string(),
        "    {\"metric\": \"P/E Ratio\", \"value\": number, \"peerAvg\": number},".to_string(),
        "    {\"metric\": \"EV/EBITDA\", \"value\": number, \"peerAvg\": number},".to_string(),
        "    {\"metric\": \"P/S Ratio\", \"value\": number, \"peerAvg\": number}".to_string(),
        "  ],".to_string(),
        "  \"verdict\": \"BULLISH\" | \"BEARISH\" | \"NEUTRAL\",".to_string(),
        "  \"confidence\": \"High\" | \"Medium\" | \"Low\",".to_string(),
        "  \"summary\": [".to_string(),
        "    \"Detailed bullet point 1\",".to_string(),
        "    \"Detailed bullet point 2\",".to_string(),
        "    \"Detailed bullet point 3\",".to_string(),
        "    \"Detailed bullet point 4\",".to_string(),
        "    \"Detailed bullet point 5\"".to_string(),
        "  ],".to_string(),
        "  \"primaryRisk\": \"Short description of the biggest downside risk\",".to_string(),
        "  \"nextCatalyst\": \"Short description of the upcoming event\",".to_string(),
        "  \"sectorContext\": \"A brief, dense paragraph analyzing the sector trends.\",".to_string(),
        "  \"finalRecommendation\": {".to_string(),
        "    \"action\": \"STRONG BUY | BUY | HOLD | SELL | STRONG SELL\",".to_string(),
        "    \"priceTarget\": \"Specific price range or value\",".to_string(),
        "    \"allocationLimit\": \"Percentage of portfolio\",".to_string(),
        "    \"entryStrategy\": \"How to buy/sell\",".to_string(),
        "    \"justification\": \"One powerful sentence justifying this specific action.\"".to_string(),
        "  }".to_string(),
        "}".to_string(),
        String::new(),
        format!("Ensure the numbers are realistic. {closing}"),
        String::new(),
    ];

    lines.join("\n")
}

pub fn build_user_prompt(inputs: &PromptInputs) -> String {
    format!(
        "Analyze Ticker: {}. \nUser Thesis: {}. \nInvestment Goal: {}.",
        inputs.ticker, inputs.thesis, inputs.goal
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_fiscal_labels_ending_with_estimate() {
        let labels = fiscal_year_labels(2026);
        assert_eq!(
            labels,
            vec!["2022", "2023", "2024", "2025", "2026", "2027 (Est)"]
        );
    }

    #[test]
    fn schema_embeds_every_fiscal_label() {
        let prompt = build_system_prompt(&ApiConfig::default(), 2026);
        for label in fiscal_year_labels(2026) {
            assert!(
                prompt.contains(&format!("{{\"year\": \"{label}\", \"revenue\": number, \"ebitda\": number}}")),
                "missing {label}"
            );
        }
        assert!(prompt.contains("current through 2026 with 2027 shown as an estimate"));
        assert!(!prompt.contains("\"year\": \"2021\""));
    }

    #[test]
    fn directives_follow_language_and_complexity() {
        let technical_en = build_system_prompt(&ApiConfig::default(), 2026);
        assert!(technical_en.contains(ROLE_TECHNICAL));
        assert!(technical_en.contains(LANG_EN));
        assert!(technical_en.contains("should be in English"));
        assert!(technical_en.contains("Ensure deep technical accuracy."));

        let simple_es = ApiConfig {
            language: Language::Es,
            complexity: Complexity::Simple,
            ..ApiConfig::default()
        };
        let prompt = build_system_prompt(&simple_es, 2026);
        assert!(prompt.contains(ROLE_SIMPLE));
        assert!(prompt.contains(LANG_ES));
        assert!(prompt.contains("should be in Spanish"));
        assert!(prompt.contains("educational and easy to digest"));
    }

    #[test]
    fn user_prompt_carries_all_inputs() {
        let inputs = PromptInputs {
            ticker: "NVDA".to_string(),
            thesis: "Datacenter demand is underpriced".to_string(),
            goal: "Growth".to_string(),
        };
        assert_eq!(
            build_user_prompt(&inputs),
            "Analyze Ticker: NVDA. \nUser Thesis: Datacenter demand is underpriced. \nInvestment Goal: Growth."
        );
    }
}
