use crate::domain::settings::{GoalOption, Language};

/// Fixed strings drawn by the dashboard and the PDF report.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub app_title: &'static str,
    pub goal_label: &'static str,
    pub thesis_label: &'static str,
    pub confidence: &'static str,
    pub chart_title: &'static str,
    pub val_matrix: &'static str,
    pub sector_title: &'static str,
    pub exec_summary: &'static str,
    pub risk_title: &'static str,
    pub catalyst_title: &'static str,
    pub verdict_title: &'static str,
    pub price_target: &'static str,
    pub alloc_limit: &'static str,
    pub entry_strat: &'static str,
    pub revenue_label: &'static str,
    pub ebitda_label: &'static str,
    pub peer_avg: &'static str,
    pub growth_vs: &'static str,
    pub analysis_fallback: &'static str,
    pub export_pdf: &'static str,
    pub error_title: &'static str,
    pub chart_info: &'static str,
    pub valuation_info: &'static str,
    pub company_short: &'static str,
    // Report-only copy.
    pub cover_title: &'static str,
    pub issued: &'static str,
    pub brief_title: &'static str,
    pub brief_subtitle: &'static str,
    pub playbook_title: &'static str,
    pub playbook_subtitle: &'static str,
    pub playbook_note_title: &'static str,
    pub playbook_note: &'static str,
    pub opt_value: &'static str,
    pub opt_growth: &'static str,
    pub opt_bear: &'static str,
    pub opt_income: &'static str,
}

const EN: Labels = Labels {
    app_title: "Aether Equity Research",
    goal_label: "Strategy Goal",
    thesis_label: "Investment Thesis (Hypothesis)",
    confidence: "Confidence Score",
    chart_title: "Revenue vs EBITDA Growth",
    val_matrix: "Valuation Matrix",
    sector_title: "Sector & Macro Context",
    exec_summary: "Executive Analysis",
    risk_title: "Primary Risk",
    catalyst_title: "Key Catalyst Watch",
    verdict_title: "Final Verdict",
    price_target: "Price Target",
    alloc_limit: "Allocation Limit",
    entry_strat: "Entry Strategy",
    revenue_label: "Revenue",
    ebitda_label: "EBITDA",
    peer_avg: "Peer avg",
    growth_vs: "Growth vs",
    analysis_fallback: "Independent automated analysis.",
    export_pdf: "Export PDF report",
    error_title: "Analysis could not be generated.",
    chart_info: "Reported revenue and EBITDA per fiscal year; the last point is a forward estimate.",
    valuation_info: "Bar length compares the company multiple with the peer average, capped at 100%.",
    company_short: "Co.",
    cover_title: "EQUITY INTELLIGENCE BRIEF",
    issued: "Issued",
    brief_title: "Intelligence Brief",
    brief_subtitle: "Market narrative & macro context",
    playbook_title: "Valuation Playbook",
    playbook_subtitle: "Multiples, comps & execution",
    playbook_note_title: "Playbook context",
    playbook_note: "Each multiple is plotted versus the sector cohort to spot premiums, discounts and regime shifts for positioning.",
    opt_value: "Value Investing (Long Term)",
    opt_growth: "Growth / Momentum",
    opt_bear: "Short / Bearish Setup",
    opt_income: "Income / Dividend",
};

const ES: Labels = Labels {
    app_title: "Aether Equity Research",
    goal_label: "Objetivo de Estrategia",
    thesis_label: "Tesis de Inversión (Hipótesis)",
    confidence: "Nivel de Confianza",
    chart_title: "Crecimiento Ingresos vs EBITDA",
    val_matrix: "Matriz de Valoración",
    sector_title: "Contexto Macro y Sectorial",
    exec_summary: "Análisis Ejecutivo",
    risk_title: "Riesgo Principal",
    catalyst_title: "Próximo Catalizador",
    verdict_title: "Veredicto Final",
    price_target: "Precio Objetivo",
    alloc_limit: "Límite Asignación",
    entry_strat: "Estrategia Entrada",
    revenue_label: "Ingresos",
    ebitda_label: "EBITDA",
    peer_avg: "Promedio sector",
    growth_vs: "Crecimiento vs",
    analysis_fallback: "Análisis automatizado independiente.",
    export_pdf: "Exportar informe PDF",
    error_title: "No se pudo generar el análisis.",
    chart_info: "Ingresos y EBITDA reportados por año fiscal; el último punto es una estimación.",
    valuation_info: "La barra compara el múltiplo de la empresa con el promedio del sector, con tope en 100%.",
    company_short: "Emp.",
    cover_title: "INTELIGENCIA DE RENTA VARIABLE",
    issued: "Emitido",
    brief_title: "Informe táctico",
    brief_subtitle: "Narrativa de mercado y contexto macro",
    playbook_title: "Matriz estratégica",
    playbook_subtitle: "Múltiplos, comparables y ejecución",
    playbook_note_title: "Matriz de valoración",
    playbook_note: "Comparamos el múltiplo de cada métrica con el promedio sectorial para entender hacia dónde está orientada la prima o el descuento.",
    opt_value: "Value Investing (Largo Plazo)",
    opt_growth: "Crecimiento / Momentum",
    opt_bear: "Short / Bajista",
    opt_income: "Ingresos / Dividendos",
};

pub fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN,
        Language::Es => &ES,
    }
}

impl Labels {
    pub fn goal_option(&self, goal: GoalOption) -> &'static str {
        match goal {
            GoalOption::ValueInvesting => self.opt_value,
            GoalOption::Growth => self.opt_growth,
            GoalOption::Bearish => self.opt_bear,
            GoalOption::Income => self.opt_income,
        }
    }

    /// The failure to show: `error` when it says something, the generic title otherwise.
    pub fn failure_message(&self, error: Option<&str>) -> String {
        match error.map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => self.error_title.to_string(),
        }
    }
}

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const MONTHS_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

/// Long-form date: `October 18, 2026` / `18 de octubre de 2026`.
pub fn long_date(date: chrono::NaiveDate, language: Language) -> String {
    use chrono::Datelike;
    let month = date.month0() as usize;
    match language {
        Language::En => format!("{} {}, {}", MONTHS_EN[month], date.day(), date.year()),
        Language::Es => format!("{} de {} de {}", date.day(), MONTHS_ES[month], date.year()),
    }
}
