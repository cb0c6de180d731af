use shared::protocol::AnalysisVerdict;

/// Slate tone shown when the service sends no usable risk color.
pub const NEUTRAL_RISK_HEX: &str = "#64748b";
pub const MEDICINES_PLACEHOLDER: &str = "No specific medications identified";
pub const ALERT_FALLBACK: &str = "No additional guidance provided.";

/// Either the identified medicine tags or the fixed placeholder, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MedicinesView {
    Tags(Vec<String>),
    NoneIdentified,
}

/// Display-ready projection of a verdict. Pure data; building one reads
/// nothing but the verdict and mutates nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub risk_label: String,
    pub risk_hex: String,
    pub medicines: MedicinesView,
    pub alert: String,
    /// `None` hides the whole section; entries carry the `Suggested:` prefix.
    pub alternatives: Option<Vec<String>>,
}

impl ResultView {
    pub fn from_verdict(verdict: &AnalysisVerdict) -> Self {
        let risk_hex = verdict
            .risk_hex
            .as_deref()
            .filter(|hex| !hex.is_empty())
            .unwrap_or(NEUTRAL_RISK_HEX)
            .to_string();

        let medicines = if verdict.medicines_found.is_empty() {
            MedicinesView::NoneIdentified
        } else {
            MedicinesView::Tags(verdict.medicines_found.clone())
        };

        let alert = verdict
            .alert_message
            .as_deref()
            .map(str::trim)
            .filter(|alert| !alert.is_empty())
            .unwrap_or(ALERT_FALLBACK)
            .to_string();

        let alternatives = if verdict.alternatives.is_empty() {
            None
        } else {
            Some(
                verdict
                    .alternatives
                    .iter()
                    .map(|alt| format!("Suggested: {alt}"))
                    .collect(),
            )
        };

        Self {
            risk_label: verdict.risk_level.clone(),
            risk_hex,
            medicines,
            alert,
            alternatives,
        }
    }
}
