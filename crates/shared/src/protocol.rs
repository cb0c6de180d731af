use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_hex: Option<String>,
    #[serde(default)]
    pub medicines_found: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisVerdict>,
}

impl AnalysisEnvelope {
    pub fn success(verdict: AnalysisVerdict) -> Self {
        Self {
            status: "success".into(),
            data: Some(verdict),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_defaults_fill_missing_fields() {
        let verdict: AnalysisVerdict =
            serde_json::from_str(r#"{"risk_level": "Low"}"#).expect("minimal verdict parses");
        assert_eq!(verdict.risk_level, "Low");
        assert!(verdict.risk_hex.is_none());
        assert!(verdict.medicines_found.is_empty());
        assert!(verdict.alert_message.is_none());
        assert!(verdict.alternatives.is_empty());
    }

    #[test]
    fn verdict_ignores_unknown_service_fields() {
        let raw = r##"{
            "risk_level": "Critical",
            "risk_color": "red",
            "risk_hex": "#ef4444",
            "medicines_found": ["Warfarin", "Aspirin"],
            "alert_message": "Do not combine.",
            "alternatives": ["Acetaminophen"],
            "disclaimer": "AI-generated."
        }"##;
        let verdict: AnalysisVerdict = serde_json::from_str(raw).expect("full verdict parses");
        assert_eq!(verdict.medicines_found.len(), 2);
        assert_eq!(verdict.risk_hex.as_deref(), Some("#ef4444"));
    }

    #[test]
    fn envelope_without_data_deserializes() {
        let envelope: AnalysisEnvelope =
            serde_json::from_str(r#"{"status": "error"}"#).expect("bare envelope parses");
        assert_eq!(envelope.status, "error");
        assert!(envelope.data.is_none());
    }
}
