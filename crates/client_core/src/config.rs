use std::fs;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub service_url: String,
    pub default_language: String,
    pub request_timeout_secs: u64,
    pub results_delay_ms: u64,
    pub mock_analysis: bool,
    pub conditions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".into(),
            default_language: "en".into(),
            request_timeout_secs: 30,
            results_delay_ms: 800,
            mock_analysis: false,
            conditions: default_conditions(),
        }
    }
}

fn default_conditions() -> Vec<String> {
    [
        "Diabetes",
        "Hypertension",
        "Kidney Disease",
        "Liver Disease",
        "Pregnancy",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    default_language: Option<String>,
    request_timeout_secs: Option<u64>,
    results_delay_ms: Option<u64>,
    mock_analysis: Option<bool>,
    conditions: Option<Vec<String>>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("client.toml") {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("APP__SERVICE_URL") {
        settings.service_url = v;
    }
    if let Ok(v) = std::env::var("APP__DEFAULT_LANGUAGE") {
        settings.default_language = v;
    }
    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__RESULTS_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.results_delay_ms = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__MOCK_ANALYSIS") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.mock_analysis = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__CONDITIONS") {
        let names: Vec<String> = v
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if !names.is_empty() {
            settings.conditions = names;
        }
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) else {
        return;
    };

    if let Some(v) = file_cfg.service_url {
        settings.service_url = v;
    }
    if let Some(v) = file_cfg.default_language {
        settings.default_language = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.results_delay_ms {
        settings.results_delay_ms = v;
    }
    if let Some(v) = file_cfg.mock_analysis {
        settings.mock_analysis = v;
    }
    if let Some(v) = file_cfg.conditions {
        settings.conditions = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_service() {
        let settings = Settings::default();
        assert_eq!(settings.service_url, "http://127.0.0.1:5000");
        assert_eq!(settings.default_language, "en");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.results_delay_ms, 800);
        assert!(!settings.mock_analysis);
        assert!(!settings.conditions.is_empty());
    }

    #[test]
    fn file_settings_override_defaults() {
        let mut settings = Settings::default();
        apply_file_settings(
            &mut settings,
            r#"
service_url = "http://10.0.0.5:5000"
results_delay_ms = 0
mock_analysis = true
conditions = ["Asthma"]
"#,
        );

        assert_eq!(settings.service_url, "http://10.0.0.5:5000");
        assert_eq!(settings.results_delay_ms, 0);
        assert!(settings.mock_analysis);
        assert_eq!(settings.conditions, vec!["Asthma".to_string()]);
        assert_eq!(settings.default_language, "en");
    }

    #[test]
    fn malformed_file_settings_are_ignored() {
        let mut settings = Settings::default();
        apply_file_settings(&mut settings, "service_url = [not toml");
        assert_eq!(settings.service_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn env_overrides_apply_last() {
        std::env::set_var("APP__SERVICE_URL", "http://192.168.1.20:5000");
        std::env::set_var("APP__RESULTS_DELAY_MS", "25");
        std::env::set_var("APP__CONDITIONS", "Asthma, Gout");

        let settings = load_settings();

        std::env::remove_var("APP__SERVICE_URL");
        std::env::remove_var("APP__RESULTS_DELAY_MS");
        std::env::remove_var("APP__CONDITIONS");

        assert_eq!(settings.service_url, "http://192.168.1.20:5000");
        assert_eq!(settings.results_delay_ms, 25);
        assert_eq!(
            settings.conditions,
            vec!["Asthma".to_string(), "Gout".to_string()]
        );
    }
}
