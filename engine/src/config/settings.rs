// Engine settings, loaded from defaults plus environment variables.
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    /// Where the dataset (actions + justification inputs) is persisted.
    pub data_file: PathBuf,
    /// API key for the narrative-report service. Reports are unavailable
    /// without it; everything numeric works regardless.
    pub api_key: Option<String>,
    pub report_model: String,
    pub report_api_base: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            data_file: PathBuf::from("justifications.json"),
            api_key: None,
            report_model: "gemini-1.5-flash".to_string(),
            report_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        let mut settings = EngineSettings::default();
        if let Ok(path) = std::env::var("FPJUST_DATA_FILE") {
            if !path.is_empty() {
                settings.data_file = PathBuf::from(path);
            }
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                settings.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("FPJUST_REPORT_MODEL") {
            if !model.is_empty() {
                settings.report_model = model;
            }
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_no_api_key() {
        let settings = EngineSettings::default();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.data_file, PathBuf::from("justifications.json"));
    }
}
