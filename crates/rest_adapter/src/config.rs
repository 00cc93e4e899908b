use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".into(),
            timeout_seconds: 30,
            page_size: 10,
        }
    }
}

/// Defaults, overlaid by `client.toml` in the working directory, overlaid by
/// environment variables. Unparseable values are ignored rather than fatal.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("client.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_overrides(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = std::env::var("API_BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.base_url = v;
    }

    if let Ok(v) = std::env::var("API_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.timeout_seconds = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__API_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.timeout_seconds = parsed;
        }
    }

    if let Ok(v) = std::env::var("API_PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__API_PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("base_url") {
        settings.base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("timeout_seconds") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.timeout_seconds = parsed;
        }
    }
    if let Some(v) = file_cfg.get("page_size") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed;
        }
    }
}
