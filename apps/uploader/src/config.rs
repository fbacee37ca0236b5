use std::{collections::HashMap, fs, path::Path, time::Duration};

use shared::domain::DEFAULT_FILE_FIELD;
use tracing::warn;

pub const SETTINGS_FILE: &str = "uploader.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub file_field: String,
    pub timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            file_field: DEFAULT_FILE_FIELD.into(),
            timeout_seconds: 300,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

pub fn load_settings() -> Settings {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Path::new(SETTINGS_FILE), &env)
}

/// File values first, then environment overrides; unreadable or malformed
/// sources are skipped.
pub fn load_settings_from(path: &Path, env: &HashMap<String, String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_values(&mut settings, &file_cfg),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring malformed settings file")
            }
        }
    }

    if let Some(v) = env.get("UPLOADER_SERVER_URL") {
        settings.server_url = v.clone();
    }
    if let Some(v) = env.get("APP__SERVER_URL") {
        settings.server_url = v.clone();
    }

    if let Some(v) = env.get("APP__FILE_FIELD") {
        settings.file_field = v.clone();
    }

    if let Some(v) = env.get("APP__TIMEOUT_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.timeout_seconds = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__TIMEOUT_SECONDS"),
        }
    }

    settings
}

fn apply_file_values(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("file_field").and_then(toml::Value::as_str) {
        settings.file_field = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("timeout_seconds")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.timeout_seconds = v;
    }
}
