use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_settings;
use crate::core::errors::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_EXACT: [&str; 2] = ["key", "token"];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Loads [`Settings`] from `config.yml`, `secrets.yaml` and the environment,
/// later sources overriding earlier ones.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        self.paths.data_dir.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        self.load_settings_with(|name| env::var(name).ok())
    }

    /// Same as [`load_settings`](Self::load_settings) with an injectable
    /// environment lookup.
    pub fn load_settings_with<F>(&self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let file_config = deep_merge(&public_config, &secrets_config);
        let merged = deep_merge(&file_config, &env_overrides(lookup)?);

        let settings: Settings = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Settings as JSON with every secret replaced by a placeholder.
    pub fn redacted(settings: &Settings) -> Value {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        redact_sensitive_values(&value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(_) => Ok(value),
        _ => Ok(Value::Object(Map::new())),
    }
}

fn env_overrides<F>(lookup: F) -> Result<Value, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let mut root = Map::new();
    let mut server = Map::new();
    let mut hf = Map::new();
    let mut supabase = Map::new();

    if let Some(host) = get("HOST") {
        server.insert("host".to_string(), json!(host));
    }
    if let Some(port) = get("PORT") {
        let port = port.parse::<u16>().map_err(|e| ConfigError::Env {
            name: "PORT",
            message: e.to_string(),
        })?;
        server.insert("port".to_string(), json!(port));
    }
    if let Some(local) = get("LOCAL") {
        let backend = if is_truthy(&local) { "local" } else { "supabase" };
        root.insert("backend".to_string(), json!(backend));
    }
    for (var, key) in [
        ("HF_API_TOKEN", "api_token"),
        ("HF_MODEL", "chat_model"),
        ("HF_EMBEDDING_MODEL", "embedding_model"),
        ("HF_BASE_URL", "base_url"),
    ] {
        if let Some(value) = get(var) {
            hf.insert(key.to_string(), json!(value));
        }
    }
    for (var, key) in [("SUPABASE_URL", "url"), ("SUPABASE_KEY", "key")] {
        if let Some(value) = get(var) {
            supabase.insert(key.to_string(), json!(value));
        }
    }

    for (key, section) in [("server", server), ("huggingface", hf), ("supabase", supabase)] {
        if !section.is_empty() {
            root.insert(key.to_string(), Value::Object(section));
        }
    }

    Ok(Value::Object(root))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_EXACT.iter().any(|exact| *exact == key_lower)
        || SENSITIVE_PATTERNS
            .iter()
            .any(|pattern| key_lower.contains(pattern))
}
