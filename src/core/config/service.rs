use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_settings;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_generation_tokens", "max_tokens"];

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
    Float,
    List,
}

/// Environment variables recognized on top of `config.yml`, in apply order.
///
/// `HUGGINGFACE_API_KEY` precedes `LLM_API_KEY` so the latter wins when both
/// are set.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 19] = [
    ("EMBEDDER_MODEL", &["models", "embedder"], EnvKind::Text),
    ("GENERATOR_MODEL", &["models", "generator"], EnvKind::Text),
    ("LLM_BASE_URL", &["models", "base_url"], EnvKind::Text),
    ("EMBEDDER_BASE_URL", &["models", "embedder_base_url"], EnvKind::Text),
    ("HUGGINGFACE_API_KEY", &["models", "api_key"], EnvKind::Text),
    ("LLM_API_KEY", &["models", "api_key"], EnvKind::Text),
    ("MAX_GENERATION_TOKENS", &["models", "max_generation_tokens"], EnvKind::Integer),
    ("GENERATION_TIMEOUT_SECS", &["models", "generation_timeout_secs"], EnvKind::Integer),
    ("TOP_K", &["retrieval", "top_k"], EnvKind::Integer),
    ("RETRIEVE_MULTIPLIER", &["retrieval", "retrieve_multiplier"], EnvKind::Integer),
    ("SIMILARITY_THRESHOLD", &["retrieval", "similarity_threshold"], EnvKind::Float),
    ("MAX_SECTION_CHARS", &["retrieval", "max_section_chars"], EnvKind::Integer),
    ("QUERY_EMBED_CACHE_SIZE", &["retrieval", "query_embed_cache_size"], EnvKind::Integer),
    ("EXPLANATION_CACHE_SIZE", &["retrieval", "explanation_cache_size"], EnvKind::Integer),
    ("VECTOR_INDEX_PATH", &["index", "vector_index_path"], EnvKind::Text),
    ("META_PATH", &["index", "meta_path"], EnvKind::Text),
    ("HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
    ("CORS_ORIGINS", &["server", "cors_origins"], EnvKind::List),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {name}: '{value}' is not a valid {expected}")]
    InvalidEnv {
        name: String,
        value: String,
        expected: &'static str,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("LAWBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let data_config = self.paths.data_dir.join("config.yml");
        if data_config.exists() {
            return data_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads settings from `config.yml` and the process environment.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        self.load_settings_with(|name| env::var(name).ok())
    }

    /// Same as [`load_settings`](Self::load_settings) with an injectable
    /// environment lookup.
    pub fn load_settings_with<F>(&self, lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_config = load_yaml_file(&self.config_path())?;
        let env_config = env_overlay(lookup)?;
        let merged = deep_merge(&file_config, &env_config);

        let settings: Settings = serde_json::from_value(merged)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Settings rendered as JSON with credentials masked, for startup logs.
    pub fn redacted(&self, settings: &Settings) -> Value {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        redact_sensitive_values(&value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(_) => Ok(value),
        // An empty file parses to null.
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Invalid(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn env_overlay<F>(lookup: F) -> Result<Value, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut overlay = Value::Object(Map::new());

    for (name, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = parse_env_value(name, raw, kind)?;
        ensure_object_path(&mut overlay, path, value);
    }

    Ok(overlay)
}

fn parse_env_value(name: &str, raw: &str, kind: EnvKind) -> Result<Value, ConfigError> {
    let invalid = |expected| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: raw.to_string(),
        expected,
    };

    match kind {
        EnvKind::Text => Ok(Value::String(raw.to_string())),
        EnvKind::Integer => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("non-negative integer")),
        EnvKind::Float => {
            let number = raw.parse::<f64>().map_err(|_| invalid("number"))?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| invalid("finite number"))
        }
        EnvKind::List => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
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
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::with_root(
            dir.to_path_buf(),
            dir.to_path_buf(),
        )))
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = service_in(dir.path())
            .load_settings_with(env_from(&[]))
            .expect("defaults are valid");

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.query_embed_cache_size, 512);
        assert_eq!(settings.server.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.yml"),
            "retrieval:\n  top_k: 7\n  max_section_chars: 900\nmodels:\n  generator: file-model\n",
        )
        .expect("write config");

        let settings = service_in(dir.path())
            .load_settings_with(env_from(&[
                ("TOP_K", "4"),
                ("SIMILARITY_THRESHOLD", "0.35"),
                ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ]))
            .expect("valid settings");

        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.retrieval.max_section_chars, 900);
        assert!((settings.retrieval.similarity_threshold - 0.35).abs() < 1e-6);
        assert_eq!(settings.models.generator, "file-model");
        assert_eq!(
            settings.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn llm_api_key_wins_over_huggingface_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = service_in(dir.path())
            .load_settings_with(env_from(&[
                ("HUGGINGFACE_API_KEY", "hf-key"),
                ("LLM_API_KEY", "llm-key"),
            ]))
            .expect("valid settings");
        assert_eq!(settings.models.api_key.as_deref(), Some("llm-key"));

        let settings = service_in(dir.path())
            .load_settings_with(env_from(&[("HUGGINGFACE_API_KEY", "hf-key")]))
            .expect("valid settings");
        assert_eq!(settings.models.api_key.as_deref(), Some("hf-key"));
    }

    #[test]
    fn unparseable_env_value_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service_in(dir.path())
            .load_settings_with(env_from(&[("TOP_K", "three")]))
            .expect_err("TOP_K must be numeric");
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "TOP_K"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.yml"), "retrieval: [unclosed").expect("write");
        let err = service_in(dir.path())
            .load_settings_with(env_from(&[]))
            .expect_err("broken yaml");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redacted_masks_api_key_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(dir.path());
        let mut settings = Settings::default();
        settings.models.api_key = Some("hf_secret".to_string());

        let redacted = service.redacted(&settings);

        assert_eq!(redacted["models"]["api_key"], json!("****"));
        assert_eq!(redacted["models"]["max_generation_tokens"], json!(256));
    }
}
