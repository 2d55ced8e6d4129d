use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::intent::IntentRule;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const MODEL_ENV: &str = "CAREBOT_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "carebot".to_string(),
            env: "dev".to_string(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_tokens() -> u32 {
    512
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_negative_turn_threshold() -> usize {
    2
}

fn default_unknown_turn_limit() -> usize {
    2
}

fn default_critical_phrases() -> Vec<String> {
    [
        "urgent",
        "emergency",
        "unacceptable",
        "immediately",
        "hazard",
        "danger",
        "dangerous",
        "fire",
        "gas leak",
        "smoke",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Negative sentiment escalates once the session has more customer turns than this.
    #[serde(default = "default_negative_turn_threshold")]
    pub negative_turn_threshold: usize,
    /// Escalate after more than this many consecutive `unknown` customer turns.
    #[serde(default = "default_unknown_turn_limit")]
    pub unknown_turn_limit: usize,
    #[serde(default = "default_critical_phrases")]
    pub critical_phrases: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            negative_turn_threshold: default_negative_turn_threshold(),
            unknown_turn_limit: default_unknown_turn_limit(),
            critical_phrases: default_critical_phrases(),
        }
    }
}

fn default_session_ttl_secs() -> i64 {
    1800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    #[default]
    Template,
    Generative,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplyConfig {
    #[serde(default)]
    pub mode: ReplyMode,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareConfig {
    #[serde(default)]
    pub app: AppConfig,
    pub inference: InferenceConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Ordered intent rules from `intents.yaml`; empty means the built-in table.
    #[serde(default)]
    pub intent_rules: Vec<IntentRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntentTable {
    #[serde(default)]
    rules: Vec<IntentRule>,
}

impl CareConfig {
    /// Build a config from process environment only (no files).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{API_KEY_ENV} is not set"))?;

        let mut inference = InferenceConfig {
            api_key,
            ..InferenceConfig::default()
        };
        if let Some(base_url) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            inference.base_url = base_url;
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            inference.model = model;
        }

        let config = Self {
            app: AppConfig::default(),
            inference,
            escalation: EscalationConfig::default(),
            session: SessionConfig::default(),
            reply: ReplyConfig::default(),
            server: ServerConfig::default(),
            intent_rules: Vec::new(),
        };
        validate_config(&config)?;
        Ok(config)
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Load `main.yaml` (and `intents.yaml` when present) from a config directory.
pub fn load_config(root: &Path) -> Result<CareConfig> {
    let mut config: CareConfig = read_yaml_file(&root.join("main.yaml"))?;

    let intents_path = root.join("intents.yaml");
    if intents_path.is_file() {
        let table: IntentTable = read_yaml_file(&intents_path)?;
        config.intent_rules = table.rules;
    }

    resolve_config_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &CareConfig) -> Result<()> {
    let inference = &config.inference;
    if inference.api_key.trim().is_empty() {
        bail!("inference.api_key is empty (set {API_KEY_ENV})");
    }
    if !(inference.base_url.starts_with("http://") || inference.base_url.starts_with("https://")) {
        bail!("inference.base_url must be an http(s) url: {}", inference.base_url);
    }
    if inference.model.trim().is_empty() {
        bail!("inference.model is empty");
    }
    if inference.timeout_secs == 0 {
        bail!("inference.timeout_secs must be positive");
    }
    if config.session.ttl_secs <= 0 {
        bail!("session.ttl_secs must be positive");
    }

    for (idx, rule) in config.intent_rules.iter().enumerate() {
        if rule.phrases.is_empty() {
            bail!("intent rule #{idx} ({}) has no phrases", rule.intent);
        }
        if rule.phrases.iter().any(|p| p.trim().is_empty()) {
            bail!("intent rule #{idx} ({}) has a blank phrase", rule.intent);
        }
    }

    Ok(())
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

fn resolve_config_env(config: &mut CareConfig) {
    config.app.name = resolve_env_var(&config.app.name);
    config.app.env = resolve_env_var(&config.app.env);

    let inference = &mut config.inference;
    inference.api_key = resolve_env_var(&inference.api_key);
    inference.base_url = resolve_env_var(&inference.base_url);
    inference.model = resolve_env_var(&inference.model);
    // An unset placeholder falls back to the built-in default.
    if inference.base_url.trim().is_empty() {
        inference.base_url = default_base_url();
    }
    if inference.model.trim().is_empty() {
        inference.model = default_model();
    }

    config.server.bind = resolve_env_var(&config.server.bind);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use carebot_schema::Intent;

    use super::*;

    fn fixture_config_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn load_config_from_workspace_fixtures() {
        if std::env::var(API_KEY_ENV).is_err() {
            std::env::set_var(API_KEY_ENV, "sk-fixture");
        }
        let config = load_config(&fixture_config_root()).unwrap();
        assert_eq!(config.app.name, "carebot");
        assert_eq!(config.escalation.negative_turn_threshold, 2);
        assert!(!config.intent_rules.is_empty());
        assert_eq!(config.intent_rules[0].intent, Intent::EscalationRequest);
        // The shipped table and the built-in fallback must not drift apart.
        assert_eq!(config.intent_rules, crate::intent::default_rules());
    }

    #[test]
    fn load_config_applies_defaults_without_intents_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_file(
            &tmp.path().join("main.yaml"),
            "inference:\n  api_key: sk-test\n",
        );

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.inference.model, "llama3-8b-8192");
        assert_eq!(config.inference.timeout_secs, 20);
        assert_eq!(config.reply.mode, ReplyMode::Template);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert!(config.intent_rules.is_empty());
        assert!(config
            .escalation
            .critical_phrases
            .iter()
            .any(|p| p == "gas leak"));
    }

    #[test]
    fn load_config_rejects_empty_api_key() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_file(
            &tmp.path().join("main.yaml"),
            "inference:\n  api_key: \"${CAREBOT_UNSET_KEY_XYZ}\"\n",
        );

        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("api_key is empty"));
    }

    #[test]
    fn load_config_rejects_blank_intent_phrase() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_file(
            &tmp.path().join("main.yaml"),
            "inference:\n  api_key: sk-test\n",
        );
        write_file(
            &tmp.path().join("intents.yaml"),
            "rules:\n  - intent: greeting\n    phrases: [\"hello\", \"  \"]\n",
        );

        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("blank phrase"));
    }

    #[test]
    fn load_config_missing_file_names_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("main.yaml"));
    }

    #[test]
    fn validate_config_rejects_zero_timeout() {
        let mut config =
            CareConfig::from_lookup(|k| (k == API_KEY_ENV).then(|| "sk".into())).unwrap();
        config.inference.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn from_lookup_reads_key_base_and_model() {
        let env = HashMap::from([
            (API_KEY_ENV, "gsk-123"),
            (API_BASE_ENV, "https://api.groq.com/openai/v1"),
            (MODEL_ENV, "mixtral"),
        ]);
        let config = CareConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.inference.api_key, "gsk-123");
        assert_eq!(config.inference.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.inference.model, "mixtral");
    }

    #[test]
    fn from_lookup_requires_api_key() {
        let err = CareConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn resolve_env_var_replaces_env_placeholder() {
        let expected = std::env::var("PATH").unwrap();
        assert_eq!(resolve_env_var("${PATH}"), expected);
    }

    #[test]
    fn resolve_env_var_returns_raw_when_not_placeholder() {
        assert_eq!(resolve_env_var("plain-value"), "plain-value");
    }

    #[test]
    fn resolve_env_var_unclosed_bracket() {
        assert_eq!(resolve_env_var("prefix_${UNCLOSED"), "prefix_${UNCLOSED");
    }

    #[test]
    fn resolve_env_var_missing_env_returns_empty() {
        assert_eq!(resolve_env_var("val=${CAREBOT_NONEXISTENT_VAR_XYZ}"), "val=");
    }
}
