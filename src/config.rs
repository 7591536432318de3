use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::util::SecretString;

const APP_DIR: &str = "prompt-enhancer";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "anthropic" (default), "openai" or "gemini"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Deployment secret store, checked before the environment.
    /// Defaults to `<config dir>/prompt-enhancer/secrets.toml`.
    #[serde(default)]
    pub secrets_file: Option<PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Optional ceiling applied to every call's max output tokens
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            secrets_file: None,
            base_url: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Input caps, per-call token budgets and per-session rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_answer_chars")]
    pub max_answer_chars: usize,
    /// Clarifying questions requested from the model (the synthetic
    /// output-format question comes on top)
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    /// Minimum seconds between two generation calls; 0 disables the cooldown
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_requests_per_session")]
    pub max_requests_per_session: u32,
    #[serde(default = "default_analysis_tokens")]
    pub analysis_max_tokens: u32,
    #[serde(default = "default_questions_tokens")]
    pub questions_max_tokens: u32,
    #[serde(default = "default_build_tokens")]
    pub build_max_tokens: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            max_answer_chars: default_max_answer_chars(),
            max_questions: default_max_questions(),
            min_interval_secs: default_min_interval_secs(),
            max_requests_per_session: default_max_requests_per_session(),
            analysis_max_tokens: default_analysis_tokens(),
            questions_max_tokens: default_questions_tokens(),
            build_max_tokens: default_build_tokens(),
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_prompt_chars() -> usize {
    6000
}

fn default_max_answer_chars() -> usize {
    1000
}

fn default_max_questions() -> usize {
    4
}

fn default_min_interval_secs() -> u64 {
    10
}

fn default_max_requests_per_session() -> u32 {
    20
}

fn default_analysis_tokens() -> u32 {
    512
}

fn default_questions_tokens() -> u32 {
    1024
}

fn default_build_tokens() -> u32 {
    2048
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("failed to load config from {}", config_path));
        }

        // Per-directory config first
        if Path::new("prompt-enhancer.toml").exists() {
            let config = Self::load_from_path("prompt-enhancer.toml")?;
            debug!("Loaded config from ./prompt-enhancer.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join("config.toml");
            if config_path.exists() {
                let config = Self::load_from_path(&config_path)?;
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn secrets_path(&self) -> Option<PathBuf> {
        self.llm
            .secrets_file
            .clone()
            .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR).join("secrets.toml")))
    }

    /// Resolve the API key: deployment secret store first, then the
    /// environment variable. `None` means the service is not configured.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        let name = self.llm.api_key_env.as_str();

        if let Some(path) = self.secrets_path() {
            match read_secret(&path, name) {
                Ok(Some(value)) => {
                    debug!("API key {} resolved from secret store", name);
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => warn!("ignoring unreadable secret store {:?}: {}", path, e),
            }
        }

        env::var(name)
            .ok()
            .map(SecretString::new)
            .filter(|k| !k.is_empty())
    }
}

/// Look up `name` in a flat TOML secrets file. A missing file is not an error.
fn read_secret(path: &Path, name: &str) -> Result<Option<SecretString>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let table: BTreeMap<String, toml::Value> = toml::from_str(&content)?;
    Ok(table
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| SecretString::new(s.to_string()))
        .filter(|k| !k.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.limits.max_prompt_chars, 6000);
        assert_eq!(config.limits.max_answer_chars, 1000);
        assert_eq!(config.limits.max_questions, 4);
        assert_eq!(config.limits.max_requests_per_session, 20);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("provider = \"anthropic\""));
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
provider = "openai"
model = "gpt-4o"

[limits]
min_interval_secs = 0
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.limits.min_interval_secs, 0);
        assert_eq!(config.limits.max_questions, 4);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_requests_per_session = 3").unwrap();
        let config =
            Config::load_with_path(Some(file.path().to_string_lossy().to_string())).unwrap();
        assert_eq!(config.limits.max_requests_per_session, 3);
    }

    #[test]
    fn test_load_from_missing_explicit_path_fails() {
        let result = Config::load_with_path(Some("/nonexistent/prompt-enhancer.toml".to_string()));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_secret_store_wins_over_env() {
        let mut secrets = tempfile::NamedTempFile::new().unwrap();
        writeln!(secrets, "PE_TEST_KEY_STORE = \"from-store\"").unwrap();
        env::set_var("PE_TEST_KEY_STORE", "from-env");

        let mut config = Config::default();
        config.llm.api_key_env = "PE_TEST_KEY_STORE".to_string();
        config.llm.secrets_file = Some(secrets.path().to_path_buf());

        let key = config.resolve_api_key().unwrap();
        assert_eq!(key.expose(), "from-store");
        env::remove_var("PE_TEST_KEY_STORE");
    }

    #[test]
    #[serial]
    fn test_env_used_when_store_lacks_key() {
        let mut secrets = tempfile::NamedTempFile::new().unwrap();
        writeln!(secrets, "OTHER_KEY = \"nope\"").unwrap();
        env::set_var("PE_TEST_KEY_ENV", "from-env");

        let mut config = Config::default();
        config.llm.api_key_env = "PE_TEST_KEY_ENV".to_string();
        config.llm.secrets_file = Some(secrets.path().to_path_buf());

        assert_eq!(config.resolve_api_key().unwrap().expose(), "from-env");
        env::remove_var("PE_TEST_KEY_ENV");
    }

    #[test]
    #[serial]
    fn test_missing_key_resolves_to_none() {
        let mut config = Config::default();
        config.llm.api_key_env = "PE_TEST_NONEXISTENT_KEY_99999".to_string();
        config.llm.secrets_file = Some(PathBuf::from("/nonexistent/secrets.toml"));
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    #[serial]
    fn test_blank_env_key_resolves_to_none() {
        env::set_var("PE_TEST_BLANK_KEY", "  ");
        let mut config = Config::default();
        config.llm.api_key_env = "PE_TEST_BLANK_KEY".to_string();
        config.llm.secrets_file = Some(PathBuf::from("/nonexistent/secrets.toml"));
        assert!(config.resolve_api_key().is_none());
        env::remove_var("PE_TEST_BLANK_KEY");
    }

    #[test]
    #[serial]
    fn test_malformed_secret_store_falls_back_to_env() {
        let mut secrets = tempfile::NamedTempFile::new().unwrap();
        writeln!(secrets, "this is = = not toml").unwrap();
        env::set_var("PE_TEST_KEY_MALFORMED", "from-env");

        let mut config = Config::default();
        config.llm.api_key_env = "PE_TEST_KEY_MALFORMED".to_string();
        config.llm.secrets_file = Some(secrets.path().to_path_buf());

        assert_eq!(config.resolve_api_key().unwrap().expose(), "from-env");
        env::remove_var("PE_TEST_KEY_MALFORMED");
    }
}
