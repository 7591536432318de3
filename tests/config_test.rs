//! Configuration loading and factory wiring

use anyhow::Result;
use prompt_enhancer::config::Config;
use prompt_enhancer::llm::factory::create_client;
use prompt_enhancer::session::RateLimiter;
use serial_test::serial;
use std::io::Write;
use std::time::{Duration, SystemTime};

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert_eq!(config.llm.model, "claude-haiku-4-5-20251001");
    assert_eq!(config.llm.timeout_secs, 120);
    assert_eq!(config.limits.min_interval_secs, 10);
    assert_eq!(config.limits.analysis_max_tokens, 512);
    assert_eq!(config.limits.questions_max_tokens, 1024);
    assert_eq!(config.limits.build_max_tokens, 2048);

    Ok(())
}

#[test]
fn test_full_config_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[llm]
provider = "gemini"
model = "gemini-2.0-flash"
api_key_env = "GEMINI_API_KEY"
max_tokens = 1000

[limits]
max_questions = 2
min_interval_secs = 3
max_requests_per_session = 5
"#
    )?;

    let config = Config::load_with_path(Some(file.path().to_string_lossy().to_string()))?;
    assert_eq!(config.llm.provider, "gemini");
    assert_eq!(config.llm.max_tokens, Some(1000));
    assert_eq!(config.limits.max_questions, 2);
    assert_eq!(config.limits.max_prompt_chars, 6000);

    let limiter = RateLimiter::from_limits(&config.limits);
    let mut state = prompt_enhancer::session::SessionState::new();
    let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
    limiter.acquire(&mut state, t0).unwrap();
    assert!(limiter.check(&state, t0 + Duration::from_secs(2)).is_err());
    assert!(limiter.check(&state, t0 + Duration::from_secs(3)).is_ok());
    Ok(())
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[llm\nprovider = ").unwrap();
    assert!(Config::load_with_path(Some(file.path().to_string_lossy().to_string())).is_err());
}

#[test]
#[serial]
fn test_secrets_file_feeds_factory() -> Result<()> {
    let mut secrets = tempfile::NamedTempFile::new()?;
    writeln!(secrets, "PE_IT_OPENAI_KEY = \"sk-from-store\"")?;

    let mut config = Config::default();
    config.llm.provider = "openai".to_string();
    config.llm.model = "gpt-4o-mini".to_string();
    config.llm.api_key_env = "PE_IT_OPENAI_KEY".to_string();
    config.llm.secrets_file = Some(secrets.path().to_path_buf());

    let key = config.resolve_api_key().expect("key from store");
    assert_eq!(key.expose(), "sk-from-store");
    assert!(!format!("{:?}", key).contains("sk-from-store"));

    let client = create_client(&config, false)?;
    assert_eq!(client.model_name(), "gpt-4o-mini");
    Ok(())
}
