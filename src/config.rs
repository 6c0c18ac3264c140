use std::env;
use std::time::Duration;

use secrecy::SecretString;
use validator::Validate;

use crate::errors::AppResult;
use crate::services::attempt_session::SessionConfig;

#[derive(Clone, Debug, Validate)]
pub struct Config {
    #[validate(url)]
    pub api_base_url: String,
    pub api_token: SecretString,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
    #[validate(range(min = 1, max = 3600))]
    pub auto_save_interval_secs: u64,
    pub grade_on_submit: bool,
    pub refresh_stats_after_submit: bool,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("ATTEMPT_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            api_token: SecretString::from(env::var("ATTEMPT_API_TOKEN").unwrap_or_default()),
            request_timeout_secs: env_parse("ATTEMPT_REQUEST_TIMEOUT_SECS", 15),
            auto_save_interval_secs: env_parse("ATTEMPT_AUTO_SAVE_INTERVAL_SECS", 30),
            grade_on_submit: env_parse("ATTEMPT_GRADE_ON_SUBMIT", false),
            refresh_stats_after_submit: env_parse("ATTEMPT_REFRESH_STATS", true),
        }
    }

    /// Reads `.env` when present, then the environment, and validates.
    pub fn load() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_save_interval: Duration::from_secs(self.auto_save_interval_secs),
            grade_on_submit: self.grade_on_submit,
            refresh_stats_after_submit: self.refresh_stats_after_submit,
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".to_string(),
            api_token: SecretString::from("test_api_token".to_string()),
            request_timeout_secs: 5,
            auto_save_interval_secs: 30,
            grade_on_submit: false,
            refresh_stats_after_submit: false,
        }
    }
}
