//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - Builder pattern
//! - Environment variable loading with defaults
//! - Timeout/performance tuning shared between server and client halves

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Well-known public test site key used when no key is configured. Rendering
/// must never fail because a key is missing.
pub const TEST_SITE_KEY: &str = "6LeIxAcTAAAAAJcZVRqyHh71UMIEGNQ_MXjiZKhI";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CAPTCHA_LOAD_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_FORM_SUBMIT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_API_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_RENDER_TIMEOUT_MS: u64 = 5_000;

/// Per-operation timeout tuning, injected into the rendered page as
/// `__PERFORMANCE_CONFIG__` and consumed by the client half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(rename = "CAPTCHA_LOAD_TIMEOUT")]
    pub captcha_load_timeout_ms: u64,
    #[serde(rename = "FORM_SUBMIT_TIMEOUT")]
    pub form_submit_timeout_ms: u64,
    #[serde(rename = "API_TIMEOUT")]
    pub api_timeout_ms: u64,
    #[serde(rename = "RENDER_TIMEOUT")]
    pub render_timeout_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            captcha_load_timeout_ms: DEFAULT_CAPTCHA_LOAD_TIMEOUT_MS,
            form_submit_timeout_ms: DEFAULT_FORM_SUBMIT_TIMEOUT_MS,
            api_timeout_ms: DEFAULT_API_TIMEOUT_MS,
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
        }
    }
}

impl PerformanceConfig {
    pub fn captcha_load_timeout(&self) -> Duration {
        Duration::from_millis(self.captcha_load_timeout_ms)
    }

    pub fn form_submit_timeout(&self) -> Duration {
        Duration::from_millis(self.form_submit_timeout_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

/// Server-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// CAPTCHA site key; `None` falls back to [`TEST_SITE_KEY`].
    pub site_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub performance: PerformanceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            site_key: None,
            allowed_origins: vec![format!("http://localhost:{DEFAULT_PORT}")],
            performance: PerformanceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Obtain a builder to customise the configuration.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Load configuration from the process environment. Missing variables
    /// use defaults; unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parsed::<u16>("PORT") {
            config.port = port;
        }
        if let Ok(key) = std::env::var("RECAPTCHA_SITE_KEY") {
            if !key.trim().is_empty() {
                config.site_key = Some(key);
            }
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            if !origins.is_empty() {
                config.allowed_origins = origins;
            }
        }
        if let Some(ms) = env_parsed("CAPTCHA_LOAD_TIMEOUT") {
            config.performance.captcha_load_timeout_ms = ms;
        }
        if let Some(ms) = env_parsed("FORM_SUBMIT_TIMEOUT") {
            config.performance.form_submit_timeout_ms = ms;
        }
        if let Some(ms) = env_parsed("API_TIMEOUT") {
            config.performance.api_timeout_ms = ms;
        }
        if let Some(ms) = env_parsed("RENDER_TIMEOUT") {
            config.performance.render_timeout_ms = ms;
        }

        config
    }

    /// Effective site key, falling back to the public test key.
    pub fn site_key(&self) -> &str {
        self.site_key.as_deref().unwrap_or(TEST_SITE_KEY)
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring unparseable {name}={raw}");
            None
        }
    }
}

/// Fluent builder for [`AppConfig`].
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn with_site_key(mut self, key: impl Into<String>) -> Self {
        self.config.site_key = Some(key.into());
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_performance(mut self, performance: PerformanceConfig) -> Self {
        self.config.performance = performance;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
