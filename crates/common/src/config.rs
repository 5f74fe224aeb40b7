//! Harness configuration
//!
//! Values come from three layers, later layers winning: built-in defaults,
//! an optional TOML file, and the process environment. The CLI applies its
//! own flags on top of the loaded value.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable holding the API access key
pub const ENV_API_KEY: &str = "KINOPOISK_API_KEY";
/// Environment override for the API base URL
pub const ENV_API_URL: &str = "KINOCHECK_API_URL";
/// Environment override for the site base URL
pub const ENV_SITE_URL: &str = "KINOCHECK_SITE_URL";
/// Environment override for the Chrome executable
pub const ENV_CHROME: &str = "KINOCHECK_CHROME";
/// Environment override for the report directory
pub const ENV_OUTPUT_DIR: &str = "KINOCHECK_OUTPUT_DIR";

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub api: ApiConfig,
    pub site: SiteConfig,
    pub browser: BrowserSettings,
    pub timing: TimingConfig,
    pub report: ReportConfig,
}

/// API endpoint configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without the version prefix
    pub base_url: String,

    /// Access key sent as `X-API-KEY`. Never written back out.
    #[serde(skip_serializing)]
    pub key: Option<String>,

    /// Per-request timeout
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kinopoisk.dev".to_string(),
            key: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Web front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL of the site, with trailing slash
    pub base_url: String,

    /// Text the home page title must contain
    pub title_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.kinopoisk.ru/".to_string(),
            title_marker: "Кинопоиск".to_string(),
        }
    }
}

/// Browser launch settings handed to the session provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,

    /// Explicit Chrome/Chromium binary (None = auto-detect)
    pub chrome_executable: Option<PathBuf>,

    /// Extra command-line switches passed to the browser
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            chrome_executable: None,
            extra_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
            ],
        }
    }
}

/// Wait budgets and settle delays, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub consent_timeout_ms: u64,
    pub page_ready_timeout_ms: u64,
    pub poll_interval_ms: u64,

    /// Render settle time after a navigation
    pub post_navigation_settle_ms: u64,

    /// Settle time after the consent overlay is dismissed
    pub post_consent_settle_ms: u64,

    /// Settle time after typing into an input
    pub post_input_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            consent_timeout_ms: 5_000,
            page_ready_timeout_ms: 15_000,
            poll_interval_ms: 250,
            post_navigation_settle_ms: 3_000,
            post_consent_settle_ms: 1_000,
            post_input_settle_ms: 1_000,
        }
    }
}

impl TimingConfig {
    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }

    pub fn page_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.page_ready_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn post_navigation_settle(&self) -> Duration {
        Duration::from_millis(self.post_navigation_settle_ms)
    }

    pub fn post_consent_settle(&self) -> Duration {
        Duration::from_millis(self.post_consent_settle_ms)
    }

    pub fn post_input_settle(&self) -> Duration {
        Duration::from_millis(self.post_input_settle_ms)
    }

    /// All waits and delays zeroed except a minimal poll interval
    pub fn immediate() -> Self {
        Self {
            consent_timeout_ms: 0,
            page_ready_timeout_ms: 0,
            poll_interval_ms: 1,
            post_navigation_settle_ms: 0,
            post_consent_settle_ms: 0,
            post_input_settle_ms: 0,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,

    /// How many characters of a response body are kept as evidence
    pub body_preview_chars: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
            body_preview_chars: 200,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from an optional TOML file, then overlay the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without touching the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay values using an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.api.key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(url) = lookup(ENV_SITE_URL) {
            self.site.base_url = url;
        }
        if let Some(chrome) = lookup(ENV_CHROME) {
            self.browser.chrome_executable = Some(PathBuf::from(chrome));
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.report.output_dir = PathBuf::from(dir);
        }
    }

    /// Reject values the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("api.base_url", &self.api.base_url),
            ("site.base_url", &self.site.base_url),
        ];
        for (field, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, url
                )));
            }
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "timing.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "api.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The API access key, required by every API check
    pub fn api_key(&self) -> Result<&str> {
        self.api.key.as_deref().ok_or(Error::MissingApiKey)
    }
}
