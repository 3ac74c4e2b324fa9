//! Task configuration
//!
//! One `Config` is built from the process environment at startup and passed
//! down explicitly; nothing reads environment variables after this point.

use thiserror::Error;

/// Default post-submit wait in seconds. Long enough for a third-party
/// CAPTCHA widget to auto-resolve or time out.
pub const DEFAULT_POST_SUBMIT_WAIT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variables ({})", names.join(", "))]
    Missing { names: Vec<&'static str> },
}

/// Runtime configuration for one login run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Login page of the target control panel
    pub website_url: String,
    pub username: String,
    pub password: String,

    /// Telegram credentials; notifications are skipped when unset
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    /// Serialized JSON array of cookie records from a previous session
    pub session_cookies: Option<String>,

    pub headless: bool,
    pub chrome_path: Option<String>,
    pub post_submit_wait_secs: u64,
    /// Allow the classifier to fall back to probing for a dashboard element
    pub dashboard_probe: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary lookup function. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing: Vec<&'static str> = Vec::new();
        let mut required = |name: &'static str| -> String {
            match get(name) {
                Some(value) => value,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let website_url = required("WEBSITE_URL");
        let username = required("LOGIN_USERNAME");
        let password = required("LOGIN_PASSWORD");

        if !missing.is_empty() {
            return Err(ConfigError::Missing { names: missing });
        }

        Ok(Self {
            website_url,
            username,
            password,
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            session_cookies: get("SESSION_COOKIES"),
            headless: get("HEADLESS").map(|v| parse_bool(&v)).unwrap_or(true),
            chrome_path: get("CHROME_PATH"),
            post_submit_wait_secs: get("POST_SUBMIT_WAIT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POST_SUBMIT_WAIT_SECS),
            dashboard_probe: get("DASHBOARD_PROBE").map(|v| parse_bool(&v)).unwrap_or(true),
        })
    }
}

fn parse_bool(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}
