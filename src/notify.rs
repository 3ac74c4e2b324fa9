//! Telegram notifier
//!
//! Fire-and-forget status delivery over the Bot API. Delivery problems are
//! logged and swallowed; the notifier can never change the run's outcome.

use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::config::Config;
use crate::outcome::{LoginMethod, Outcome};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct Notifier {
    token: String,
    chat_id: String,
    api_base: String,
    timeout: Duration,
}

impl Notifier {
    /// Build from the loaded config; `None` when the Telegram credentials
    /// are not configured.
    pub fn from_config(config: &Config, timeout: Duration) -> Option<Self> {
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => {
                Some(Self::new(token.clone(), chat_id.clone(), timeout))
            }
            _ => {
                info!("Telegram credentials not configured; skipping notifications");
                None
            }
        }
    }

    /// Build straight from the process environment. Used on the config
    /// failure path, where no `Config` exists yet.
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.trim().is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.trim().is_empty())?;
        Some(Self::new(token, chat_id, timeout))
    }

    pub fn new(token: String, chat_id: String, timeout: Duration) -> Self {
        Self {
            token,
            chat_id,
            api_base: TELEGRAM_API_BASE.to_string(),
            timeout,
        }
    }

    /// Point the notifier at a different API host (tests use a mock server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Deliver a message. Never returns an error; failures are logged.
    pub async fn send(&self, text: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let client = match reqwest::Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to build HTTP client for notification: {}", e);
                return;
            }
        };

        match client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Telegram notification delivered");
            }
            Ok(response) => {
                warn!("Telegram notification rejected: HTTP {}", response.status());
            }
            Err(e) => {
                warn!("Telegram notification failed: {}", e);
            }
        }
    }
}

/// Render the Markdown message body for an outcome, timestamped now.
pub fn format_outcome(outcome: &Outcome) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    match outcome {
        Outcome::Success { url, title, method } => format_success(url, title, *method, &timestamp),
        Outcome::Failure { reason, url } => format_failure(reason, url.as_deref(), &timestamp),
    }
}

fn format_success(url: &str, title: &str, method: LoginMethod, timestamp: &str) -> String {
    format!(
        "*Login successful*\n\n\
         Time: {timestamp}\n\
         Page: {url}\n\
         Title: {title}\n\
         Method: {method}"
    )
}

fn format_failure(reason: &str, url: Option<&str>, timestamp: &str) -> String {
    let mut message = format!("*Login failed*\n\nTime: {timestamp}\nReason: {reason}");
    if let Some(url) = url {
        message.push_str(&format!("\nURL: {url}"));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(base: &str) -> Notifier {
        Notifier::new(
            "123456:dummy".to_string(),
            "-100200300".to_string(),
            Duration::from_secs(2),
        )
        .with_api_base(base)
    }

    #[tokio::test]
    async fn sends_the_bot_api_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123456:dummy/sendMessage"))
            .and(body_json(json!({
                "chat_id": "-100200300",
                "text": "*Login successful*",
                "parse_mode": "Markdown",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server.uri()).send("*Login successful*").await;
    }

    #[tokio::test]
    async fn server_error_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        // Must return normally despite the 5xx.
        notifier(&server.uri()).send("anything").await;
    }

    #[tokio::test]
    async fn unreachable_server_is_swallowed() {
        // Nothing listens on this port.
        notifier("http://127.0.0.1:9").send("anything").await;
    }

    #[test]
    fn success_body_contains_page_and_method() {
        let body = format_success(
            "https://panel.example.com/dashboard",
            "Dashboard",
            LoginMethod::SessionReplay,
            "2026-08-26 03:00:00",
        );
        assert!(body.starts_with("*Login successful*"));
        assert!(body.contains("Page: https://panel.example.com/dashboard"));
        assert!(body.contains("Title: Dashboard"));
        assert!(body.contains("Method: session-replay"));
        assert!(body.contains("Time: 2026-08-26 03:00:00"));
    }

    #[test]
    fn failure_body_omits_url_when_unknown() {
        let body = format_failure("Missing environment variables (WEBSITE_URL)", None, "t");
        assert!(body.starts_with("*Login failed*"));
        assert!(body.contains("Reason: Missing environment variables (WEBSITE_URL)"));
        assert!(!body.contains("URL:"));
    }

    #[test]
    fn failure_body_includes_url_when_known() {
        let body = format_failure(
            "Still on login page",
            Some("https://panel.example.com/login"),
            "t",
        );
        assert!(body.contains("URL: https://panel.example.com/login"));
    }
}
