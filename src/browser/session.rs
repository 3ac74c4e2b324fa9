//! Browser session management
//!
//! Launches and drives a single Chrome instance over the DevTools protocol.
//! One run uses one session and one page for its whole lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::BrowserError;
use crate::config::Config;

/// Find Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        // Also check %LOCALAPPDATA%
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![
            std::path::PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            std::path::PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
            std::path::PathBuf::from("/snap/bin/chromium"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// Quote a string for safe embedding in a generated JavaScript snippet.
fn js_str(s: &str) -> String {
    serde_json::json!(s).to_string()
}

/// A single Chrome browser session driving one page.
pub struct PanelSession {
    browser: Option<Browser>,
    page: Page,
    alive: Arc<AtomicBool>,
}

impl PanelSession {
    /// Launch Chrome and attach to its initial tab.
    pub async fn launch(config: &Config) -> Result<Self, BrowserError> {
        let executable = config
            .chrome_path
            .clone()
            .map(std::path::PathBuf::from)
            .or_else(find_chrome)
            .ok_or_else(|| {
                BrowserError::LaunchFailed(
                    "Chrome/Chromium not found; install Chrome or set CHROME_PATH".to_string(),
                )
            })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-default-browser-check")
            .arg("--no-first-run")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-session-crashed-bubble")
            .arg("--disable-notifications")
            .arg("--disable-save-password-bubble")
            .arg("--no-sandbox");

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));

        // Drain CDP events; when the stream ends Chrome is gone.
        let alive_flag = alive.clone();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
            warn!("Chrome disconnected (event stream ended)");
            alive_flag.store(false, Ordering::Relaxed);
        });

        // Chrome starts with one blank tab; reuse it, close any extras.
        let mut pages = browser
            .pages()
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        let page = if pages.is_empty() {
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
        } else {
            pages.remove(0)
        };
        for extra in pages {
            let _ = extra.close().await;
        }

        info!(
            "Browser session launched ({}, headless: {})",
            executable.display(),
            config.headless
        );

        Ok(Self {
            browser: Some(browser),
            page,
            alive,
        })
    }

    /// Whether the Chrome process is still connected.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    /// Reload the current page without waiting for load completion; callers
    /// pace themselves through the wait policy.
    pub async fn reload(&self) -> Result<(), BrowserError> {
        self.page
            .evaluate("window.location.reload()")
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    /// Evaluate JavaScript on the page, returning the result as JSON.
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.evaluate_with_timeout(script, Duration::from_secs(30)).await
    }

    pub async fn evaluate_with_timeout(
        &self,
        script: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, BrowserError> {
        if !self.is_alive() {
            return Err(BrowserError::ConnectionLost(
                "browser process is gone".to_string(),
            ));
        }
        let result = tokio::time::timeout(timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "JavaScript evaluation timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    pub async fn current_url(&self) -> Result<String, BrowserError> {
        let value = self.evaluate("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::JavaScriptError("page returned no URL".to_string()))
    }

    pub async fn title(&self) -> Result<String, BrowserError> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Wait until `selector` matches a visible element, polling the DOM.
    /// `what` names the element in the error on expiry.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
        what: &str,
    ) -> Result<(), BrowserError> {
        let script = format!(
            r#"
            (async () => {{
                const deadline = Date.now() + {timeout_ms};
                while (Date.now() < deadline) {{
                    const el = document.querySelector({sel});
                    if (el && el.offsetParent !== null) return true;
                    await new Promise(r => setTimeout(r, 250));
                }}
                const el = document.querySelector({sel});
                return el !== null && el.offsetParent !== null;
            }})()
            "#,
            timeout_ms = timeout.as_millis(),
            sel = js_str(selector),
        );

        let found = self
            .evaluate_with_timeout(&script, timeout + Duration::from_secs(5))
            .await?;

        if found.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(what.to_string()))
        }
    }

    /// Focus an input and type text character by character with small random
    /// delays between keystrokes.
    pub async fn type_into(
        &self,
        selector: &str,
        text: &str,
        what: &str,
    ) -> Result<(), BrowserError> {
        let script = format!(
            r#"
            (async () => {{
                const el = document.querySelector({sel});
                if (!el) return {{ ok: false }};
                el.click();
                el.focus();
                el.value = '';
                const text = {text};
                for (const ch of text) {{
                    await new Promise(r => setTimeout(r, 40 + Math.random() * 90));
                    el.value += ch;
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                }}
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return {{ ok: true }};
            }})()
            "#,
            sel = js_str(selector),
            text = js_str(text),
        );

        let result = self.evaluate(&script).await?;
        if result.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(what.to_string()))
        }
    }

    /// Click the first element matching `selector` through CDP input events.
    pub async fn click(&self, selector: &str, what: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(what.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;
        Ok(())
    }

    /// Apply stored cookie records to the browser. Records that fail to
    /// deserialize are skipped. Returns the number of cookies applied.
    pub async fn inject_cookies(&self, records: &[serde_json::Value]) -> usize {
        let params: Vec<CookieParam> = records
            .iter()
            .filter_map(|record| serde_json::from_value(record.clone()).ok())
            .collect();

        let skipped = records.len() - params.len();
        if skipped > 0 {
            warn!("{} cookie record(s) were malformed and skipped", skipped);
        }
        if params.is_empty() {
            return 0;
        }

        let count = params.len();
        match self.page.execute(SetCookiesParams::new(params)).await {
            Ok(_) => count,
            Err(e) => {
                warn!("Cookie injection failed: {}", e);
                0
            }
        }
    }

    /// Capture a full-page PNG screenshot. Best effort: capture or write
    /// failures are logged, never propagated.
    pub async fn save_screenshot(&self, path: &str) {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        match self.page.screenshot(params).await {
            Ok(bytes) => match std::fs::write(path, &bytes) {
                Ok(()) => info!("Diagnostic screenshot saved: {}", path),
                Err(e) => warn!("Failed to write screenshot {}: {}", path, e),
            },
            Err(e) => warn!("Screenshot capture failed: {}", e),
        }
    }

    /// Shut down: close the page, ask Chrome to exit, then force-kill after
    /// a short grace period.
    pub async fn close(mut self) {
        self.alive.store(false, Ordering::Relaxed);

        let _ = self.page.clone().close().await;

        if let Some(mut browser) = self.browser.take() {
            let _ = browser.close().await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = browser.kill().await;
        }

        info!("Browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_str_escapes_quotes_and_backslashes() {
        assert_eq!(js_str("plain"), r#""plain""#);
        assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_str(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn js_str_output_embeds_into_selector_query() {
        let script = format!("document.querySelector({})", js_str(r#"button[type="submit"]"#));
        assert_eq!(
            script,
            r#"document.querySelector("button[type=\"submit\"]")"#
        );
    }
}
