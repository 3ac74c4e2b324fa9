//! Keep-alive navigation
//!
//! After a confirmed login the task clicks through to a server console so
//! the account registers real activity. Strictly best effort: nothing in
//! here may turn a successful login into a failure.

use std::time::Duration;

use tracing::{info, warn};

use crate::browser::{BrowserError, PanelSession};
use crate::wait::WaitPolicy;

pub(crate) mod selectors {
    pub const SERVER_CARD: &str = "a.server-card";
    pub const SERVER_TITLE: &str = ".server-title";
}

/// Placeholder when the dashboard card carries no readable label.
pub const UNKNOWN_SERVER_LABEL: &str = "unknown";

/// Bounded probe for the dashboard-only entry element. Doubles as the
/// classifier's last-resort authentication signal.
pub async fn dashboard_element_present(session: &PanelSession, timeout: Duration) -> bool {
    session
        .wait_for_element(selectors::SERVER_CARD, timeout, "server card")
        .await
        .is_ok()
}

/// Click through to the first server console. Returns the landing page's
/// `(url, title)` when the click-through happened, `None` otherwise.
pub async fn visit_dashboard(
    session: &PanelSession,
    waits: &WaitPolicy,
) -> Option<(String, String)> {
    match visit_inner(session, waits).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Keep-alive navigation failed ({}); login already succeeded, continuing", e);
            None
        }
    }
}

async fn visit_inner(
    session: &PanelSession,
    waits: &WaitPolicy,
) -> Result<Option<(String, String)>, BrowserError> {
    if session
        .wait_for_element(selectors::SERVER_CARD, waits.card_wait, "server card")
        .await
        .is_err()
    {
        warn!("No server card found; the dashboard layout may have changed");
        return Ok(None);
    }

    let label = read_server_label(session, waits).await;
    info!("Server card found: {}", label);

    session
        .click(selectors::SERVER_CARD, "server card not found")
        .await?;
    waits.pause(waits.keepalive_settle).await;

    let url = session.current_url().await?;
    let title = session.title().await?;
    info!("Server console visited: {} ({})", title, url);
    Ok(Some((url, title)))
}

async fn read_server_label(session: &PanelSession, waits: &WaitPolicy) -> String {
    if session
        .wait_for_element(selectors::SERVER_TITLE, waits.card_label_wait, "server title")
        .await
        .is_ok()
    {
        let script = format!(
            "(document.querySelector('{}')?.textContent || '').trim()",
            selectors::SERVER_TITLE
        );
        if let Ok(value) = session.evaluate(&script).await {
            if let Some(text) = value.as_str() {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    UNKNOWN_SERVER_LABEL.to_string()
}
