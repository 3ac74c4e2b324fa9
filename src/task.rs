//! Run orchestration
//!
//! One pass through the whole flow: optional session replay, interactive
//! login, classification, keep-alive on success or a diagnostic screenshot
//! on failure. Exactly one `Outcome` per run; the browser is released on
//! every exit path.

use tracing::{info, warn};

use crate::browser::PanelSession;
use crate::classifier::{self, PageSnapshot};
use crate::config::Config;
use crate::keepalive;
use crate::login;
use crate::outcome::{LoginMethod, Outcome};
use crate::replay;
use crate::wait::WaitPolicy;

pub const FAILURE_SCREENSHOT: &str = "login_failure_bot.png";
pub const ERROR_SCREENSHOT: &str = "login_error_bot.png";
pub const REASON_STILL_ON_LOGIN: &str = "Still on login page";

pub async fn run(config: &Config) -> Outcome {
    let waits = WaitPolicy::from_config(config);

    let session = match PanelSession::launch(config).await {
        Ok(session) => session,
        Err(e) => {
            return Outcome::Failure {
                reason: e.to_string(),
                url: None,
            }
        }
    };

    let outcome = drive(&session, config, &waits).await;
    session.close().await;
    outcome
}

async fn drive(session: &PanelSession, config: &Config, waits: &WaitPolicy) -> Outcome {
    // Cookie replay first: skips the whole form flow when the stored
    // session is still valid.
    if replay::attempt(session, config, waits).await {
        let outcome = Outcome::Success {
            url: session.current_url().await.unwrap_or_default(),
            title: session.title().await.unwrap_or_default(),
            method: LoginMethod::SessionReplay,
        };
        return finish_success(session, waits, outcome).await;
    }

    if let Err(e) = login::perform(session, config, waits).await {
        warn!("Login stage failed: {}", e);
        if !session.is_alive() {
            warn!("Browser connection was lost during the run");
        }
        session.save_screenshot(ERROR_SCREENSHOT).await;
        let url = session.current_url().await.ok();
        return Outcome::Failure {
            reason: e.to_string(),
            url,
        };
    }

    let snapshot = PageSnapshot {
        url: session.current_url().await.unwrap_or_default(),
        title: session.title().await.unwrap_or_default(),
    };
    info!("Post-submit page: {} ({})", snapshot.title, snapshot.url);

    let signal = classifier::classify(&snapshot, config.dashboard_probe, || {
        keepalive::dashboard_element_present(session, waits.card_label_wait)
    })
    .await;

    match signal {
        Some(signal) => {
            info!("Authenticated ({:?})", signal);
            let outcome = Outcome::Success {
                url: snapshot.url,
                title: snapshot.title,
                method: LoginMethod::Password,
            };
            finish_success(session, waits, outcome).await
        }
        None => {
            warn!("Still on the login page after submit");
            session.save_screenshot(FAILURE_SCREENSHOT).await;
            Outcome::Failure {
                reason: REASON_STILL_ON_LOGIN.to_string(),
                url: Some(snapshot.url),
            }
        }
    }
}

/// Run the keep-alive click-through and fold its landing page into the
/// success. A missed click-through keeps the post-login page.
async fn finish_success(
    session: &PanelSession,
    waits: &WaitPolicy,
    outcome: Outcome,
) -> Outcome {
    match keepalive::visit_dashboard(session, waits).await {
        Some((url, title)) => outcome.with_final_page(url, title),
        None => outcome,
    }
}
