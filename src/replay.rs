//! Session replay stage
//!
//! Replays a previously captured cookie set before falling back to the
//! interactive form. A replay that does not authenticate is a cache miss,
//! not an error; every failure in this stage logs and falls through.

use tracing::{info, warn};

use crate::browser::{BrowserError, PanelSession};
use crate::classifier::{self, PageSnapshot};
use crate::config::Config;
use crate::keepalive;
use crate::wait::WaitPolicy;

/// Parse the serialized cookie snapshot. Anything other than a non-empty
/// JSON array is rejected with a warning.
pub fn parse_snapshot(raw: &str) -> Option<Vec<serde_json::Value>> {
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(records) if !records.is_empty() => Some(records),
        Ok(_) => {
            warn!("Session snapshot is an empty list; skipping replay");
            None
        }
        Err(e) => {
            warn!("Session snapshot is not a JSON cookie array ({}); skipping replay", e);
            None
        }
    }
}

/// Attempt to resume the stored session. Returns whether the replayed
/// session authenticated.
pub async fn attempt(session: &PanelSession, config: &Config, waits: &WaitPolicy) -> bool {
    let Some(raw) = config.session_cookies.as_deref() else {
        return false;
    };
    let Some(records) = parse_snapshot(raw) else {
        return false;
    };

    info!("Attempting session replay with {} stored cookie record(s)", records.len());
    match replay_inner(session, config, waits, &records).await {
        Ok(authenticated) => authenticated,
        Err(e) => {
            warn!("Session replay errored ({}); falling back to interactive login", e);
            false
        }
    }
}

async fn replay_inner(
    session: &PanelSession,
    config: &Config,
    waits: &WaitPolicy,
    records: &[serde_json::Value],
) -> Result<bool, BrowserError> {
    session.navigate(&config.website_url).await?;
    waits.pause(waits.challenge_settle).await;

    let applied = session.inject_cookies(records).await;
    info!("Applied {}/{} cookie record(s)", applied, records.len());
    if applied == 0 {
        return Ok(false);
    }

    session.reload().await?;
    waits.pause(waits.challenge_settle).await;

    let snapshot = PageSnapshot {
        url: session.current_url().await?,
        title: session.title().await?,
    };
    let authenticated = classifier::classify(&snapshot, config.dashboard_probe, || {
        keepalive::dashboard_element_present(session, waits.card_label_wait)
    })
    .await
    .is_some();

    if authenticated {
        info!("Stored session is still valid");
    } else {
        info!("Stored session is no longer authenticated (cache miss)");
    }
    Ok(authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_cookie_array() {
        let raw = r#"[{"name":"session","value":"abc","domain":"panel.example.com","path":"/"}]"#;
        let records = parse_snapshot(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "session");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_snapshot("{not json").is_none());
    }

    #[test]
    fn rejects_a_non_array_document() {
        assert!(parse_snapshot(r#"{"name":"session"}"#).is_none());
    }

    #[test]
    fn rejects_an_empty_array() {
        assert!(parse_snapshot("[]").is_none());
    }

    #[test]
    fn keeps_individually_odd_records_for_the_injection_step() {
        // Record filtering happens at injection time, not parse time.
        let raw = r#"[{"name":"a","value":"1","domain":"d","path":"/"}, 42]"#;
        let records = parse_snapshot(raw).unwrap();
        assert_eq!(records.len(), 2);
    }
}
