//! Authenticated-page classifier
//!
//! No single signal survives the panel's redirect chain reliably, so the
//! verdict comes from an ordered list of independent checks. The first
//! positive signal wins; a miss on every check means "still logged out".
//! New heuristics append to the list.

use std::future::Future;

const LOGIN_PATH_SEGMENT: &str = "/login";
const LOGIN_TITLE_WORD: &str = "login";

/// What the browser reported after the login attempt settled.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
}

/// Which check concluded the session is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    UrlOffLoginPage,
    TitleNotLogin,
    DashboardElement,
}

/// The static checks (URL path, page title). No browser access needed.
pub fn static_signal(snapshot: &PageSnapshot) -> Option<AuthSignal> {
    if !snapshot.url.to_lowercase().contains(LOGIN_PATH_SEGMENT) {
        return Some(AuthSignal::UrlOffLoginPage);
    }
    if !snapshot.title.to_lowercase().contains(LOGIN_TITLE_WORD) {
        return Some(AuthSignal::TitleNotLogin);
    }
    None
}

/// Full classification. `probe` is the bounded dashboard-element check; it
/// only runs when both static checks miss and probing is enabled, so the
/// common cases stay cheap.
pub async fn classify<F, Fut>(
    snapshot: &PageSnapshot,
    probe_enabled: bool,
    probe: F,
) -> Option<AuthSignal>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = bool>,
{
    if let Some(signal) = static_signal(snapshot) {
        return Some(signal);
    }
    if probe_enabled && probe().await {
        return Some(AuthSignal::DashboardElement);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(url: &str, title: &str) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            title: title.to_string(),
        }
    }

    async fn probe_hit() -> bool {
        true
    }

    async fn probe_miss() -> bool {
        false
    }

    #[tokio::test]
    async fn dashboard_url_wins_without_probing() {
        let snap = snapshot("https://panel.example.com/dashboard", "Login");
        let signal = classify(&snap, true, || async {
            panic!("probe must not run when a static check matches")
        })
        .await;
        assert_eq!(signal, Some(AuthSignal::UrlOffLoginPage));
    }

    #[tokio::test]
    async fn non_login_title_wins_despite_login_url() {
        let snap = snapshot("https://panel.example.com/login?next=/", "My Servers");
        let signal = classify(&snap, true, probe_miss).await;
        assert_eq!(signal, Some(AuthSignal::TitleNotLogin));
    }

    #[tokio::test]
    async fn probe_breaks_the_tie_when_static_checks_miss() {
        let snap = snapshot("https://panel.example.com/login", "Login - Panel");
        let signal = classify(&snap, true, probe_hit).await;
        assert_eq!(signal, Some(AuthSignal::DashboardElement));
    }

    #[tokio::test]
    async fn disabled_probe_never_runs() {
        let snap = snapshot("https://panel.example.com/login", "Login - Panel");
        let signal = classify(&snap, false, || async {
            panic!("probe must not run when disabled")
        })
        .await;
        assert_eq!(signal, None);
    }

    #[tokio::test]
    async fn all_checks_negative_means_logged_out() {
        let snap = snapshot("https://panel.example.com/LOGIN", "LOGIN PAGE");
        let signal = classify(&snap, true, probe_miss).await;
        assert_eq!(signal, None);
    }

    #[test]
    fn static_checks_are_case_insensitive() {
        let snap = snapshot("https://panel.example.com/Login", "LOGIN Required");
        assert_eq!(static_signal(&snap), None);
    }
}
