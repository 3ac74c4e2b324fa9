//! Interactive login stage
//!
//! Fixed-order scripted flow against the panel's login form. Pacing comes
//! from the wait policy; the longer pauses let the bot-challenge
//! interstitial and any CAPTCHA widget resolve on their own.

use tracing::{info, warn};

use crate::browser::{BrowserError, PanelSession};
use crate::config::Config;
use crate::wait::WaitPolicy;

mod selectors {
    pub const EMAIL_INPUT: &str = "#email";
    pub const PASSWORD_INPUT: &str = "#password";
    pub const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
}

/// Warm-up search visit so the panel sees a plausible referrer instead of a
/// cold direct navigation.
fn referrer_url(website_url: &str) -> String {
    let host = url::Url::parse(website_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    let query: String = host
        .split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("+");
    format!("https://www.google.com/search?q={}+control+panel", query)
}

/// Run the full form flow. The caller classifies the resulting page; this
/// stage only errors when a step itself fails (element missing, browser
/// gone).
pub async fn perform(
    session: &PanelSession,
    config: &Config,
    waits: &WaitPolicy,
) -> Result<(), BrowserError> {
    info!("Starting interactive login: {}", config.website_url);

    session.navigate(&referrer_url(&config.website_url)).await?;
    waits.pause(waits.referrer_settle).await;

    session.navigate(&config.website_url).await?;
    settle_challenge(session, waits).await?;

    info!(
        "Landed on: {} ({})",
        session.title().await.unwrap_or_default(),
        session.current_url().await.unwrap_or_default()
    );

    session
        .wait_for_element(selectors::EMAIL_INPUT, waits.email_wait, "email input not found")
        .await?;
    session
        .type_into(selectors::EMAIL_INPUT, &config.username, "email input not found")
        .await?;

    session
        .wait_for_element(
            selectors::PASSWORD_INPUT,
            waits.password_wait,
            "password input not found",
        )
        .await?;
    session
        .type_into(selectors::PASSWORD_INPUT, &config.password, "password input not found")
        .await?;

    info!("Credentials entered");
    waits.pause(waits.pre_submit).await;

    session
        .wait_for_element(
            selectors::SUBMIT_BUTTON,
            waits.submit_wait,
            "submit button not found",
        )
        .await?;
    session
        .click(selectors::SUBMIT_BUTTON, "submit button not found")
        .await?;

    info!(
        "Login form submitted; waiting {}s for the result (CAPTCHA grace included)",
        waits.post_submit.as_secs()
    );
    waits.pause(waits.post_submit).await;

    Ok(())
}

/// Wait out a Cloudflare-style interstitial: settle, then re-check for
/// challenge markers a bounded number of times. The interstitial normally
/// clears itself; running out of attempts is not an error here, the
/// classifier has the final say.
async fn settle_challenge(session: &PanelSession, waits: &WaitPolicy) -> Result<(), BrowserError> {
    waits.pause(waits.challenge_settle).await;
    for attempt in 1..=4 {
        if !challenge_markers_present(session).await? {
            return Ok(());
        }
        warn!("Bot-challenge interstitial still up (check {}/4)", attempt);
        waits.pause(waits.challenge_settle).await;
    }
    Ok(())
}

async fn challenge_markers_present(session: &PanelSession) -> Result<bool, BrowserError> {
    let script = r#"
        (() => {
            const title = (document.title || '').toLowerCase();
            if (title.includes('just a moment') || title.includes('attention required')) {
                return true;
            }
            const iframes = Array.from(document.querySelectorAll('iframe'))
                .map(f => ((f.src || '') + ' ' + (f.title || '')).toLowerCase())
                .join(' ');
            return iframes.includes('challenge') || iframes.includes('turnstile');
        })()
    "#;
    let result = session.evaluate(script).await?;
    Ok(result.as_bool().unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referrer_url_uses_the_panel_host() {
        assert_eq!(
            referrer_url("https://panel.example.com/login"),
            "https://www.google.com/search?q=panel+example+com+control+panel"
        );
    }

    #[test]
    fn referrer_url_survives_an_unparseable_target() {
        assert_eq!(
            referrer_url("not a url"),
            "https://www.google.com/search?q=+control+panel"
        );
    }
}
