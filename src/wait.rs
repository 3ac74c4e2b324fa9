//! Wait policy
//!
//! Every fixed pause and element-wait bound in the login flow lives here as
//! a `Duration` field, so deployments can tune pacing in one place and tests
//! can inject a zero-delay policy.

use std::time::Duration;

use rand::Rng;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct WaitPolicy {
    /// Settle after the warm-up referrer visit
    pub referrer_settle: Duration,
    /// Settle after landing behind the bot-challenge interstitial
    pub challenge_settle: Duration,
    /// Human-like hesitation before pressing submit
    pub pre_submit: Duration,
    /// Grace period after submit for redirects and CAPTCHA resolution
    pub post_submit: Duration,
    /// Settle after the keep-alive click-through
    pub keepalive_settle: Duration,

    pub email_wait: Duration,
    pub password_wait: Duration,
    pub submit_wait: Duration,
    pub card_wait: Duration,
    pub card_label_wait: Duration,

    pub notify_timeout: Duration,

    jitter: bool,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            referrer_settle: Duration::from_secs(2),
            challenge_settle: Duration::from_secs(3),
            pre_submit: Duration::from_secs(1),
            post_submit: Duration::from_secs(crate::config::DEFAULT_POST_SUBMIT_WAIT_SECS),
            keepalive_settle: Duration::from_secs(3),
            email_wait: Duration::from_secs(10),
            password_wait: Duration::from_secs(5),
            submit_wait: Duration::from_secs(5),
            card_wait: Duration::from_secs(10),
            card_label_wait: Duration::from_secs(2),
            notify_timeout: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            post_submit: Duration::from_secs(config.post_submit_wait_secs),
            ..Self::default()
        }
    }

    /// All-zero policy so tests never sleep.
    pub fn zero() -> Self {
        Self {
            referrer_settle: Duration::ZERO,
            challenge_settle: Duration::ZERO,
            pre_submit: Duration::ZERO,
            post_submit: Duration::ZERO,
            keepalive_settle: Duration::ZERO,
            email_wait: Duration::ZERO,
            password_wait: Duration::ZERO,
            submit_wait: Duration::ZERO,
            card_wait: Duration::ZERO,
            card_label_wait: Duration::ZERO,
            notify_timeout: Duration::ZERO,
            jitter: false,
        }
    }

    /// Sleep for `duration` plus a little random jitter so the pacing never
    /// looks metronomic.
    pub async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let jitter_ms = if self.jitter {
            rand::thread_rng().gen_range(0..=250)
        } else {
            0
        };
        tokio::time::sleep(duration + Duration::from_millis(jitter_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config_with_wait(secs: &str) -> Config {
        Config::from_lookup(|name| match name {
            "WEBSITE_URL" => Some("https://panel.example.com".to_string()),
            "LOGIN_USERNAME" => Some("u".to_string()),
            "LOGIN_PASSWORD" => Some("p".to_string()),
            "POST_SUBMIT_WAIT_SECS" => Some(secs.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn from_config_honors_post_submit_wait() {
        let policy = WaitPolicy::from_config(&config_with_wait("42"));
        assert_eq!(policy.post_submit, Duration::from_secs(42));
        assert_eq!(policy.email_wait, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn zero_policy_pause_returns_immediately() {
        let policy = WaitPolicy::zero();
        let start = std::time::Instant::now();
        policy.pause(policy.post_submit).await;
        policy.pause(policy.challenge_settle).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
