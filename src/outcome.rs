//! Run outcome
//!
//! Exactly one `Outcome` is produced per run; the process exit code and the
//! notification body both derive from it.

use serde::{Deserialize, Serialize};

/// How the authenticated session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginMethod {
    Password,
    SessionReplay,
}

impl std::fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginMethod::Password => write!(f, "password"),
            LoginMethod::SessionReplay => write!(f, "session-replay"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Outcome {
    Success {
        url: String,
        title: String,
        method: LoginMethod,
    },
    Failure {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Merge the keep-alive landing page into a success. Failures pass
    /// through untouched.
    pub fn with_final_page(self, url: String, title: String) -> Self {
        match self {
            Outcome::Success { method, .. } => Outcome::Success { url, title, method },
            failure @ Outcome::Failure { .. } => failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> Outcome {
        Outcome::Success {
            url: "https://panel.example.com/dashboard".to_string(),
            title: "Dashboard".to_string(),
            method: LoginMethod::Password,
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(success().exit_code(), 0);
        let failure = Outcome::Failure {
            reason: "Still on login page".to_string(),
            url: None,
        };
        assert_eq!(failure.exit_code(), 1);
    }

    #[test]
    fn with_final_page_rewrites_success() {
        let merged = success().with_final_page(
            "https://panel.example.com/server/1".to_string(),
            "Server console".to_string(),
        );
        match merged {
            Outcome::Success { url, title, method } => {
                assert_eq!(url, "https://panel.example.com/server/1");
                assert_eq!(title, "Server console");
                assert_eq!(method, LoginMethod::Password);
            }
            Outcome::Failure { .. } => panic!("success expected"),
        }
    }

    #[test]
    fn with_final_page_leaves_failure_untouched() {
        let failure = Outcome::Failure {
            reason: "boom".to_string(),
            url: Some("https://panel.example.com/login".to_string()),
        };
        let merged = failure.with_final_page("x".to_string(), "y".to_string());
        match merged {
            Outcome::Failure { reason, url } => {
                assert_eq!(reason, "boom");
                assert_eq!(url.as_deref(), Some("https://panel.example.com/login"));
            }
            Outcome::Success { .. } => panic!("failure expected"),
        }
    }

    #[test]
    fn method_display_names() {
        assert_eq!(LoginMethod::Password.to_string(), "password");
        assert_eq!(LoginMethod::SessionReplay.to_string(), "session-replay");
    }
}
