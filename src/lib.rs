//! panel-keeper
//!
//! Logs into a hosting control panel from behind a Cloudflare-style
//! interstitial, optionally short-circuiting the form with a replayed
//! cookie session, then keeps the account warm by clicking through to a
//! server console. One run produces exactly one `Outcome`, a matching
//! process exit code and a Telegram status message. Re-running on a
//! schedule is an external scheduler's job (cron, systemd timer).

pub mod browser;
pub mod classifier;
pub mod config;
pub mod keepalive;
pub mod login;
pub mod notify;
pub mod outcome;
pub mod replay;
pub mod task;
pub mod wait;

use std::path::PathBuf;

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("panel-keeper").join("logs"))
}

/// Initialize tracing: console output always, plus a daily-rolling file
/// layer when a config directory is available. The returned guard must stay
/// alive for the file layer to flush.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "panel-keeper.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}
