//! panel-keeper entry point
//!
//! One login pass per invocation; cadence comes from an external scheduler.

use tracing::{error, info};

use panel_keeper::config::Config;
use panel_keeper::notify::{self, Notifier};
use panel_keeper::outcome::Outcome;
use panel_keeper::wait::WaitPolicy;
use panel_keeper::{init_logging, log_dir, task};

#[tokio::main]
async fn main() {
    // A .env file is optional; real deployments set the process environment.
    let _ = dotenvy::dotenv();
    let _guard = init_logging();

    info!("Starting panel-keeper");
    if let Some(dir) = log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let waits = WaitPolicy::default();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            let outcome = Outcome::Failure {
                reason: e.to_string(),
                url: None,
            };
            if let Some(notifier) = Notifier::from_env(waits.notify_timeout) {
                notifier.send(&notify::format_outcome(&outcome)).await;
            }
            std::process::exit(outcome.exit_code());
        }
    };

    info!("Target panel: {}", config.website_url);

    let outcome = task::run(&config).await;

    if let Some(notifier) = Notifier::from_config(&config, waits.notify_timeout) {
        notifier.send(&notify::format_outcome(&outcome)).await;
    }

    match &outcome {
        Outcome::Success { url, method, .. } => {
            info!("Run complete: logged in via {} ({})", method, url);
        }
        Outcome::Failure { reason, .. } => {
            error!("Run complete: login failed ({})", reason);
        }
    }

    std::process::exit(outcome.exit_code());
}
