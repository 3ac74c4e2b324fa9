//! Browser automation module
//!
//! Launching and controlling the single Chrome/Chromium instance the login
//! task drives over the DevTools protocol.

mod errors;
mod session;

pub use errors::BrowserError;
pub use session::PanelSession;
