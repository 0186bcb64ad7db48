//! Notification sinks.
//!
//! Notifications are fire-and-forget: the engine logs a failed delivery and
//! carries on. [`build_notifier`] picks Telegram when it is enabled and
//! configured, otherwise a sink that only logs.

pub mod telegram;

pub use telegram::TelegramNotifier;

use tracing::{info, warn};

use crate::config::{EngineConfig, TelegramCredentials};
use crate::engine::ports::Notifier;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Network(String),

    #[error("notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Writes every message to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "tickgate::notify", "{text}");
        Ok(())
    }
}

/// Telegram if enabled and its credentials resolve, else [`LogNotifier`].
pub fn build_notifier(config: &EngineConfig) -> Box<dyn Notifier> {
    if !config.telegram.enabled {
        return Box::new(LogNotifier);
    }
    let credentials = match TelegramCredentials::from_env(&config.telegram) {
        Ok(credentials) => credentials,
        Err(err) => {
            warn!(error = %err, "telegram enabled but not configured, notifications go to the log");
            return Box::new(LogNotifier);
        }
    };
    match TelegramNotifier::new(credentials, config.exchange.timeout_secs) {
        Ok(notifier) => Box::new(notifier),
        Err(err) => {
            warn!(error = %err, "telegram client unavailable, notifications go to the log");
            Box::new(LogNotifier)
        }
    }
}
