//! Configuration types for notification system

use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Notification config file name under the root directory
pub const NOTIFY_CONFIG_FILE: &str = "rotate-notify.toml";

/// Event types accepted in `events`
pub const VALID_EVENTS: &[&str] = &["rotate", "failure"];

/// Get the notification config path under a root directory
pub fn notify_config_path(root: &Path) -> PathBuf {
    root.join(NOTIFY_CONFIG_FILE)
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// Telegram notification settings
    pub telegram: Option<TelegramConfig>,

    /// Events to notify on (empty = all events)
    /// Valid values: "rotate", "failure"
    #[serde(default)]
    pub events: Vec<String>,
}

impl NotifyConfig {
    /// Load config from a specific path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Notify config not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: NotifyConfig = toml::from_str(&content)?;
        config.validate_events()?;

        debug!("Loaded notify config from {:?}", path);
        Ok(config)
    }

    /// Check if any notification channel is configured
    pub fn is_configured(&self) -> bool {
        self.telegram.is_some()
    }

    /// Validate event names
    pub fn validate_events(&self) -> Result<()> {
        for event in &self.events {
            if !VALID_EVENTS.contains(&event.as_str()) {
                return Err(NotifyError::config(format!(
                    "Invalid event type '{}'. Valid types: {:?}",
                    event, VALID_EVENTS
                )));
            }
        }
        Ok(())
    }
}

/// Telegram notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,

    /// Chat ID to send messages to (can be user, group, or channel)
    pub chat_id: String,
}
