//! OxiRotate Notification System
//!
//! Reports rotations and rotation faults via various channels:
//! - Telegram

pub mod config;
mod error;
mod event;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod telegram;

pub use config::{notify_config_path, NotifyConfig, TelegramConfig};
pub use error::{NotifyError, Result};
pub use event::RotationEvent;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use std::path::Path;

/// Trait for notification backends
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain text message
    async fn send(&self, message: &str) -> Result<()>;

    /// Send a formatted rotation event notification
    async fn send_rotation_event(&self, event: &RotationEvent) -> Result<()>;

    /// Check if the notifier is configured and ready
    fn is_configured(&self) -> bool;
}

/// Manager for all notification channels
pub struct NotificationManager {
    telegram: Option<TelegramNotifier>,
    config: NotifyConfig,
}

impl NotificationManager {
    /// Create a new notification manager from config
    pub fn new(config: NotifyConfig) -> Self {
        let telegram = config
            .telegram
            .as_ref()
            .map(|tc| TelegramNotifier::new(tc.bot_token.clone(), tc.chat_id.clone()));

        Self { telegram, config }
    }

    /// Create a notification manager from `<root>/rotate-notify.toml`
    pub fn from_root(root: &Path) -> Result<Self> {
        let config = NotifyConfig::load_from(&notify_config_path(root))?;
        Ok(Self::new(config))
    }

    /// Check if this event type should trigger a notification
    fn should_notify(&self, event: &RotationEvent) -> bool {
        if self.config.events.is_empty() {
            return true;
        }

        let event_type = event.event_type();
        self.config.events.iter().any(|e| e == event_type)
    }
}

#[async_trait]
impl Notifier for NotificationManager {
    async fn send(&self, message: &str) -> Result<()> {
        if let Some(ref telegram) = self.telegram {
            telegram.send(message).await?;
        }
        Ok(())
    }

    async fn send_rotation_event(&self, event: &RotationEvent) -> Result<()> {
        if !self.should_notify(event) {
            return Ok(());
        }

        if let Some(ref telegram) = self.telegram {
            telegram.send_rotation_event(event).await?;
        }

        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.telegram
            .as_ref()
            .map(|t| t.is_configured())
            .unwrap_or(false)
    }
}
