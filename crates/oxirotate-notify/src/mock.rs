//! Mock implementations for testing

use crate::error::{NotifyError, Result};
use crate::event::RotationEvent;
use crate::Notifier;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A mock notifier for testing that records all sent messages
#[derive(Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<RotationEvent>>>,
    call_count: AtomicUsize,
    should_fail: bool,
}

impl MockNotifier {
    /// Create a new mock notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock notifier that always fails
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Get the number of times send was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all sent messages
    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Get all sent events
    pub async fn events(&self) -> Vec<RotationEvent> {
        self.events.lock().await.clone()
    }

    /// Check if a specific event type was sent
    pub async fn was_event_type_sent(&self, event_type: &str) -> bool {
        self.events
            .lock()
            .await
            .iter()
            .any(|e| e.event_type() == event_type)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(NotifyError::telegram("Mock failure"));
        }

        self.messages.lock().await.push(message.to_string());
        Ok(())
    }

    async fn send_rotation_event(&self, event: &RotationEvent) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(NotifyError::telegram("Mock failure"));
        }

        self.messages.lock().await.push(event.format_message());
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_notifier_records_messages() {
        let notifier = MockNotifier::new();
        notifier.send("Hello, world!").await.unwrap();
        notifier.send("Another message").await.unwrap();

        assert_eq!(notifier.call_count(), 2);
        assert_eq!(notifier.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_notifier_records_events() {
        let notifier = MockNotifier::new();

        notifier
            .send_rotation_event(&RotationEvent::Failed {
                path: "/logs/app-err.log".to_string(),
                kind: "stat_failure".to_string(),
                error: "EACCES".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(notifier.call_count(), 1);
        assert!(notifier.was_event_type_sent("failure").await);
        assert!(!notifier.was_event_type_sent("rotate").await);
        assert_eq!(notifier.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_notifier_fails_when_configured() {
        let notifier = MockNotifier::failing();
        assert!(notifier.send("test").await.is_err());
        assert_eq!(notifier.call_count(), 1);
    }
}
