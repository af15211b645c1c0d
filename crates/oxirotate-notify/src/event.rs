//! Rotation event types for notifications

use humansize::{format_size, BINARY};
use serde::{Deserialize, Serialize};

/// Events that can trigger notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationEvent {
    /// A live log was archived and truncated
    Rotated {
        path: String,
        archive: String,
        bytes: u64,
    },

    /// A rotation stage failed (`kind` is the fault name, e.g. "truncate_failure")
    Failed {
        path: String,
        kind: String,
        error: String,
    },

    /// The process list could not be fetched
    ListFailed { error: String },
}

impl RotationEvent {
    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            RotationEvent::Rotated { .. } => "rotate",
            RotationEvent::Failed { .. } | RotationEvent::ListFailed { .. } => "failure",
        }
    }

    /// Format the event as a human-readable message with emoji
    pub fn format_message(&self) -> String {
        match self {
            RotationEvent::Rotated {
                path,
                archive,
                bytes,
            } => {
                format!(
                    "\u{1F5C4}\u{FE0F} Rotated: `{}`\nArchive: `{}` ({})",
                    path,
                    archive,
                    format_size(*bytes, BINARY)
                )
            }
            RotationEvent::Failed { path, kind, error } => {
                // Fault names contain `_`, which Markdown reads as emphasis
                format!(
                    "\u{1F534} Rotation failed (`{}`): `{}`\nError: `{}`",
                    kind, path, error
                )
            }
            RotationEvent::ListFailed { error } => {
                format!("\u{26A0}\u{FE0F} Process list unavailable\nError: {}", error)
            }
        }
    }

    /// Get the log path the event is about, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            RotationEvent::Rotated { path, .. } | RotationEvent::Failed { path, .. } => Some(path),
            RotationEvent::ListFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> RotationEvent {
        RotationEvent::Failed {
            path: "/logs/api-out.log".to_string(),
            kind: "truncate_failure".to_string(),
            error: "permission denied".to_string(),
        }
    }

    #[test]
    fn test_event_type() {
        let rotated = RotationEvent::Rotated {
            path: "/logs/api-out.log".to_string(),
            archive: "/logs/api-out__x.log".to_string(),
            bytes: 10,
        };
        assert_eq!(rotated.event_type(), "rotate");
        assert_eq!(failed().event_type(), "failure");
        assert_eq!(
            RotationEvent::ListFailed {
                error: "down".to_string()
            }
            .event_type(),
            "failure"
        );
    }

    #[test]
    fn test_format_message_rotated() {
        let event = RotationEvent::Rotated {
            path: "/logs/api-out.log".to_string(),
            archive: "/logs/api-out__2024.log".to_string(),
            bytes: 3 * 1024 * 1024,
        };
        let msg = event.format_message();
        assert!(msg.contains("api-out.log"));
        assert!(msg.contains("MiB"));
    }

    #[test]
    fn test_format_message_failed() {
        let msg = failed().format_message();
        assert!(msg.contains("(`truncate_failure`)"));
        assert!(msg.contains("`permission denied`"));
    }

    #[test]
    fn test_path() {
        assert_eq!(failed().path(), Some("/logs/api-out.log"));
        assert_eq!(
            RotationEvent::ListFailed {
                error: "x".to_string()
            }
            .path(),
            None
        );
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&failed()).unwrap();
        assert!(json.contains("\"type\":\"failed\""));
        let back: RotationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failed());
    }
}
