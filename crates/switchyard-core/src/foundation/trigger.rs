//! Trigger classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of where an inbound event came from.
///
/// Assigned exactly once by the adapter that normalizes the payload. The
/// dispatcher uses it to pick between the path router ([`TriggerKind::Call`])
/// and the trigger router (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Synchronous request/response call (HTTP-style).
    Call,
    /// A batch of queue or stream records.
    QueueBatch,
    /// Object storage change notification.
    ObjectNotification,
    /// Time-based schedule.
    Scheduled,
    /// Event published on a bus or topic.
    CustomEvent,
    /// A bidirectional stream connection was opened.
    StreamConnect,
    /// A message arrived on an open stream connection.
    StreamMessage,
    /// A stream connection was closed.
    StreamDisconnect,
    /// Recognized by an adapter but not classified further.
    Unknown,
}

impl TriggerKind {
    /// All kinds, in declaration order.
    pub const ALL: [TriggerKind; 9] = [
        Self::Call,
        Self::QueueBatch,
        Self::ObjectNotification,
        Self::Scheduled,
        Self::CustomEvent,
        Self::StreamConnect,
        Self::StreamMessage,
        Self::StreamDisconnect,
        Self::Unknown,
    ];

    /// Returns the snake_case name used in logs and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::QueueBatch => "queue_batch",
            Self::ObjectNotification => "object_notification",
            Self::Scheduled => "scheduled",
            Self::CustomEvent => "custom_event",
            Self::StreamConnect => "stream_connect",
            Self::StreamMessage => "stream_message",
            Self::StreamDisconnect => "stream_disconnect",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` for synchronous call-style triggers.
    pub fn is_call(self) -> bool {
        matches!(self, Self::Call)
    }

    /// Returns `true` if one invocation carries several records.
    pub fn is_batch(self) -> bool {
        matches!(self, Self::QueueBatch | Self::ObjectNotification)
    }

    /// Returns `true` for the three stream lifecycle kinds.
    pub fn is_stream(self) -> bool {
        matches!(
            self,
            Self::StreamConnect | Self::StreamMessage | Self::StreamDisconnect
        )
    }

    /// Whether trigger patterns of this kind may use a trailing `*` prefix match.
    pub fn supports_prefix_patterns(self) -> bool {
        matches!(self, Self::CustomEvent)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown trigger kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trigger kind '{0}'")]
pub struct ParseTriggerKindError(pub String);

impl FromStr for TriggerKind {
    type Err = ParseTriggerKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseTriggerKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in TriggerKind::ALL {
            assert_eq!(kind.as_str().parse::<TriggerKind>(), Ok(kind));
        }
        assert!("webhook".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn only_custom_events_accept_prefix_patterns() {
        let allowed: Vec<_> = TriggerKind::ALL
            .into_iter()
            .filter(|k| k.supports_prefix_patterns())
            .collect();
        assert_eq!(allowed, vec![TriggerKind::CustomEvent]);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TriggerKind::ObjectNotification).unwrap();
        assert_eq!(json, "\"object_notification\"");
    }
}
