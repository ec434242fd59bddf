//! Track status events.
//!
//! Hosts subscribe through `SpeechTrack::subscribe_status()` and may forward
//! the JSON form to a UI or log pipeline.

use serde::{Deserialize, Serialize};

/// Observable state of a speech track.
///
/// ```text
/// Idle ─submit─► Buffering ─first frame out─► Emitting ─buffer drained─► Idle
///   ▲                │                           │
///   └──── Interrupted ◄───────── barge-in ───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Nothing buffered, nothing being assembled: the pacer emits silence.
    Idle,
    /// The assembler is filling the frame buffer.
    Buffering,
    /// The pacer is handing out buffered speech.
    Emitting,
    /// Queued speech was discarded by a new utterance.
    Interrupted,
    /// The track was torn down. Terminal.
    Closed,
}

/// Emitted on every status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatusEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    pub status: TrackStatus,
    /// Optional human-readable detail (e.g. what an interruption cleared).
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_event_serializes_with_lowercase_status() {
        let event = TrackStatusEvent {
            seq: 4,
            status: TrackStatus::Interrupted,
            detail: Some("cleared 12 frames".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["seq"], 4);
        assert_eq!(json["status"], "interrupted");
        assert_eq!(json["detail"], "cleared 12 frames");

        let round_trip: TrackStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, TrackStatus::Interrupted);
    }

    #[test]
    fn status_rejects_non_lowercase_values() {
        assert!(serde_json::from_str::<TrackStatus>(r#""Idle""#).is_err());
        assert_eq!(
            serde_json::from_str::<TrackStatus>(r#""emitting""#).expect("parse"),
            TrackStatus::Emitting
        );
    }
}
