//! Media payloads: media state updates, load notifications, player callbacks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Playback state reported for a video component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MediaState {
    /// Current track
    pub track_index: i64,
    /// Number of tracks
    pub track_count: i64,
    /// Position in milliseconds
    pub current_time: i64,
    /// Track duration in milliseconds
    pub duration: i64,
    /// Paused
    pub paused: bool,
    /// Ended
    pub ended: bool,
    /// Muted
    pub muted: bool,
    /// Engine track state code
    pub track_state: i64,
}

/// `updateMedia` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpdate {
    /// Video component id
    pub id: String,
    /// Parsed state; `None` when the structure is incomplete
    pub state: Option<MediaState>,
    /// Whether the update originates from a media event
    pub from_event: Option<bool>,
}

const MEDIA_STATE_KEYS: [&str; 8] =
    ["trackIndex", "trackCount", "currentTime", "duration", "paused", "ended", "trackState", "muted"];

impl MediaUpdate {
    /// Read an `updateMedia` payload.
    ///
    /// Returns `None` only when `id` is missing. Every state member must be
    /// present; numeric members that were stringified to `null` read as 0.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id")?.as_str()?.to_string();
        let from_event = value.get("fromEvent").and_then(Value::as_bool);
        let state = value.get("mediaState").and_then(media_state);
        Some(Self { id, state, from_event })
    }
}

fn media_state(state: &Value) -> Option<MediaState> {
    if !MEDIA_STATE_KEYS.iter().all(|key| state.get(key).is_some()) {
        return None;
    }
    let int = |key: &str| {
        state.get(key).and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))).unwrap_or(0)
    };
    let flag = |key: &str| state.get(key).and_then(Value::as_bool);

    Some(MediaState {
        track_index: int("trackIndex"),
        track_count: int("trackCount"),
        current_time: int("currentTime"),
        duration: int("duration"),
        paused: flag("paused")?,
        ended: flag("ended")?,
        muted: flag("muted")?,
        track_state: state.get("trackState").and_then(Value::as_i64)?,
    })
}

/// `mediaLoaded` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaLoaded {
    /// Media source url
    pub source: String,
}

/// `mediaLoadFailed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLoadFailed {
    /// Media source url
    pub source: String,
    /// Viewhost error code
    pub error_code: i64,
    /// Error description
    pub error: String,
}

/// Which player-side callback a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCallbackKind {
    /// `audioPlayerCallback`
    AudioEvent,
    /// `speechMarkCallback`
    SpeechMarks,
    /// `mediaPlayerUpdateMediaState`
    MediaUpdateState,
    /// `mediaPlayerDoCallback`
    MediaDoCallback,
}

/// Player callback routed to an engine-owned audio or media player.
///
/// The player interprets the payload; the bridge only routes by id.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCallback {
    /// Callback kind
    pub kind: PlayerCallbackKind,
    /// Target player id
    pub player_id: String,
    /// Full payload as received
    pub payload: Value,
}

impl PlayerCallback {
    /// Read a player callback payload; `None` if `playerId` is missing.
    pub fn from_value(kind: PlayerCallbackKind, value: &Value) -> Option<Self> {
        let player_id = value.get("playerId")?.as_str()?.to_string();
        Some(Self { kind, player_id, payload: value.clone() })
    }
}
