//! Event normalizer
//!
//! Turns one raw frame from the daemon's event stream into a [`Delta`]: the
//! partial update that event makes to [`PlayerState`].
//!
//! The daemon sends either a flat object, `{"type": "seek", "position": 10}`,
//! or an envelope, `{"type": "seek", "data": {"position": 10}}`. Both are
//! reduced to `(type, payload)` before dispatch.

use serde_json::{Map, Value};
use spkiosk_common::{PlayerState, TrackMetadata};
use thiserror::Error;

/// Why a frame was discarded
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event is not a JSON object")]
    NotAnObject,

    #[error("event has no string \"type\" field")]
    MissingType,
}

/// Partial state update produced by a single event
///
/// `None` fields are left untouched. `current_track` is doubly optional:
/// `Some(None)` clears the track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub is_paused: Option<bool>,
    pub is_active: Option<bool>,
    pub current_track: Option<Option<TrackMetadata>>,
    pub position: Option<u64>,
    pub duration: Option<u64>,
    pub volume: Option<u32>,
    pub volume_max: Option<u32>,
    pub repeat_context: Option<bool>,
    pub repeat_track: Option<bool>,
    pub shuffle_context: Option<bool>,
}

impl Delta {
    /// Merge this delta into `state`
    pub fn apply_to(&self, state: &mut PlayerState) {
        if let Some(v) = self.is_paused {
            state.is_paused = v;
        }
        if let Some(v) = self.is_active {
            state.is_active = v;
        }
        if let Some(track) = &self.current_track {
            state.current_track = track.clone();
        }
        if let Some(v) = self.position {
            state.position = v;
        }
        if let Some(v) = self.duration {
            state.duration = v;
        }
        if let Some(v) = self.volume {
            state.volume = v;
        }
        if let Some(v) = self.volume_max {
            state.volume_max = v;
        }
        if let Some(v) = self.repeat_context {
            state.repeat_context = v;
        }
        if let Some(v) = self.repeat_track {
            state.repeat_track = v;
        }
        if let Some(v) = self.shuffle_context {
            state.shuffle_context = v;
        }
    }
}

/// A frame reduced to its event type and payload
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: String,
    pub payload: Map<String, Value>,
}

impl RawEvent {
    /// Parse a frame, unwrapping the `{type, data}` envelope if present
    pub fn parse(raw: &str) -> Result<Self, NormalizeError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut object) = value else {
            return Err(NormalizeError::NotAnObject);
        };

        let kind = match object.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(NormalizeError::MissingType),
        };

        let payload = match object.remove("data") {
            Some(Value::Object(data)) => data,
            // Not an envelope after all; keep "data" as an ordinary field
            Some(other) => {
                object.insert("data".to_string(), other);
                object
            }
            None => object,
        };

        Ok(Self { kind, payload })
    }

    /// Delta for this event, or `None` for an unknown type
    pub fn to_delta(&self) -> Option<Delta> {
        let p = &self.payload;
        let delta = match self.kind.as_str() {
            "active" => Delta {
                is_active: Some(true),
                ..Delta::default()
            },
            "inactive" => Delta {
                is_active: Some(false),
                ..Delta::default()
            },
            "metadata" => Delta {
                current_track: Some(Some(track_from_payload(p))),
                position: Some(u64_field(p, "position")),
                duration: Some(u64_field(p, "duration")),
                ..Delta::default()
            },
            "playing" => Delta {
                is_paused: Some(false),
                is_active: Some(true),
                ..Delta::default()
            },
            "paused" => Delta {
                is_paused: Some(true),
                ..Delta::default()
            },
            "not_playing" => Delta {
                is_paused: Some(true),
                is_active: Some(false),
                ..Delta::default()
            },
            "stopped" => Delta {
                is_active: Some(false),
                current_track: Some(None),
                ..Delta::default()
            },
            "seek" => Delta {
                position: Some(u64_field(p, "position")),
                duration: Some(u64_field(p, "duration")),
                ..Delta::default()
            },
            "volume" => Delta {
                volume: Some(u32_field(p, "value")),
                volume_max: p.get("max").and_then(lenient_u64).map(saturate_u32),
                ..Delta::default()
            },
            "repeat_context" => Delta {
                repeat_context: Some(flag_field(p)),
                ..Delta::default()
            },
            "repeat_track" => Delta {
                repeat_track: Some(flag_field(p)),
                ..Delta::default()
            },
            "shuffle_context" => Delta {
                shuffle_context: Some(flag_field(p)),
                ..Delta::default()
            },
            _ => return None,
        };
        Some(delta)
    }
}

/// Parse and classify one frame
///
/// `Ok(None)` means the event type is unknown and should be ignored.
pub fn normalize(raw: &str) -> Result<Option<Delta>, NormalizeError> {
    Ok(RawEvent::parse(raw)?.to_delta())
}

fn track_from_payload(p: &Map<String, Value>) -> TrackMetadata {
    let artist_names = match p.get("artist_names") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    TrackMetadata {
        uri: string_field(p, "uri"),
        name: string_field(p, "name"),
        artist_names,
        album_name: string_field(p, "album_name"),
        album_cover_url: p
            .get("album_cover_url")
            .and_then(Value::as_str)
            .map(str::to_string),
        duration: u64_field(p, "duration"),
    }
}

fn string_field(p: &Map<String, Value>, key: &str) -> String {
    p.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Only a literal JSON `true` sets a flag
fn flag_field(p: &Map<String, Value>) -> bool {
    matches!(p.get("value"), Some(Value::Bool(true)))
}

fn u64_field(p: &Map<String, Value>, key: &str) -> u64 {
    p.get(key).and_then(lenient_u64).unwrap_or(0)
}

fn u32_field(p: &Map<String, Value>, key: &str) -> u32 {
    saturate_u32(u64_field(p, key))
}

/// Any JSON number as u64: negatives clamp to 0, fractions truncate
fn lenient_u64(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    if n.as_i64().is_some() {
        return Some(0);
    }
    n.as_f64().map(|f| if f <= 0.0 { 0 } else { f as u64 })
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(raw: &str) -> Delta {
        normalize(raw).unwrap().expect("known event type")
    }

    #[test]
    fn test_flat_and_envelope_forms_match() {
        let flat = delta(r#"{"type":"seek","position":1500,"duration":90000}"#);
        let envelope = delta(r#"{"type":"seek","data":{"position":1500,"duration":90000}}"#);
        assert_eq!(flat, envelope);
        assert_eq!(flat.position, Some(1500));
        assert_eq!(flat.duration, Some(90000));
    }

    #[test]
    fn test_metadata_replaces_track() {
        let d = delta(
            r#"{"type":"metadata","data":{
                "uri":"spotify:track:X","name":"Song",
                "artist_names":["A","B"],"album_name":"Album",
                "album_cover_url":"https://i.scdn.co/image/abc",
                "position":1000,"duration":200000}}"#,
        );
        let track = d.current_track.clone().flatten().unwrap();
        assert_eq!(track.uri, "spotify:track:X");
        assert_eq!(track.name, "Song");
        assert_eq!(track.artist_names, vec!["A", "B"]);
        assert_eq!(track.album_cover_url.as_deref(), Some("https://i.scdn.co/image/abc"));
        assert_eq!(track.duration, 200000);
        assert_eq!(d.position, Some(1000));
        assert_eq!(d.duration, Some(200000));
    }

    #[test]
    fn test_metadata_missing_numbers_default_to_zero() {
        let d = delta(r#"{"type":"metadata","uri":"spotify:track:Y"}"#);
        assert_eq!(d.position, Some(0));
        assert_eq!(d.duration, Some(0));
        let track = d.current_track.flatten().unwrap();
        assert!(track.artist_names.is_empty());
        assert!(track.album_cover_url.is_none());
    }

    #[test]
    fn test_playback_transitions() {
        let playing = delta(r#"{"type":"playing"}"#);
        assert_eq!((playing.is_paused, playing.is_active), (Some(false), Some(true)));

        let paused = delta(r#"{"type":"paused"}"#);
        assert_eq!((paused.is_paused, paused.is_active), (Some(true), None));

        let not_playing = delta(r#"{"type":"not_playing"}"#);
        assert_eq!((not_playing.is_paused, not_playing.is_active), (Some(true), Some(false)));

        let stopped = delta(r#"{"type":"stopped"}"#);
        assert_eq!(stopped.is_active, Some(false));
        assert_eq!(stopped.current_track, Some(None));
    }

    #[test]
    fn test_volume_max_only_when_present() {
        let with_max = delta(r#"{"type":"volume","data":{"value":30000,"max":65535}}"#);
        assert_eq!(with_max.volume, Some(30000));
        assert_eq!(with_max.volume_max, Some(65535));

        let without_max = delta(r#"{"type":"volume","value":12}"#);
        assert_eq!(without_max.volume, Some(12));
        assert_eq!(without_max.volume_max, None);

        let empty = delta(r#"{"type":"volume"}"#);
        assert_eq!(empty.volume, Some(0));
    }

    #[test]
    fn test_flags_require_literal_true() {
        assert_eq!(delta(r#"{"type":"repeat_context","value":true}"#).repeat_context, Some(true));
        assert_eq!(delta(r#"{"type":"repeat_track","value":"true"}"#).repeat_track, Some(false));
        assert_eq!(delta(r#"{"type":"shuffle_context","value":1}"#).shuffle_context, Some(false));
        assert_eq!(delta(r#"{"type":"shuffle_context"}"#).shuffle_context, Some(false));
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert!(normalize(r#"{"type":"will_play"}"#).unwrap().is_none());
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(matches!(normalize("{not json"), Err(NormalizeError::Json(_))));
        assert!(matches!(normalize("[1,2]"), Err(NormalizeError::NotAnObject)));
        assert!(matches!(normalize(r#"{"data":{}}"#), Err(NormalizeError::MissingType)));
        assert!(matches!(normalize(r#"{"type":7}"#), Err(NormalizeError::MissingType)));
    }

    #[test]
    fn test_odd_numbers_are_clamped() {
        let d = delta(r#"{"type":"seek","position":-20,"duration":1234.9}"#);
        assert_eq!(d.position, Some(0));
        assert_eq!(d.duration, Some(1234));

        let v = delta(r#"{"type":"volume","value":99999999999}"#);
        assert_eq!(v.volume, Some(u32::MAX));

        let s = delta(r#"{"type":"seek","position":"100"}"#);
        assert_eq!(s.position, Some(0));
    }

    #[test]
    fn test_non_object_data_is_not_an_envelope() {
        let event = RawEvent::parse(r#"{"type":"seek","data":5,"position":42}"#).unwrap();
        assert_eq!(event.payload.get("data"), Some(&Value::from(5)));
        assert_eq!(event.to_delta().unwrap().position, Some(42));
    }

    #[test]
    fn test_apply_to_only_touches_set_fields() {
        let mut state = PlayerState {
            volume: 10,
            repeat_track: true,
            ..PlayerState::default()
        };
        delta(r#"{"type":"playing"}"#).apply_to(&mut state);
        assert!(!state.is_paused);
        assert!(state.is_active);
        assert_eq!(state.volume, 10);
        assert!(state.repeat_track);
    }
}
