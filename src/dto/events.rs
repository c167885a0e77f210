use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::tournament::{Challenge, MatchId, MatchScore, TournamentState};

#[derive(Clone, Debug, PartialEq)]
/// Dispatched payload carried to every viewer stream.
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the event data.
    pub fn json<T>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
        })
    }

    /// Data rendered for an SSE `data:` line.
    pub fn data_text(&self) -> String {
        self.data.to_string()
    }

    /// Frame sent over WebSocket: the payload fields next to a `type` tag.
    pub fn to_ws_text(&self) -> String {
        let frame = match &self.data {
            Value::Object(fields) => {
                let mut frame = fields.clone();
                frame.insert("type".into(), Value::String(self.event.clone()));
                Value::Object(frame)
            }
            other => serde_json::json!({ "type": self.event, "data": other }),
        };
        frame.to_string()
    }
}

#[derive(Debug, Serialize)]
/// Full snapshot pushed after every change and to new viewers.
pub struct StateUpdateEvent<'a> {
    pub data: &'a TournamentState,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Emitted when a match starts, or is reset back to its opening view.
pub struct MatchStartEvent {
    pub match_id: MatchId,
    pub challenge: Option<Challenge>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Emitted when a match shows a new challenge, or none after a rollback.
pub struct ChallengeEvent {
    pub match_id: MatchId,
    pub challenge: Option<Challenge>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Emitted after every scored round.
pub struct ScoreUpdateEvent {
    pub match_id: MatchId,
    pub score: MatchScore,
    pub challenge: Option<Challenge>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Emitted when a match is decided.
pub struct MatchAdvanceEvent {
    pub match_id: MatchId,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sound cue requested by the moderator.
pub struct SfxEvent {
    pub event: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_frame_flattens_payload_next_to_type() {
        let event = ServerEvent::json(
            "sfx",
            &SfxEvent {
                event: "buzzer".into(),
            },
        )
        .unwrap();
        let frame: Value = serde_json::from_str(&event.to_ws_text()).unwrap();
        assert_eq!(frame["type"], "sfx");
        assert_eq!(frame["event"], "buzzer");
    }

    #[test]
    fn match_events_use_camel_case() {
        let event = ServerEvent::json(
            "match:start",
            &MatchStartEvent {
                match_id: MatchId::Sf2,
                challenge: None,
            },
        )
        .unwrap();
        assert_eq!(event.data["matchId"], "sf2");
        assert!(event.data["challenge"].is_null());
    }
}
