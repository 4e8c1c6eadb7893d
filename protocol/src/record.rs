//! The shared battle record

use chrono::{DateTime, Utc};
use duet_battle::{BattleSnapshot, EndReason, Role, Winner};
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Record lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Created by the host, teams not loaded yet
    Pending,
    Active,
    /// Final. No further writes are accepted.
    Completed,
}

/// One battle as stored remotely.
///
/// `turn_number` is the only ordering key; `updated_at` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBattleRecord {
    #[serde(rename = "id")]
    pub battle_id: String,

    pub host_id: String,

    pub guest_id: String,

    /// Team references resolved by the team service
    #[serde(default)]
    pub host_team: Option<String>,

    #[serde(default)]
    pub guest_team: Option<String>,

    pub status: RecordStatus,

    pub current_turn: Role,

    pub turn_number: u64,

    /// Absent while pending
    #[serde(default)]
    pub battle_data: Option<BattleSnapshot<Role>>,

    #[serde(default)]
    pub winner: Option<Winner<Role>>,

    /// Set together with `winner`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<EndReason>,

    pub updated_at: DateTime<Utc>,
}

/// The fields that decide whether a record is a real change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordFingerprint {
    pub status: RecordStatus,
    pub current_turn: Role,
    pub turn_number: u64,
}

impl RemoteBattleRecord {
    pub fn fingerprint(&self) -> RecordFingerprint {
        RecordFingerprint {
            status: self.status,
            current_turn: self.current_turn,
            turn_number: self.turn_number,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RecordStatus::Completed
    }

    /// Team reference for a role
    pub fn team_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Host => self.host_team.as_deref(),
            Role::Guest => self.guest_team.as_deref(),
        }
    }
}

/// Decode a record payload. JSON `null` means the record does not exist.
pub fn decode_record(value: serde_json::Value) -> Result<Option<RemoteBattleRecord>, ParseError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_json() -> serde_json::Value {
        json!({
            "id": "b1",
            "hostId": "ash",
            "guestId": "gary",
            "hostTeam": "electric",
            "guestTeam": "normal",
            "status": "pending",
            "currentTurn": "host",
            "turnNumber": 1,
            "updatedAt": "2024-05-01T12:00:00Z"
        })
    }

    #[test]
    fn test_decode_pending_record() {
        let record = decode_record(pending_json()).unwrap().unwrap();
        assert_eq!(record.battle_id, "b1");
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.battle_data, None);
        assert_eq!(record.winner, None);
        assert_eq!(record.team_for(Role::Guest), Some("normal"));
    }

    #[test]
    fn test_decode_null_is_missing() {
        assert!(decode_record(serde_json::Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_bad_status() {
        let mut value = pending_json();
        value["status"] = json!("paused");
        assert!(matches!(decode_record(value), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_fingerprint_ignores_timestamp() {
        let a = decode_record(pending_json()).unwrap().unwrap();
        let mut b = a.clone();
        b.updated_at = Utc::now();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.turn_number = 2;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_winner_draw_encoding() {
        let mut value = pending_json();
        value["status"] = json!("completed");
        value["winner"] = json!("draw");
        let record = decode_record(value).unwrap().unwrap();
        assert_eq!(record.winner, Some(Winner::Draw));
        assert_eq!(record.ended_reason, None);
        assert!(record.is_completed());
    }

    #[test]
    fn test_ended_reason_decodes() {
        let mut value = pending_json();
        value["status"] = json!("completed");
        value["winner"] = json!("guest");
        value["endedReason"] = json!("forfeit");
        let record = decode_record(value).unwrap().unwrap();
        assert_eq!(record.ended_reason, Some(duet_battle::EndReason::Forfeit));
    }
}
