use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which side of the care link the current user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Therapist,
}

/// The two parties of a care link.
///
/// The pair is unordered from the application's point of view; the canonical
/// room key sorts the ids ascending so both peers derive the same key
/// independent of which one initiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    pub student_id: i64,
    pub therapist_id: i64,
}

impl PeerIdentity {
    pub fn new(student_id: i64, therapist_id: i64) -> Self {
        Self {
            student_id,
            therapist_id,
        }
    }

    /// Canonical, order-independent identifier for the two-party channel.
    pub fn room_key(&self) -> String {
        room_key(self.student_id, self.therapist_id)
    }
}

/// Derive the shared room key for a pair of numeric identifiers.
pub fn room_key(a: i64, b: i64) -> String {
    format!("{}_{}", a.min(b), a.max(b))
}
