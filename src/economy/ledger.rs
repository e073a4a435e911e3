//! Append-Only Ledger Records
//!
//! Immutable facts the store keeps forever. They are the ground truth the
//! cached fields on `PlayerRecord` (best score, daily ad count) and the
//! rank index can be rebuilt from.

use serde::{Deserialize, Serialize};

use crate::core::time::Timestamp;
use crate::economy::player::{CharacterId, PlayerId};
use crate::economy::submission::SessionResult;

/// One accepted score submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    /// Submitting player
    pub player_id: PlayerId,
    /// Client session id (unique per player)
    pub session_id: String,
    /// Final score
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Seconds survived
    pub survival_seconds: u64,
    /// Enemies defeated
    pub enemies_defeated: u64,
    /// Character played
    pub character_used: CharacterId,
    /// When the submission was accepted
    pub submitted_at: Timestamp,
}

impl ScoreEvent {
    /// Build the event for an admitted session.
    pub fn new(
        player_id: PlayerId,
        session_id: impl Into<String>,
        session: &SessionResult,
        character_used: impl Into<CharacterId>,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            player_id,
            session_id: session_id.into(),
            score: session.score,
            level: session.level,
            survival_seconds: session.survival_seconds,
            enemies_defeated: session.enemies_defeated,
            character_used: character_used.into(),
            submitted_at,
        }
    }
}

/// One granted rewarded ad.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdGrant {
    /// Unique grant id
    pub grant_id: String,
    /// Rewarded player
    pub player_id: PlayerId,
    /// Requested ad reward type (`coins`, `extra_life`, ...)
    pub ad_type: String,
    /// Reward type credited
    pub reward_type: String,
    /// Amount credited
    pub reward_amount: u64,
    /// When the grant happened
    pub granted_at: Timestamp,
}
