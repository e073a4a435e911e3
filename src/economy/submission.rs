//! Score Submission Admission
//!
//! Raw session results arrive as signed integers from the request layer.
//! `ScoreSubmission::validate` is the only way to obtain a `SessionResult`,
//! so nothing downstream ever sees a negative or inconsistent session.

use serde::{Deserialize, Serialize};

use crate::economy::player::{CharacterId, PlayerId};

/// A game session as reported by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Submitting player
    pub player_id: PlayerId,
    /// Final score
    pub score: i64,
    /// Level reached
    pub level: i64,
    /// Seconds survived
    pub survival_seconds: i64,
    /// Enemies defeated
    pub enemies_defeated: i64,
    /// Character played
    pub character_used: CharacterId,
    /// Client session id, unique per played session
    pub session_id: String,
}

/// Validated, non-negative session values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    /// Final score
    pub score: u64,
    /// Level reached (at least 1)
    pub level: u32,
    /// Seconds survived
    pub survival_seconds: u64,
    /// Enemies defeated
    pub enemies_defeated: u64,
}

/// Why a submission was refused at admission.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// A counter was negative.
    #[error("{field} must not be negative (got {value})")]
    Negative {
        /// Offending field
        field: &'static str,
        /// Submitted value
        value: i64,
    },
    /// Level outside the playable range.
    #[error("level {0} is out of range")]
    LevelOutOfRange(i64),
    /// Zero score or level reported for a session that lasted.
    #[error("session of {survival_seconds}s reported zero {field}")]
    InconsistentSession {
        /// The zero field
        field: &'static str,
        /// Reported play time
        survival_seconds: i64,
    },
    /// Missing session id.
    #[error("session id is required")]
    MissingSessionId,
    /// Missing character id.
    #[error("character id is required")]
    MissingCharacter,
}

impl ScoreSubmission {
    /// Check the submission and extract its session values.
    pub fn validate(&self) -> Result<SessionResult, SubmissionError> {
        let score = non_negative("score", self.score)?;
        let survival_seconds = non_negative("survival_seconds", self.survival_seconds)?;
        let enemies_defeated = non_negative("enemies_defeated", self.enemies_defeated)?;

        if self.level < 0 {
            return Err(SubmissionError::Negative {
                field: "level",
                value: self.level,
            });
        }
        // Levels start at 1
        let level = u32::try_from(self.level)
            .ok()
            .filter(|l| *l >= 1)
            .ok_or(SubmissionError::LevelOutOfRange(self.level))?;

        if survival_seconds > 0 && score == 0 {
            return Err(SubmissionError::InconsistentSession {
                field: "score",
                survival_seconds: self.survival_seconds,
            });
        }

        if self.session_id.trim().is_empty() {
            return Err(SubmissionError::MissingSessionId);
        }
        if self.character_used.trim().is_empty() {
            return Err(SubmissionError::MissingCharacter);
        }

        Ok(SessionResult {
            score,
            level,
            survival_seconds,
            enemies_defeated,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, SubmissionError> {
    u64::try_from(value).map_err(|_| SubmissionError::Negative { field, value })
}
