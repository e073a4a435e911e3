//! Engine error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::economy::ad_gate::AdDenial;
use crate::economy::player::PlayerId;
use crate::economy::submission::SubmissionError;
use crate::store::StoreError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown player id. Nothing was written.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// Rewarded ad requested inside the cooldown window.
    #[error("ad cooldown active, retry in {}s", .retry_after.as_secs())]
    CooldownActive {
        /// Time until a grant can succeed
        retry_after: Duration,
    },

    /// Rewarded ad quota for the UTC day is used up.
    #[error("daily ad limit of {limit} reached")]
    DailyLimitReached {
        /// Configured quota
        limit: u32,
    },

    /// Optimistic write kept losing. Caller should retry the request.
    #[error("write conflict persisted after {attempts} attempts")]
    Conflict {
        /// Attempts made
        attempts: u32,
    },

    /// Store failed or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EngineError {
    /// Check if the caller may succeed by retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict { .. } | EngineError::StoreUnavailable(_)
        )
    }
}

impl From<SubmissionError> for EngineError {
    fn from(err: SubmissionError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<AdDenial> for EngineError {
    fn from(denial: AdDenial) -> Self {
        match denial {
            AdDenial::CooldownActive { retry_after_secs } => EngineError::CooldownActive {
                retry_after: Duration::from_secs(retry_after_secs),
            },
            AdDenial::DailyLimitReached { limit } => EngineError::DailyLimitReached { limit },
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(player_id) => EngineError::PlayerNotFound(player_id),
            StoreError::Conflict { .. } => EngineError::Conflict { attempts: 1 },
            StoreError::DuplicateSession { .. }
            | StoreError::DuplicatePlayer { .. }
            | StoreError::DuplicatePurchase(_) => EngineError::Validation(err.to_string()),
            StoreError::Unavailable(_) | StoreError::Codec(_) => {
                EngineError::StoreUnavailable(err.to_string())
            }
        }
    }
}
