//! Economy Rules
//!
//! Pure rules over the player record. Nothing in this module performs I/O;
//! the engine wraps these in store transactions.
//!
//! ## Module Structure
//!
//! - `player`: Player record, stats, character unlocks
//! - `submission`: Score submission admission
//! - `reward`: Reward calculator
//! - `challenge`: Daily challenge issuing and settlement
//! - `ad_gate`: Rewarded ad cooldown and daily quota
//! - `purchase`: Verified purchase application
//! - `ledger`: Append-only score and ad records

pub mod player;
pub mod submission;
pub mod reward;
pub mod challenge;
pub mod ad_gate;
pub mod purchase;
pub mod ledger;

// Re-export key types
pub use player::{PlayerId, PlayerRecord, GameStats, CharacterProgress, CharacterId};
pub use submission::{ScoreSubmission, SessionResult, SubmissionError};
pub use reward::{compute_reward, RewardOutcome};
pub use challenge::{ChallengeKind, ChallengeTemplate, DailyChallenge};
pub use ad_gate::{AdType, AdReward, AdDenial};
pub use purchase::{Purchase, PurchaseItem, PurchaseRecord, CoinPack};
pub use ledger::{ScoreEvent, AdGrant};
