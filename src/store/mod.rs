//! Player Store
//!
//! Durable keyed storage consumed by the engine. Every mutating call is
//! conditioned on the record version the caller read, and every commit that
//! touches more than the player record (score event, ad grant, purchase)
//! applies all of its parts or none of them.
//!
//! `MemoryStore` is the in-process reference implementation.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::time::Timestamp;
use crate::economy::ledger::{AdGrant, ScoreEvent};
use crate::economy::player::{PlayerId, PlayerRecord};
use crate::economy::purchase::PurchaseRecord;
use crate::rank::RankedEntry;

pub use memory::{MemoryStore, StoreSnapshot};

// =============================================================================
// ERRORS
// =============================================================================

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version no longer matches the version the caller read.
    #[error("version conflict for {player_id}: expected {expected}, found {actual}")]
    Conflict {
        /// Player whose write lost
        player_id: PlayerId,
        /// Version the caller read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },
    /// A score event with this session id already exists for the player.
    #[error("session {session_id} already recorded for {player_id}")]
    DuplicateSession {
        /// Player
        player_id: PlayerId,
        /// Replayed session id
        session_id: String,
    },
    /// A player with this id or device already exists.
    #[error("player already registered for device {device_id}")]
    DuplicatePlayer {
        /// Registering device
        device_id: String,
    },
    /// The purchase id was already recorded.
    #[error("purchase {0} already recorded")]
    DuplicatePurchase(String),
    /// Unknown player.
    #[error("player {0} not found")]
    NotFound(PlayerId),
    /// The backing storage cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Snapshot encoding or decoding failed.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),
}

// =============================================================================
// COMMITS
// =============================================================================

/// One accepted score submission, written atomically.
#[derive(Clone, Debug)]
pub struct ScoreCommit {
    /// Player record after rewards
    pub record: PlayerRecord,
    /// Version the record was computed from
    pub expected_version: u64,
    /// Event to append
    pub event: ScoreEvent,
}

/// Result of a score commit.
#[derive(Clone, Debug)]
pub struct CommittedScore {
    /// Stored record (version bumped)
    pub record: PlayerRecord,
    /// Player's rank after the commit
    pub rank: u64,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Storage operations the engine depends on.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Load a player record.
    async fn get_player(&self, player_id: &PlayerId) -> Result<Option<PlayerRecord>, StoreError>;

    /// Load the record registered from `device_id`.
    async fn find_by_device(&self, device_id: &str) -> Result<Option<PlayerRecord>, StoreError>;

    /// Insert a new record at version 1.
    async fn insert_player(&self, record: PlayerRecord) -> Result<PlayerRecord, StoreError>;

    /// Replace a record if its stored version is `expected_version`.
    async fn put_player(
        &self,
        record: PlayerRecord,
        expected_version: u64,
    ) -> Result<PlayerRecord, StoreError>;

    /// Check whether a session was already recorded for the player.
    async fn has_score_event(
        &self,
        player_id: &PlayerId,
        session_id: &str,
    ) -> Result<bool, StoreError>;

    /// Append the event, replace the record and update the rank index as
    /// one transaction.
    async fn commit_score(&self, commit: ScoreCommit) -> Result<CommittedScore, StoreError>;

    /// Append the grant and replace the record as one transaction.
    async fn commit_ad_grant(
        &self,
        record: PlayerRecord,
        expected_version: u64,
        grant: AdGrant,
    ) -> Result<PlayerRecord, StoreError>;

    /// Check whether a purchase id was already recorded.
    async fn has_purchase(&self, purchase_id: &str) -> Result<bool, StoreError>;

    /// Append the purchase and replace the record as one transaction.
    async fn commit_purchase(
        &self,
        record: PlayerRecord,
        expected_version: u64,
        purchase: PurchaseRecord,
    ) -> Result<PlayerRecord, StoreError>;

    /// Ad grants for the player with `from <= granted_at < to`.
    async fn count_ad_grants(
        &self,
        player_id: &PlayerId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<u32, StoreError>;

    /// Rank of the player's best score, None if unranked.
    async fn rank_of(&self, player_id: &PlayerId) -> Result<Option<u64>, StoreError>;

    /// Ranked players with a best score strictly greater than `score`.
    async fn count_ranked_above(&self, score: u64) -> Result<u64, StoreError>;

    /// Top `limit` ranked players.
    async fn top_ranked(&self, limit: usize) -> Result<Vec<RankedEntry>, StoreError>;

    /// Score events of a player in append order.
    async fn score_events(&self, player_id: &PlayerId) -> Result<Vec<ScoreEvent>, StoreError>;

    /// Ad grants of a player in append order.
    async fn ad_grants(&self, player_id: &PlayerId) -> Result<Vec<AdGrant>, StoreError>;
}
