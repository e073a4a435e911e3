//! In-Memory Player Store
//!
//! All state sits behind one `RwLock`. Each commit validates everything
//! (version, duplicate session, duplicate purchase) before mutating
//! anything, and never awaits while holding the write guard, so a dropped
//! or timed-out caller cannot leave a half-applied commit behind.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::core::time::Timestamp;
use crate::economy::ledger::{AdGrant, ScoreEvent};
use crate::economy::player::{PlayerId, PlayerRecord};
use crate::economy::purchase::PurchaseRecord;
use crate::rank::{RankIndex, RankIndexEntry, RankedEntry};
use crate::store::{CommittedScore, PlayerStore, ScoreCommit, StoreError};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Serializable ground truth of a store.
///
/// Holds no rank index: it is derived from `score_events` on restore.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// All player records
    pub players: Vec<PlayerRecord>,
    /// All score events in append order
    pub score_events: Vec<ScoreEvent>,
    /// All ad grants in append order
    pub ad_grants: Vec<AdGrant>,
    /// All purchases in append order
    pub purchases: Vec<PurchaseRecord>,
}

impl StoreSnapshot {
    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Default)]
struct StoreState {
    players: HashMap<PlayerId, PlayerRecord>,
    devices: HashMap<String, PlayerId>,
    sessions: HashSet<(PlayerId, String)>,
    score_events: HashMap<PlayerId, Vec<ScoreEvent>>,
    ad_grants: HashMap<PlayerId, Vec<AdGrant>>,
    purchase_ids: HashSet<String>,
    purchases: Vec<PurchaseRecord>,
    /// Append sequence across all players, for snapshots
    event_count: usize,
    grant_count: usize,
    rank: RankIndex,
}

impl StoreState {
    fn check_version(&self, player_id: &PlayerId, expected: u64) -> Result<(), StoreError> {
        let current = self
            .players
            .get(player_id)
            .ok_or(StoreError::NotFound(*player_id))?;
        if current.version != expected {
            return Err(StoreError::Conflict {
                player_id: *player_id,
                expected,
                actual: current.version,
            });
        }
        Ok(())
    }

    fn replace(&mut self, mut record: PlayerRecord, expected: u64) -> PlayerRecord {
        record.version = expected + 1;
        self.players.insert(record.player_id, record.clone());
        record
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Reference `PlayerStore` kept entirely in memory.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    available: AtomicBool,
    latency: Option<Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Delay every call by `latency` (simulates a slow backend).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call fail with `Unavailable` until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Copy out the ground truth.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;

        let mut players: Vec<PlayerRecord> = state.players.values().cloned().collect();
        players.sort_by_key(|p| p.player_id);

        let mut score_events: Vec<ScoreEvent> =
            state.score_events.values().flatten().cloned().collect();
        score_events.sort_by_key(|e| e.submitted_at);
        let mut ad_grants: Vec<AdGrant> = state.ad_grants.values().flatten().cloned().collect();
        ad_grants.sort_by_key(|g| g.granted_at);

        debug!(
            players = players.len(),
            events = state.event_count,
            grants = state.grant_count,
            "store snapshot taken"
        );

        StoreSnapshot {
            players,
            score_events,
            ad_grants,
            purchases: state.purchases.clone(),
        }
    }

    /// Build a store from a snapshot, rebuilding the rank index from the
    /// score-event log.
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let mut state = StoreState::default();

        for record in snapshot.players {
            state.devices.insert(record.device_id.clone(), record.player_id);
            state.players.insert(record.player_id, record);
        }

        state.rank = RankIndex::rebuild(&snapshot.score_events, |id| {
            state
                .players
                .get(id)
                .map(|p| p.display_name.clone())
                .unwrap_or_default()
        });

        state.event_count = snapshot.score_events.len();
        for event in snapshot.score_events {
            state.sessions.insert((event.player_id, event.session_id.clone()));
            state.score_events.entry(event.player_id).or_default().push(event);
        }

        state.grant_count = snapshot.ad_grants.len();
        for grant in snapshot.ad_grants {
            state.ad_grants.entry(grant.player_id).or_default().push(grant);
        }

        for purchase in &snapshot.purchases {
            state.purchase_ids.insert(purchase.purchase.purchase_id.clone());
        }
        state.purchases = snapshot.purchases;

        info!(
            players = state.players.len(),
            ranked = state.rank.len(),
            "store restored from snapshot"
        );

        Self {
            state: RwLock::new(state),
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Simulated backend latency and outage, applied before any state access.
    async fn gate(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn get_player(&self, player_id: &PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.players.get(player_id).cloned())
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state
            .devices
            .get(device_id)
            .and_then(|id| state.players.get(id))
            .cloned())
    }

    async fn insert_player(&self, mut record: PlayerRecord) -> Result<PlayerRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.write().await;

        if state.devices.contains_key(&record.device_id)
            || state.players.contains_key(&record.player_id)
        {
            return Err(StoreError::DuplicatePlayer {
                device_id: record.device_id,
            });
        }

        record.version = 1;
        state.devices.insert(record.device_id.clone(), record.player_id);
        state.players.insert(record.player_id, record.clone());
        Ok(record)
    }

    async fn put_player(
        &self,
        record: PlayerRecord,
        expected_version: u64,
    ) -> Result<PlayerRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.write().await;

        state.check_version(&record.player_id, expected_version)?;
        Ok(state.replace(record, expected_version))
    }

    async fn has_score_event(
        &self,
        player_id: &PlayerId,
        session_id: &str,
    ) -> Result<bool, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.sessions.contains(&(*player_id, session_id.to_string())))
    }

    async fn commit_score(&self, commit: ScoreCommit) -> Result<CommittedScore, StoreError> {
        self.gate().await?;
        let mut state = self.state.write().await;

        let ScoreCommit {
            record,
            expected_version,
            event,
        } = commit;
        let player_id = record.player_id;

        state.check_version(&player_id, expected_version)?;
        let session_key = (player_id, event.session_id.clone());
        if state.sessions.contains(&session_key) {
            return Err(StoreError::DuplicateSession {
                player_id,
                session_id: event.session_id,
            });
        }

        // Validated; apply all parts
        let candidate = RankIndexEntry::from_event(&event, record.display_name.clone());
        state.rank.offer(candidate);
        state.sessions.insert(session_key);
        state.score_events.entry(player_id).or_default().push(event);
        state.event_count += 1;
        let record = state.replace(record, expected_version);

        let rank = state
            .rank
            .rank_of(&player_id)
            .unwrap_or_else(|| 1 + state.rank.count_greater(record.stats.best_score));

        Ok(CommittedScore { record, rank })
    }

    async fn commit_ad_grant(
        &self,
        record: PlayerRecord,
        expected_version: u64,
        grant: AdGrant,
    ) -> Result<PlayerRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.write().await;

        state.check_version(&record.player_id, expected_version)?;
        state.ad_grants.entry(record.player_id).or_default().push(grant);
        state.grant_count += 1;
        Ok(state.replace(record, expected_version))
    }

    async fn has_purchase(&self, purchase_id: &str) -> Result<bool, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.purchase_ids.contains(purchase_id))
    }

    async fn commit_purchase(
        &self,
        record: PlayerRecord,
        expected_version: u64,
        purchase: PurchaseRecord,
    ) -> Result<PlayerRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.write().await;

        state.check_version(&record.player_id, expected_version)?;
        let purchase_id = purchase.purchase.purchase_id.clone();
        if state.purchase_ids.contains(&purchase_id) {
            return Err(StoreError::DuplicatePurchase(purchase_id));
        }

        state.purchase_ids.insert(purchase_id);
        state.purchases.push(purchase);
        Ok(state.replace(record, expected_version))
    }

    async fn count_ad_grants(
        &self,
        player_id: &PlayerId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<u32, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        let count = state
            .ad_grants
            .get(player_id)
            .map(|grants| {
                grants
                    .iter()
                    .filter(|g| g.granted_at >= from && g.granted_at < to)
                    .count()
            })
            .unwrap_or(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn rank_of(&self, player_id: &PlayerId) -> Result<Option<u64>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.rank.rank_of(player_id))
    }

    async fn count_ranked_above(&self, score: u64) -> Result<u64, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.rank.count_greater(score))
    }

    async fn top_ranked(&self, limit: usize) -> Result<Vec<RankedEntry>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.rank.top(limit))
    }

    async fn score_events(&self, player_id: &PlayerId) -> Result<Vec<ScoreEvent>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.score_events.get(player_id).cloned().unwrap_or_default())
    }

    async fn ad_grants(&self, player_id: &PlayerId) -> Result<Vec<AdGrant>, StoreError> {
        self.gate().await?;
        let state = self.state.read().await;
        Ok(state.ad_grants.get(player_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::submission::SessionResult;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn t(secs: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(secs)
    }

    fn record(id: u8) -> PlayerRecord {
        PlayerRecord::register(
            PlayerId::new([id; 16]),
            format!("p{id}"),
            format!("dev-{id}"),
            "android",
            "basic_cosmic",
            t(0),
        )
    }

    fn event(id: u8, session: &str, score: u64, at: i64) -> ScoreEvent {
        let session_result = SessionResult {
            score,
            level: 1,
            survival_seconds: 30,
            enemies_defeated: 3,
        };
        ScoreEvent::new(PlayerId::new([id; 16]), session, &session_result, "basic_cosmic", t(at))
    }

    async fn commit(
        store: &MemoryStore,
        id: u8,
        session: &str,
        score: u64,
        at: i64,
    ) -> Result<CommittedScore, StoreError> {
        let mut current = store.get_player(&PlayerId::new([id; 16])).await?.unwrap();
        let expected_version = current.version;
        current.stats.best_score = current.stats.best_score.max(score);
        store
            .commit_score(ScoreCommit {
                record: current,
                expected_version,
                event: event(id, session, score, at),
            })
            .await
    }

    #[tokio::test]
    async fn test_insert_sets_version_and_rejects_duplicate_device() {
        let store = MemoryStore::new();

        let stored = store.insert_player(record(1)).await.unwrap();
        assert_eq!(stored.version, 1);

        let mut other = record(2);
        other.device_id = "dev-1".into();
        assert!(matches!(
            store.insert_player(other).await,
            Err(StoreError::DuplicatePlayer { .. })
        ));

        let found = store.find_by_device("dev-1").await.unwrap().unwrap();
        assert_eq!(found.player_id, PlayerId::new([1; 16]));
    }

    #[tokio::test]
    async fn test_put_is_version_conditioned() {
        let store = MemoryStore::new();
        let stored = store.insert_player(record(1)).await.unwrap();

        let mut first = stored.clone();
        first.coins = 10;
        let written = store.put_player(first, 1).await.unwrap();
        assert_eq!(written.version, 2);

        let mut stale = stored;
        stale.coins = 99;
        let err = store.put_player(stale, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, actual: 2, .. }));

        let current = store.get_player(&PlayerId::new([1; 16])).await.unwrap().unwrap();
        assert_eq!(current.coins, 10);
    }

    #[tokio::test]
    async fn test_put_unknown_player() {
        let store = MemoryStore::new();
        let err = store.put_player(record(7), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_score_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.insert_player(record(1)).await.unwrap();

        let committed = commit(&store, 1, "s-1", 400, 1).await.unwrap();
        assert_eq!(committed.rank, 1);
        assert_eq!(committed.record.version, 2);

        let err = commit(&store, 1, "s-1", 900, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSession { .. }));

        // Neither record, event log nor index moved
        let id = PlayerId::new([1; 16]);
        assert_eq!(store.get_player(&id).await.unwrap().unwrap().version, 2);
        assert_eq!(store.score_events(&id).await.unwrap().len(), 1);
        assert_eq!(store.top_ranked(10).await.unwrap()[0].entry.best_score, 400);
    }

    #[tokio::test]
    async fn test_rank_follows_commits() {
        let store = MemoryStore::new();
        for id in 1..=3 {
            store.insert_player(record(id)).await.unwrap();
        }

        commit(&store, 1, "a", 100, 1).await.unwrap();
        commit(&store, 2, "b", 200, 2).await.unwrap();
        let third = commit(&store, 3, "c", 200, 3).await.unwrap();
        assert_eq!(third.rank, 1);

        assert_eq!(store.rank_of(&PlayerId::new([1; 16])).await.unwrap(), Some(3));
        assert_eq!(store.count_ranked_above(100).await.unwrap(), 2);
        assert_eq!(store.rank_of(&PlayerId::new([9; 16])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_count_ad_grants_window() {
        let store = MemoryStore::new();
        let stored = store.insert_player(record(1)).await.unwrap();
        let id = stored.player_id;

        let mut version = stored.version;
        for at in [-10, 5, 50, 3_600] {
            let grant = AdGrant {
                grant_id: format!("g{at}"),
                player_id: id,
                ad_type: "coins".into(),
                reward_type: "coins".into(),
                reward_amount: 25,
                granted_at: t(at),
            };
            let current = store.get_player(&id).await.unwrap().unwrap();
            version = store.commit_ad_grant(current, version, grant).await.unwrap().version;
        }

        assert_eq!(store.count_ad_grants(&id, t(0), t(100)).await.unwrap(), 2);
        assert_eq!(store.count_ad_grants(&id, t(5), t(50)).await.unwrap(), 1);
        assert_eq!(store.ad_grants(&id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.insert_player(record(1)).await.unwrap();

        store.set_available(false);
        assert!(matches!(
            store.get_player(&PlayerId::new([1; 16])).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.top_ranked(5).await, Err(StoreError::Unavailable(_))));

        store.set_available(true);
        assert!(store.get_player(&PlayerId::new([1; 16])).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_restore_rebuilds_rank() {
        let store = MemoryStore::new();
        for id in 1..=3 {
            store.insert_player(record(id)).await.unwrap();
        }
        commit(&store, 1, "a", 300, 1).await.unwrap();
        commit(&store, 1, "b", 700, 2).await.unwrap();
        commit(&store, 2, "c", 700, 3).await.unwrap();
        commit(&store, 3, "d", 50, 4).await.unwrap();

        let bytes = store.snapshot().await.to_bytes().unwrap();
        let restored = MemoryStore::restore(StoreSnapshot::from_bytes(&bytes).unwrap());

        let before = store.top_ranked(10).await.unwrap();
        let after = restored.top_ranked(10).await.unwrap();
        assert_eq!(before, after);

        // Session dedup survives the round trip
        assert!(restored.has_score_event(&PlayerId::new([1; 16]), "b").await.unwrap());
        assert_eq!(
            restored.get_player(&PlayerId::new([2; 16])).await.unwrap().unwrap().version,
            2
        );
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            StoreSnapshot::from_bytes(&[0xff, 0x01]),
            Err(StoreError::Codec(_))
        ));
    }
}
