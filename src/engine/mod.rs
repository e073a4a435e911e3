//! Reward & Ranking Engine
//!
//! The entry point the request layer calls. Each operation is one
//! read-compute-write transaction against the player store:
//!
//! ```text
//!   lock player ──► read record + version ──► pure rules ──► conditioned commit
//!                          ▲                                        │
//!                          └──────────── version conflict ◄─────────┘
//! ```
//!
//! - Operations on the same player are serialized by `PlayerLocks`.
//! - Commits are conditioned on the version read; conflicts retry up to
//!   `max_commit_attempts` times, then surface as `EngineError::Conflict`.
//! - Every store call runs under `store_timeout`. A timeout or outage
//!   fails the request with `StoreUnavailable` and is never retried.
//! - Denials (cooldown, quota) are returned verbatim, never retried.

pub mod error;
pub mod locks;

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub use error::EngineError;
pub use locks::{PlayerGuard, PlayerLocks};

use crate::config::{ConfigError, EconomyConfig};
use crate::core::time::{day_window, utc_day, Timestamp};
use crate::economy::ad_gate::{apply_grant, check_grant, grant_record, AdReward, AdType};
use crate::economy::challenge::{issue_challenges, settle_challenges, DailyChallenge};
use crate::economy::ledger::{AdGrant, ScoreEvent};
use crate::economy::player::{AdDayCounter, CharacterId, PlayerId, PlayerRecord};
use crate::economy::purchase::{apply_purchase, Purchase, PurchaseItem, PurchaseRecord};
use crate::economy::reward::compute_reward;
use crate::economy::submission::ScoreSubmission;
use crate::rank::RankedEntry;
use crate::store::{PlayerStore, ScoreCommit, StoreError};

// =============================================================================
// RESPONSES
// =============================================================================

/// Outcome of a score submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    /// False if the session id was already recorded (nothing credited)
    pub accepted: bool,
    /// Coins from the reward calculator
    pub coins_awarded: u64,
    /// Session beat the previous best score
    pub is_new_record: bool,
    /// Coins from challenges this session completed
    pub challenge_coins: u64,
    /// Ids of challenges this session completed
    pub completed_challenges: Vec<String>,
    /// Balance after the submission
    pub total_coins: u64,
    /// Rank after the submission
    pub rank: u64,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Player
    pub player_id: PlayerId,
    /// Leaderboard name
    pub display_name: String,
    /// Best score
    pub score: u64,
    /// Level reached in the best-scoring session, not the player's
    /// `max_level`; a later lower-scoring run at a higher level leaves it
    pub level: u32,
    /// Character of the best-scoring session
    pub character_used: CharacterId,
    /// When the best score was first reached
    pub timestamp: Timestamp,
    /// 1-based rank (ties share a rank)
    pub rank: u64,
}

impl From<RankedEntry> for LeaderboardEntry {
    fn from(ranked: RankedEntry) -> Self {
        let entry = ranked.entry;
        Self {
            player_id: entry.player_id,
            display_name: entry.display_name,
            score: entry.best_score,
            level: entry.level,
            character_used: entry.character_used,
            timestamp: entry.improved_at,
            rank: ranked.rank,
        }
    }
}

/// Outcome of recording a purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// False if the purchase id was already recorded (nothing credited)
    pub accepted: bool,
    /// Coins credited
    pub coins_credited: u64,
    /// Character newly unlocked
    pub unlocked: Option<CharacterId>,
    /// Balance after the purchase
    pub total_coins: u64,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The reward and ranking engine.
pub struct EconomyEngine {
    store: Arc<dyn PlayerStore>,
    config: Arc<EconomyConfig>,
    locks: PlayerLocks,
}

impl EconomyEngine {
    /// Create an engine over `store`. Rejects an inconsistent config.
    pub fn new(store: Arc<dyn PlayerStore>, config: EconomyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
            locks: PlayerLocks::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Register a player, or return the record already registered from
    /// `device_id`.
    #[instrument(skip_all, fields(device = %device_id))]
    pub async fn register_player(
        &self,
        display_name: &str,
        device_id: &str,
        platform: &str,
        now: Timestamp,
    ) -> Result<PlayerRecord, EngineError> {
        if display_name.trim().is_empty() {
            return Err(EngineError::Validation("display name is required".into()));
        }
        if device_id.trim().is_empty() {
            return Err(EngineError::Validation("device id is required".into()));
        }

        if let Some(existing) = self.call(self.store.find_by_device(device_id)).await? {
            debug!(player = %existing.player_id, "device already registered");
            return Ok(existing);
        }

        let record = PlayerRecord::register(
            PlayerId::random(),
            display_name.trim(),
            device_id,
            platform,
            &self.config.starter_character,
            now,
        );

        match self.call(self.store.insert_player(record)).await {
            Ok(stored) => {
                info!(player = %stored.player_id, "player registered");
                Ok(stored)
            }
            Err(StoreError::DuplicatePlayer { .. }) => {
                // Concurrent registration from the same device won
                self.call(self.store.find_by_device(device_id))
                    .await?
                    .ok_or(EngineError::Conflict { attempts: 1 })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Current record of a player.
    pub async fn player(&self, player_id: PlayerId) -> Result<PlayerRecord, EngineError> {
        self.load(&player_id).await
    }

    /// Unlock a character. Returns false if it already was unlocked.
    #[instrument(skip_all, fields(player = %player_id, character = %character))]
    pub async fn unlock_character(
        &self,
        player_id: PlayerId,
        character: &str,
        now: Timestamp,
    ) -> Result<bool, EngineError> {
        if character.trim().is_empty() {
            return Err(EngineError::Validation("character id is required".into()));
        }
        let _guard = self.locks.acquire(player_id).await;

        for attempt in 1..=self.config.max_commit_attempts {
            let mut record = self.load(&player_id).await?;
            if record.has_unlocked(character) {
                debug!("character already unlocked");
                return Ok(false);
            }

            let version = record.version;
            record.unlock_character(character, now);
            record.last_active = now;

            match self.call(self.store.put_player(record, version)).await {
                Ok(_) => {
                    info!("character unlocked");
                    return Ok(true);
                }
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("unlock_character", &player_id))
    }

    // =========================================================================
    // Scores & ranking
    // =========================================================================

    /// Credit a played session and update the leaderboard.
    ///
    /// A replayed session id is accepted-but-uncredited: `accepted` is false
    /// and the current balance and rank are reported.
    #[instrument(
        skip_all,
        fields(player = %submission.player_id, session = %submission.session_id)
    )]
    pub async fn submit_score(
        &self,
        submission: &ScoreSubmission,
        now: Timestamp,
    ) -> Result<ScoreReceipt, EngineError> {
        let session = submission.validate()?;
        let player_id = submission.player_id;
        let _guard = self.locks.acquire(player_id).await;

        for attempt in 1..=self.config.max_commit_attempts {
            let record = self.load(&player_id).await?;

            if self
                .call(self.store.has_score_event(&player_id, &submission.session_id))
                .await?
            {
                return self.duplicate_receipt(record).await;
            }
            if !record.has_unlocked(&submission.character_used) {
                return Err(EngineError::Validation(format!(
                    "character {} is not unlocked",
                    submission.character_used
                )));
            }

            let outcome = compute_reward(&record.stats, &session, &self.config);
            let version = record.version;
            let mut next = record;
            next.stats = outcome.stats;
            next.credit_coins(outcome.coins_awarded);
            next.record_character_use(&submission.character_used);
            let settlement = settle_challenges(&mut next.challenges, &session, utc_day(now), now);
            next.credit_coins(settlement.coins);
            next.last_active = now;

            let event = ScoreEvent::new(
                player_id,
                submission.session_id.clone(),
                &session,
                submission.character_used.clone(),
                now,
            );
            let commit = ScoreCommit {
                record: next,
                expected_version: version,
                event,
            };

            match self.call(self.store.commit_score(commit)).await {
                Ok(committed) => {
                    info!(
                        coins = outcome.coins_awarded,
                        challenge_coins = settlement.coins,
                        new_record = outcome.is_new_record,
                        rank = committed.rank,
                        "score accepted"
                    );
                    return Ok(ScoreReceipt {
                        accepted: true,
                        coins_awarded: outcome.coins_awarded,
                        is_new_record: outcome.is_new_record,
                        challenge_coins: settlement.coins,
                        completed_challenges: settlement.completed,
                        total_coins: committed.record.coins,
                        rank: committed.rank,
                    });
                }
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(StoreError::DuplicateSession { .. }) => {
                    let record = self.load(&player_id).await?;
                    return self.duplicate_receipt(record).await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("submit_score", &player_id))
    }

    /// Top of the leaderboard. `limit` is capped at `leaderboard_max_limit`.
    #[instrument(skip(self))]
    pub async fn get_leaderboard(
        &self,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        if limit == 0 {
            return Err(EngineError::Validation("limit must be at least 1".into()));
        }
        let limit = limit.min(self.config.leaderboard_max_limit);

        let ranked = self.call(self.store.top_ranked(limit)).await?;
        Ok(ranked.into_iter().map(LeaderboardEntry::from).collect())
    }

    /// Rank of a player, None if they have no accepted score yet.
    pub async fn rank_of(&self, player_id: PlayerId) -> Result<Option<u64>, EngineError> {
        self.load(&player_id).await?;
        Ok(self.call(self.store.rank_of(&player_id)).await?)
    }

    /// Accepted sessions of a player in submission order.
    pub async fn score_history(&self, player_id: PlayerId) -> Result<Vec<ScoreEvent>, EngineError> {
        self.load(&player_id).await?;
        Ok(self.call(self.store.score_events(&player_id)).await?)
    }

    // =========================================================================
    // Rewarded ads
    // =========================================================================

    /// Grant a rewarded ad if both the cooldown and the daily quota allow it.
    #[instrument(skip_all, fields(player = %player_id, ad_type = %ad_type))]
    pub async fn grant_ad(
        &self,
        player_id: PlayerId,
        ad_type: &AdType,
        now: Timestamp,
    ) -> Result<AdReward, EngineError> {
        let _guard = self.locks.acquire(player_id).await;

        for attempt in 1..=self.config.max_commit_attempts {
            let record = self.load(&player_id).await?;

            let reward = match check_grant(&record, ad_type, now, &self.config) {
                Ok(reward) => reward,
                Err(denial) => {
                    debug!(?denial, "ad grant denied");
                    return Err(denial.into());
                }
            };

            let version = record.version;
            let mut next = record;
            apply_grant(&mut next, ad_type, &reward, now);
            let grant = grant_record(&next, ad_type, &reward, now);

            match self.call(self.store.commit_ad_grant(next, version, grant)).await {
                Ok(stored) => {
                    info!(
                        reward_type = %reward.reward_type,
                        amount = reward.reward_amount,
                        granted_today = stored.ads_granted_on(utc_day(now)),
                        "ad reward granted"
                    );
                    return Ok(reward);
                }
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("grant_ad", &player_id))
    }

    /// Recount today's grants from the grant log and repair the cached
    /// counter if it drifted. Returns the logged count.
    #[instrument(skip_all, fields(player = %player_id))]
    pub async fn audit_ad_quota(
        &self,
        player_id: PlayerId,
        now: Timestamp,
    ) -> Result<u32, EngineError> {
        let _guard = self.locks.acquire(player_id).await;
        let day = utc_day(now);
        let (from, to) = day_window(now);

        for attempt in 1..=self.config.max_commit_attempts {
            let mut record = self.load(&player_id).await?;
            let logged = self
                .call(self.store.count_ad_grants(&player_id, from, to))
                .await?;

            let cached = record.ads_granted_on(day);
            if cached == logged {
                return Ok(logged);
            }

            warn!(cached, logged, "ad counter drifted from grant log, repairing");
            let version = record.version;
            record.ad_counter = Some(AdDayCounter { day, granted: logged });

            match self.call(self.store.put_player(record, version)).await {
                Ok(_) => return Ok(logged),
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("audit_ad_quota", &player_id))
    }

    /// Rewarded ad grants of a player in grant order.
    pub async fn ad_history(&self, player_id: PlayerId) -> Result<Vec<AdGrant>, EngineError> {
        self.load(&player_id).await?;
        Ok(self.call(self.store.ad_grants(&player_id)).await?)
    }

    // =========================================================================
    // Daily challenges
    // =========================================================================

    /// The player's challenge set for `today`, issued on first request.
    ///
    /// Concurrent first requests on a new day all return the set written
    /// by whichever commit won.
    #[instrument(skip_all, fields(player = %player_id, day = %today))]
    pub async fn get_daily_challenges(
        &self,
        player_id: PlayerId,
        today: NaiveDate,
    ) -> Result<Vec<DailyChallenge>, EngineError> {
        let _guard = self.locks.acquire(player_id).await;

        for attempt in 1..=self.config.max_commit_attempts {
            let mut record = self.load(&player_id).await?;
            if record.challenges_issued_on() == Some(today) {
                return Ok(record.challenges);
            }

            let version = record.version;
            record.challenges = issue_challenges(&player_id, today, version, &self.config);

            match self.call(self.store.put_player(record, version)).await {
                Ok(stored) => {
                    info!(count = stored.challenges.len(), "daily challenges issued");
                    return Ok(stored.challenges);
                }
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("get_daily_challenges", &player_id))
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Apply a purchase already verified by the billing platform.
    ///
    /// A replayed purchase id credits nothing and reports `accepted = false`.
    #[instrument(skip_all, fields(player = %player_id, purchase = %purchase.purchase_id))]
    pub async fn record_purchase(
        &self,
        player_id: PlayerId,
        purchase: &Purchase,
        now: Timestamp,
    ) -> Result<PurchaseReceipt, EngineError> {
        if purchase.purchase_id.trim().is_empty() {
            return Err(EngineError::Validation("purchase id is required".into()));
        }
        if let PurchaseItem::Character(character) = &purchase.item {
            if character.trim().is_empty() {
                return Err(EngineError::Validation("character id is required".into()));
            }
        }
        let _guard = self.locks.acquire(player_id).await;

        for attempt in 1..=self.config.max_commit_attempts {
            let mut record = self.load(&player_id).await?;
            if self.call(self.store.has_purchase(&purchase.purchase_id)).await? {
                debug!("purchase already recorded");
                return Ok(Self::replayed_purchase(&record));
            }

            let version = record.version;
            let effect = apply_purchase(&mut record, purchase, &self.config, now);
            let entry = PurchaseRecord {
                player_id,
                purchase: purchase.clone(),
                coins_credited: effect.coins_credited,
                unlocked: effect.unlocked.clone(),
                recorded_at: now,
            };

            match self.call(self.store.commit_purchase(record, version, entry)).await {
                Ok(stored) => {
                    info!(
                        coins = effect.coins_credited,
                        unlocked = ?effect.unlocked,
                        "purchase recorded"
                    );
                    return Ok(PurchaseReceipt {
                        accepted: true,
                        coins_credited: effect.coins_credited,
                        unlocked: effect.unlocked,
                        total_coins: stored.coins,
                    });
                }
                Err(StoreError::Conflict { .. }) => debug!(attempt, "version conflict, retrying"),
                Err(StoreError::DuplicatePurchase(_)) => {
                    let record = self.load(&player_id).await?;
                    return Ok(Self::replayed_purchase(&record));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted("record_purchase", &player_id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run a store call under the configured deadline.
    async fn call<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let timeout = self.config.store_timeout();
        match tokio::time::timeout(timeout, op).await {
            Ok(Err(StoreError::Unavailable(reason))) => {
                warn!(%reason, "store unavailable");
                Err(StoreError::Unavailable(reason))
            }
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "store call timed out");
                Err(StoreError::Unavailable(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    async fn load(&self, player_id: &PlayerId) -> Result<PlayerRecord, EngineError> {
        self.call(self.store.get_player(player_id))
            .await?
            .ok_or(EngineError::PlayerNotFound(*player_id))
    }

    async fn duplicate_receipt(&self, record: PlayerRecord) -> Result<ScoreReceipt, EngineError> {
        debug!("session already recorded, nothing credited");
        let above = self
            .call(self.store.count_ranked_above(record.stats.best_score))
            .await?;

        Ok(ScoreReceipt {
            accepted: false,
            coins_awarded: 0,
            is_new_record: false,
            challenge_coins: 0,
            completed_challenges: Vec::new(),
            total_coins: record.coins,
            rank: above + 1,
        })
    }

    fn replayed_purchase(record: &PlayerRecord) -> PurchaseReceipt {
        PurchaseReceipt {
            accepted: false,
            coins_credited: 0,
            unlocked: None,
            total_coins: record.coins,
        }
    }

    fn exhausted(&self, operation: &str, player_id: &PlayerId) -> EngineError {
        let attempts = self.config.max_commit_attempts;
        warn!(
            player = %player_id,
            attempts,
            "{} gave up after repeated version conflicts", operation
        );
        EngineError::Conflict { attempts }
    }
}
