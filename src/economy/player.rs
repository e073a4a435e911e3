//! Player Record Definitions
//!
//! The persistent per-player document: balance, lifetime stats, character
//! unlocks, the active daily challenge set and the ad throttle cache.
//! Uses BTreeMap for stable iteration and serialization order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::time::Timestamp;
use crate::economy::challenge::DailyChallenge;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Implements Ord for stable BTreeMap ordering and rank tie-breaks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

/// Character ("flutterer") identifier, e.g. `basic_cosmic`.
pub type CharacterId = String;

// =============================================================================
// GAME STATS
// =============================================================================

/// Lifetime gameplay statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Highest score ever submitted. Never decreases.
    pub best_score: u64,
    /// Highest level ever reached. Never decreases.
    pub max_level: u32,
    /// Sum of enemies defeated across all sessions.
    pub enemies_defeated: u64,
    /// Sum of survival time across all sessions.
    pub survival_seconds: u64,
    /// Number of accepted sessions.
    pub games_played: u64,
}

impl Default for GameStats {
    fn default() -> Self {
        Self {
            best_score: 0,
            // Every player starts on level 1
            max_level: 1,
            enemies_defeated: 0,
            survival_seconds: 0,
            games_played: 0,
        }
    }
}

/// Unlock state of one character for one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProgress {
    /// Whether the player may select this character.
    pub unlocked: bool,
    /// When it was unlocked (registration time for the starter).
    pub unlocked_at: Option<Timestamp>,
    /// Accepted sessions played with it.
    pub usage_count: u64,
}

/// Cached count of rewarded ads granted on one UTC day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdDayCounter {
    /// Day the count belongs to.
    pub day: NaiveDate,
    /// Grants issued that day.
    pub granted: u32,
}

// =============================================================================
// PLAYER RECORD
// =============================================================================

/// Persistent state of one registered player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Unique player ID
    pub player_id: PlayerId,
    /// Name shown on the leaderboard
    pub display_name: String,
    /// Registering device (one record per device)
    pub device_id: String,
    /// Client platform (`android`, `ios`, `web`)
    pub platform: String,

    /// Cosmic coin balance
    pub coins: u64,
    /// Lifetime stats
    pub stats: GameStats,
    /// Per-character unlock map
    pub characters: BTreeMap<CharacterId, CharacterProgress>,
    /// Active daily challenge set (replaced wholesale each day)
    pub challenges: Vec<DailyChallenge>,

    // =========================================================================
    // Ad throttle cache
    // =========================================================================

    /// Time of the last granted rewarded ad
    pub last_ad_at: Option<Timestamp>,
    /// Grants taken on `ad_counter.day`
    pub ad_counter: Option<AdDayCounter>,
    /// Lifetime rewarded ad grants
    pub ad_interactions: u64,
    /// Non-coin ad rewards by reward type (e.g. `extra_life`)
    pub item_credits: BTreeMap<String, u64>,

    /// Registration time
    pub created_at: Timestamp,
    /// Last mutation time
    pub last_active: Timestamp,
    /// Optimistic concurrency version, bumped by the store on every write
    pub version: u64,
}

impl PlayerRecord {
    /// Fresh record with one unlocked starter character and zero stats.
    pub fn register(
        player_id: PlayerId,
        display_name: impl Into<String>,
        device_id: impl Into<String>,
        platform: impl Into<String>,
        starter_character: &str,
        now: Timestamp,
    ) -> Self {
        let mut characters = BTreeMap::new();
        characters.insert(
            starter_character.to_string(),
            CharacterProgress {
                unlocked: true,
                unlocked_at: Some(now),
                usage_count: 0,
            },
        );

        Self {
            player_id,
            display_name: display_name.into(),
            device_id: device_id.into(),
            platform: platform.into(),
            coins: 0,
            stats: GameStats::default(),
            characters,
            challenges: Vec::new(),
            last_ad_at: None,
            ad_counter: None,
            ad_interactions: 0,
            item_credits: BTreeMap::new(),
            created_at: now,
            last_active: now,
            version: 0,
        }
    }

    /// Check whether a character is unlocked.
    pub fn has_unlocked(&self, character: &str) -> bool {
        self.characters.get(character).is_some_and(|c| c.unlocked)
    }

    /// Unlock a character. Returns false if it already was.
    pub fn unlock_character(&mut self, character: &str, now: Timestamp) -> bool {
        let progress = self.characters.entry(character.to_string()).or_default();
        if progress.unlocked {
            return false;
        }
        progress.unlocked = true;
        progress.unlocked_at = Some(now);
        true
    }

    /// Count one session played with `character`.
    pub fn record_character_use(&mut self, character: &str) {
        if let Some(progress) = self.characters.get_mut(character) {
            progress.usage_count = progress.usage_count.saturating_add(1);
        }
    }

    /// Credit coins to the balance.
    pub fn credit_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Ads granted on `day` according to the cached counter.
    pub fn ads_granted_on(&self, day: NaiveDate) -> u32 {
        match self.ad_counter {
            Some(counter) if counter.day == day => counter.granted,
            _ => 0,
        }
    }

    /// Issue date of the stored challenge set, if any.
    pub fn challenges_issued_on(&self) -> Option<NaiveDate> {
        self.challenges.first().map(|c| c.issued_on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    fn fresh() -> PlayerRecord {
        PlayerRecord::register(
            PlayerId::new([1; 16]),
            "nova",
            "device-1",
            "android",
            "basic_cosmic",
            now(),
        )
    }

    #[test]
    fn test_register_starts_with_starter_only() {
        let record = fresh();

        assert_eq!(record.coins, 0);
        assert_eq!(record.stats, GameStats::default());
        assert_eq!(record.stats.max_level, 1);
        assert_eq!(record.characters.len(), 1);
        assert!(record.has_unlocked("basic_cosmic"));
        assert_eq!(record.characters["basic_cosmic"].unlocked_at, Some(now()));
        assert!(record.challenges.is_empty());
    }

    #[test]
    fn test_unlock_character_once() {
        let mut record = fresh();

        assert!(record.unlock_character("frost_wing", now()));
        assert!(record.has_unlocked("frost_wing"));
        assert!(!record.unlock_character("frost_wing", now()));
        assert!(!record.unlock_character("basic_cosmic", now()));
    }

    #[test]
    fn test_character_use_only_counts_known() {
        let mut record = fresh();

        record.record_character_use("basic_cosmic");
        record.record_character_use("basic_cosmic");
        record.record_character_use("ghost");

        assert_eq!(record.characters["basic_cosmic"].usage_count, 2);
        assert!(!record.characters.contains_key("ghost"));
    }

    #[test]
    fn test_ad_counter_is_per_day() {
        let mut record = fresh();
        let today = now().date_naive();

        assert_eq!(record.ads_granted_on(today), 0);

        record.ad_counter = Some(AdDayCounter { day: today, granted: 4 });
        assert_eq!(record.ads_granted_on(today), 4);
        assert_eq!(record.ads_granted_on(today.succ_opt().unwrap()), 0);
    }

    #[test]
    fn test_player_id_uuid_round_trip() {
        let id = PlayerId::random();
        assert_eq!(PlayerId::from_uuid_str(&id.to_uuid_string()), Some(id));
        assert_eq!(PlayerId::from_uuid_str("not-a-uuid"), None);
    }
}
