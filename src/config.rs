//! Economy Configuration
//!
//! Every numeric threshold the engine applies lives here: ad throttling,
//! reward formula, challenge pool, purchase payouts and retry budget.
//! Nothing else in the crate carries a copy of these values.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economy::challenge::{ChallengeKind, ChallengeTemplate};

/// Reward formula rates are applied in basis points (1/10_000).
pub const BASIS_POINTS: u64 = 10_000;

/// Coins paid out per coin pack size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinPackRewards {
    /// `small` pack
    pub small: u64,
    /// `medium` pack
    pub medium: u64,
    /// `large` pack
    pub large: u64,
}

impl Default for CoinPackRewards {
    fn default() -> Self {
        Self {
            small: 500,
            medium: 1200,
            large: 2500,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    // =========================================================================
    // Ad throttle
    // =========================================================================
    /// Minimum seconds between two rewarded ad grants.
    pub ad_cooldown_secs: u64,
    /// Rewarded ad grants allowed per UTC day.
    pub daily_ad_limit: u32,
    /// Coins granted for a `coins` ad.
    pub coin_ad_reward: u64,
    /// Units granted for any other ad reward type (e.g. one extra life).
    pub unit_ad_reward: u64,

    // =========================================================================
    // Score rewards
    // =========================================================================
    /// Coins for beating the previous best score.
    pub high_score_bonus: u64,
    /// Coins per level when a new max level is reached.
    pub level_bonus_per_level: u64,
    /// Fraction of the score paid as base reward (floored).
    pub base_reward_rate: f64,
    /// Flat base reward paid on every accepted session.
    pub base_reward_flat: u64,

    // =========================================================================
    // Daily challenges
    // =========================================================================
    /// Challenges sampled per daily set.
    pub challenge_template_count: usize,
    /// Pool the daily set is sampled from.
    pub challenge_templates: Vec<ChallengeTemplate>,

    // =========================================================================
    // Characters & purchases
    // =========================================================================
    /// Character unlocked at registration.
    pub starter_character: String,
    /// Character unlocked by the starter pack.
    pub starter_pack_character: String,
    /// Coins included in the starter pack.
    pub starter_pack_coins: u64,
    /// Coin pack payouts.
    pub coin_packs: CoinPackRewards,

    // =========================================================================
    // Engine
    // =========================================================================
    /// Read-compute-write attempts before surfacing a conflict.
    pub max_commit_attempts: u32,
    /// Per-call store deadline in milliseconds.
    pub store_timeout_ms: u64,
    /// Largest leaderboard page served.
    pub leaderboard_max_limit: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            ad_cooldown_secs: 5 * 60,
            daily_ad_limit: 10,
            coin_ad_reward: 25,
            unit_ad_reward: 1,
            high_score_bonus: 50,
            level_bonus_per_level: 10,
            base_reward_rate: 0.01,
            base_reward_flat: 10,
            challenge_template_count: 3,
            challenge_templates: default_challenge_templates(),
            starter_character: "basic_cosmic".into(),
            starter_pack_character: "epic_blaster_wing".into(),
            starter_pack_coins: 1000,
            coin_packs: CoinPackRewards::default(),
            max_commit_attempts: 5,
            store_timeout_ms: 2_000,
            leaderboard_max_limit: 100,
        }
    }
}

/// The stock challenge pool.
pub fn default_challenge_templates() -> Vec<ChallengeTemplate> {
    vec![
        ChallengeTemplate::new("Score Master", ChallengeKind::Score, 5000, 100),
        ChallengeTemplate::new("Survivor", ChallengeKind::Survival, 120, 75),
        ChallengeTemplate::new("Level Climber", ChallengeKind::Level, 10, 125),
        ChallengeTemplate::new("Enemy Hunter", ChallengeKind::Enemies, 50, 80),
    ]
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// JSON document could not be parsed.
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    /// Values parse but are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EconomyConfig {
    /// Create config from `ECONOMY_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            ad_cooldown_secs: env_or("ECONOMY_AD_COOLDOWN_SECS", defaults.ad_cooldown_secs)?,
            daily_ad_limit: env_or("ECONOMY_DAILY_AD_LIMIT", defaults.daily_ad_limit)?,
            coin_ad_reward: env_or("ECONOMY_COIN_AD_REWARD", defaults.coin_ad_reward)?,
            unit_ad_reward: env_or("ECONOMY_UNIT_AD_REWARD", defaults.unit_ad_reward)?,
            high_score_bonus: env_or("ECONOMY_HIGH_SCORE_BONUS", defaults.high_score_bonus)?,
            level_bonus_per_level: env_or(
                "ECONOMY_LEVEL_BONUS_PER_LEVEL",
                defaults.level_bonus_per_level,
            )?,
            base_reward_rate: env_or("ECONOMY_BASE_REWARD_RATE", defaults.base_reward_rate)?,
            base_reward_flat: env_or("ECONOMY_BASE_REWARD_FLAT", defaults.base_reward_flat)?,
            challenge_template_count: env_or(
                "ECONOMY_CHALLENGE_TEMPLATE_COUNT",
                defaults.challenge_template_count,
            )?,
            max_commit_attempts: env_or(
                "ECONOMY_MAX_COMMIT_ATTEMPTS",
                defaults.max_commit_attempts,
            )?,
            store_timeout_ms: env_or("ECONOMY_STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_ad_limit == 0 {
            return Err(ConfigError::Invalid("daily_ad_limit must be at least 1".into()));
        }
        if !self.base_reward_rate.is_finite() || self.base_reward_rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "base_reward_rate must be a non-negative number, got {}",
                self.base_reward_rate
            )));
        }
        if self.challenge_template_count == 0 {
            return Err(ConfigError::Invalid(
                "challenge_template_count must be at least 1".into(),
            ));
        }
        if self.challenge_template_count > self.challenge_templates.len() {
            return Err(ConfigError::Invalid(format!(
                "challenge_template_count {} exceeds pool of {} templates",
                self.challenge_template_count,
                self.challenge_templates.len()
            )));
        }
        for (i, template) in self.challenge_templates.iter().enumerate() {
            if self.challenge_templates[..i].iter().any(|t| t.kind == template.kind) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate challenge template kind {:?}",
                    template.kind
                )));
            }
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid("max_commit_attempts must be at least 1".into()));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid("store_timeout_ms must be at least 1".into()));
        }
        if self.starter_character.is_empty() {
            return Err(ConfigError::Invalid("starter_character must be set".into()));
        }
        Ok(())
    }

    /// Ad cooldown as a duration comparable with timestamps.
    pub fn ad_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.ad_cooldown_secs).unwrap_or(i64::MAX))
    }

    /// Base reward rate in basis points, rounded once.
    pub fn base_reward_bps(&self) -> u64 {
        (self.base_reward_rate * BASIS_POINTS as f64).round() as u64
    }

    /// Per-call store deadline.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EconomyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_reward_bps(), 100);
        assert_eq!(config.ad_cooldown(), chrono::Duration::minutes(5));
        assert_eq!(config.challenge_templates.len(), 4);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EconomyConfig::from_json_str(
            r#"{ "daily_ad_limit": 3, "ad_cooldown_secs": 60 }"#,
        )
        .unwrap();

        assert_eq!(config.daily_ad_limit, 3);
        assert_eq!(config.ad_cooldown_secs, 60);
        assert_eq!(config.high_score_bonus, 50);
        assert_eq!(config.coin_packs, CoinPackRewards::default());
    }

    #[test]
    fn test_rejects_oversized_challenge_count() {
        let result = EconomyConfig::from_json_str(r#"{ "challenge_template_count": 5 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicate_template_kinds() {
        let mut config = EconomyConfig::default();
        config.challenge_templates.push(ChallengeTemplate::new(
            "Score Legend",
            ChallengeKind::Score,
            20_000,
            300,
        ));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_rate_and_limits() {
        let config = EconomyConfig {
            base_reward_rate: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EconomyConfig {
            daily_ad_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EconomyConfig {
            max_commit_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = EconomyConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("ECONOMY_DAILY_AD_LIMIT", "7");
        let config = EconomyConfig::from_env().unwrap();
        std::env::remove_var("ECONOMY_DAILY_AD_LIMIT");

        assert_eq!(config.daily_ad_limit, 7);
    }
}
