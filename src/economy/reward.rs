//! Reward Calculator
//!
//! Pure function from (prior stats, session) to (new stats, coins). No I/O,
//! no randomness. Calling it twice for the same session credits twice, so
//! session admission is deduplicated before this point.

use crate::config::{EconomyConfig, BASIS_POINTS};
use crate::economy::player::GameStats;
use crate::economy::submission::SessionResult;

/// Result of rewarding one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardOutcome {
    /// Stats after the session
    pub stats: GameStats,
    /// Coins earned (record bonus + level bonus + base)
    pub coins_awarded: u64,
    /// Session beat the previous best score
    pub is_new_record: bool,
    /// Session reached a new max level
    pub is_new_max_level: bool,
}

/// Compute stat deltas and the coin award for one session.
///
/// - New best score: `best_score = score`, `+high_score_bonus`
/// - New max level: `max_level = level`, `+level * level_bonus_per_level`
/// - Always: cumulative counters add up, `+floor(score * rate) + flat`
pub fn compute_reward(
    prior: &GameStats,
    session: &SessionResult,
    config: &EconomyConfig,
) -> RewardOutcome {
    let mut stats = prior.clone();
    let mut coins: u64 = 0;

    let is_new_record = session.score > prior.best_score;
    if is_new_record {
        stats.best_score = session.score;
        coins = coins.saturating_add(config.high_score_bonus);
    }

    let is_new_max_level = session.level > prior.max_level;
    if is_new_max_level {
        stats.max_level = session.level;
        coins = coins.saturating_add(
            u64::from(session.level).saturating_mul(config.level_bonus_per_level),
        );
    }

    stats.enemies_defeated = stats.enemies_defeated.saturating_add(session.enemies_defeated);
    stats.survival_seconds = stats.survival_seconds.saturating_add(session.survival_seconds);
    stats.games_played = stats.games_played.saturating_add(1);

    coins = coins
        .saturating_add(base_reward(session.score, config.base_reward_bps()))
        .saturating_add(config.base_reward_flat);

    RewardOutcome {
        stats,
        coins_awarded: coins,
        is_new_record,
        is_new_max_level,
    }
}

/// `floor(score * bps / 10_000)` in exact integer arithmetic.
#[inline]
fn base_reward(score: u64, bps: u64) -> u64 {
    let scaled = u128::from(score) * u128::from(bps) / u128::from(BASIS_POINTS);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(score: u64, level: u32, survival: u64, enemies: u64) -> SessionResult {
        SessionResult {
            score,
            level,
            survival_seconds: survival,
            enemies_defeated: enemies,
        }
    }

    #[test]
    fn test_first_record_with_level_up() {
        let config = EconomyConfig::default();
        let prior = GameStats::default();

        let outcome = compute_reward(&prior, &session(15750, 8, 200, 30), &config);

        // 50 record + 80 level + floor(157.5) + 10 base
        assert_eq!(outcome.coins_awarded, 297);
        assert!(outcome.is_new_record);
        assert!(outcome.is_new_max_level);
        assert_eq!(outcome.stats.best_score, 15750);
        assert_eq!(outcome.stats.max_level, 8);
        assert_eq!(outcome.stats.games_played, 1);
        assert_eq!(outcome.stats.survival_seconds, 200);
        assert_eq!(outcome.stats.enemies_defeated, 30);
    }

    #[test]
    fn test_no_improvement_pays_base_only() {
        let config = EconomyConfig::default();
        let prior = GameStats {
            best_score: 20_000,
            max_level: 12,
            enemies_defeated: 100,
            survival_seconds: 1000,
            games_played: 9,
        };

        let outcome = compute_reward(&prior, &session(1234, 4, 30, 5), &config);

        assert_eq!(outcome.coins_awarded, 12 + 10);
        assert!(!outcome.is_new_record);
        assert!(!outcome.is_new_max_level);
        assert_eq!(outcome.stats.best_score, 20_000);
        assert_eq!(outcome.stats.max_level, 12);
        assert_eq!(outcome.stats.enemies_defeated, 105);
        assert_eq!(outcome.stats.survival_seconds, 1030);
        assert_eq!(outcome.stats.games_played, 10);
    }

    #[test]
    fn test_equal_score_is_not_a_record() {
        let config = EconomyConfig::default();
        let prior = GameStats {
            best_score: 500,
            ..GameStats::default()
        };

        let outcome = compute_reward(&prior, &session(500, 1, 10, 0), &config);
        assert!(!outcome.is_new_record);
        assert_eq!(outcome.coins_awarded, 5 + 10);
    }

    #[test]
    fn test_rate_uses_configured_values() {
        let config = EconomyConfig {
            high_score_bonus: 7,
            level_bonus_per_level: 3,
            base_reward_rate: 0.07,
            base_reward_flat: 1,
            ..EconomyConfig::default()
        };

        // 7 record + 2*3 level + floor(100 * 0.07) + 1
        let outcome = compute_reward(&GameStats::default(), &session(100, 2, 5, 0), &config);
        assert_eq!(outcome.coins_awarded, 7 + 6 + 7 + 1);
    }

    proptest! {
        #[test]
        fn prop_best_and_level_never_decrease(
            best in 0u64..1_000_000,
            max_level in 1u32..100,
            score in 0u64..1_000_000,
            level in 1u32..100,
        ) {
            let config = EconomyConfig::default();
            let prior = GameStats { best_score: best, max_level, ..GameStats::default() };
            let outcome = compute_reward(&prior, &session(score, level, 0, 0), &config);

            prop_assert_eq!(outcome.stats.best_score, best.max(score));
            prop_assert_eq!(outcome.stats.max_level, max_level.max(level));
            prop_assert_eq!(outcome.is_new_record, score > best);
            prop_assert!(outcome.coins_awarded >= score / 100 + 10);
        }

        #[test]
        fn prop_base_reward_is_exact_floor(score in 0u64..u64::MAX / 10_000) {
            prop_assert_eq!(base_reward(score, 100), score / 100);
        }
    }
}
