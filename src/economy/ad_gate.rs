//! Ad Throttle Gate
//!
//! Two independent gates guard every rewarded ad grant:
//!
//! ```text
//!   request ──► cooldown gate ──► daily quota gate ──► grant
//!                    │                   │
//!                    ▼                   ▼
//!             CooldownActive     DailyLimitReached
//! ```
//!
//! The decision reads only the player record, so the engine can evaluate
//! and apply it inside a single version-conditioned write. Two concurrent
//! requests cannot both pass: the loser's write fails the version check
//! and its retry sees the winner's cooldown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::core::time::{utc_day, Timestamp};
use crate::economy::ledger::AdGrant;
use crate::economy::player::{AdDayCounter, PlayerRecord};

/// Reward requested for watching an ad.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdType {
    /// Fixed coin payout
    Coins,
    /// Unit reward of a named item (e.g. `extra_life`)
    Item(String),
}

impl AdType {
    /// Wire name of the ad type.
    pub fn as_str(&self) -> &str {
        match self {
            AdType::Coins => "coins",
            AdType::Item(name) => name,
        }
    }
}

impl FromStr for AdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("ad type must not be empty".into()),
            "coins" => Ok(AdType::Coins),
            other => Ok(AdType::Item(other.to_string())),
        }
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a grant pays out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdReward {
    /// Reward type (`coins` or the item name)
    pub reward_type: String,
    /// Amount credited
    pub reward_amount: u64,
}

/// Why a grant was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdDenial {
    /// Too soon after the previous grant.
    CooldownActive {
        /// Whole seconds until the cooldown lapses (rounded up)
        retry_after_secs: u64,
    },
    /// Quota for the current UTC day is used up.
    DailyLimitReached {
        /// Configured quota
        limit: u32,
    },
}

/// Decide whether `record` may receive an ad reward at `now`.
pub fn check_grant(
    record: &PlayerRecord,
    ad_type: &AdType,
    now: Timestamp,
    config: &EconomyConfig,
) -> Result<AdReward, AdDenial> {
    if let Some(last) = record.last_ad_at {
        let elapsed = now.signed_duration_since(last);
        let cooldown = config.ad_cooldown();
        if elapsed < cooldown {
            let remaining = cooldown - elapsed;
            let millis = u64::try_from(remaining.num_milliseconds()).unwrap_or(0);
            return Err(AdDenial::CooldownActive {
                retry_after_secs: millis.div_ceil(1000),
            });
        }
    }

    if record.ads_granted_on(utc_day(now)) >= config.daily_ad_limit {
        return Err(AdDenial::DailyLimitReached {
            limit: config.daily_ad_limit,
        });
    }

    let reward_amount = match ad_type {
        AdType::Coins => config.coin_ad_reward,
        AdType::Item(_) => config.unit_ad_reward,
    };

    Ok(AdReward {
        reward_type: ad_type.as_str().to_string(),
        reward_amount,
    })
}

/// Credit a granted reward and advance the throttle state.
pub fn apply_grant(record: &mut PlayerRecord, ad_type: &AdType, reward: &AdReward, now: Timestamp) {
    match ad_type {
        AdType::Coins => record.credit_coins(reward.reward_amount),
        AdType::Item(name) => {
            let credits = record.item_credits.entry(name.clone()).or_insert(0);
            *credits = credits.saturating_add(reward.reward_amount);
        }
    }

    let day = utc_day(now);
    record.ad_counter = Some(AdDayCounter {
        day,
        granted: record.ads_granted_on(day).saturating_add(1),
    });
    record.last_ad_at = Some(now);
    record.ad_interactions = record.ad_interactions.saturating_add(1);
    record.last_active = now;
}

/// Audit entry for a grant.
pub fn grant_record(
    record: &PlayerRecord,
    ad_type: &AdType,
    reward: &AdReward,
    now: Timestamp,
) -> AdGrant {
    AdGrant {
        grant_id: uuid::Uuid::new_v4().to_string(),
        player_id: record.player_id,
        ad_type: ad_type.as_str().to_string(),
        reward_type: reward.reward_type.clone(),
        reward_amount: reward.reward_amount,
        granted_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::player::PlayerId;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
    }

    fn record() -> PlayerRecord {
        PlayerRecord::register(PlayerId::new([2; 16]), "vega", "dev-2", "ios", "basic_cosmic", t0())
    }

    fn grant(
        record: &mut PlayerRecord,
        ad_type: &AdType,
        now: Timestamp,
        config: &EconomyConfig,
    ) -> Result<AdReward, AdDenial> {
        let reward = check_grant(record, ad_type, now, config)?;
        apply_grant(record, ad_type, &reward, now);
        Ok(reward)
    }

    #[test]
    fn test_parse_ad_type() {
        assert_eq!("coins".parse::<AdType>(), Ok(AdType::Coins));
        assert_eq!("extra_life".parse::<AdType>(), Ok(AdType::Item("extra_life".into())));
        assert!("".parse::<AdType>().is_err());
    }

    #[test]
    fn test_reward_amount_by_type() {
        let config = EconomyConfig::default();
        let mut rec = record();

        let coins = grant(&mut rec, &AdType::Coins, t0(), &config).unwrap();
        assert_eq!(coins, AdReward { reward_type: "coins".into(), reward_amount: 25 });
        assert_eq!(rec.coins, 25);

        let later = t0() + Duration::minutes(10);
        let life = grant(&mut rec, &AdType::Item("extra_life".into()), later, &config).unwrap();
        assert_eq!(life.reward_amount, 1);
        assert_eq!(rec.item_credits["extra_life"], 1);
        assert_eq!(rec.coins, 25);
        assert_eq!(rec.ad_interactions, 2);
    }

    #[test]
    fn test_cooldown_window() {
        let config = EconomyConfig::default();
        let mut rec = record();
        grant(&mut rec, &AdType::Coins, t0(), &config).unwrap();

        let early = t0() + Duration::minutes(4) + Duration::seconds(59);
        assert_eq!(
            check_grant(&rec, &AdType::Coins, early, &config),
            Err(AdDenial::CooldownActive { retry_after_secs: 1 })
        );

        let late = t0() + Duration::minutes(5) + Duration::seconds(1);
        assert!(check_grant(&rec, &AdType::Coins, late, &config).is_ok());
    }

    #[test]
    fn test_cooldown_comes_from_config() {
        let config = EconomyConfig {
            ad_cooldown_secs: 30,
            ..EconomyConfig::default()
        };
        let mut rec = record();
        grant(&mut rec, &AdType::Coins, t0(), &config).unwrap();

        assert!(check_grant(&rec, &AdType::Coins, t0() + Duration::seconds(29), &config).is_err());
        assert!(check_grant(&rec, &AdType::Coins, t0() + Duration::seconds(30), &config).is_ok());
    }

    #[test]
    fn test_daily_quota_resets_at_utc_midnight() {
        let config = EconomyConfig::default();
        let mut rec = record();
        let day_start = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        for i in 0..10 {
            let at = day_start + Duration::minutes(6 * i);
            grant(&mut rec, &AdType::Coins, at, &config).unwrap();
        }
        assert_eq!(rec.ads_granted_on(utc_day(day_start)), 10);

        let eleventh = day_start + Duration::hours(5);
        assert_eq!(
            check_grant(&rec, &AdType::Coins, eleventh, &config),
            Err(AdDenial::DailyLimitReached { limit: 10 })
        );

        let next_day = day_start + Duration::days(1);
        assert!(grant(&mut rec, &AdType::Coins, next_day, &config).is_ok());
        assert_eq!(rec.ads_granted_on(utc_day(next_day)), 1);
    }

    #[test]
    fn test_grant_record_mirrors_reward() {
        let rec = record();
        let reward = AdReward { reward_type: "coins".into(), reward_amount: 25 };
        let entry = grant_record(&rec, &AdType::Coins, &reward, t0());

        assert_eq!(entry.player_id, rec.player_id);
        assert_eq!(entry.ad_type, "coins");
        assert_eq!(entry.reward_amount, 25);
        assert_eq!(entry.granted_at, t0());
    }
}
