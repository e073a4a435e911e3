//! Purchase Recording
//!
//! Payment is verified by the platform billing service before a purchase
//! reaches the engine. Here it is only applied to the record and logged.

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::core::time::Timestamp;
use crate::economy::player::{CharacterId, PlayerId, PlayerRecord};

/// Coin pack sizes on sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinPack {
    /// Small pack
    Small,
    /// Medium pack
    Medium,
    /// Large pack
    Large,
}

/// What was bought.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseItem {
    /// A single character unlock
    Character(CharacterId),
    /// Starter pack: a character plus bonus coins
    StarterPack,
    /// A pack of coins
    CoinPack(CoinPack),
}

/// A verified purchase handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique purchase id (replays of the same id credit nothing)
    pub purchase_id: String,
    /// Item bought
    pub item: PurchaseItem,
    /// Price in minor units of `currency`
    pub price_minor: u64,
    /// ISO currency code
    pub currency: String,
    /// Store platform (`android`, `ios`, `web`)
    pub platform: String,
    /// Platform transaction id, if any
    pub transaction_id: Option<String>,
}

/// Stored purchase audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Buyer
    pub player_id: PlayerId,
    /// The purchase as received
    pub purchase: Purchase,
    /// Coins credited by it
    pub coins_credited: u64,
    /// Character unlocked by it, if newly unlocked
    pub unlocked: Option<CharacterId>,
    /// When it was applied
    pub recorded_at: Timestamp,
}

/// Effect of applying a purchase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseEffect {
    /// Coins credited
    pub coins_credited: u64,
    /// Character newly unlocked
    pub unlocked: Option<CharacterId>,
}

/// Apply `purchase` to `record`.
pub fn apply_purchase(
    record: &mut PlayerRecord,
    purchase: &Purchase,
    config: &EconomyConfig,
    now: Timestamp,
) -> PurchaseEffect {
    let (character, coins) = match &purchase.item {
        PurchaseItem::Character(id) => (Some(id.as_str()), 0),
        PurchaseItem::StarterPack => (
            Some(config.starter_pack_character.as_str()),
            config.starter_pack_coins,
        ),
        PurchaseItem::CoinPack(pack) => {
            let coins = match pack {
                CoinPack::Small => config.coin_packs.small,
                CoinPack::Medium => config.coin_packs.medium,
                CoinPack::Large => config.coin_packs.large,
            };
            (None, coins)
        }
    };

    let unlocked = character
        .filter(|id| record.unlock_character(id, now))
        .map(str::to_string);

    record.credit_coins(coins);
    record.last_active = now;

    PurchaseEffect {
        coins_credited: coins,
        unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 7, 4, 9, 0, 0).unwrap()
    }

    fn record() -> PlayerRecord {
        PlayerRecord::register(
            PlayerId::new([5; 16]),
            "lyra",
            "dev-5",
            "web",
            "basic_cosmic",
            now(),
        )
    }

    fn purchase(item: PurchaseItem) -> Purchase {
        Purchase {
            purchase_id: "p-1".into(),
            item,
            price_minor: 199,
            currency: "USD".into(),
            platform: "android".into(),
            transaction_id: Some("GPA.1234".into()),
        }
    }

    #[test]
    fn test_coin_packs() {
        let config = EconomyConfig::default();
        let mut rec = record();

        let packs = [
            (CoinPack::Small, 500),
            (CoinPack::Medium, 1200),
            (CoinPack::Large, 2500),
        ];
        for (pack, expected) in packs {
            let item = purchase(PurchaseItem::CoinPack(pack));
            let effect = apply_purchase(&mut rec, &item, &config, now());
            assert_eq!(effect.coins_credited, expected);
            assert_eq!(effect.unlocked, None);
        }
        assert_eq!(rec.coins, 4200);
    }

    #[test]
    fn test_starter_pack() {
        let config = EconomyConfig::default();
        let mut rec = record();

        let effect = apply_purchase(&mut rec, &purchase(PurchaseItem::StarterPack), &config, now());

        assert_eq!(effect.coins_credited, 1000);
        assert_eq!(effect.unlocked.as_deref(), Some("epic_blaster_wing"));
        assert!(rec.has_unlocked("epic_blaster_wing"));
        assert_eq!(rec.coins, 1000);
    }

    #[test]
    fn test_character_already_owned() {
        let config = EconomyConfig::default();
        let mut rec = record();

        let effect = apply_purchase(
            &mut rec,
            &purchase(PurchaseItem::Character("basic_cosmic".into())),
            &config,
            now(),
        );
        assert_eq!(effect, PurchaseEffect::default());
    }
}
