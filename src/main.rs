//! Nebula Economy
//!
//! Demo driver for the reward and ranking engine. Runs a short day of play
//! against the in-memory store and prints the leaderboard.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nebula_economy::{
    core::time::utc_day,
    economy::purchase::{CoinPack, Purchase, PurchaseItem},
    AdType, EconomyConfig, EconomyEngine, EngineError, MemoryStore, PlayerId, ScoreSubmission,
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = EconomyConfig::from_env().context("invalid ECONOMY_* configuration")?;
    info!("Nebula Economy v{}", VERSION);
    info!(
        "Ad cooldown {}s, {} ads/day, {} daily challenges",
        config.ad_cooldown_secs, config.daily_ad_limit, config.challenge_template_count
    );

    let engine = Arc::new(EconomyEngine::new(Arc::new(MemoryStore::new()), config)?);
    demo_day(engine).await
}

/// Register a few players, play concurrently, then show the results.
async fn demo_day(engine: Arc<EconomyEngine>) -> Result<()> {
    info!("=== Registering Players ===");
    let now = Utc::now();
    let mut players: Vec<PlayerId> = Vec::new();
    for name in ["nova", "vega", "lyra", "orion"] {
        let record = engine
            .register_player(name, &format!("demo-{name}"), "web", now)
            .await?;
        info!("Registered {} as {}", name, record.player_id);
        players.push(record.player_id);
    }

    info!("=== Daily Challenges ===");
    let today = utc_day(now);
    for challenge in engine.get_daily_challenges(players[0], today).await? {
        info!(
            "{}: {:?} >= {} pays {} coins",
            challenge.name, challenge.kind, challenge.target, challenge.reward_coins
        );
    }

    info!("=== Playing Sessions ===");
    let sessions = players.iter().enumerate().flat_map(|(p, player_id)| {
        (0..5u8).map(move |round| {
            let score = 1_000 * (p as i64 + 1) + 700 * i64::from(round);
            ScoreSubmission {
                player_id: *player_id,
                score,
                level: 1 + i64::from(round) * 2,
                survival_seconds: 30 + 25 * i64::from(round),
                enemies_defeated: 4 + 12 * i64::from(round),
                character_used: "basic_cosmic".into(),
                session_id: format!("demo-{p}-{round}"),
            }
        })
    });

    let submissions = sessions.map(|submission| {
        let engine = engine.clone();
        async move { engine.submit_score(&submission, now).await }
    });
    let results = join_all(submissions).await;

    let mut accepted = 0;
    for result in results {
        match result {
            Ok(receipt) if receipt.accepted => accepted += 1,
            Ok(_) => {}
            Err(err) => warn!("Submission failed: {}", err),
        }
    }
    info!("{} sessions accepted", accepted);

    // Replaying a session credits nothing
    let replay = ScoreSubmission {
        player_id: players[0],
        score: 1_000,
        level: 1,
        survival_seconds: 30,
        enemies_defeated: 4,
        character_used: "basic_cosmic".into(),
        session_id: "demo-0-0".into(),
    };
    let receipt = engine.submit_score(&replay, now).await?;
    info!("Replayed session accepted: {}", receipt.accepted);

    info!("=== Rewarded Ads ===");
    engine.grant_ad(players[1], &AdType::Coins, now).await?;
    match engine.grant_ad(players[1], &AdType::Coins, now + Duration::seconds(30)).await {
        Err(EngineError::CooldownActive { retry_after }) => {
            info!("Second ad refused, retry in {}s", retry_after.as_secs())
        }
        other => warn!("Unexpected ad outcome: {:?}", other),
    }

    info!("=== Purchases ===");
    let purchase = Purchase {
        purchase_id: "demo-order-1".into(),
        item: PurchaseItem::CoinPack(CoinPack::Medium),
        price_minor: 299,
        currency: "USD".into(),
        platform: "web".into(),
        transaction_id: None,
    };
    let receipt = engine.record_purchase(players[2], &purchase, now).await?;
    info!("Coin pack credited {} coins", receipt.coins_credited);

    info!("=== Leaderboard ===");
    for entry in engine.get_leaderboard(10).await? {
        let record = engine.player(entry.player_id).await?;
        info!(
            "#{}: {} - {} (level {}) - {} coins",
            entry.rank, entry.display_name, entry.score, entry.level, record.coins
        );
    }

    Ok(())
}
