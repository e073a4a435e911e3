//! Daily Challenge Issuer
//!
//! Samples a player's challenge set for one UTC day from the configured
//! template pool and settles challenge completion against session results.
//!
//! Generation is a pure function of (player, day, record version), so the
//! engine can run it inside a compare-and-swap loop: whichever writer wins
//! the version race defines the day's set, and every later reader on that
//! day gets the stored set back instead of a fresh draw.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::core::rng::SeededRng;
use crate::core::time::Timestamp;
use crate::economy::player::PlayerId;
use crate::economy::submission::SessionResult;

/// What a challenge measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// Reach a score in one session
    Score,
    /// Survive a number of seconds in one session
    Survival,
    /// Reach a level in one session
    Level,
    /// Defeat a number of enemies in one session
    Enemies,
}

impl ChallengeKind {
    /// The session value this kind is measured against.
    pub fn measure(self, session: &SessionResult) -> u64 {
        match self {
            ChallengeKind::Score => session.score,
            ChallengeKind::Survival => session.survival_seconds,
            ChallengeKind::Level => u64::from(session.level),
            ChallengeKind::Enemies => session.enemies_defeated,
        }
    }
}

/// A configured challenge blueprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    /// Display name
    pub name: String,
    /// Measured quantity
    pub kind: ChallengeKind,
    /// Value to reach
    pub target: u64,
    /// Coins paid on completion
    pub reward_coins: u64,
}

impl ChallengeTemplate {
    /// Create a template.
    pub fn new(
        name: impl Into<String>,
        kind: ChallengeKind,
        target: u64,
        reward_coins: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
            reward_coins,
        }
    }
}

/// One issued challenge in a player's active set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyChallenge {
    /// Unique id of this issuance
    pub challenge_id: String,
    /// Display name
    pub name: String,
    /// Measured quantity
    pub kind: ChallengeKind,
    /// Value to reach
    pub target: u64,
    /// Coins paid on completion
    pub reward_coins: u64,
    /// Whether it has been completed
    pub completed: bool,
    /// When it was completed
    pub completed_at: Option<Timestamp>,
    /// UTC day the set was issued for
    pub issued_on: NaiveDate,
}

impl DailyChallenge {
    fn from_template(template: &ChallengeTemplate, challenge_id: String, day: NaiveDate) -> Self {
        Self {
            challenge_id,
            name: template.name.clone(),
            kind: template.kind,
            target: template.target,
            reward_coins: template.reward_coins,
            completed: false,
            completed_at: None,
            issued_on: day,
        }
    }
}

/// Generate a fresh challenge set for `day`.
///
/// Draws `challenge_template_count` distinct templates without replacement.
/// `nonce` is the record version the set will be written against.
pub fn issue_challenges(
    player_id: &PlayerId,
    day: NaiveDate,
    nonce: u64,
    config: &EconomyConfig,
) -> Vec<DailyChallenge> {
    let mut rng = SeededRng::for_challenge_assignment(player_id.as_bytes(), day, nonce);
    let picks = rng.sample_indices(
        config.challenge_templates.len(),
        config.challenge_template_count,
    );

    picks
        .into_iter()
        .map(|idx| {
            let challenge_id = format!("{:016x}{:016x}", rng.next_u64(), rng.next_u64());
            DailyChallenge::from_template(&config.challenge_templates[idx], challenge_id, day)
        })
        .collect()
}

/// Challenges completed by one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChallengeSettlement {
    /// Ids of newly completed challenges
    pub completed: Vec<String>,
    /// Coins earned from them
    pub coins: u64,
}

/// Mark every open challenge issued on `day` that `session` satisfies.
pub fn settle_challenges(
    challenges: &mut [DailyChallenge],
    session: &SessionResult,
    day: NaiveDate,
    now: Timestamp,
) -> ChallengeSettlement {
    let mut settlement = ChallengeSettlement::default();

    for challenge in challenges
        .iter_mut()
        .filter(|c| c.issued_on == day && !c.completed)
    {
        if challenge.kind.measure(session) >= challenge.target {
            challenge.completed = true;
            challenge.completed_at = Some(now);
            settlement.coins = settlement.coins.saturating_add(challenge.reward_coins);
            settlement.completed.push(challenge.challenge_id.clone());
        }
    }

    settlement
}
