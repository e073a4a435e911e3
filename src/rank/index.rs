//! Rank Index
//!
//! Materialized projection of each player's best score. Answers
//! "how many players beat score X" and "top N" without scanning the
//! player population.
//!
//! Ordering is (score desc, last-improved asc, player id asc): on equal
//! scores whoever got there first is listed first. Rank itself ignores the
//! tie-break, so tied players share a rank.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::time::Timestamp;
use crate::economy::ledger::ScoreEvent;
use crate::economy::player::{CharacterId, PlayerId};
use crate::rank::tree::OrderStatTree;

/// A player's standing on the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankIndexEntry {
    /// Ranked player
    pub player_id: PlayerId,
    /// Best score
    pub best_score: u64,
    /// When `best_score` was first reached
    pub improved_at: Timestamp,
    /// Leaderboard name
    pub display_name: String,
    /// Level of the best-scoring session; replaced only with the score
    pub level: u32,
    /// Character of the best-scoring session
    pub character_used: CharacterId,
}

impl RankIndexEntry {
    /// Candidate entry for a score event.
    pub fn from_event(event: &ScoreEvent, display_name: impl Into<String>) -> Self {
        Self {
            player_id: event.player_id,
            best_score: event.score,
            improved_at: event.submitted_at,
            display_name: display_name.into(),
            level: event.level,
            character_used: event.character_used.clone(),
        }
    }

    fn key(&self) -> RankKey {
        RankKey {
            score: Reverse(self.best_score),
            improved_at: self.improved_at,
            player_id: self.player_id,
        }
    }
}

/// An entry together with its rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based competition rank
    pub rank: u64,
    /// The entry
    pub entry: RankIndexEntry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RankKey {
    score: Reverse<u64>,
    improved_at: Timestamp,
    player_id: PlayerId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.improved_at.cmp(&other.improved_at))
            .then_with(|| self.player_id.cmp(&other.player_id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Incrementally maintained best-score index.
#[derive(Clone, Debug, Default)]
pub struct RankIndex {
    tree: OrderStatTree<RankKey>,
    entries: HashMap<PlayerId, RankIndexEntry>,
}

impl RankIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the score-event log by max-aggregation per player.
    ///
    /// `display_name` resolves the current name of a player.
    pub fn rebuild<'a, I, F>(events: I, display_name: F) -> Self
    where
        I: IntoIterator<Item = &'a ScoreEvent>,
        F: Fn(&PlayerId) -> String,
    {
        let mut best: HashMap<PlayerId, &ScoreEvent> = HashMap::new();
        for event in events {
            best.entry(event.player_id)
                .and_modify(|current| {
                    let better = event.score > current.score
                        || (event.score == current.score
                            && event.submitted_at < current.submitted_at);
                    if better {
                        *current = event;
                    }
                })
                .or_insert(event);
        }

        let mut index = Self::new();
        for (player_id, event) in best {
            index.offer(RankIndexEntry::from_event(event, display_name(&player_id)));
        }
        index
    }

    /// Number of ranked players.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no player is ranked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current entry of a player.
    pub fn entry(&self, player_id: &PlayerId) -> Option<&RankIndexEntry> {
        self.entries.get(player_id)
    }

    /// Store `candidate` if the player has no entry or it beats the stored
    /// score. Returns whether the index changed.
    pub fn offer(&mut self, candidate: RankIndexEntry) -> bool {
        if let Some(current) = self.entries.get(&candidate.player_id) {
            if candidate.best_score <= current.best_score {
                return false;
            }
            let stale = current.key();
            self.tree.remove(&stale);
        }

        self.tree.insert(candidate.key());
        self.entries.insert(candidate.player_id, candidate);
        true
    }

    /// Players whose best score is strictly greater than `score`.
    pub fn count_greater(&self, score: u64) -> u64 {
        self.tree.count_prefix(|key| key.score.0 > score) as u64
    }

    /// `1 + count_greater(best score)`, or None if the player is unranked.
    pub fn rank_of(&self, player_id: &PlayerId) -> Option<u64> {
        self.entries
            .get(player_id)
            .map(|entry| 1 + self.count_greater(entry.best_score))
    }

    /// Top `limit` entries, best first.
    pub fn top(&self, limit: usize) -> Vec<RankedEntry> {
        let mut out = Vec::new();
        let mut rank = 0;
        let mut last_score = None;

        for (position, key) in self.tree.first_n(limit).into_iter().enumerate() {
            if last_score != Some(key.score.0) {
                // Competition ranking: ties share the first position's rank
                rank = position as u64 + 1;
                last_score = Some(key.score.0);
            }
            if let Some(entry) = self.entries.get(&key.player_id) {
                out.push(RankedEntry {
                    rank,
                    entry: entry.clone(),
                });
            }
        }

        out
    }
}
