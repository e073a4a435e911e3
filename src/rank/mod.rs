//! Leaderboard Ranking
//!
//! - `tree`: Order-statistics treap (generic)
//! - `index`: Best-score projection with rank and top-N queries

pub mod tree;
pub mod index;

pub use tree::OrderStatTree;
pub use index::{RankIndex, RankIndexEntry, RankedEntry};
