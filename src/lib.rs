//! # Nebula Economy
//!
//! Reward and ranking engine for the Butterfly Nebula game backend: turns
//! played sessions into coins and stats, keeps the global leaderboard,
//! throttles rewarded ads and issues daily challenges.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      NEBULA ECONOMY                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── time.rs     - UTC day windows                           │
//! │                                                              │
//! │  economy/        - Pure rules (no I/O)                       │
//! │  ├── player.rs   - Player record                             │
//! │  ├── submission.rs - Session admission                       │
//! │  ├── reward.rs   - Reward calculator                         │
//! │  ├── challenge.rs- Daily challenge issuer                    │
//! │  ├── ad_gate.rs  - Ad cooldown + daily quota                 │
//! │  ├── purchase.rs - Verified purchase application             │
//! │  └── ledger.rs   - Score events and ad grants                │
//! │                                                              │
//! │  rank/           - Leaderboard                               │
//! │  ├── tree.rs     - Order-statistics treap                    │
//! │  └── index.rs    - Best-score rank index                     │
//! │                                                              │
//! │  store/          - Player store trait + in-memory store      │
//! │  engine/         - Transactions, retries, locking            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! - Every player mutation is a version-conditioned write.
//! - A score commit appends the event, replaces the record and updates
//!   the rank index together, so rank reads are never stale.
//! - Replayed session ids and purchase ids credit nothing.
//! - Reward arithmetic is exact integer math.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod economy;
pub mod engine;
pub mod rank;
pub mod store;

// Re-export commonly used types
pub use config::{ConfigError, EconomyConfig};
pub use economy::{AdType, PlayerId, PlayerRecord, ScoreSubmission};
pub use engine::{EconomyEngine, EngineError, LeaderboardEntry, PurchaseReceipt, ScoreReceipt};
pub use store::{MemoryStore, PlayerStore, StoreError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
