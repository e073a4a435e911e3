//! Core primitives.
//!
//! Seeded randomness and UTC calendar helpers shared by the economy rules
//! and the rank index.

pub mod rng;
pub mod time;

// Re-export core types
pub use rng::SeededRng;
pub use time::Timestamp;
