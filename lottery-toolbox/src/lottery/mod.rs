//! Selection of airdrop winners among token holders.
//!
//! A draw fills a bounded number of slots from three sources, in priority order:
//! 1. the largest holders, who always win;
//! 2. a quota drawn uniformly among eligible holders that never won before;
//! 3. a weighted random permutation of every eligible holder, where the weight grows
//!    with the balance and shrinks for the winners of the previous round.
//!
//! Duplicates are dropped, keeping the first occurrence, and the result is truncated.
mod config;
mod participant;
mod selector;
mod stats;

pub use config::{ConfigError, LotteryConfig, Tier};
pub use participant::Participant;
pub use selector::{Draw, DrawInput, LotterySelector, Seed};
pub use stats::{ExperimentsSummary, TierStats, TiersStats};
