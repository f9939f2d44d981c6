//! # rf-spin-core — Slot spin and cascade resolution engine
//!
//! Resolves one stochastic slot episode at a time: a base reveal, its
//! cascades and feature passes, and every freespin it awards, producing a
//! deterministic, replayable result from a seed and a condition set.
//!
//! ## Features
//!
//! - **Weighted sampling**: every non-uniform draw goes through one table type
//! - **Win models**: cluster, lines, ways and pay-anywhere evaluation
//! - **Multiplier grid**: per-cell doubling with a cap and a reset policy
//! - **Features**: wild injection, area explosion, transformation, guillotine
//! - **Event stream**: ordered events sufficient to replay the episode
//!
//! ## Architecture
//!
//! ```text
//! GameConfig ──compile──► Game (shared, read-only)
//!                           │
//!                           v
//! SpinEngine::run_episode(conditions, seed)
//!     │
//!     ├── Board        (reel sets × stops, tumble/refill)
//!     ├── WinModel     (cluster | lines | ways | scatter_pay)
//!     ├── MultiplierGrid
//!     └── FeatureResolver (Scan → Apply → Settle)
//!           │
//!           v
//!     EpisodeResult → Vec<SpinEvent>
//! ```

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod game;
pub mod multiplier;
pub mod paytable;
pub mod presets;
pub mod reels;
pub mod sampler;
pub mod spin;
pub mod symbols;
pub mod wins;

pub use board::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use features::*;
pub use game::*;
pub use multiplier::*;
pub use paytable::*;
pub use reels::*;
pub use sampler::*;
pub use spin::*;
pub use symbols::*;
pub use wins::*;
