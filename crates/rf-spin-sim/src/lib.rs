//! # rf-spin-sim — Batch simulator for rf-spin-core
//!
//! Runs many independent episodes of one game on a rayon pool and reduces
//! their statistics: RTP split by game type, hit and trigger rates, tumble
//! depth, grid multipliers, scatter and cluster-size histograms.
//!
//! ## Architecture
//!
//! ```text
//! SpinEngine (Arc<Game>, shared)
//!     │
//!     ├── run_batch(conditions, BatchConfig, BatchControl)
//!     │       └── par episodes → EpisodeStats → BatchStats
//!     │
//!     └── run_bet_mode(mode)
//!             └── one run_batch per distribution, split by quota → ModeReport
//! ```

pub mod batch;
pub mod error;
pub mod stats;

pub use batch::*;
pub use error::*;
pub use stats::*;
