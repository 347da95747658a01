//! Offline transition datasets for safe RL.
//!
//! A dataset is a fixed table of `(s, a, r, c, s', mask, done)` transitions
//! loaded from a [`DatasetFile`]. Loading applies the preprocessing the FISOR
//! critics expect:
//!
//! 1. **Ratio** - keep only the leading fraction of the transitions
//! 2. **Action clipping** - clip actions to `±(1 - eps)`
//! 3. **Episode boundaries** - derive `done` flags from terminals, timeouts and
//!    observation discontinuities; `mask = 1 - terminal`
//! 4. **Cost transform** - reachability labels (`cost > 0 ? scale : -1`) or
//!    plainly scaled costs
//!
//! Benchmark datasets additionally rescale rewards with
//! [`Dataset::normalize_returns`]. Training draws uniform batches with
//! replacement from a seeded generator.
//!
//! Behavior data for any [`Environment`](fisor_env::Environment) can be
//! produced with [`collect::collect`].

use std::{io, path::PathBuf};

pub use self::{
    dataset::{Batch, CostTransform, Dataset, LoadOptions, Transition},
    file::DatasetFile,
};

pub mod collect;
pub mod dataset;
pub mod file;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("failed to access dataset file {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse dataset file {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("dataset column '{column}' has {actual} rows, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("dataset column '{column}' row {row} has dimension {actual}, expected {expected}")]
    Dimension {
        column: &'static str,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("dataset ratio must be in (0, 1], got {ratio}")]
    InvalidRatio { ratio: f64 },
    #[display("dataset is empty")]
    Empty,
}
