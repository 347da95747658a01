//! Statistical helpers shared by the FISOR training crates.
//!
//! - **Descriptive statistics**: mean, median, spread and extrema of evaluation
//!   episodes and dataset columns
//!
//! # Examples
//!
//! ```
//! use fisor_stats::descriptive::DescriptiveStats;
//!
//! let returns = [10.0, 12.0, 14.0];
//! let stats = DescriptiveStats::new(returns).unwrap();
//! assert_eq!(stats.mean, 12.0);
//! assert_eq!(stats.count, 3);
//! ```

pub mod descriptive;
