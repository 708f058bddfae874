//! # Journal Analytics
//!
//! Turns a list of logged trades into the numbers a dashboard shows: win rate,
//! profit factor, averages, extremes and the equity series.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   storage or presentation and depends only on `core-types` (Layer 0).
//!   Records are handed in as plain data by whoever fetched them.
//! - **Stateless Calculation:** `FilterCriteria::apply` and
//!   `StatisticsEngine::summarize` never mutate their input and hold no state
//!   between calls, so they can be called from a request handler, a CLI or a
//!   test alike.
//!
//! ## Public API
//!
//! - `FilterCriteria` / `TimeWindow`: narrow a record list before aggregation.
//! - `StatisticsEngine`: computes a `Statistics` value from a record list.
//! - `StatisticsSummary`: the derived metrics; `Statistics::NoData` for an empty input.
//! - `sort_records`: the journal list ordering.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod filter;
pub mod report;
pub mod sort;

// Re-export the key components to create a clean, public-facing API.
pub use engine::StatisticsEngine;
pub use filter::{FilterCriteria, TimeWindow};
pub use report::{EquityPoint, Statistics, StatisticsSummary};
pub use sort::{SortKey, SortOrder, sort_records};
