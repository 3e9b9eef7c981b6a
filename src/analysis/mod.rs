//! Analysis modules.
//!
//! Filtering and aggregation over a fetched item collection.

pub mod aggregator;

pub use aggregator::*;
