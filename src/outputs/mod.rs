//! Output writers.
//!
//! - [`json`]: per-contest snapshot files and the "already scraped" lookup

pub mod json;
