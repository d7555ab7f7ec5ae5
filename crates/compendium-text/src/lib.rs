//! compendium-text
//!
//! Tantivy-backed source indexes. Each committed source is a `GameIndex`
//! exposing ranked search, unique-key lookup and per-row scoring to the
//! fusion and resolution layers.

pub mod tantivy_utils;
pub mod index;
pub mod query;

pub use index::{GameIndex, GameIndexWriter};
