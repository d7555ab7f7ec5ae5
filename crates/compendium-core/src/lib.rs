//! compendium-core
//!
//! Shared vocabulary for the meta-search engine: records, hits, the
//! structured query tree, the index collaborator traits and configuration.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod dump;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use query::GameQuery;
pub use traits::{DocumentSink, SearchIndex};
pub use types::{AggregateHit, GameRecord, Hit, RowId, SourceHit, StoredGame};
