//! compendium-resolve
//!
//! Cross-source entity resolution: every record of a newly ingested source
//! is matched against the committed sources and either adopts an existing
//! canonical id or receives a new one.

pub mod graph;
pub mod resolver;
pub mod similarity;

pub use graph::{Candidate, ResolutionGraph};
pub use resolver::{EntityResolver, ResolutionStats};
pub use similarity::similarity_query;
