pub mod aggregator;
pub mod scorer;

pub use aggregator::{aggregate, Aggregator, Source};
pub use scorer::{random_access_score, ScoreResult};
