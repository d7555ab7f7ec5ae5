use compendium_core::types::Score;
use compendium_core::{GameQuery, Result, RowId, SearchIndex};

/// Outcome of scoring one entity inside one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreResult {
    /// The entity has no document in this index.
    Absent,
    /// The entity exists; `score` is zero when its document does not match.
    Present { row: RowId, score: Score },
}

impl ScoreResult {
    pub fn score(&self) -> Option<Score> {
        match self {
            Self::Absent => None,
            Self::Present { score, .. } => Some(*score),
        }
    }
}

/// Scores `query` for the single document carrying `entity_id`, without
/// building the index's ranked list.
pub fn random_access_score(query: &GameQuery, index: &dyn SearchIndex, entity_id: &str) -> Result<ScoreResult> {
    let Some(row) = index.lookup_row(entity_id)? else { return Ok(ScoreResult::Absent) };
    let score = index.score_at(query, row)?;
    Ok(ScoreResult::Present { row, score })
}
