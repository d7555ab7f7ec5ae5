use crate::error::Result;
use crate::query::GameQuery;
use crate::types::{GameRecord, Hit, RowId, Score, StoredGame};

/// Read side of one committed source index.
pub trait SearchIndex: Send + Sync {
    /// Hits sorted by descending score, at most `limit` of them.
    fn search(&self, query: &GameQuery, limit: usize) -> Result<Vec<Hit>>;

    /// Row of the document carrying `entity_id` in its unique-key field.
    fn lookup_row(&self, entity_id: &str) -> Result<Option<RowId>>;

    /// Score `query` contributes at `row`; `0.0` when the row does not match.
    fn score_at(&self, query: &GameQuery, row: RowId) -> Result<Score>;

    fn document(&self, row: RowId) -> Result<StoredGame>;
}

/// Write side of an index that is being built.
pub trait DocumentSink {
    fn add_document(&mut self, entity_id: &str, record: &GameRecord) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}
