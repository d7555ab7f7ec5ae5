//! Domain types shared by the index, fusion and resolution layers.

use serde::{Deserialize, Serialize};

pub type EntityId = String;
pub type Score = f32;

/// One game as delivered by a source's scraper, before it has a canonical
/// identity.
///
/// - `id`: source-scoped identifier (e.g. a store app id)
/// - `release_date`: unix seconds, when known
/// - `dev_companies`: developers and publishers, matched as exact terms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub storyline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub dev_companies: Vec<String>,
    #[serde(default)]
    pub release_date: Option<i64>,
}

impl GameRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }
}

/// Internal address of a document inside one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId {
    pub segment: u32,
    pub doc: u32,
}

impl RowId {
    pub fn new(segment: u32, doc: u32) -> Self { Self { segment, doc } }
}

/// Stored fields of a committed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredGame {
    pub local_id: String,
    pub entity_id: EntityId,
    pub name: String,
    pub dev_companies: Vec<String>,
    pub release_date: Option<i64>,
}

/// A document together with the relevance a query gave it in one index.
///
/// Scores are never persisted; higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub row: RowId,
    pub score: Score,
    pub game: StoredGame,
}

impl Hit {
    pub fn entity_id(&self) -> &str { &self.game.entity_id }
}

/// A hit labelled with the name of the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHit {
    pub source: String,
    pub hit: Hit,
}

/// One fused result: every source where the entity was found, plus the
/// average of their scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateHit {
    pub hits: Vec<SourceHit>,
    pub total_score: Score,
}

impl AggregateHit {
    /// Builds the fused hit, averaging over the sources present in `hits`.
    ///
    /// Returns `None` when `hits` is empty since an entity must be present
    /// somewhere to be ranked.
    pub fn from_hits(hits: Vec<SourceHit>) -> Option<Self> {
        if hits.is_empty() {
            return None;
        }
        let sum: Score = hits.iter().map(|h| h.hit.score).sum();
        let total_score = sum / hits.len() as Score;
        Some(Self { hits, total_score })
    }

    pub fn entity_id(&self) -> &str {
        self.hits.first().map(|h| h.hit.entity_id()).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.hits.first().map(|h| h.hit.game.name.as_str()).unwrap_or_default()
    }
}
