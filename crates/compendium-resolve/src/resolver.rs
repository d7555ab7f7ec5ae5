use compendium_core::config::ResolverSettings;
use compendium_core::{DocumentSink, GameRecord, Result};
use compendium_fusion::{Aggregator, Source};
use uuid::Uuid;

use crate::graph::{Candidate, ResolutionGraph};
use crate::similarity::similarity_query;

/// Counters returned by one source's ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Records that took the id of a game already committed elsewhere.
    pub reused: usize,
    /// Records given a fresh id.
    pub generated: usize,
    /// Times a record lost its candidate to a better-matching one.
    pub conflicts: usize,
    /// Records whose similarity query failed; they are counted in `generated` too.
    pub failed: usize,
}

/// Assigns canonical ids to a new source's records by matching them against
/// every committed source.
pub struct EntityResolver {
    committed: Aggregator,
    settings: ResolverSettings,
}

impl EntityResolver {
    pub fn new(committed: Vec<Source>, settings: ResolverSettings) -> Self {
        Self { committed: Aggregator::new(committed), settings }
    }

    /// Makes a freshly committed source available to later resolutions.
    pub fn add_committed(&mut self, source: Source) { self.committed.push(source); }

    pub fn committed(&self) -> &[Source] { self.committed.sources() }

    /// Resolves `records`, writes them to `sink` under their canonical ids and
    /// commits it.
    pub fn resolve_and_commit<S: DocumentSink>(&self, records: &[GameRecord], sink: &mut S) -> Result<ResolutionStats> {
        let mut stats = ResolutionStats::default();
        let graph = if self.committed.is_empty() { ResolutionGraph::new() } else { self.build_graph(records, &mut stats) };
        stats.conflicts = graph.displacements();

        for (position, record) in records.iter().enumerate() {
            let entity_id = match graph.assigned(&position) {
                Some(existing) => {
                    stats.reused += 1;
                    existing.to_string()
                }
                None => {
                    stats.generated += 1;
                    new_entity_id()
                }
            };
            sink.add_document(&entity_id, record)?;
        }
        sink.commit()?;
        tracing::info!(
            records = records.len(),
            reused = stats.reused,
            generated = stats.generated,
            conflicts = stats.conflicts,
            failed = stats.failed,
            "resolved source"
        );
        Ok(stats)
    }

    fn build_graph(&self, records: &[GameRecord], stats: &mut ResolutionStats) -> ResolutionGraph<usize> {
        let mut graph = ResolutionGraph::new();
        for (position, record) in records.iter().enumerate() {
            match self.candidates(record) {
                Ok(candidates) => graph.insert(position, candidates),
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(id = %record.id, name = %record.name, error = %e, "similarity lookup failed, record gets a new id");
                }
            }
        }
        graph
    }

    fn candidates(&self, record: &GameRecord) -> Result<Vec<Candidate>> {
        let query = similarity_query(record, &self.settings)?;
        let hits = self.committed.query(&query, self.settings.candidates)?;
        Ok(hits.iter().map(|h| Candidate::new(h.entity_id(), h.total_score)).collect())
    }
}

fn new_entity_id() -> String { Uuid::new_v4().simple().to_string() }
