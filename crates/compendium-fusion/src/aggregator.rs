use std::collections::HashSet;
use std::sync::Arc;

use compendium_core::types::Score;
use compendium_core::{AggregateHit, GameQuery, Hit, Result, SearchIndex, SourceHit};

use crate::scorer::{random_access_score, ScoreResult};

/// A committed index and the name its hits are labelled with.
#[derive(Clone)]
pub struct Source {
    pub name: String,
    pub index: Arc<dyn SearchIndex>,
}

impl Source {
    pub fn new(name: impl Into<String>, index: Arc<dyn SearchIndex>) -> Self {
        Self { name: name.into(), index }
    }
}

/// Fuses the ranked lists of several sources into one top-k ranking.
#[derive(Clone, Default)]
pub struct Aggregator {
    sources: Vec<Source>,
}

impl Aggregator {
    pub fn new(sources: Vec<Source>) -> Self { Self { sources } }

    pub fn push(&mut self, source: Source) { self.sources.push(source); }

    pub fn sources(&self) -> &[Source] { &self.sources }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    pub fn query(&self, query: &GameQuery, k: usize) -> Result<Vec<AggregateHit>> {
        aggregate(query, &self.sources, k)
    }
}

/// One source's ranked list, fetched lazily and deepened on demand.
struct RankedStream<'a> {
    index: &'a dyn SearchIndex,
    hits: Vec<Hit>,
    depth: usize,
    exhausted: bool,
}

impl<'a> RankedStream<'a> {
    fn open(index: &'a dyn SearchIndex, query: &GameQuery, depth: usize) -> Result<Self> {
        let hits = index.search(query, depth)?;
        let exhausted = hits.len() < depth;
        Ok(Self { index, hits, depth, exhausted })
    }

    fn get(&mut self, query: &GameQuery, row: usize) -> Result<Option<&Hit>> {
        while row >= self.hits.len() && !self.exhausted {
            self.depth = self.depth.saturating_mul(2);
            self.hits = self.index.search(query, self.depth)?;
            self.exhausted = self.hits.len() < self.depth;
        }
        Ok(self.hits.get(row))
    }
}

/// Threshold-algorithm fusion under the average-over-present-sources score.
///
/// Lists are walked in lock-step rows. Every newly seen entity is scored in
/// all other sources by random access. The walk stops once k entities are
/// held and none of them scores below the row's maximum: an unseen entity
/// averages scores that each sit at or below that maximum, so it can tie
/// the bound but never beat it. Any smaller bound is unsafe because a later
/// row may hold an entity present in a single source with exactly that score.
///
/// Result ties keep first-seen order; on eviction the earliest-inserted
/// entry among the minima goes first.
pub fn aggregate(query: &GameQuery, sources: &[Source], k: usize) -> Result<Vec<AggregateHit>> {
    if k == 0 || sources.is_empty() {
        return Ok(Vec::new());
    }
    let mut streams = sources
        .iter()
        .map(|s| RankedStream::open(s.index.as_ref(), query, k))
        .collect::<Result<Vec<_>>>()?;
    let mut visited: HashSet<String> = HashSet::new();
    let mut top: Vec<AggregateHit> = Vec::new();

    let mut row = 0usize;
    loop {
        let mut threshold: Option<Score> = None;
        for (home, stream) in streams.iter_mut().enumerate() {
            let Some(hit) = stream.get(query, row)?.cloned() else { continue };
            threshold = Some(threshold.map_or(hit.score, |t| t.max(hit.score)));
            if !visited.insert(hit.entity_id().to_string()) {
                continue;
            }
            if let Some(fused) = fuse(query, sources, home, hit)? {
                top.push(fused);
            }
            if top.len() > k {
                evict_min(&mut top);
            }
        }
        let Some(threshold) = threshold else { break };
        if top.len() >= k && top.iter().all(|h| h.total_score >= threshold) {
            tracing::debug!(rows = row + 1, threshold, "threshold reached");
            break;
        }
        row += 1;
    }

    top.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    Ok(top)
}

/// Collects the entity's score in every source where it is present.
fn fuse(query: &GameQuery, sources: &[Source], home: usize, hit: Hit) -> Result<Option<AggregateHit>> {
    let entity_id = hit.entity_id().to_string();
    let mut home_hit = Some(hit);
    let mut hits = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        if i == home {
            hits.extend(home_hit.take().map(|hit| SourceHit { source: source.name.clone(), hit }));
            continue;
        }
        if let ScoreResult::Present { row, score } = random_access_score(query, source.index.as_ref(), &entity_id)? {
            let game = source.index.document(row)?;
            hits.push(SourceHit { source: source.name.clone(), hit: Hit { row, score, game } });
        }
    }
    Ok(AggregateHit::from_hits(hits))
}

fn evict_min(top: &mut Vec<AggregateHit>) {
    let mut min_at = 0;
    for (i, h) in top.iter().enumerate().skip(1) {
        if h.total_score < top[min_at].total_score {
            min_at = i;
        }
    }
    top.remove(min_at);
}
