use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use compendium_core::types::{EntityId, Score};

/// A proposed edge from a local record to an existing canonical entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entity_id: EntityId,
    pub weight: Score,
}

impl Candidate {
    pub fn new(entity_id: impl Into<EntityId>, weight: Score) -> Self {
        Self { entity_id: entity_id.into(), weight }
    }
}

/// Bipartite graph between local records (`L`) and canonical entities.
///
/// Each entity is held by at most one record: the one whose edge to it is
/// heaviest. A record keeps its remaining candidates, head first, so it can
/// fall back to the next one when it is displaced.
#[derive(Debug)]
pub struct ResolutionGraph<L> {
    candidates: HashMap<L, VecDeque<Candidate>>,
    winners: HashMap<EntityId, (L, Score)>,
    displacements: usize,
}

impl<L> Default for ResolutionGraph<L> {
    fn default() -> Self {
        Self { candidates: HashMap::new(), winners: HashMap::new(), displacements: 0 }
    }
}

impl<L: Eq + Hash + Clone + Debug> ResolutionGraph<L> {
    pub fn new() -> Self { Self::default() }

    /// Inserts `left` with candidates sorted by descending weight.
    ///
    /// A challenger needs a strictly greater weight to take an entity from its
    /// holder. The displaced holder is re-inserted with the rest of its list,
    /// which may in turn displace another record.
    pub fn insert(&mut self, left: L, candidates: Vec<Candidate>) {
        self.detach(&left);
        let mut pending = Some((left, VecDeque::from(candidates)));
        while let Some((left, mut edges)) = pending.take() {
            while edges.front().is_some_and(|head| self.cannot_win(head)) {
                edges.pop_front();
            }
            let Some(head) = edges.front().cloned() else { continue };
            let displaced = self.winners.insert(head.entity_id.clone(), (left.clone(), head.weight));
            self.candidates.insert(left.clone(), edges);
            if let Some((loser, lost)) = displaced {
                self.displacements += 1;
                tracing::debug!(winner = ?left, loser = ?loser, entity = %head.entity_id, weight = head.weight, lost, "displaced holder");
                if let Some(mut rest) = self.candidates.remove(&loser) {
                    rest.pop_front();
                    pending = Some((loser, rest));
                }
            }
        }
    }

    /// The entity `left` currently holds, if any.
    pub fn assigned(&self, left: &L) -> Option<&str> {
        self.candidates.get(left).and_then(|edges| edges.front()).map(|c| c.entity_id.as_str())
    }

    /// The record holding `entity_id` and the weight it holds it with.
    pub fn holder(&self, entity_id: &str) -> Option<(&L, Score)> {
        self.winners.get(entity_id).map(|(left, weight)| (left, *weight))
    }

    pub fn assignments(&self) -> impl Iterator<Item = (&L, &str, Score)> {
        self.winners.iter().map(|(entity, (left, weight))| (left, entity.as_str(), *weight))
    }

    /// Number of held entities.
    pub fn len(&self) -> usize { self.winners.len() }

    pub fn is_empty(&self) -> bool { self.winners.is_empty() }

    /// How many times a holder lost its entity to a heavier edge.
    pub fn displacements(&self) -> usize { self.displacements }

    fn cannot_win(&self, edge: &Candidate) -> bool {
        self.winners.get(&edge.entity_id).is_some_and(|(_, held)| *held >= edge.weight)
    }

    fn detach(&mut self, left: &L) {
        if let Some(edges) = self.candidates.remove(left) {
            if let Some(head) = edges.front() {
                self.winners.remove(&head.entity_id);
            }
        }
    }
}
