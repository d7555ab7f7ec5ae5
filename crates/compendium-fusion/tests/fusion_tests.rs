use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use compendium_core::types::Score;
use compendium_core::{DocumentSink, Error, GameQuery, GameRecord, Hit, Result, RowId, SearchIndex, StoredGame};
use compendium_fusion::{aggregate, random_access_score, Aggregator, ScoreResult, Source};

/// Index whose scores are scripted per entity; a score of zero means the
/// entity is present but does not match.
struct ScriptedIndex {
    rows: Vec<(String, Score)>,
    fail: bool,
    searches: AtomicUsize,
}

impl ScriptedIndex {
    fn new(rows: &[(&str, Score)]) -> Self {
        Self { rows: rows.iter().map(|(e, s)| (e.to_string(), *s)).collect(), fail: false, searches: AtomicUsize::new(0) }
    }

    fn failing() -> Self { Self { rows: Vec::new(), fail: true, searches: AtomicUsize::new(0) } }

    fn game(&self, row: usize) -> StoredGame {
        let entity = &self.rows[row].0;
        StoredGame { local_id: format!("local-{row}"), entity_id: entity.clone(), name: entity.clone(), ..StoredGame::default() }
    }
}

impl SearchIndex for ScriptedIndex {
    fn search(&self, _query: &GameQuery, limit: usize) -> Result<Vec<Hit>> {
        if self.fail { return Err(Error::Query("unknown field 'name'".into())); }
        self.searches.fetch_add(1, Ordering::SeqCst);
        let mut matching: Vec<usize> = (0..self.rows.len()).filter(|&i| self.rows[i].1 > 0.0).collect();
        matching.sort_by(|&a, &b| self.rows[b].1.total_cmp(&self.rows[a].1));
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|i| Hit { row: RowId::new(0, i as u32), score: self.rows[i].1, game: self.game(i) })
            .collect())
    }

    fn lookup_row(&self, entity_id: &str) -> Result<Option<RowId>> {
        Ok(self.rows.iter().position(|(e, _)| e == entity_id).map(|i| RowId::new(0, i as u32)))
    }

    fn score_at(&self, _query: &GameQuery, row: RowId) -> Result<Score> {
        if self.fail { return Err(Error::Query("unknown field 'name'".into())); }
        Ok(self.rows[row.doc as usize].1)
    }

    fn document(&self, row: RowId) -> Result<StoredGame> { Ok(self.game(row.doc as usize)) }
}

fn source(name: &str, rows: &[(&str, Score)]) -> Source {
    Source::new(name, Arc::new(ScriptedIndex::new(rows)))
}

fn query() -> GameQuery { GameQuery::term("name", "anything") }

#[test]
fn scorer_distinguishes_absent_from_zero() {
    let index = ScriptedIndex::new(&[("portal", 7.0), ("gta", 0.0)]);
    assert_eq!(random_access_score(&query(), &index, "stardew").expect("score"), ScoreResult::Absent);
    let gta = random_access_score(&query(), &index, "gta").expect("score");
    assert_eq!(gta, ScoreResult::Present { row: RowId::new(0, 1), score: 0.0 });
    assert_eq!(gta.score(), Some(0.0));
    assert_eq!(ScoreResult::Absent.score(), None);
}

#[test]
fn average_is_over_present_sources_only() {
    let sources = vec![source("igdb", &[("a", 5.0), ("b", 3.0)]), source("steam", &[("b", 3.0)])];
    let top = aggregate(&query(), &sources, 2).expect("aggregate");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].entity_id(), "a");
    assert!((top[0].total_score - 5.0).abs() < 1e-6);
    assert_eq!(top[1].entity_id(), "b");
    assert!((top[1].total_score - 3.0).abs() < 1e-6);
    let labels: Vec<&str> = top[1].hits.iter().map(|h| h.source.as_str()).collect();
    assert_eq!(labels, vec!["igdb", "steam"]);
}

#[test]
fn present_but_unmatched_counts_as_zero() {
    let sources = vec![source("igdb", &[("a", 6.0)]), source("steam", &[("a", 0.0)])];
    let top = aggregate(&query(), &sources, 1).expect("aggregate");
    assert!((top[0].total_score - 3.0).abs() < 1e-6);
    assert_eq!(top[0].hits.len(), 2);
}

#[test]
fn portal_beats_gta_and_stops_early() {
    let sources = vec![
        source("igdb", &[("portal", 10.0), ("gta", 4.0)]),
        source("steam", &[("portal", 6.0)]),
    ];
    let top = aggregate(&query(), &sources, 1).expect("aggregate");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].entity_id(), "portal");
    assert!((top[0].total_score - 8.0).abs() < 1e-6);
}

#[test]
fn walkthrough_from_two_catalogs() {
    let sources = vec![
        source("igdb", &[("portal", 10.0), ("pokemon", 8.0), ("gta", 4.0)]),
        source("steam", &[("stardew", 8.0), ("portal", 4.0), ("gta", 4.0)]),
    ];
    let top = aggregate(&query(), &sources, 2).expect("aggregate");
    let ids: Vec<&str> = top.iter().map(|h| h.entity_id()).collect();
    // Equal totals keep first-seen order.
    assert_eq!(ids, vec!["stardew", "pokemon"]);
    assert!((top[0].total_score - 8.0).abs() < 1e-6);
    assert!((top[1].total_score - 8.0).abs() < 1e-6);
}

#[test]
fn eviction_tie_drops_earliest_inserted() {
    let sources = vec![source("igdb", &[("x", 2.0)]), source("steam", &[("y", 2.0)])];
    let top = aggregate(&query(), &sources, 1).expect("aggregate");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].entity_id(), "y");
}

#[test]
fn short_lists_are_deepened_on_demand() {
    let deep = Arc::new(ScriptedIndex::new(&[("a", 5.0), ("b", 4.0)]));
    let sources = vec![Source::new("igdb", deep.clone()), source("steam", &[("c", 3.0), ("a", 1.0)])];
    let top = aggregate(&query(), &sources, 1).expect("aggregate");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].entity_id(), "b");
    assert!((top[0].total_score - 4.0).abs() < 1e-6);
    assert_eq!(deep.searches.load(Ordering::SeqCst), 2);
}

#[test]
fn zero_k_or_no_sources_is_empty() {
    assert!(aggregate(&query(), &[], 3).expect("aggregate").is_empty());
    assert!(aggregate(&query(), &[source("igdb", &[("a", 1.0)])], 0).expect("aggregate").is_empty());
}

#[test]
fn unbounded_k_returns_every_entity() {
    let sources = vec![source("igdb", &[("a", 3.0), ("b", 1.0)]), source("steam", &[("c", 2.5), ("a", 1.0)])];
    let top = aggregate(&query(), &sources, usize::MAX).expect("aggregate");
    let ids: Vec<&str> = top.iter().map(|h| h.entity_id()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn index_errors_propagate() {
    let sources = vec![source("igdb", &[("a", 1.0)]), Source::new("steam", Arc::new(ScriptedIndex::failing()))];
    assert!(matches!(aggregate(&query(), &sources, 3), Err(Error::Query(_))));
}

/// Small deterministic generator so the adversarial grid is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn brute_force(sources: &[Vec<(String, Score)>], k: usize) -> Vec<Score> {
    let mut by_entity: HashMap<&str, Vec<Score>> = HashMap::new();
    for rows in sources {
        for (e, s) in rows { by_entity.entry(e.as_str()).or_default().push(*s); }
    }
    let mut totals: Vec<Score> = by_entity
        .values()
        .filter(|scores| scores.iter().any(|s| *s > 0.0))
        .map(|scores| scores.iter().sum::<Score>() / scores.len() as Score)
        .collect();
    totals.sort_by(|a, b| b.total_cmp(a));
    totals.truncate(k);
    totals
}

#[test]
fn early_termination_never_loses_a_better_entity() {
    let mut rng = Lcg(42);
    for case in 0..200 {
        let n_sources = 1 + (rng.next() % 3) as usize;
        let n_entities = 1 + (rng.next() % 12) as usize;
        let k = 1 + (rng.next() % 4) as usize;
        let mut scripted: Vec<Vec<(String, Score)>> = Vec::new();
        for _ in 0..n_sources {
            let mut rows = Vec::new();
            for e in 0..n_entities {
                match rng.next() % 4 {
                    0 => {}
                    1 => rows.push((format!("e{e}"), 0.0)),
                    _ => rows.push((format!("e{e}"), (rng.next() % 20) as Score)),
                }
            }
            scripted.push(rows);
        }
        let sources: Vec<Source> = scripted
            .iter()
            .enumerate()
            .map(|(i, rows)| {
                let rows: Vec<(&str, Score)> = rows.iter().map(|(e, s)| (e.as_str(), *s)).collect();
                source(&format!("s{i}"), &rows)
            })
            .collect();

        let got: Vec<Score> = aggregate(&query(), &sources, k).expect("aggregate").iter().map(|h| h.total_score).collect();
        let want = brute_force(&scripted, k);
        assert_eq!(got.len(), want.len(), "case {case}");
        for (g, w) in got.iter().zip(&want) {
            assert!((g - w).abs() < 1e-4, "case {case}: got {got:?} want {want:?}");
        }
    }
}

#[test]
fn aggregator_over_tantivy_indexes() {
    use compendium_text::tantivy_utils::NAME;
    use compendium_text::GameIndex;

    let igdb = GameIndex::create_in_ram("igdb").expect("index");
    let steam = GameIndex::create_in_ram("steam").expect("index");
    let mut w = igdb.writer().expect("writer");
    w.add_document("portal", &GameRecord::new("71", "Portal")).expect("add");
    w.add_document("portal2", &GameRecord::new("72", "Portal 2")).expect("add");
    w.add_document("gta", &GameRecord::new("73", "Grand Theft Auto IV")).expect("add");
    w.commit().expect("commit");
    let mut w = steam.writer().expect("writer");
    w.add_document("portal", &GameRecord::new("400", "Portal")).expect("add");
    w.add_document("gta", &GameRecord::new("12210", "Grand Theft Auto IV")).expect("add");
    w.commit().expect("commit");

    let aggregator = Aggregator::new(vec![Source::new("igdb", Arc::new(igdb)), Source::new("steam", Arc::new(steam))]);
    let top = aggregator.query(&GameQuery::text(&[NAME], "portal"), 5).expect("aggregate");
    assert_eq!(top.len(), 2);
    let portal = top.iter().find(|h| h.entity_id() == "portal").expect("portal fused");
    let labels: Vec<&str> = portal.hits.iter().map(|h| h.source.as_str()).collect();
    assert_eq!(labels, vec!["igdb", "steam"]);
    assert_eq!(portal.hits[1].hit.game.local_id, "400");
    let portal2 = top.iter().find(|h| h.entity_id() == "portal2").expect("portal 2");
    assert_eq!(portal2.hits.len(), 1);
    assert!(top.iter().all(|h| h.entity_id() != "gta"));
}

#[test]
fn unbounded_k_over_tantivy_indexes() {
    use compendium_text::tantivy_utils::NAME;
    use compendium_text::GameIndex;

    let igdb = GameIndex::create_in_ram("igdb").expect("index");
    let mut w = igdb.writer().expect("writer");
    w.add_document("portal", &GameRecord::new("71", "Portal")).expect("add");
    w.add_document("portal2", &GameRecord::new("72", "Portal 2")).expect("add");
    w.commit().expect("commit");
    let steam = GameIndex::create_in_ram("steam").expect("index");

    let aggregator = Aggregator::new(vec![Source::new("igdb", Arc::new(igdb)), Source::new("steam", Arc::new(steam))]);
    let top = aggregator.query(&GameQuery::text(&[NAME], "portal"), usize::MAX).expect("aggregate");
    assert_eq!(top.len(), 2);
}
