//! Structured queries consumed opaquely by fusion and resolution.
//!
//! Field names are resolved against an index's schema when the index
//! compiles the tree, so the same query can be run against every source.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameQuery {
    /// Exact term on a field.
    Term { field: String, value: String },
    /// Words that must appear next to each other, analyzed with the field's analyzer.
    Phrase { field: String, text: String },
    /// Every analyzed word of `text` must appear in the field, in any order.
    AllWords { field: String, text: String },
    And(Vec<GameQuery>),
    Or(Vec<GameQuery>),
    /// `must` decides the match; `maybe` only adds score when it also matches.
    AndMaybe { must: Box<GameQuery>, maybe: Box<GameQuery> },
    /// Inclusive range of unix seconds on a date field.
    DateRange { field: String, from: i64, to: i64 },
    /// Every match scores exactly `score`.
    ConstScore { query: Box<GameQuery>, score: f32 },
    Boost { query: Box<GameQuery>, factor: f32 },
    /// Free text handed to the index's own query parser.
    Text { fields: Vec<String>, text: String },
}

impl GameQuery {
    pub fn term(field: &str, value: &str) -> Self {
        Self::Term { field: field.to_string(), value: value.to_string() }
    }

    pub fn phrase(field: &str, text: &str) -> Self {
        Self::Phrase { field: field.to_string(), text: text.to_string() }
    }

    pub fn all_words(field: &str, text: &str) -> Self {
        Self::AllWords { field: field.to_string(), text: text.to_string() }
    }

    pub fn text(fields: &[&str], text: &str) -> Self {
        Self::Text { fields: fields.iter().map(|f| f.to_string()).collect(), text: text.to_string() }
    }

    pub fn date_range(field: &str, from: i64, to: i64) -> Self {
        Self::DateRange { field: field.to_string(), from, to }
    }

    pub fn and_maybe(self, maybe: GameQuery) -> Self {
        Self::AndMaybe { must: Box::new(self), maybe: Box::new(maybe) }
    }

    pub fn boost(self, factor: f32) -> Self {
        Self::Boost { query: Box::new(self), factor }
    }

    pub fn const_score(self, score: f32) -> Self {
        Self::ConstScore { query: Box::new(self), score }
    }

    /// Flattens nested conjunctions/disjunctions, drops empty children and
    /// collapses single-child combinators.
    pub fn normalize(self) -> Self {
        match self {
            Self::And(children) => Self::flatten(children, true),
            Self::Or(children) => Self::flatten(children, false),
            Self::AndMaybe { must, maybe } => {
                let must = must.normalize();
                let maybe = maybe.normalize();
                if maybe.is_empty() { must } else { must.and_maybe(maybe) }
            }
            Self::ConstScore { query, score } => {
                let inner = query.normalize();
                if inner.is_empty() { inner } else { inner.const_score(score) }
            }
            Self::Boost { query, factor } => {
                let inner = query.normalize();
                if inner.is_empty() { inner } else { inner.boost(factor) }
            }
            other => other,
        }
    }

    /// An empty combinator never matches anything.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::And(c) | Self::Or(c) if c.is_empty())
    }

    fn flatten(children: Vec<GameQuery>, conjunction: bool) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children.into_iter().map(GameQuery::normalize) {
            match child {
                Self::And(inner) if conjunction => flat.extend(inner),
                Self::Or(inner) if !conjunction => flat.extend(inner),
                c if c.is_empty() => {}
                c => flat.push(c),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        if conjunction { Self::And(flat) } else { Self::Or(flat) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_flattens_and_collapses() {
        let q = GameQuery::Or(vec![
            GameQuery::Or(vec![GameQuery::term("name", "portal"), GameQuery::term("name", "2")]),
            GameQuery::And(vec![]),
        ]);
        assert_eq!(
            q.normalize(),
            GameQuery::Or(vec![GameQuery::term("name", "portal"), GameQuery::term("name", "2")])
        );

        let single = GameQuery::And(vec![GameQuery::And(vec![GameQuery::term("name", "gta")])]);
        assert_eq!(single.normalize(), GameQuery::term("name", "gta"));
    }

    #[test]
    fn normalize_drops_empty_optional_clause() {
        let q = GameQuery::term("name", "portal").and_maybe(GameQuery::And(vec![]).boost(20.0));
        assert_eq!(q.normalize(), GameQuery::term("name", "portal"));
    }
}
