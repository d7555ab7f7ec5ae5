use std::ops::Bound;

use tantivy::query::{BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, Occur, PhraseQuery, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{Field, FieldType, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{DateTime, Index, Term};

use compendium_core::{Error, GameQuery, Result};

use crate::tantivy_utils::{ENTITY_ID, LOCAL_ID};

/// Turns a `GameQuery` into a tantivy query bound to `index`'s schema.
pub fn compile(index: &Index, query: &GameQuery) -> Result<Box<dyn Query>> {
	let compiled: Box<dyn Query> = match query {
		GameQuery::Term { field, value } => {
			let f = field_of(index, field)?;
			let value = if field == LOCAL_ID || field == ENTITY_ID { value.clone() } else { value.to_lowercase() };
			Box::new(TermQuery::new(Term::from_field_text(f, &value), IndexRecordOption::WithFreqs))
		}
		GameQuery::Phrase { field, text } => phrase(index, field, text)?,
		GameQuery::AllWords { field, text } => all_words(index, field, text)?,
		GameQuery::And(children) => boolean(index, children, Occur::Must)?,
		GameQuery::Or(children) => boolean(index, children, Occur::Should)?,
		GameQuery::AndMaybe { must, maybe } => Box::new(BooleanQuery::new(vec![
			(Occur::Must, compile(index, must)?),
			(Occur::Should, compile(index, maybe)?),
		])),
		GameQuery::DateRange { field, from, to } => {
			let f = field_of(index, field)?;
			if !matches!(index.schema().get_field_entry(f).field_type(), FieldType::Date(_)) {
				return Err(Error::Query(format!("'{}' is not a date field", field)));
			}
			let lower = Term::from_field_date_for_search(f, DateTime::from_timestamp_secs(*from));
			let upper = Term::from_field_date_for_search(f, DateTime::from_timestamp_secs(*to));
			Box::new(RangeQuery::new(Bound::Included(lower), Bound::Included(upper)))
		}
		GameQuery::ConstScore { query, score } => Box::new(ConstScoreQuery::new(compile(index, query)?, *score)),
		GameQuery::Boost { query, factor } => Box::new(BoostQuery::new(compile(index, query)?, *factor)),
		GameQuery::Text { fields, text } => {
			let fields = fields.iter().map(|f| field_of(index, f)).collect::<Result<Vec<_>>>()?;
			let parser = QueryParser::for_index(index, fields);
			parser.parse_query(text).map_err(|e| Error::Query(format!("'{}': {}", text, e)))?
		}
	};
	Ok(compiled)
}

fn field_of(index: &Index, name: &str) -> Result<Field> {
	index.schema().get_field(name).map_err(|_| Error::Query(format!("unknown field '{}'", name)))
}

fn boolean(index: &Index, children: &[GameQuery], occur: Occur) -> Result<Box<dyn Query>> {
	if children.is_empty() { return Ok(Box::new(EmptyQuery)); }
	let clauses = children.iter().map(|c| Ok((occur, compile(index, c)?))).collect::<Result<Vec<_>>>()?;
	Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Runs `text` through the field's own analyzer so stop words and casing
/// line up with what was indexed.
fn analyze(index: &Index, field: &str, text: &str) -> Result<Vec<(usize, Term)>> {
	let f = field_of(index, field)?;
	let mut analyzer = index.tokenizer_for_field(f).map_err(|e| Error::Query(format!("'{}': {}", field, e)))?;
	let mut terms: Vec<(usize, Term)> = Vec::new();
	let mut stream = analyzer.token_stream(text);
	stream.process(&mut |token| terms.push((token.position, Term::from_field_text(f, &token.text))));
	Ok(terms)
}

fn phrase(index: &Index, field: &str, text: &str) -> Result<Box<dyn Query>> {
	let mut terms = analyze(index, field, text)?;
	let compiled: Box<dyn Query> = match terms.len() {
		0 => Box::new(EmptyQuery),
		1 => Box::new(TermQuery::new(terms.remove(0).1, IndexRecordOption::WithFreqs)),
		_ => {
			let first = terms[0].0;
			Box::new(PhraseQuery::new_with_offset(terms.into_iter().map(|(pos, t)| (pos - first, t)).collect()))
		}
	};
	Ok(compiled)
}

fn all_words(index: &Index, field: &str, text: &str) -> Result<Box<dyn Query>> {
	let mut terms = analyze(index, field, text)?;
	let compiled: Box<dyn Query> = match terms.len() {
		0 => Box::new(EmptyQuery),
		1 => Box::new(TermQuery::new(terms.remove(0).1, IndexRecordOption::WithFreqs)),
		_ => Box::new(BooleanQuery::new(
			terms.into_iter().map(|(_, t)| -> (Occur, Box<dyn Query>) { (Occur::Must, Box::new(TermQuery::new(t, IndexRecordOption::WithFreqs))) }).collect(),
		)),
	};
	Ok(compiled)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tantivy_utils::{build_schema, register_tokenizers};

	fn index() -> Index {
		let index = Index::create_in_ram(build_schema());
		register_tokenizers(&index);
		index
	}

	#[test]
	fn unknown_field_is_a_query_error() {
		let err = compile(&index(), &GameQuery::term("publisher", "valve")).err();
		assert!(matches!(err, Some(Error::Query(_))));
	}

	#[test]
	fn date_range_requires_date_field() {
		let err = compile(&index(), &GameQuery::date_range("name", 0, 10)).err();
		assert!(matches!(err, Some(Error::Query(_))));
	}

	#[test]
	fn text_over_unknown_field_is_a_query_error() {
		let err = compile(&index(), &GameQuery::text(&["name", "publisher"], "portal")).err();
		assert!(matches!(err, Some(Error::Query(_))));
	}

	#[test]
	fn all_words_over_unknown_field_is_a_query_error() {
		let err = compile(&index(), &GameQuery::all_words("publisher", "valve")).err();
		assert!(matches!(err, Some(Error::Query(_))));
	}

	#[test]
	fn stop_word_only_phrase_compiles_to_nothing() {
		assert!(compile(&index(), &GameQuery::phrase("name", "the of")).is_ok());
	}
}
