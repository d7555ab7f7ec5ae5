use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::{EnableScoring, Scorer};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{DateTime, DocAddress, DocSet, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term, TERMINATED};

use compendium_core::types::Score;
use compendium_core::{DocumentSink, Error, GameQuery, GameRecord, Hit, Result, RowId, SearchIndex, StoredGame};

use crate::query::compile;
use crate::tantivy_utils::{build_schema, register_tokenizers, DEV_COMPANIES, ENTITY_ID, GENRES, LOCAL_ID, NAME, PLATFORMS, RELEASE_DATE, STORYLINE, SUMMARY};

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone, Copy)]
struct GameFields {
	local_id: Field,
	entity_id: Field,
	name: Field,
	storyline: Field,
	summary: Field,
	genres: Field,
	platforms: Field,
	dev_companies: Field,
	release_date: Field,
}

impl GameFields {
	fn of(index: &Index) -> Result<Self> {
		let schema = index.schema();
		let get = |name: &str| schema.get_field(name).map_err(|e| Error::Index(e.to_string()));
		Ok(Self {
			local_id: get(LOCAL_ID)?,
			entity_id: get(ENTITY_ID)?,
			name: get(NAME)?,
			storyline: get(STORYLINE)?,
			summary: get(SUMMARY)?,
			genres: get(GENRES)?,
			platforms: get(PLATFORMS)?,
			dev_companies: get(DEV_COMPANIES)?,
			release_date: get(RELEASE_DATE)?,
		})
	}
}

/// One source's games, searchable once committed.
pub struct GameIndex {
	name: String,
	index: Index,
	reader: IndexReader,
	fields: GameFields,
}

impl GameIndex {
	/// Creates a fresh index in `index_dir`, wiping whatever was there.
	pub fn create_in_dir(name: &str, index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema()).map_err(index_err)?;
		Self::from_index(name, index)
	}

	pub fn open_in_dir(name: &str, index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir).map_err(index_err)?;
		Self::from_index(name, index)
	}

	pub fn create_in_ram(name: &str) -> Result<Self> {
		Self::from_index(name, Index::create_in_ram(build_schema()))
	}

	/// Whether `index_dir` holds a committed index.
	pub fn exists_in_dir(index_dir: &Path) -> bool {
		tantivy::directory::MmapDirectory::open(index_dir).ok().and_then(|d| Index::exists(&d).ok()).unwrap_or(false)
	}

	fn from_index(name: &str, index: Index) -> Result<Self> {
		register_tokenizers(&index);
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;
		let fields = GameFields::of(&index)?;
		Ok(Self { name: name.to_string(), index, reader, fields })
	}

	pub fn name(&self) -> &str { &self.name }

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	pub fn writer(&self) -> Result<GameIndexWriter> {
		let writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES).map_err(index_err)?;
		Ok(GameIndexWriter { writer, reader: self.reader.clone(), fields: self.fields, pending: 0 })
	}

	fn stored(&self, doc: &TantivyDocument) -> StoredGame {
		let text = |field: Field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		StoredGame {
			local_id: text(self.fields.local_id),
			entity_id: text(self.fields.entity_id),
			name: text(self.fields.name),
			dev_companies: doc.get_all(self.fields.dev_companies).filter_map(|v| v.as_str().map(str::to_string)).collect(),
			release_date: doc.get_first(self.fields.release_date).and_then(|v| v.as_datetime()).map(|d| d.into_timestamp_secs()),
		}
	}
}

impl SearchIndex for GameIndex {
	fn search(&self, query: &GameQuery, limit: usize) -> Result<Vec<Hit>> {
		let q = compile(&self.index, query)?;
		let searcher = self.reader.searcher();
		// No more hits than documents; keeps the collector's heap bounded.
		let limit = limit.min(usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX));
		if limit == 0 { return Ok(Vec::new()); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			hits.push(Hit { row: RowId::new(addr.segment_ord, addr.doc_id), score, game: self.stored(&doc) });
		}
		Ok(hits)
	}

	fn lookup_row(&self, entity_id: &str) -> Result<Option<RowId>> {
		let term = Term::from_field_text(self.fields.entity_id, entity_id);
		let searcher = self.reader.searcher();
		for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
			let inverted = segment.inverted_index(self.fields.entity_id).map_err(index_err)?;
			let Some(mut postings) = inverted.read_postings(&term, IndexRecordOption::Basic)? else { continue };
			let mut doc = postings.doc();
			while doc != TERMINATED {
				if segment.alive_bitset().map_or(true, |alive| alive.is_alive(doc)) {
					return Ok(Some(RowId::new(segment_ord as u32, doc)));
				}
				doc = postings.advance();
			}
		}
		Ok(None)
	}

	/// Seeks the query's scorer straight to `row` instead of collecting the
	/// ranked list; the row is scored whether or not it matches.
	fn score_at(&self, query: &GameQuery, row: RowId) -> Result<Score> {
		let q = compile(&self.index, query)?;
		let searcher = self.reader.searcher();
		let segment = searcher
			.segment_readers()
			.get(row.segment as usize)
			.ok_or_else(|| Error::NotFound(format!("segment {} in {}", row.segment, self.name)))?;
		let weight = q.weight(EnableScoring::enabled_from_searcher(&searcher)).map_err(index_err)?;
		let mut scorer = weight.scorer(segment, 1.0).map_err(index_err)?;
		let current = scorer.doc();
		let landed = if current >= row.doc { current } else { scorer.seek(row.doc) };
		Ok(if landed == row.doc { scorer.score() } else { 0.0 })
	}

	fn document(&self, row: RowId) -> Result<StoredGame> {
		let doc: TantivyDocument = self.reader.searcher().doc(DocAddress::new(row.segment, row.doc)).map_err(index_err)?;
		Ok(self.stored(&doc))
	}
}

pub struct GameIndexWriter {
	writer: IndexWriter,
	reader: IndexReader,
	fields: GameFields,
	pending: usize,
}

impl DocumentSink for GameIndexWriter {
	fn add_document(&mut self, entity_id: &str, record: &GameRecord) -> Result<()> {
		let f = &self.fields;
		let mut doc = TantivyDocument::default();
		doc.add_text(f.local_id, &record.id);
		doc.add_text(f.entity_id, entity_id);
		doc.add_text(f.name, &record.name);
		if let Some(storyline) = &record.storyline { doc.add_text(f.storyline, storyline); }
		if let Some(summary) = &record.summary { doc.add_text(f.summary, summary); }
		for genre in &record.genres { doc.add_text(f.genres, genre); }
		for platform in &record.platforms { doc.add_text(f.platforms, platform); }
		for company in &record.dev_companies { doc.add_text(f.dev_companies, company); }
		if let Some(ts) = record.release_date { doc.add_date(f.release_date, DateTime::from_timestamp_secs(ts)); }
		self.writer.add_document(doc).map_err(index_err)?;
		self.pending += 1;
		Ok(())
	}

	fn commit(&mut self) -> Result<()> {
		self.writer.commit().map_err(index_err)?;
		self.reader.reload().map_err(index_err)?;
		tracing::debug!(documents = self.pending, "committed index");
		self.pending = 0;
		Ok(())
	}
}

fn index_err(e: tantivy::TantivyError) -> Error { Error::Index(e.to_string()) }
