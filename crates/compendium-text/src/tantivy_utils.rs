use tantivy::schema::{DateOptions, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RawTokenizer, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const LOCAL_ID: &str = "id";
pub const ENTITY_ID: &str = "uuid";
pub const NAME: &str = "name";
pub const STORYLINE: &str = "storyline";
pub const SUMMARY: &str = "summary";
pub const GENRES: &str = "genres";
pub const PLATFORMS: &str = "platforms";
pub const DEV_COMPANIES: &str = "dev_companies";
pub const RELEASE_DATE: &str = "release_date";

/// Keeps single letters and numbers ("Portal 2" -> ["portal", "2"]).
pub const KEEP_NUMBERS_TOKENIZER: &str = "keep_numbers";
pub const KEYWORD_TOKENIZER: &str = "keyword_lower";

/// Fields indexed with the keyword analyzer; term queries lowercase their value.
pub const KEYWORD_FIELDS: [&str; 3] = [GENRES, PLATFORMS, DEV_COMPANIES];

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(LOCAL_ID, STRING | STORED);
	schema_builder.add_text_field(ENTITY_ID, STRING | STORED);
	let name_indexing = TextFieldIndexing::default().set_tokenizer(KEEP_NUMBERS_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field(NAME, TextOptions::default().set_indexing_options(name_indexing).set_stored());
	let text_indexing = TextFieldIndexing::default().set_tokenizer("default").set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_indexing).set_stored();
	schema_builder.add_text_field(STORYLINE, text_options.clone());
	schema_builder.add_text_field(SUMMARY, text_options);
	let keyword_indexing = TextFieldIndexing::default().set_tokenizer(KEYWORD_TOKENIZER).set_index_option(IndexRecordOption::WithFreqs);
	let keyword_options = TextOptions::default().set_indexing_options(keyword_indexing).set_stored();
	for field in KEYWORD_FIELDS { schema_builder.add_text_field(field, keyword_options.clone()); }
	schema_builder.add_date_field(RELEASE_DATE, DateOptions::default().set_indexed().set_stored().set_fast());
	schema_builder.build()
}

pub fn register_tokenizers(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","but","by","for","if","in","into","is","it","no","not","of","on","or","such","that","the","their","then","there","these","they","this","to","was","will","with",
	];
	let keep_numbers = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(KEEP_NUMBERS_TOKENIZER, keep_numbers);
	let keyword = TextAnalyzer::builder(RawTokenizer::default()).filter(LowerCaser).build();
	index.tokenizers().register(KEYWORD_TOKENIZER, keyword);
}
