//! In-RAM tantivy index backing the memory store's lexical ranker.
//!
//! Text is folded and split by [`text::tokenize`] before indexing, so index terms and query terms
//! always agree. Exact term matches score BM25; a term within the fuzzy tolerance of a query term
//! adds a constant 1.0.

use std::fmt;

use tantivy::{
	Index, IndexReader, IndexWriter, TantivyDocument, Term,
	collector::TopDocs,
	doc,
	query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery},
	schema::{Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value},
	tokenizer::{TextAnalyzer, WhitespaceTokenizer},
};

use sift_domain::Item;

use crate::{Result, TextField, text};

const TOKENIZER: &str = "sift_terms";
const WRITER_HEAP_BYTES: usize = 15_000_000;
/// Largest edit distance tantivy builds automata for.
pub const MAX_TOLERANCE: u8 = 2;

pub struct LexicalIndex {
	reader: IndexReader,
	searchable_text: Field,
	title: Field,
	position: Field,
	len: usize,
}
impl LexicalIndex {
	/// Indexes `items`; hits report their position in the slice.
	pub fn build(items: &[Item]) -> Result<Self> {
		let mut builder = Schema::builder();
		let indexing = TextFieldIndexing::default()
			.set_tokenizer(TOKENIZER)
			.set_index_option(IndexRecordOption::WithFreqsAndPositions);
		let options = TextOptions::default().set_indexing_options(indexing);
		let searchable_text = builder.add_text_field("searchable_text", options.clone());
		let title = builder.add_text_field("title", options);
		let position = builder.add_u64_field("position", STORED);
		let index = Index::create_in_ram(builder.build());

		index
			.tokenizers()
			.register(TOKENIZER, TextAnalyzer::builder(WhitespaceTokenizer::default()).build());

		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

		for (idx, item) in items.iter().enumerate() {
			writer.add_document(doc!(
				searchable_text => text::tokenize(&item.searchable_text).join(" "),
				title => text::tokenize(&item.title).join(" "),
				position => idx as u64,
			))?;
		}

		writer.commit()?;

		Ok(Self { reader: index.reader()?, searchable_text, title, position, len: items.len() })
	}

	/// Every matching document as `(position, score)`, unordered.
	pub fn search(
		&self,
		field: TextField,
		terms: &[String],
		tolerance: u8,
		conjunctive: bool,
	) -> Result<Vec<(usize, f32)>> {
		if terms.is_empty() || self.len == 0 {
			return Ok(Vec::new());
		}

		let field = match field {
			TextField::SearchableText => self.searchable_text,
			TextField::Title => self.title,
		};
		let occur = if conjunctive { Occur::Must } else { Occur::Should };
		let clauses = terms
			.iter()
			.map(|term| (occur, term_query(field, term, tolerance)))
			.collect::<Vec<_>>();
		let query = BooleanQuery::new(clauses);
		let searcher = self.reader.searcher();
		let mut hits = Vec::new();

		for (score, address) in searcher.search(&query, &TopDocs::with_limit(self.len))? {
			let doc = searcher.doc::<TantivyDocument>(address)?;

			if let Some(position) = doc.get_first(self.position).and_then(|value| value.as_u64()) {
				hits.push((position as usize, score));
			}
		}

		Ok(hits)
	}
}

impl fmt::Debug for LexicalIndex {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LexicalIndex").field("len", &self.len).finish_non_exhaustive()
	}
}

/// One-letter terms only match exactly.
pub fn effective_tolerance(term: &str, tolerance: u8) -> u8 {
	let limit = u8::try_from(term.chars().count().saturating_sub(1)).unwrap_or(u8::MAX);

	tolerance.min(limit).min(MAX_TOLERANCE)
}

fn term_query(field: Field, term: &str, tolerance: u8) -> Box<dyn Query> {
	let exact = Term::from_field_text(field, term);
	let distance = effective_tolerance(term, tolerance);

	if distance == 0 {
		return Box::new(TermQuery::new(exact, IndexRecordOption::WithFreqs));
	}

	let exact_query: Box<dyn Query> =
		Box::new(TermQuery::new(exact.clone(), IndexRecordOption::WithFreqs));
	let fuzzy_query: Box<dyn Query> = Box::new(FuzzyTermQuery::new(exact, distance, false));

	Box::new(BooleanQuery::new(vec![(Occur::Should, exact_query), (Occur::Should, fuzzy_query)]))
}
