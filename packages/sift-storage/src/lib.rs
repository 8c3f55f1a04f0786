pub mod catalog;
pub mod lexical;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod text;
pub mod vector;

mod error;

pub use error::Error;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::{future::Future, pin::Pin};

use sift_domain::{Item, Predicate, RankedCandidate, SortSpec};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextField {
	SearchableText,
	Title,
}
impl TextField {
	pub fn column(self) -> &'static str {
		match self {
			Self::SearchableText => "searchable_content",
			Self::Title => "title",
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct LexicalQuery<'a> {
	pub field: TextField,
	pub text: &'a str,
	/// Maximum edit distance per query term.
	pub tolerance: u8,
	/// Every query term must match.
	pub conjunctive: bool,
	pub predicate: &'a Predicate,
	pub top_k: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct VectorQuery<'a> {
	pub embedding: &'a [f32],
	pub predicate: &'a Predicate,
	pub top_k: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct PrefixQuery<'a> {
	pub field: TextField,
	pub prefix: &'a str,
	pub top_k: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct ListQuery<'a> {
	pub predicate: &'a Predicate,
	pub sort: Option<&'a SortSpec>,
	pub offset: u32,
	pub limit: u32,
}

/// Tenant-scoped retrieval over one item catalog.
///
/// Ranked lists carry contiguous 1-based ranks. Predicates are applied before ranking and before
/// `top_k` truncation. A tenant with no data behaves as an empty partition.
pub trait SearchStore
where
	Self: Send + Sync,
{
	/// BM25 relevance, highest first.
	fn lexical_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: LexicalQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>>;

	/// Cosine distance, lowest first. Items without embeddings never appear.
	fn vector_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: VectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>>;

	/// Case-insensitive prefix match ordered by id, every score 1.0.
	fn prefix_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: PrefixQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>>;

	/// Unranked listing ordered by the sort field when given, then by id.
	fn list<'a>(&'a self, tenant_id: &'a str, query: ListQuery<'a>)
	-> BoxFuture<'a, Result<Vec<Item>>>;

	fn get_by_id<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Item>>>;

	/// Items in the order of `ids`; unknown ids are skipped.
	fn get_many<'a>(
		&'a self,
		tenant_id: &'a str,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Item>>>;

	fn get_embedding_of<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>>;
}
