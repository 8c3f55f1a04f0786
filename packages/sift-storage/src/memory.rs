use std::{collections::HashMap, path::Path, sync::OnceLock};

use sift_domain::{
	Item, Predicate, RankedCandidate,
	candidate::{cmp_f32_asc, cmp_f32_desc},
};

use crate::{
	BoxFuture, LexicalQuery, ListQuery, PrefixQuery, Result, SearchStore, TextField, VectorQuery,
	catalog::{self, CatalogRecord},
	lexical::LexicalIndex,
	text, vector,
};

#[derive(Debug, Default)]
struct Partition {
	items: Vec<Item>,
	positions: HashMap<String, usize>,
	/// Length of the first stored embedding.
	dimensions: Option<usize>,
	lexical: OnceLock<LexicalIndex>,
}
impl Partition {
	fn upsert(&mut self, mut item: Item) {
		item.normalize();

		if self.dimensions.is_none() {
			self.dimensions = item.embedding.as_ref().map(Vec::len);
		}

		self.lexical.take();

		match self.positions.get(&item.id) {
			Some(&idx) => self.items[idx] = item,
			None => {
				self.positions.insert(item.id.clone(), self.items.len());
				self.items.push(item);
			},
		}
	}

	/// Built on first use after the last write.
	fn lexical_index(&self) -> Result<&LexicalIndex> {
		if let Some(index) = self.lexical.get() {
			return Ok(index);
		}

		let built = LexicalIndex::build(&self.items)?;

		Ok(self.lexical.get_or_init(|| built))
	}

	fn field_text(&self, idx: usize, field: TextField) -> &str {
		match field {
			TextField::SearchableText => &self.items[idx].searchable_text,
			TextField::Title => &self.items[idx].title,
		}
	}

	fn passes(&self, idx: usize, predicate: &Predicate) -> Result<bool> {
		Ok(predicate.evaluate(&self.items[idx].attributes)?)
	}

	fn get(&self, item_id: &str) -> Option<&Item> {
		self.positions.get(item_id).map(|idx| &self.items[*idx])
	}

	fn ranked(&self, scored: Vec<(usize, f32)>) -> Vec<RankedCandidate> {
		RankedCandidate::ranked(
			scored.into_iter().map(|(idx, score)| (self.items[idx].id.clone(), score)),
		)
	}
}

/// In-process store. Ties between equal scores resolve by insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
	partitions: HashMap<String, Partition>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn load(path: &Path) -> Result<Self> {
		let records = catalog::load(path)?;

		Ok(Self::from_records(records))
	}

	pub fn from_records<I>(records: I) -> Self
	where
		I: IntoIterator<Item = CatalogRecord>,
	{
		let mut store = Self::new();

		for record in records {
			store.insert(&record.tenant, record.item);
		}

		store
	}

	/// Replaces an item with the same id in place.
	pub fn insert(&mut self, tenant_id: &str, item: Item) {
		self.partitions.entry(tenant_id.to_string()).or_default().upsert(item);
	}

	pub fn len(&self, tenant_id: &str) -> usize {
		self.partitions.get(tenant_id).map(|partition| partition.items.len()).unwrap_or(0)
	}

	pub fn tenants(&self) -> impl Iterator<Item = &str> {
		self.partitions.keys().map(String::as_str)
	}

	fn lexical(&self, tenant_id: &str, query: LexicalQuery<'_>) -> Result<Vec<RankedCandidate>> {
		let Some(partition) = self.partitions.get(tenant_id) else {
			return Ok(Vec::new());
		};
		let terms = text::query_terms(query.text);

		if terms.is_empty() || query.top_k == 0 {
			return Ok(Vec::new());
		}

		let hits = partition.lexical_index()?.search(
			query.field,
			&terms,
			query.tolerance,
			query.conjunctive,
		)?;
		let mut scored = Vec::new();

		for (idx, score) in hits {
			if partition.passes(idx, query.predicate)? {
				scored.push((idx, score));
			}
		}

		scored.sort_by(|a, b| cmp_f32_desc(a.1, b.1).then(a.0.cmp(&b.0)));
		scored.truncate(query.top_k as usize);

		Ok(partition.ranked(scored))
	}

	fn vector(&self, tenant_id: &str, query: VectorQuery<'_>) -> Result<Vec<RankedCandidate>> {
		let partition = self.partitions.get(tenant_id);
		let dimensions = partition.and_then(|partition| partition.dimensions);

		vector::validate_query(query.embedding, dimensions)?;

		let Some(partition) = partition else {
			return Ok(Vec::new());
		};
		let mut scored = Vec::new();
		let mut skipped = 0_usize;

		for (idx, item) in partition.items.iter().enumerate() {
			let Some(embedding) = item.embedding.as_deref() else {
				continue;
			};
			let Some(distance) = vector::cosine_distance(query.embedding, embedding) else {
				skipped += 1;

				continue;
			};

			if partition.passes(idx, query.predicate)? {
				scored.push((idx, distance));
			}
		}

		if skipped > 0 {
			tracing::debug!(
				tenant_id,
				skipped,
				dim = query.embedding.len(),
				"Skipped embeddings with mismatched dimensions."
			);
		}

		scored.sort_by(|a, b| cmp_f32_asc(a.1, b.1).then(a.0.cmp(&b.0)));
		scored.truncate(query.top_k as usize);

		Ok(partition.ranked(scored))
	}

	fn prefix(&self, tenant_id: &str, query: PrefixQuery<'_>) -> Vec<RankedCandidate> {
		let Some(partition) = self.partitions.get(tenant_id) else {
			return Vec::new();
		};
		let prefix = text::fold(query.prefix.trim());
		let mut matched = (0..partition.items.len())
			.filter(|idx| text::fold(partition.field_text(*idx, query.field)).starts_with(&prefix))
			.collect::<Vec<_>>();

		matched.sort_by(|a, b| partition.items[*a].id.cmp(&partition.items[*b].id));
		matched.truncate(query.top_k as usize);

		partition.ranked(matched.into_iter().map(|idx| (idx, 1.0)).collect())
	}

	fn listing(&self, tenant_id: &str, query: ListQuery<'_>) -> Result<Vec<Item>> {
		let Some(partition) = self.partitions.get(tenant_id) else {
			return Ok(Vec::new());
		};
		let mut kept = Vec::new();

		for (idx, item) in partition.items.iter().enumerate() {
			if partition.passes(idx, query.predicate)? {
				kept.push(item);
			}
		}

		kept.sort_by(|a, b| {
			let by_field = query
				.sort
				.map(|sort| sort.compare(&a.attributes, &b.attributes))
				.unwrap_or(std::cmp::Ordering::Equal);

			by_field.then_with(|| a.id.cmp(&b.id))
		});

		Ok(kept
			.into_iter()
			.skip(query.offset as usize)
			.take(query.limit as usize)
			.cloned()
			.collect())
	}
}

impl SearchStore for MemoryStore {
	fn lexical_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: LexicalQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(async move { self.lexical(tenant_id, query) })
	}

	fn vector_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: VectorQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(async move { self.vector(tenant_id, query) })
	}

	fn prefix_search<'a>(
		&'a self,
		tenant_id: &'a str,
		query: PrefixQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<RankedCandidate>>> {
		Box::pin(async move { Ok(self.prefix(tenant_id, query)) })
	}

	fn list<'a>(
		&'a self,
		tenant_id: &'a str,
		query: ListQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<Item>>> {
		Box::pin(async move { self.listing(tenant_id, query) })
	}

	fn get_by_id<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Item>>> {
		Box::pin(async move {
			Ok(self.partitions.get(tenant_id).and_then(|partition| partition.get(item_id)).cloned())
		})
	}

	fn get_many<'a>(
		&'a self,
		tenant_id: &'a str,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Item>>> {
		Box::pin(async move {
			let Some(partition) = self.partitions.get(tenant_id) else {
				return Ok(Vec::new());
			};

			Ok(ids.iter().filter_map(|id| partition.get(id)).cloned().collect())
		})
	}

	fn get_embedding_of<'a>(
		&'a self,
		tenant_id: &'a str,
		item_id: &'a str,
	) -> BoxFuture<'a, Result<Option<Vec<f32>>>> {
		Box::pin(async move {
			Ok(self
				.partitions
				.get(tenant_id)
				.and_then(|partition| partition.get(item_id))
				.and_then(|item| item.embedding.clone()))
		})
	}
}
