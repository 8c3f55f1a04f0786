pub mod fusion;
pub mod window;

mod rerank;

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{Error, ItemView, Result, SiftService, candidate_k};
use fusion::FusedCandidate;
use sift_config::Fusion;
use sift_domain::{FilterSet, Item, Predicate, RankedCandidate, SortSpec};
use sift_storage::{LexicalQuery, ListQuery, TextField, VectorQuery};
use window::{Span, Window};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
	Keyword,
	Semantic,
	#[default]
	Hybrid,
}
impl SearchMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Keyword => "keyword",
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}
}

/// Per-request fusion overrides layered over the tenant's configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WeightsOverride {
	pub lexical: Option<f64>,
	pub vector: Option<f64>,
	pub rrf_k: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub tenant_id: String,
	#[serde(default)]
	pub query: String,
	#[serde(default)]
	pub mode: SearchMode,
	/// Precomputed by the caller; required for semantic and hybrid modes.
	#[serde(default)]
	pub query_embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub filters: FilterSet,
	#[serde(default)]
	pub sort: Option<SortSpec>,
	#[serde(default)]
	pub page: Option<u32>,
	#[serde(default)]
	pub size: Option<u32>,
	#[serde(default)]
	pub weights: Option<WeightsOverride>,
	/// Reorders a pool of `search.rerank_pool_factor` pages through the rerank provider.
	#[serde(default)]
	pub rerank: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
	#[serde(flatten)]
	pub item: ItemView,
	/// Fused score for hybrid results, the backend-native score otherwise, the provider's
	/// relevance score when reranked. Scores are not comparable across modes.
	pub score: f64,
	pub lexical_rank: Option<u32>,
	pub vector_rank: Option<u32>,
}
impl From<RankedItem> for SearchHit {
	fn from(ranked: RankedItem) -> Self {
		Self {
			item: ranked.item.into(),
			score: ranked.score,
			lexical_rank: ranked.lexical_rank,
			vector_rank: ranked.vector_rank,
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
	pub items: Vec<SearchHit>,
	pub page: u32,
	pub size: u32,
	pub mode: SearchMode,
	/// False when reranking was not requested, had nothing to rank, or fell back.
	#[serde(default)]
	pub reranked: bool,
}

/// A hydrated hit that still carries the item's lexical text.
#[derive(Debug)]
pub(crate) struct RankedItem {
	pub(crate) item: Item,
	pub(crate) score: f64,
	pub(crate) lexical_rank: Option<u32>,
	pub(crate) vector_rank: Option<u32>,
}

impl SiftService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let tenant = self.tenant(&req.tenant_id)?;

		self.registry.validate_request(&req.tenant_id, &req.filters, req.sort.as_ref())?;

		let predicate = Predicate::compile(&req.filters)?;
		let window = Window::resolve(req.page, req.size, &self.cfg.search)?;
		let params = resolve_fusion(self.cfg.fusion_for(tenant), req.weights.as_ref())?;
		let tenant_id = req.tenant_id.as_str();
		let query = req.query.trim();
		let embedding = req.query_embedding.as_deref();

		if embedding.is_some_and(|values| values.is_empty()) {
			return Err(Error::InvalidRequest {
				message: "query_embedding must be non-empty when provided.".to_string(),
			});
		}

		let browse = match req.mode {
			SearchMode::Keyword => query.is_empty(),
			SearchMode::Semantic | SearchMode::Hybrid => query.is_empty() && embedding.is_none(),
		};
		let reranker = if req.rerank { Some(self.require_reranker()?) } else { None };
		// Relevance needs query text; browsing and embedding-only searches keep their order.
		let reranker = reranker.filter(|_| !query.is_empty());
		let span = match reranker {
			Some(_) => window.pool(self.cfg.search.rerank_pool_factor),
			None => window.span(),
		};
		let top_k = candidate_k(span.end(), self.cfg.search.candidate_ceiling);
		let ranked = if browse {
			self.browse(tenant_id, &predicate, req.sort.as_ref(), window).await?
		} else {
			match req.mode {
				SearchMode::Keyword => {
					let ranked = self.lexical(tenant_id, query, &predicate, top_k).await?;

					self.single_page(tenant_id, ranked, span, true).await?
				},
				SearchMode::Semantic => {
					let embedding = require_embedding(embedding, req.mode)?;
					let ranked = self.vector(tenant_id, embedding, &predicate, top_k).await?;

					self.single_page(tenant_id, ranked, span, false).await?
				},
				SearchMode::Hybrid => {
					let embedding = require_embedding(embedding, req.mode)?;
					let (lexical, vector) = tokio::try_join!(
						self.lexical(tenant_id, query, &predicate, top_k),
						self.vector(tenant_id, embedding, &predicate, top_k),
					)?;

					tracing::debug!(
						tenant_id,
						top_k,
						lexical = lexical.len(),
						vector = vector.len(),
						"Retrieved hybrid candidates."
					);

					let fused = fusion::fuse(&lexical, &vector, &params);

					self.fused_page(tenant_id, fused, req.sort.as_ref(), span).await?
				},
			}
		};
		let (ranked, reranked) = match reranker {
			Some(reranker) => self.rerank(reranker, tenant_id, query, ranked, window.size).await,
			None => (ranked, false),
		};
		let items = ranked.into_iter().map(SearchHit::from).collect::<Vec<_>>();

		tracing::info!(
			tenant_id,
			mode = req.mode.as_str(),
			browse,
			reranked,
			page = window.page,
			size = window.size,
			returned = items.len(),
			"Search completed."
		);

		Ok(SearchResponse {
			items,
			page: window.page,
			size: window.size,
			mode: req.mode,
			reranked,
		})
	}

	pub(crate) async fn lexical(
		&self,
		tenant_id: &str,
		text: &str,
		predicate: &Predicate,
		top_k: u32,
	) -> Result<Vec<RankedCandidate>> {
		let query = LexicalQuery {
			field: TextField::SearchableText,
			text,
			tolerance: self.cfg.search.fuzzy_distance,
			conjunctive: false,
			predicate,
			top_k,
		};

		self.bounded("lexical", self.store.lexical_search(tenant_id, query)).await
	}

	pub(crate) async fn vector(
		&self,
		tenant_id: &str,
		embedding: &[f32],
		predicate: &Predicate,
		top_k: u32,
	) -> Result<Vec<RankedCandidate>> {
		let query = VectorQuery { embedding, predicate, top_k };

		self.bounded("vector", self.store.vector_search(tenant_id, query)).await
	}

	/// Hydrates a single backend's page in its native order.
	pub(crate) async fn single_page(
		&self,
		tenant_id: &str,
		ranked: Vec<RankedCandidate>,
		span: Span,
		is_lexical: bool,
	) -> Result<Vec<RankedItem>> {
		let page = span.apply(ranked);
		let ids = candidate_ids(page.iter().map(|candidate| &candidate.item_id));
		let mut items = self.load_items(tenant_id, &ids).await?;

		Ok(page
			.into_iter()
			.filter_map(|candidate| {
				let item = items.remove(&candidate.item_id)?;

				Some(RankedItem {
					item,
					score: candidate.score as f64,
					lexical_rank: is_lexical.then_some(candidate.rank),
					vector_rank: (!is_lexical).then_some(candidate.rank),
				})
			})
			.collect())
	}

	/// Orders fused candidates, applying the sort field as the first tie-break, then hydrates the
	/// span.
	pub(crate) async fn fused_page(
		&self,
		tenant_id: &str,
		fused: Vec<FusedCandidate>,
		sort: Option<&SortSpec>,
		span: Span,
	) -> Result<Vec<RankedItem>> {
		let (page, mut items) = match sort {
			Some(sort) => {
				let ids = candidate_ids(fused.iter().map(|candidate| &candidate.item_id));
				let items = self.load_items(tenant_id, &ids).await?;
				let mut fused = fused;

				order_with_sort(&mut fused, sort, &items);

				(span.apply(fused), items)
			},
			None => {
				let page = span.apply(fused);
				let ids = candidate_ids(page.iter().map(|candidate| &candidate.item_id));
				let items = self.load_items(tenant_id, &ids).await?;

				(page, items)
			},
		};

		Ok(page
			.into_iter()
			.filter_map(|candidate| {
				let item = items.remove(&candidate.item_id)?;

				Some(RankedItem {
					item,
					score: candidate.fused_score,
					lexical_rank: candidate.lexical_rank,
					vector_rank: candidate.vector_rank,
				})
			})
			.collect())
	}

	async fn browse(
		&self,
		tenant_id: &str,
		predicate: &Predicate,
		sort: Option<&SortSpec>,
		window: Window,
	) -> Result<Vec<RankedItem>> {
		let query = ListQuery { predicate, sort, offset: window.offset(), limit: window.size };
		let items = self.bounded("listing", self.store.list(tenant_id, query)).await?;

		Ok(items
			.into_iter()
			.map(|item| RankedItem {
				item,
				score: 0.0,
				lexical_rank: None,
				vector_rank: None,
			})
			.collect())
	}
}

/// Fused score descending, then the sort field, then item id ascending.
pub fn order_with_sort(
	fused: &mut [FusedCandidate],
	sort: &SortSpec,
	items: &HashMap<String, Item>,
) {
	let empty = Map::new();

	fused.sort_by(|a, b| {
		fusion::cmp_fused(a.fused_score, b.fused_score)
			.then_with(|| {
				sort.compare(
					attributes_of(items, &a.item_id, &empty),
					attributes_of(items, &b.item_id, &empty),
				)
			})
			.then_with(|| a.item_id.cmp(&b.item_id))
	});
}

pub(crate) fn resolve_fusion(base: Fusion, over: Option<&WeightsOverride>) -> Result<Fusion> {
	let Some(over) = over else {
		return Ok(base);
	};
	let params = Fusion {
		rrf_k: over.rrf_k.unwrap_or(base.rrf_k),
		lexical_weight: over.lexical.unwrap_or(base.lexical_weight),
		vector_weight: over.vector.unwrap_or(base.vector_weight),
	};

	for (key, value) in [
		("weights.rrf_k", params.rrf_k),
		("weights.lexical", params.lexical_weight),
		("weights.vector", params.vector_weight),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::InvalidRequest {
				message: format!("{key} must be a finite, non-negative number."),
			});
		}
	}

	Ok(params)
}

fn candidate_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
	ids.cloned().collect()
}

fn require_embedding(embedding: Option<&[f32]>, mode: SearchMode) -> Result<&[f32]> {
	embedding.ok_or_else(|| Error::InvalidRequest {
		message: format!("query_embedding is required for {} mode.", mode.as_str()),
	})
}

fn attributes_of<'a>(
	items: &'a HashMap<String, Item>,
	item_id: &str,
	empty: &'a Map<String, Value>,
) -> &'a Map<String, Value> {
	items.get(item_id).map(|item| &item.attributes).unwrap_or(empty)
}
