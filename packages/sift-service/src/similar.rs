use sift_domain::Predicate;

use crate::{
	Error, Result, SearchHit, SiftService, candidate_k,
	search::{fusion, window::Span},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarMode {
	Semantic,
	#[default]
	Hybrid,
}
impl SimilarMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimilarRequest {
	#[serde(default)]
	pub tenant_id: String,
	pub item_id: String,
	#[serde(default)]
	pub mode: SimilarMode,
	#[serde(default)]
	pub count: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimilarResponse {
	pub reference_id: String,
	pub mode: SimilarMode,
	pub items: Vec<SearchHit>,
}

impl SiftService {
	/// Neighbors of a reference item. The reference never appears in its own results.
	pub async fn similar(&self, req: SimilarRequest) -> Result<SimilarResponse> {
		let tenant = self.tenant(&req.tenant_id)?;
		let tenant_id = req.tenant_id.as_str();
		let search = &self.cfg.search;
		let count =
			req.count.unwrap_or(search.similar.default_count).clamp(1, search.max_page_size);
		let reference = self
			.bounded("lookup", self.store.get_by_id(tenant_id, &req.item_id))
			.await?
			.ok_or_else(|| Error::ReferenceNotFound { item_id: req.item_id.clone() })?;
		let span = Span { offset: 0, len: count };
		// One extra slot so dropping the reference still leaves `count` candidates.
		let top_k = candidate_k(count, search.candidate_ceiling).saturating_add(1);
		let always = Predicate::always();
		let items = match (req.mode, reference.embedding.as_deref()) {
			(SimilarMode::Semantic, None) => {
				tracing::warn!(
					tenant_id,
					item_id = %reference.id,
					"Reference item has no embedding."
				);

				Vec::new()
			},
			(SimilarMode::Semantic, Some(embedding)) => {
				let ranked = self.vector(tenant_id, embedding, &always, top_k).await?;
				let ranked = fusion::without(ranked, &reference.id);

				self.single_page(tenant_id, ranked, span, false).await?
			},
			(SimilarMode::Hybrid, embedding) => {
				let text = reference.searchable_text.as_str();
				let (lexical, vector) = match embedding {
					Some(embedding) => tokio::try_join!(
						self.lexical(tenant_id, text, &always, top_k),
						self.vector(tenant_id, embedding, &always, top_k),
					)?,
					None => {
						tracing::warn!(
							tenant_id,
							item_id = %reference.id,
							"Reference item has no embedding. Fusing lexical matches only."
						);

						(self.lexical(tenant_id, text, &always, top_k).await?, Vec::new())
					},
				};
				let fused = fusion::fuse(
					&fusion::without(lexical, &reference.id),
					&fusion::without(vector, &reference.id),
					&self.cfg.fusion_for(tenant),
				);

				self.fused_page(tenant_id, fused, None, span).await?
			},
		};

		tracing::info!(
			tenant_id,
			item_id = %reference.id,
			mode = req.mode.as_str(),
			count,
			returned = items.len(),
			"Similar items completed."
		);

		Ok(SimilarResponse {
			reference_id: reference.id,
			mode: req.mode,
			items: items.into_iter().map(SearchHit::from).collect(),
		})
	}
}
