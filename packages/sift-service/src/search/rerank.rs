use super::RankedItem;
use crate::{Error, Result, SiftService};
use sift_providers::RerankProvider;

impl SiftService {
	pub(crate) fn require_reranker(&self) -> Result<&dyn RerankProvider> {
		self.reranker.as_deref().ok_or_else(|| Error::InvalidRequest {
			message: "rerank requires a configured rerank provider.".to_string(),
		})
	}

	/// Reorders `pool` by provider relevance and keeps the first `keep` hits. Any provider failure
	/// keeps the incoming order instead; the flag reports whether the provider's order was used.
	pub(crate) async fn rerank(
		&self,
		reranker: &dyn RerankProvider,
		tenant_id: &str,
		query: &str,
		pool: Vec<RankedItem>,
		keep: u32,
	) -> (Vec<RankedItem>, bool) {
		if pool.is_empty() {
			return (pool, false);
		}

		let docs =
			pool.iter().map(|ranked| ranked.item.searchable_text.clone()).collect::<Vec<_>>();

		match reranker.rerank(query, &docs).await {
			Ok(scores) => match reorder(pool, &scores, keep) {
				Ok(ranked) => {
					tracing::debug!(tenant_id, pool = docs.len(), "Reranked search pool.");

					(ranked, true)
				},
				Err(pool) => {
					tracing::warn!(
						tenant_id,
						pool = docs.len(),
						scores = scores.len(),
						"Rerank scores are unusable. Keeping retrieval order."
					);

					(truncate(pool, keep), false)
				},
			},
			Err(err) => {
				tracing::warn!(
					tenant_id,
					error = %err,
					"Rerank provider failed. Keeping retrieval order."
				);

				(truncate(pool, keep), false)
			},
		}
	}
}

/// Relevance descending; ties keep retrieval order. Hands the pool back untouched when `scores`
/// does not line up with it.
fn reorder(
	pool: Vec<RankedItem>,
	scores: &[f32],
	keep: u32,
) -> std::result::Result<Vec<RankedItem>, Vec<RankedItem>> {
	if scores.len() != pool.len() || scores.iter().any(|score| !score.is_finite()) {
		return Err(pool);
	}

	let mut scored = pool.into_iter().zip(scores.iter().copied()).collect::<Vec<_>>();

	scored.sort_by(|(_, a), (_, b)| b.total_cmp(a));

	Ok(scored
		.into_iter()
		.take(keep as usize)
		.map(|(mut ranked, score)| {
			ranked.score = score as f64;

			ranked
		})
		.collect())
}

fn truncate(mut pool: Vec<RankedItem>, keep: u32) -> Vec<RankedItem> {
	pool.truncate(keep as usize);

	pool
}
