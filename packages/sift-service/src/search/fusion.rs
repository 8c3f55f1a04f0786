use std::{cmp::Ordering, collections::HashMap};

use sift_config::Fusion;
use sift_domain::RankedCandidate;

#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
	pub item_id: String,
	pub fused_score: f64,
	pub lexical_rank: Option<u32>,
	pub vector_rank: Option<u32>,
}

/// One backend's reciprocal-rank term.
pub fn contribution(weight: f64, k: f64, rank: u32) -> f64 {
	weight / (k + rank as f64)
}

/// Reciprocal rank fusion over the union of both lists.
///
/// Output is ordered by fused score descending, then item id ascending.
pub fn fuse(
	lexical: &[RankedCandidate],
	vector: &[RankedCandidate],
	params: &Fusion,
) -> Vec<FusedCandidate> {
	let mut fused: Vec<FusedCandidate> = Vec::with_capacity(lexical.len() + vector.len());
	let mut slots: HashMap<&str, usize> = HashMap::new();

	for (candidates, is_lexical) in [(lexical, true), (vector, false)] {
		let weight = if is_lexical { params.lexical_weight } else { params.vector_weight };

		for candidate in candidates {
			let slot = *slots.entry(candidate.item_id.as_str()).or_insert_with(|| {
				fused.push(FusedCandidate {
					item_id: candidate.item_id.clone(),
					fused_score: 0.0,
					lexical_rank: None,
					vector_rank: None,
				});

				fused.len() - 1
			});
			let entry = &mut fused[slot];
			let rank = if is_lexical { &mut entry.lexical_rank } else { &mut entry.vector_rank };

			if rank.is_some() {
				continue;
			}

			*rank = Some(candidate.rank);
			entry.fused_score += contribution(weight, params.rrf_k, candidate.rank);
		}
	}

	fused.sort_by(|a, b| {
		cmp_fused(a.fused_score, b.fused_score).then_with(|| a.item_id.cmp(&b.item_id))
	});

	fused
}

/// Descending order for fused scores.
pub fn cmp_fused(a: f64, b: f64) -> Ordering {
	b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Drops `item_id` and renumbers the remaining ranks from 1.
pub fn without(candidates: Vec<RankedCandidate>, item_id: &str) -> Vec<RankedCandidate> {
	RankedCandidate::ranked(
		candidates
			.into_iter()
			.filter(|candidate| candidate.item_id != item_id)
			.map(|candidate| (candidate.item_id, candidate.score)),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn list(ids: &[&str]) -> Vec<RankedCandidate> {
		RankedCandidate::ranked(ids.iter().map(|id| (id.to_string(), 0.0)))
	}

	fn halves() -> Fusion {
		Fusion { rrf_k: 60.0, lexical_weight: 0.5, vector_weight: 0.5 }
	}

	#[test]
	fn worked_example_orders_b_c_a_d() {
		let fused = fuse(&list(&["A", "B", "C"]), &list(&["B", "C", "D"]), &halves());
		let order = fused.iter().map(|c| c.item_id.as_str()).collect::<Vec<_>>();

		assert_eq!(order, vec!["B", "C", "A", "D"]);

		let score = |id: &str| fused.iter().find(|c| c.item_id == id).map(|c| c.fused_score);

		assert!((score("A").unwrap_or_default() - 0.5 / 61.0).abs() < 1e-12);
		assert!((score("B").unwrap_or_default() - (0.5 / 62.0 + 0.5 / 61.0)).abs() < 1e-12);
		assert!((score("C").unwrap_or_default() - (0.5 / 63.0 + 0.5 / 62.0)).abs() < 1e-12);
		assert!((score("D").unwrap_or_default() - 0.5 / 63.0).abs() < 1e-12);
	}

	#[test]
	fn single_list_items_keep_only_their_own_term() {
		let params = Fusion { rrf_k: 10.0, lexical_weight: 2.0, vector_weight: 0.3 };
		let fused = fuse(&list(&["x", "y"]), &list(&["y"]), &params);
		let x = fused.iter().find(|c| c.item_id == "x").cloned();

		assert_eq!(
			x,
			Some(FusedCandidate {
				item_id: "x".to_string(),
				fused_score: 2.0 / 11.0,
				lexical_rank: Some(1),
				vector_rank: None,
			})
		);
	}

	#[test]
	fn equal_scores_break_ties_by_id() {
		let fused = fuse(&list(&["m", "b"]), &list(&["b", "m"]), &halves());

		assert_eq!(fused[0].fused_score, fused[1].fused_score);
		assert_eq!(fused[0].item_id, "b");
		assert_eq!(fused[1].item_id, "m");
	}

	#[test]
	fn output_is_strictly_ordered() {
		let fused = fuse(&list(&["a", "b", "c", "d"]), &list(&["d", "e", "a"]), &halves());

		assert!(fused.windows(2).all(|pair| {
			pair[0].fused_score > pair[1].fused_score
				|| (pair[0].fused_score == pair[1].fused_score && pair[0].item_id < pair[1].item_id)
		}));
		assert_eq!(fused.len(), 5);
	}

	#[test]
	fn zero_weight_still_keeps_the_item() {
		let params = Fusion { rrf_k: 60.0, lexical_weight: 0.0, vector_weight: 1.0 };
		let fused = fuse(&list(&["only_lexical"]), &[], &params);

		assert_eq!(fused.len(), 1);
		assert_eq!(fused[0].fused_score, 0.0);
	}

	#[test]
	fn without_renumbers_ranks() {
		let kept = without(list(&["ref", "a", "b"]), "ref");

		assert_eq!(kept.iter().map(|c| (c.item_id.as_str(), c.rank)).collect::<Vec<_>>(), vec![
			("a", 1),
			("b", 2)
		]);
	}
}
