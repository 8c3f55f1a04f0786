use std::cmp::Ordering;

use serde::Serialize;

/// One entry of a backend's ranked list. `score` is backend-native: BM25 relevance for lexical
/// lists, cosine distance for vector lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCandidate {
	pub item_id: String,
	pub rank: u32,
	pub score: f32,
}
impl RankedCandidate {
	/// Assigns contiguous 1-based ranks in iteration order.
	pub fn ranked<I>(scored: I) -> Vec<Self>
	where
		I: IntoIterator<Item = (String, f32)>,
	{
		scored
			.into_iter()
			.enumerate()
			.map(|(idx, (item_id, score))| Self { item_id, rank: idx as u32 + 1, score })
			.collect()
	}
}

pub fn ranks_are_contiguous(candidates: &[RankedCandidate]) -> bool {
	candidates.iter().enumerate().all(|(idx, candidate)| candidate.rank == idx as u32 + 1)
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Ascending order with NaN sorted last.
pub fn cmp_f32_asc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ranked_assigns_one_based_ranks() {
		let ranked = RankedCandidate::ranked(vec![("b".to_string(), 2.0), ("a".to_string(), 1.0)]);

		assert_eq!(ranked[0].rank, 1);
		assert_eq!(ranked[1].item_id, "a");
		assert!(ranks_are_contiguous(&ranked));
		assert!(ranks_are_contiguous(&[]));
	}

	#[test]
	fn float_orderings_put_nan_last() {
		let mut desc = vec![0.5, f32::NAN, 2.0];
		let mut asc = desc.clone();

		desc.sort_by(|a, b| cmp_f32_desc(*a, *b));
		asc.sort_by(|a, b| cmp_f32_asc(*a, *b));

		assert_eq!(desc[..2], [2.0, 0.5]);
		assert!(desc[2].is_nan());
		assert_eq!(asc[..2], [0.5, 2.0]);
		assert!(asc[2].is_nan());
	}
}
