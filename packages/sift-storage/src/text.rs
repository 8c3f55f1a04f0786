//! Term folding shared by the lexical index, prefix matching and query parsing.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// NFKC-normalized, lowercased Unicode words.
pub fn tokenize(text: &str) -> Vec<String> {
	fold(text).unicode_words().map(str::to_string).collect()
}

/// NFKC-normalized lowercase form used for prefix comparison.
pub fn fold(text: &str) -> String {
	text.nfkc().collect::<String>().to_lowercase()
}

/// Query terms with duplicates removed, first occurrence kept.
pub fn query_terms(text: &str) -> Vec<String> {
	let mut terms = tokenize(text);
	let mut seen = HashSet::new();

	terms.retain(|term| seen.insert(term.clone()));

	terms
}
