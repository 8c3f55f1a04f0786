use sift_domain::{Predicate, RankedCandidate};
use sift_storage::{LexicalQuery, ListQuery, PrefixQuery, TextField};

use crate::{Result, SiftService};

pub use sift_config::PREFIX_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
	/// Empty input: first items by id.
	Browse,
	Prefix,
	Fuzzy,
}
impl Strategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Browse => "browse",
			Self::Prefix => "prefix",
			Self::Fuzzy => "fuzzy",
		}
	}
}

/// Picks the matching strategy from the trimmed input's character count.
pub fn strategy_for(input: &str, prefix_threshold: usize) -> Strategy {
	match input.trim().chars().count() {
		0 => Strategy::Browse,
		len if len < prefix_threshold => Strategy::Prefix,
		_ => Strategy::Fuzzy,
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AutocompleteRequest {
	#[serde(default)]
	pub tenant_id: String,
	#[serde(default)]
	pub query: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Suggestion {
	pub item_id: String,
	pub title: String,
	pub media_ref: Option<String>,
	pub score: f32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AutocompleteResponse {
	pub strategy: Strategy,
	pub suggestions: Vec<Suggestion>,
}

impl SiftService {
	pub async fn autocomplete(&self, req: AutocompleteRequest) -> Result<AutocompleteResponse> {
		self.tenant(&req.tenant_id)?;

		let cfg = &self.cfg.search.autocomplete;
		let tenant_id = req.tenant_id.as_str();
		let input = req.query.trim();
		let strategy = strategy_for(input, cfg.prefix_threshold);
		let always = Predicate::always();
		let ranked = match strategy {
			Strategy::Browse => {
				let query =
					ListQuery { predicate: &always, sort: None, offset: 0, limit: cfg.max_results };
				let items = self.bounded("listing", self.store.list(tenant_id, query)).await?;

				RankedCandidate::ranked(items.into_iter().map(|item| (item.id, 0.0)))
			},
			Strategy::Prefix => {
				let query =
					PrefixQuery { field: TextField::Title, prefix: input, top_k: cfg.max_results };

				self.bounded("prefix", self.store.prefix_search(tenant_id, query)).await?
			},
			Strategy::Fuzzy => {
				let query = LexicalQuery {
					field: TextField::Title,
					text: input,
					tolerance: cfg.fuzzy_distance,
					conjunctive: true,
					predicate: &always,
					top_k: cfg.max_results,
				};

				self.bounded("lexical", self.store.lexical_search(tenant_id, query)).await?
			},
		};
		let ids = ranked.iter().map(|candidate| candidate.item_id.clone()).collect::<Vec<_>>();
		let mut items = self.load_items(tenant_id, &ids).await?;
		let suggestions = ranked
			.into_iter()
			.take(cfg.max_results as usize)
			.filter_map(|candidate| {
				let item = items.remove(&candidate.item_id)?;

				Some(Suggestion {
					item_id: item.id,
					title: item.title,
					media_ref: item.media_ref,
					score: candidate.score,
				})
			})
			.collect::<Vec<_>>();

		tracing::info!(
			tenant_id,
			strategy = strategy.as_str(),
			input_chars = input.chars().count(),
			returned = suggestions.len(),
			"Autocomplete completed."
		);

		Ok(AutocompleteResponse { strategy, suggestions })
	}
}
