use serde_json::{Map, Value};

use crate::{Error, Result, SiftService};
use sift_domain::Item;

/// Display fields of an item. Embeddings and the lexical text blob stay server-side.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemView {
	pub id: String,
	pub title: String,
	pub attributes: Map<String, Value>,
	pub media_ref: Option<String>,
	pub summary: Option<Value>,
	pub related_excerpts: Vec<String>,
}
impl From<Item> for ItemView {
	fn from(item: Item) -> Self {
		Self {
			id: item.id,
			title: item.title,
			attributes: item.attributes,
			media_ref: item.media_ref,
			summary: item.summary,
			related_excerpts: item.related_excerpts,
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ItemsRequest {
	#[serde(default)]
	pub tenant_id: String,
	pub ids: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ItemsResponse {
	pub items: Vec<ItemView>,
}

impl SiftService {
	/// Items in request order. Unknown ids are skipped rather than reported.
	pub async fn fetch_items(&self, req: ItemsRequest) -> Result<ItemsResponse> {
		self.tenant(&req.tenant_id)?;

		let max = self.cfg.search.max_page_size as usize;

		if req.ids.len() > max {
			return Err(Error::InvalidRequest {
				message: format!("ids must contain at most {max} entries."),
			});
		}
		if let Some(idx) = req.ids.iter().position(|id| id.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: format!("$.ids[{idx}] must be non-empty."),
			});
		}

		let mut by_id = self.load_items(&req.tenant_id, &req.ids).await?;
		let items = req
			.ids
			.iter()
			.filter_map(|id| by_id.remove(id))
			.map(ItemView::from)
			.collect::<Vec<_>>();

		tracing::info!(
			tenant_id = %req.tenant_id,
			requested = req.ids.len(),
			found = items.len(),
			"Fetched items."
		);

		Ok(ItemsResponse { items })
	}
}
