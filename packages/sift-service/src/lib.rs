pub mod autocomplete;
pub mod items;
pub mod search;
pub mod similar;

mod error;

pub use autocomplete::{AutocompleteRequest, AutocompleteResponse, Strategy, Suggestion};
pub use error::{Error, Result};
pub use items::{ItemView, ItemsRequest, ItemsResponse};
pub use search::{SearchHit, SearchMode, SearchRequest, SearchResponse, WeightsOverride};
pub use similar::{SimilarMode, SimilarRequest, SimilarResponse};

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use sift_config::{Config, TenantConfig};
use sift_domain::{FieldRegistry, Item};
use sift_providers::RerankProvider;
use sift_storage::SearchStore;

/// Tenant-scoped retrieval over a shared store.
///
/// Holds no per-request state; clones of the `Arc` store are shared across requests.
pub struct SiftService {
	pub cfg: Config,
	pub registry: FieldRegistry,
	pub store: Arc<dyn SearchStore>,
	/// Reorders search pools when a request asks for it.
	pub reranker: Option<Arc<dyn RerankProvider>>,
}
impl SiftService {
	pub fn new(cfg: Config, store: Arc<dyn SearchStore>) -> Self {
		let mut registry = FieldRegistry::new();

		for (tenant_id, tenant) in &cfg.tenants {
			registry.register(
				tenant_id.clone(),
				tenant.filterable_fields.clone(),
				tenant.sortable_fields.clone(),
			);
		}

		Self { cfg, registry, store, reranker: None }
	}

	pub fn with_reranker(mut self, reranker: Arc<dyn RerankProvider>) -> Self {
		self.reranker = Some(reranker);

		self
	}

	pub(crate) fn tenant(&self, tenant_id: &str) -> Result<&TenantConfig> {
		self.cfg
			.tenant(tenant_id)
			.ok_or_else(|| Error::UnknownTenant { tenant_id: tenant_id.to_string() })
	}

	/// Bounds a single store call by `search.backend_timeout_ms`.
	pub(crate) async fn bounded<T, F>(&self, backend: &'static str, call: F) -> Result<T>
	where
		F: Future<Output = sift_storage::Result<T>>,
	{
		let timeout_ms = self.cfg.search.backend_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
			Ok(result) => Ok(result?),
			Err(_) => {
				tracing::warn!(backend, timeout_ms, "Store call timed out.");

				Err(Error::BackendTimeout { backend, timeout_ms })
			},
		}
	}

	/// Loads items for `ids`, keyed by id. Ids that vanished since ranking are absent.
	pub(crate) async fn load_items(
		&self,
		tenant_id: &str,
		ids: &[String],
	) -> Result<HashMap<String, Item>> {
		if ids.is_empty() {
			return Ok(HashMap::new());
		}

		let items = self.bounded("lookup", self.store.get_many(tenant_id, ids)).await?;

		Ok(items.into_iter().map(|item| (item.id.clone(), item)).collect())
	}
}

/// `2 × min(window_end, ceiling)` candidates per backend.
pub fn candidate_k(window_end: u32, ceiling: u32) -> u32 {
	window_end.min(ceiling).saturating_mul(2)
}
