use std::sync::Arc;

use color_eyre::eyre;

use sift_config::{Config, StorageBackend};
use sift_providers::{EmbeddingProvider, HttpEmbedding, HttpRerank, RerankProvider};
use sift_service::SiftService;
use sift_storage::{MemoryStore, PgStore, SearchStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
	/// Resolves query embeddings for semantic and hybrid requests that arrive without one.
	pub embedder: Option<Arc<dyn EmbeddingProvider>>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let store: Arc<dyn SearchStore> = match config.storage.backend {
			StorageBackend::Memory => {
				let store = match config.storage.catalog_path.as_deref() {
					Some(path) => MemoryStore::load(path)?,
					None => MemoryStore::new(),
				};

				for tenant_id in
					store.tenants().filter(|tenant_id| config.tenant(tenant_id).is_none())
				{
					tracing::warn!(
						tenant_id,
						"Catalog tenant is not configured and will be unreachable."
					);
				}

				Arc::new(store)
			},
			StorageBackend::Postgres => {
				let Some(postgres) = config.storage.postgres.as_ref() else {
					return Err(eyre::eyre!(
						"storage.postgres is required for the postgres backend."
					));
				};
				let store = PgStore::connect(postgres).await?;

				store.ensure_schema(config.tenants.keys().map(String::as_str)).await?;

				Arc::new(store)
			},
		};
		let embedder = match config.providers.embedding.clone() {
			Some(cfg) => Some(Arc::new(HttpEmbedding::new(cfg)?) as Arc<dyn EmbeddingProvider>),
			None => None,
		};

		let reranker = match config.providers.rerank.clone() {
			Some(cfg) => Some(Arc::new(HttpRerank::new(cfg)?) as Arc<dyn RerankProvider>),
			None => None,
		};

		tracing::info!(
			backend = ?config.storage.backend,
			tenants = config.tenants.len(),
			embedder = embedder.is_some(),
			reranker = reranker.is_some(),
			"Initialized search state."
		);

		let service = SiftService::new(config, store);
		let service = match reranker {
			Some(reranker) => service.with_reranker(reranker),
			None => service,
		};

		Ok(Self::from_parts(service, embedder))
	}

	pub fn from_parts(service: SiftService, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
		Self { service: Arc::new(service), embedder }
	}
}
