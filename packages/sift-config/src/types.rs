use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

/// Default autocomplete input length at which fuzzy matching replaces prefix matching.
pub const PREFIX_THRESHOLD: usize = 3;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub fusion: Fusion,
	pub tenants: HashMap<String, TenantConfig>,
}
impl Config {
	pub fn tenant(&self, tenant_id: &str) -> Option<&TenantConfig> {
		self.tenants.get(tenant_id)
	}

	/// Global fusion parameters with the tenant's overrides applied.
	pub fn fusion_for(&self, tenant: &TenantConfig) -> Fusion {
		let Some(over) = tenant.fusion.as_ref() else {
			return self.fusion.clone();
		};

		Fusion {
			rrf_k: over.rrf_k.unwrap_or(self.fusion.rrf_k),
			lexical_weight: over.lexical_weight.unwrap_or(self.fusion.lexical_weight),
			vector_weight: over.vector_weight.unwrap_or(self.fusion.vector_weight),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	Memory,
	Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	#[serde(default)]
	pub backend: StorageBackend,
	/// JSON Lines file with one tenant-tagged item per line. Memory backend only.
	pub catalog_path: Option<PathBuf>,
	pub postgres: Option<Postgres>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Providers {
	pub embedding: Option<EmbeddingProviderConfig>,
	pub rerank: Option<RerankProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Cohere/Jina-style `/rerank` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub max_page_size: u32,
	pub default_page_size: u32,
	pub candidate_ceiling: u32,
	pub fuzzy_distance: u8,
	pub backend_timeout_ms: u64,
	/// Reranked searches hand the provider this many pages, starting at the requested one.
	pub rerank_pool_factor: u32,
	pub autocomplete: Autocomplete,
	pub similar: Similar,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			max_page_size: 30,
			default_page_size: 10,
			candidate_ceiling: 30,
			fuzzy_distance: 1,
			backend_timeout_ms: 2_000,
			rerank_pool_factor: 3,
			autocomplete: Autocomplete::default(),
			similar: Similar::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Autocomplete {
	/// Inputs shorter than this many characters use prefix matching instead of fuzzy matching.
	pub prefix_threshold: usize,
	pub max_results: u32,
	pub fuzzy_distance: u8,
}
impl Default for Autocomplete {
	fn default() -> Self {
		Self { prefix_threshold: PREFIX_THRESHOLD, max_results: 10, fuzzy_distance: 1 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Similar {
	pub default_count: u32,
}
impl Default for Similar {
	fn default() -> Self {
		Self { default_count: 10 }
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Fusion {
	pub rrf_k: f64,
	pub lexical_weight: f64,
	pub vector_weight: f64,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { rrf_k: 60.0, lexical_weight: 1.0, vector_weight: 1.0 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FusionOverride {
	pub rrf_k: Option<f64>,
	pub lexical_weight: Option<f64>,
	pub vector_weight: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TenantConfig {
	#[serde(default)]
	pub filterable_fields: Vec<String>,
	#[serde(default)]
	pub sortable_fields: Vec<String>,
	pub fusion: Option<FusionOverride>,
}

fn default_log_level() -> String {
	"info".to_string()
}
