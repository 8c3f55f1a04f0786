mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Autocomplete, Config, EmbeddingProviderConfig, Fusion, FusionOverride, PREFIX_THRESHOLD,
	Postgres, Providers, RerankProviderConfig, Search, Service, Similar, Storage, StorageBackend,
	TenantConfig,
};

use std::{collections::HashSet, fs, path::Path, sync::LazyLock};

use regex::Regex;

/// Tenant ids double as Postgres schema names.
pub const TENANT_NAME_PATTERN: &str = r"^[a-z_][a-z0-9_]{0,62}$";

const MAX_FUZZY_DISTANCE: u8 = 2;

static TENANT_NAME: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(TENANT_NAME_PATTERN).ok());

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn tenant_name_is_valid(name: &str) -> bool {
	TENANT_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	validate_storage(cfg)?;
	validate_search(cfg)?;
	validate_fusion(
		"fusion",
		cfg.fusion.rrf_k,
		cfg.fusion.lexical_weight,
		cfg.fusion.vector_weight,
	)?;

	if cfg.tenants.is_empty() {
		return Err(Error::Validation {
			message: "tenants must declare at least one tenant.".to_string(),
		});
	}

	for (name, tenant) in &cfg.tenants {
		validate_tenant(cfg, name, tenant)?;
	}

	Ok(())
}

fn validate_storage(cfg: &Config) -> Result<()> {
	match cfg.storage.backend {
		StorageBackend::Memory => {},
		StorageBackend::Postgres => {
			let Some(postgres) = cfg.storage.postgres.as_ref() else {
				return Err(Error::Validation {
					message: "storage.postgres is required when storage.backend is postgres."
						.to_string(),
				});
			};

			if postgres.dsn.trim().is_empty() {
				return Err(Error::Validation {
					message: "storage.postgres.dsn must be non-empty.".to_string(),
				});
			}
			if postgres.pool_max_conns == 0 {
				return Err(Error::Validation {
					message: "storage.postgres.pool_max_conns must be greater than zero."
						.to_string(),
				});
			}
			if postgres.vector_dim == 0 {
				return Err(Error::Validation {
					message: "storage.postgres.vector_dim must be greater than zero.".to_string(),
				});
			}
		},
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.api_key must be non-empty.".to_string(),
			});
		}
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if let Some(postgres) = cfg.storage.postgres.as_ref()
			&& cfg.storage.backend == StorageBackend::Postgres
			&& postgres.vector_dim != embedding.dimensions
		{
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.postgres.vector_dim."
					.to_string(),
			});
		}
	}
	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		if rerank.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.rerank.api_key must be non-empty.".to_string(),
			});
		}
		if rerank.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.rerank.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_search(cfg: &Config) -> Result<()> {
	let search = &cfg.search;

	if search.max_page_size == 0 {
		return Err(Error::Validation {
			message: "search.max_page_size must be greater than zero.".to_string(),
		});
	}
	if search.default_page_size == 0 || search.default_page_size > search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must be between 1 and search.max_page_size."
				.to_string(),
		});
	}
	if search.candidate_ceiling == 0 {
		return Err(Error::Validation {
			message: "search.candidate_ceiling must be greater than zero.".to_string(),
		});
	}
	if search.backend_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.backend_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if search.rerank_pool_factor == 0 {
		return Err(Error::Validation {
			message: "search.rerank_pool_factor must be greater than zero.".to_string(),
		});
	}

	for (label, distance) in [
		("search.fuzzy_distance", search.fuzzy_distance),
		("search.autocomplete.fuzzy_distance", search.autocomplete.fuzzy_distance),
	] {
		if distance > MAX_FUZZY_DISTANCE {
			return Err(Error::Validation {
				message: format!("{label} must be {MAX_FUZZY_DISTANCE} or less."),
			});
		}
	}

	if search.autocomplete.prefix_threshold == 0 {
		return Err(Error::Validation {
			message: "search.autocomplete.prefix_threshold must be greater than zero.".to_string(),
		});
	}
	if search.autocomplete.max_results == 0 {
		return Err(Error::Validation {
			message: "search.autocomplete.max_results must be greater than zero.".to_string(),
		});
	}
	if search.similar.default_count == 0 || search.similar.default_count > search.max_page_size {
		return Err(Error::Validation {
			message: "search.similar.default_count must be between 1 and search.max_page_size."
				.to_string(),
		});
	}

	Ok(())
}

fn validate_fusion(label: &str, rrf_k: f64, lexical_weight: f64, vector_weight: f64) -> Result<()> {
	for (key, value) in
		[("rrf_k", rrf_k), ("lexical_weight", lexical_weight), ("vector_weight", vector_weight)]
	{
		if !value.is_finite() {
			return Err(Error::Validation {
				message: format!("{label}.{key} must be a finite number."),
			});
		}
		if value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label}.{key} must be zero or greater."),
			});
		}
	}

	Ok(())
}

fn validate_tenant(cfg: &Config, name: &str, tenant: &TenantConfig) -> Result<()> {
	if !tenant_name_is_valid(name) {
		return Err(Error::Validation {
			message: format!(
				"tenants.{name} is not a valid tenant name; expected pattern {TENANT_NAME_PATTERN}."
			),
		});
	}

	for (label, fields) in [
		("filterable_fields", &tenant.filterable_fields),
		("sortable_fields", &tenant.sortable_fields),
	] {
		if fields.iter().any(|field| field.is_empty()) {
			return Err(Error::Validation {
				message: format!("tenants.{name}.{label} must not contain empty names."),
			});
		}
	}

	let fusion = cfg.fusion_for(tenant);

	validate_fusion(
		&format!("tenants.{name}.fusion"),
		fusion.rrf_k,
		fusion.lexical_weight,
		fusion.vector_weight,
	)
}

fn normalize(cfg: &mut Config) {
	if cfg
		.storage
		.catalog_path
		.as_deref()
		.map(|path| path.as_os_str().is_empty())
		.unwrap_or(false)
	{
		cfg.storage.catalog_path = None;
	}

	for tenant in cfg.tenants.values_mut() {
		dedup_trimmed(&mut tenant.filterable_fields);
		dedup_trimmed(&mut tenant.sortable_fields);
	}
}

fn dedup_trimmed(fields: &mut Vec<String>) {
	let mut seen = HashSet::new();

	fields.retain_mut(|field| {
		*field = field.trim().to_string();

		seen.insert(field.clone())
	});
}
