//! JSON Lines catalogs: one object per line, each carrying its `tenant` next to the item fields.

use std::{fs, path::Path};

use serde::Deserialize;

use sift_domain::Item;

use crate::{Error, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogRecord {
	pub tenant: String,
	#[serde(flatten)]
	pub item: Item,
}

pub fn load(path: &Path) -> Result<Vec<CatalogRecord>> {
	let origin = path.display().to_string();
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Catalog { path: origin.clone(), message: err.to_string() })?;

	parse(&raw, &origin)
}

/// Blank lines and lines starting with `#` are skipped.
pub fn parse(raw: &str, origin: &str) -> Result<Vec<CatalogRecord>> {
	let mut records = Vec::new();

	for (idx, line) in raw.lines().enumerate() {
		let trimmed = line.trim();

		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}

		let at = || format!("{origin}:{}", idx + 1);
		let record: CatalogRecord = serde_json::from_str(trimmed)
			.map_err(|err| Error::Catalog { path: at(), message: err.to_string() })?;

		if !sift_config::tenant_name_is_valid(&record.tenant) {
			return Err(Error::Catalog {
				path: at(),
				message: format!("invalid tenant name '{}'.", record.tenant),
			});
		}
		if record.item.id.trim().is_empty() {
			return Err(Error::Catalog {
				path: at(),
				message: "item id must be non-empty.".to_string(),
			});
		}

		records.push(record);
	}

	Ok(records)
}
