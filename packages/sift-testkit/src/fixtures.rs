//! Small catalogs and configs shared by integration tests.

use std::collections::HashMap;

use serde_json::{Value, json};

use sift_config::{
	Config, Fusion, Providers, Search, Service, Storage, StorageBackend, TenantConfig,
};
use sift_domain::Item;

pub const SHOP: &str = "acme";
pub const DOCS: &str = "docs";

pub type Row<'a> = (&'a str, &'a str, Value, Option<[f32; 3]>);

/// Three-dimensional embeddings keep cosine distances easy to reason about.
pub fn catalog() -> Vec<(String, Item)> {
	let shop: [Row; 7] = [
		(
			"p1",
			"Trail Runner Shoe",
			json!({ "category": "shoes", "price": 120 }),
			Some([1.0, 0.0, 0.0]),
		),
		(
			"p2",
			"Road Running Shoe",
			json!({ "category": "shoes", "price": 90 }),
			Some([0.9, 0.1, 0.0]),
		),
		(
			"p3",
			"Leather Sandal",
			json!({ "category": "shoes", "price": 60 }),
			Some([0.5, 0.5, 0.0]),
		),
		(
			"p4",
			"Canvas Tote Bag",
			json!({ "category": "bags", "price": 35 }),
			Some([0.0, 1.0, 0.0]),
		),
		(
			"p5",
			"Hiking Backpack",
			json!({ "category": "bags", "price": 150 }),
			Some([0.2, 0.8, 0.1]),
		),
		("p6", "Wool Beanie", json!({ "category": "hats", "price": 25 }), Some([0.0, 0.0, 1.0])),
		("p7", "Sun Hat", json!({ "category": "hats" }), None),
	];
	let docs: [Row; 2] = [
		("d1", "Shoe care guide", json!({ "category": "guides" }), Some([1.0, 0.0, 0.0])),
		("d2", "Returns policy", json!({ "category": "policies" }), Some([0.0, 1.0, 0.0])),
	];

	shop.into_iter()
		.map(|row| (SHOP.to_string(), item(row)))
		.chain(docs.into_iter().map(|row| (DOCS.to_string(), item(row))))
		.collect()
}

pub fn item((id, title, attributes, embedding): Row) -> Item {
	let mut item = Item::new(id, title);

	item.attributes = attributes.as_object().cloned().unwrap_or_default();
	item.embedding = embedding.map(|values| values.to_vec());
	item.media_ref = Some(format!("https://cdn.example.test/{id}.jpg"));
	item.normalize();

	item
}

pub fn config() -> Config {
	let mut tenants = HashMap::new();

	tenants.insert(
		SHOP.to_string(),
		TenantConfig {
			filterable_fields: vec!["category".to_string(), "price".to_string()],
			sortable_fields: vec!["price".to_string()],
			fusion: None,
		},
	);
	tenants.insert(
		DOCS.to_string(),
		TenantConfig {
			filterable_fields: vec!["category".to_string()],
			sortable_fields: Vec::new(),
			fusion: None,
		},
	);

	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage { backend: StorageBackend::Memory, catalog_path: None, postgres: None },
		providers: Providers::default(),
		search: Search::default(),
		fusion: Fusion { rrf_k: 60.0, lexical_weight: 0.5, vector_weight: 0.5 },
		tenants,
	}
}
