use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_RELATED_EXCERPTS: usize = 5;

const SEARCHABLE_ATTRIBUTES: [&str; 4] = ["description", "brand", "category", "tags"];

/// A retrievable record within one tenant partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
	pub id: String,
	pub title: String,
	#[serde(default)]
	pub attributes: Map<String, Value>,
	#[serde(default)]
	pub searchable_text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub media_ref: Option<String>,
	#[serde(default)]
	pub summary: Option<Value>,
	/// Most relevant first.
	#[serde(default)]
	pub related_excerpts: Vec<String>,
}
impl Item {
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			attributes: Map::new(),
			searchable_text: String::new(),
			embedding: None,
			media_ref: None,
			summary: None,
			related_excerpts: Vec::new(),
		}
	}

	pub fn attribute(&self, field: &str) -> Option<&Value> {
		self.attributes.get(field)
	}

	/// Caps excerpts and fills `searchable_text` from the title and descriptive attributes when
	/// the record carries none.
	pub fn normalize(&mut self) {
		self.related_excerpts.truncate(MAX_RELATED_EXCERPTS);

		if self.searchable_text.trim().is_empty() {
			self.searchable_text = self.derive_searchable_text();
		}
	}

	pub fn derive_searchable_text(&self) -> String {
		let mut parts = Vec::new();

		if !self.title.trim().is_empty() {
			parts.push(self.title.trim().to_string());
		}

		for key in SEARCHABLE_ATTRIBUTES {
			match self.attributes.get(key) {
				Some(Value::String(text)) if !text.trim().is_empty() =>
					parts.push(text.trim().to_string()),
				Some(Value::Array(values)) => parts.extend(
					values.iter().filter_map(Value::as_str).map(|text| text.trim().to_string()),
				),
				Some(Value::Number(number)) => parts.push(number.to_string()),
				_ => {},
			}
		}

		parts.join(" ")
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn normalize_caps_excerpts() {
		let mut item = Item::new("p1", "Trail shoe");

		item.searchable_text = "trail".to_string();
		item.related_excerpts = (0..8).map(|i| format!("excerpt {i}")).collect();
		item.normalize();

		assert_eq!(item.related_excerpts.len(), MAX_RELATED_EXCERPTS);
		assert_eq!(item.related_excerpts[0], "excerpt 0");
		assert_eq!(item.searchable_text, "trail");
	}

	#[test]
	fn derives_searchable_text_from_attributes() {
		let mut item = Item::new("p1", "Trail shoe");

		item.attributes = json!({
			"brand": "Peak",
			"category": "footwear",
			"tags": ["running", "outdoor"],
			"price": 120
		})
		.as_object()
		.cloned()
		.expect("object");
		item.normalize();

		assert_eq!(item.searchable_text, "Trail shoe Peak footwear running outdoor");
	}

	#[test]
	fn deserializes_with_defaults() {
		let item: Item = serde_json::from_value(json!({ "id": "p1", "title": "Mug" }))
			.expect("Failed to parse item.");

		assert!(item.attributes.is_empty());
		assert!(item.embedding.is_none());
		assert!(item.related_excerpts.is_empty());
	}
}
