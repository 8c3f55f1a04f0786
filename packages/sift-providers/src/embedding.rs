use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, EmbeddingProvider, Error, Result};
use sift_config::EmbeddingProviderConfig;

/// OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedding {
	cfg: EmbeddingProviderConfig,
	client: Client,
}
impl HttpEmbedding {
	pub fn new(cfg: EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.build()?;

		Ok(Self { cfg, client })
	}
}

impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { embed(&self.client, &self.cfg, texts).await })
	}

	fn dimensions(&self) -> u32 {
		self.cfg.dimensions
	}
}

async fn embed(
	client: &Client,
	cfg: &EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client.post(url).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	if vectors.len() != texts.len() {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider {} returned {} vectors for {} inputs.",
				cfg.provider_id,
				vectors.len(),
				texts.len()
			),
		});
	}

	if let Some(bad) = vectors.iter().find(|vec| vec.len() != cfg.dimensions as usize) {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider {} returned {} dimensions; expected {}.",
				cfg.provider_id,
				bad.len(),
				cfg.dimensions
			),
		});
	}

	tracing::debug!(provider_id = %cfg.provider_id, inputs = texts.len(), "Embedded query text.");

	Ok(vectors)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let vec = embedding
			.iter()
			.map(|value| {
				value.as_f64().map(|number| number as f32).ok_or_else(|| Error::InvalidResponse {
					message: "Embedding value must be numeric.".to_string(),
				})
			})
			.collect::<Result<Vec<_>>>()?;

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "embedding": ["x"] }] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn rejects_missing_data() {
		assert!(parse_embedding_response(serde_json::json!({})).is_err());
	}
}
