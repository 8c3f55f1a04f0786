use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, Error, RerankProvider, Result};
use sift_config::RerankProviderConfig;

/// Cohere/Jina-compatible `/rerank` endpoint.
pub struct HttpRerank {
	cfg: RerankProviderConfig,
	client: Client,
}
impl HttpRerank {
	pub fn new(cfg: RerankProviderConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.build()?;

		Ok(Self { cfg, client })
	}
}

impl RerankProvider for HttpRerank {
	fn rerank<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { rerank(&self.client, &self.cfg, query, docs).await })
	}
}

async fn rerank(
	client: &Client,
	cfg: &RerankProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	if docs.is_empty() {
		return Ok(Vec::new());
	}

	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_n": docs.len(),
	});
	let res = client.post(url).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;
	let scores = parse_rerank_response(json, docs.len())?;

	tracing::debug!(provider_id = %cfg.provider_id, documents = docs.len(), "Reranked documents.");

	Ok(scores)
}

/// Scores aligned with the submitted documents. Documents the provider left out score 0.
fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank response is missing results array.".to_string(),
		})?;
	let mut scores = vec![0.0_f32; doc_count];

	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Rerank result missing score.".to_string(),
			})? as f32;

		if index >= doc_count {
			return Err(Error::InvalidResponse {
				message: format!("Rerank result index {index} is out of range for {doc_count}."),
			});
		}

		scores[index] = score;
	}

	Ok(scores)
}
