pub mod embedding;
pub mod rerank;

mod error;

pub use embedding::HttpEmbedding;
pub use rerank::HttpRerank;
pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns query text into vectors for semantic retrieval.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn dimensions(&self) -> u32;
}

/// Scores documents against a query. Scores are aligned with `docs`; higher is more relevant.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
