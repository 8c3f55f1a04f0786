use crate::{Error, Result};

/// `1 - cos(a, b)`; `None` when dimensions differ or either vector has zero norm.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.len() != b.len() || a.is_empty() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rejects a query vector that cannot be compared with the stored embeddings.
pub fn validate_query(embedding: &[f32], dimensions: Option<usize>) -> Result<()> {
	if let Some(expected) = dimensions
		&& embedding.len() != expected
	{
		return Err(Error::InvalidArgument(format!(
			"embedding has {} dimensions, expected {expected}.",
			embedding.len()
		)));
	}
	if embedding.iter().any(|value| !value.is_finite()) {
		return Err(Error::InvalidArgument("embedding values must be finite.".to_string()));
	}
	if embedding.iter().all(|value| *value == 0.0) {
		return Err(Error::InvalidArgument("embedding must have a non-zero norm.".to_string()));
	}

	Ok(())
}

/// Renders a vector in pgvector's text input format.
pub fn to_pg_vector(values: &[f32]) -> String {
	let mut out = String::with_capacity(values.len() * 8 + 2);

	out.push('[');

	for (idx, value) in values.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn parse_pg_vector(text: &str) -> Option<Vec<f32>> {
	let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;

	if inner.trim().is_empty() {
		return Some(Vec::new());
	}

	inner.split(',').map(|part| part.trim().parse::<f32>().ok()).collect()
}
