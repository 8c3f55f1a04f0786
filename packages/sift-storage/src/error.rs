#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Tantivy(#[from] tantivy::TantivyError),
	#[error(transparent)]
	Domain(#[from] sift_domain::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Catalog {path}: {message}")]
	Catalog { path: String, message: String },
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
}
