use sift_domain::FieldKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown {kind} field '{field}'. Allowed fields: {}.", .allowed.join(", "))]
	UnknownField { kind: FieldKind, field: String, allowed: Vec<String> },
	#[error("Type mismatch at {path}: {message}")]
	TypeMismatch { path: String, message: String },
	#[error("Reference item '{item_id}' was not found.")]
	ReferenceNotFound { item_id: String },
	#[error("The {backend} backend did not answer within {timeout_ms} ms.")]
	BackendTimeout { backend: &'static str, timeout_ms: u64 },
	#[error("Backend unavailable: {message}")]
	BackendUnavailable { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Tenant '{tenant_id}' is not configured.")]
	UnknownTenant { tenant_id: String },
}

impl From<sift_domain::Error> for Error {
	fn from(err: sift_domain::Error) -> Self {
		match err {
			sift_domain::Error::UnknownField { kind, field, allowed } =>
				Self::UnknownField { kind, field, allowed },
			sift_domain::Error::TypeMismatch { path, message } =>
				Self::TypeMismatch { path, message },
			sift_domain::Error::InvalidFilter { path, message } =>
				Self::InvalidRequest { message: format!("{path}: {message}") },
			sift_domain::Error::UnknownTenant { tenant_id } => Self::UnknownTenant { tenant_id },
		}
	}
}

impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Domain(inner) => inner.into(),
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			sift_storage::Error::Sqlx(inner) =>
				Self::BackendUnavailable { message: inner.to_string() },
			sift_storage::Error::Tantivy(inner) =>
				Self::BackendUnavailable { message: inner.to_string() },
			sift_storage::Error::Unavailable(message) => Self::BackendUnavailable { message },
			other @ sift_storage::Error::Catalog { .. } =>
				Self::BackendUnavailable { message: other.to_string() },
		}
	}
}
