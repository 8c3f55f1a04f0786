use std::fmt::{Display, Formatter};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	Filter,
	Sort,
}
impl FieldKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Filter => "filter",
			Self::Sort => "sort",
		}
	}
}
impl Display for FieldKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("{kind} field '{field}' is not in allowlist: {}", .allowed.join(", "))]
	UnknownField { kind: FieldKind, field: String, allowed: Vec<String> },
	#[error("{path}: {message}")]
	TypeMismatch { path: String, message: String },
	#[error("{path}: {message}")]
	InvalidFilter { path: String, message: String },
	#[error("Tenant '{tenant_id}' is not configured.")]
	UnknownTenant { tenant_id: String },
}
