use std::collections::HashMap;

use crate::{Error, FieldKind, FilterSet, Result, SortSpec};

#[derive(Clone, Debug, Default)]
struct TenantFields {
	filterable: Vec<String>,
	sortable: Vec<String>,
}

/// Per-tenant allow-lists of attribute names that requests may filter or sort on.
#[derive(Clone, Debug, Default)]
pub struct FieldRegistry {
	tenants: HashMap<String, TenantFields>,
}
impl FieldRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(
		&mut self,
		tenant_id: impl Into<String>,
		filterable: Vec<String>,
		sortable: Vec<String>,
	) {
		self.tenants.insert(tenant_id.into(), TenantFields { filterable, sortable });
	}

	pub fn contains_tenant(&self, tenant_id: &str) -> bool {
		self.tenants.contains_key(tenant_id)
	}

	pub fn validate_filter(&self, tenant_id: &str, field: &str) -> Result<()> {
		let fields = self.fields(tenant_id)?;

		check(FieldKind::Filter, field, &fields.filterable)
	}

	pub fn validate_sort(&self, tenant_id: &str, field: &str) -> Result<()> {
		let fields = self.fields(tenant_id)?;

		check(FieldKind::Sort, field, &fields.sortable)
	}

	/// Validates every condition field and the sort field, in request order.
	pub fn validate_request(
		&self,
		tenant_id: &str,
		filters: &FilterSet,
		sort: Option<&SortSpec>,
	) -> Result<()> {
		for condition in &filters.conditions {
			self.validate_filter(tenant_id, &condition.field)?;
		}

		if let Some(sort) = sort {
			self.validate_sort(tenant_id, &sort.field)?;
		}

		Ok(())
	}

	fn fields(&self, tenant_id: &str) -> Result<&TenantFields> {
		self.tenants
			.get(tenant_id)
			.ok_or_else(|| Error::UnknownTenant { tenant_id: tenant_id.to_string() })
	}
}

fn check(kind: FieldKind, field: &str, allowed: &[String]) -> Result<()> {
	if allowed.iter().any(|name| name == field) {
		return Ok(());
	}

	Err(Error::UnknownField { kind, field: field.to_string(), allowed: allowed.to_vec() })
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::{FilterCondition, FilterOp};

	fn registry() -> FieldRegistry {
		let mut registry = FieldRegistry::new();

		registry.register(
			"acme",
			vec!["category".to_string(), "price".to_string()],
			vec!["price".to_string()],
		);
		registry.register("docs", vec!["foo".to_string()], Vec::new());

		registry
	}

	#[test]
	fn unknown_filter_field_lists_allowlist() {
		let err = registry().validate_filter("acme", "foo").expect_err("expected unknown field");

		assert_eq!(
			err,
			Error::UnknownField {
				kind: FieldKind::Filter,
				field: "foo".to_string(),
				allowed: vec!["category".to_string(), "price".to_string()],
			}
		);

		let message = err.to_string();

		assert!(message.contains("category"), "{message}");
		assert!(message.contains("price"), "{message}");
	}

	#[test]
	fn allow_lists_are_tenant_scoped() {
		let registry = registry();

		assert!(registry.validate_filter("docs", "foo").is_ok());
		assert!(registry.validate_filter("acme", "foo").is_err());
		assert!(registry.validate_sort("acme", "price").is_ok());
		assert!(registry.validate_sort("acme", "category").is_err());
	}

	#[test]
	fn unknown_tenant_is_rejected() {
		let err = registry().validate_sort("ghost", "price").expect_err("expected unknown tenant");

		assert_eq!(err, Error::UnknownTenant { tenant_id: "ghost".to_string() });
	}

	#[test]
	fn validate_request_checks_sort_after_filters() {
		let filters = FilterSet::all(vec![FilterCondition::new(
			"category",
			FilterOp::Eq,
			json!("shoes"),
		)]);
		let err = registry()
			.validate_request("acme", &filters, Some(&SortSpec::asc("rating")))
			.expect_err("expected unknown sort field");

		assert!(matches!(err, Error::UnknownField { kind: FieldKind::Sort, .. }));
	}
}
