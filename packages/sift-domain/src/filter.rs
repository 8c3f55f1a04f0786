use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

pub const MAX_CONDITIONS: usize = 128;
pub const MAX_IN_LIST_ITEMS: usize = 128;
pub const MAX_STRING_BYTES: usize = 512;

const CONDITIONS_PATH: &str = "$.filters.conditions";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
	Eq,
	Neq,
	Gt,
	Gte,
	Lt,
	Lte,
	In,
}
impl FilterOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "eq",
			Self::Neq => "neq",
			Self::Gt => "gt",
			Self::Gte => "gte",
			Self::Lt => "lt",
			Self::Lte => "lte",
			Self::In => "in",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
	pub field: String,
	pub operator: FilterOp,
	pub value: Value,
}
impl FilterCondition {
	pub fn new(field: impl Into<String>, operator: FilterOp, value: Value) -> Self {
		Self { field: field.into(), operator, value }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
	#[default]
	And,
	Or,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
	#[serde(default)]
	pub conditions: Vec<FilterCondition>,
	#[serde(default)]
	pub combine: Combine,
}
impl FilterSet {
	pub fn all(conditions: Vec<FilterCondition>) -> Self {
		Self { conditions, combine: Combine::And }
	}

	pub fn any(conditions: Vec<FilterCondition>) -> Self {
		Self { conditions, combine: Combine::Or }
	}

	pub fn is_empty(&self) -> bool {
		self.conditions.is_empty()
	}
}

/// A typed comparison operand for `eq`, `neq` and `in`.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
	Bool(bool),
	Number(f64),
	String(String),
}
impl Scalar {
	fn parse(path: &str, value: &Value) -> Result<Self> {
		match value {
			Value::Bool(flag) => Ok(Self::Bool(*flag)),
			Value::Number(number) => number.as_f64().map(Self::Number).ok_or_else(|| {
				Error::TypeMismatch {
					path: path.to_string(),
					message: "number is not representable as f64.".to_string(),
				}
			}),
			Value::String(text) => {
				check_string_len(path, text)?;

				Ok(Self::String(text.clone()))
			},
			other => Err(Error::TypeMismatch {
				path: path.to_string(),
				message: format!("expected a string, number or boolean, got {}.", kind_of(other)),
			}),
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::Bool(flag) => Value::Bool(*flag),
			Self::Number(number) => serde_json::json!(number),
			Self::String(text) => Value::String(text.clone()),
		}
	}

	fn matches(&self, stored: &Value) -> bool {
		match (self, stored) {
			(Self::Bool(expected), Value::Bool(actual)) => expected == actual,
			(Self::Number(expected), Value::Number(actual)) => actual.as_f64() == Some(*expected),
			(Self::String(expected), Value::String(actual)) => expected == actual,
			_ => false,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeOp {
	Gt,
	Gte,
	Lt,
	Lte,
}
impl RangeOp {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Gt => ">",
			Self::Gte => ">=",
			Self::Lt => "<",
			Self::Lte => "<=",
		}
	}

	fn accepts(self, ordering: Ordering) -> bool {
		match self {
			Self::Gt => ordering == Ordering::Greater,
			Self::Gte => ordering != Ordering::Less,
			Self::Lt => ordering == Ordering::Less,
			Self::Lte => ordering != Ordering::Greater,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
	Number(f64),
	String(String),
}
impl Bound {
	fn kind(&self) -> &'static str {
		match self {
			Self::Number(_) => "number",
			Self::String(_) => "string",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
	Eq { field: String, value: Scalar },
	Neq { field: String, value: Scalar },
	Range { field: String, op: RangeOp, bound: Bound },
	In { field: String, values: Vec<Scalar> },
}
impl Clause {
	pub fn field(&self) -> &str {
		match self {
			Self::Eq { field, .. }
			| Self::Neq { field, .. }
			| Self::Range { field, .. }
			| Self::In { field, .. } => field,
		}
	}

	fn compile(index: usize, condition: &FilterCondition) -> Result<Self> {
		let base = format!("{CONDITIONS_PATH}[{index}]");
		let value_path = format!("{base}.value");

		if condition.field.trim().is_empty() {
			return Err(Error::InvalidFilter {
				path: format!("{base}.field"),
				message: "field must be non-empty.".to_string(),
			});
		}

		let field = condition.field.clone();

		match condition.operator {
			FilterOp::Eq =>
				Ok(Self::Eq { field, value: Scalar::parse(&value_path, &condition.value)? }),
			FilterOp::Neq =>
				Ok(Self::Neq { field, value: Scalar::parse(&value_path, &condition.value)? }),
			FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
				let op = match condition.operator {
					FilterOp::Gt => RangeOp::Gt,
					FilterOp::Gte => RangeOp::Gte,
					FilterOp::Lt => RangeOp::Lt,
					_ => RangeOp::Lte,
				};
				let bound = match &condition.value {
					Value::Number(number) => match number.as_f64() {
						Some(number) => Bound::Number(number),
						None =>
							return Err(Error::TypeMismatch {
								path: value_path,
								message: "number is not representable as f64.".to_string(),
							}),
					},
					Value::String(text) => {
						check_string_len(&value_path, text)?;

						Bound::String(text.clone())
					},
					other =>
						return Err(Error::TypeMismatch {
							path: value_path,
							message: format!(
								"{} requires a number or string bound, got {}.",
								condition.operator.as_str(),
								kind_of(other)
							),
						}),
				};

				Ok(Self::Range { field, op, bound })
			},
			FilterOp::In => {
				let Value::Array(raw) = &condition.value else {
					return Err(Error::TypeMismatch {
						path: value_path,
						message: format!(
							"in requires an array of scalars, got {}.",
							kind_of(&condition.value)
						),
					});
				};

				if raw.is_empty() {
					return Err(Error::InvalidFilter {
						path: value_path,
						message: "in requires at least one value.".to_string(),
					});
				}
				if raw.len() > MAX_IN_LIST_ITEMS {
					return Err(Error::InvalidFilter {
						path: value_path,
						message: format!("in accepts at most {MAX_IN_LIST_ITEMS} values."),
					});
				}

				let values = raw
					.iter()
					.enumerate()
					.map(|(i, value)| Scalar::parse(&format!("{value_path}[{i}]"), value))
					.collect::<Result<Vec<_>>>()?;

				Ok(Self::In { field, values })
			},
		}
	}

	fn evaluate(&self, attributes: &Map<String, Value>) -> Result<bool> {
		let stored = attributes.get(self.field()).filter(|value| !value.is_null());

		match self {
			Self::Eq { value, .. } => Ok(stored.is_some_and(|stored| value.matches(stored))),
			Self::Neq { value, .. } => Ok(!stored.is_some_and(|stored| value.matches(stored))),
			Self::In { values, .. } =>
				Ok(stored.is_some_and(|stored| values.iter().any(|value| value.matches(stored)))),
			Self::Range { field, op, bound } => {
				let Some(stored) = stored else {
					return Ok(false);
				};
				let ordering = match (bound, stored) {
					(Bound::Number(bound), Value::Number(actual)) =>
						actual.as_f64().and_then(|actual| actual.partial_cmp(bound)),
					(Bound::String(bound), Value::String(actual)) =>
						Some(actual.as_str().cmp(bound.as_str())),
					_ => None,
				};
				let Some(ordering) = ordering else {
					return Err(Error::TypeMismatch {
						path: format!("$.attributes.{field}"),
						message: format!(
							"stored {} cannot be compared with a {} bound.",
							kind_of(stored),
							bound.kind()
						),
					});
				};

				Ok(op.accepts(ordering))
			},
		}
	}
}

/// A compiled filter set, evaluated in-process or pushed down by a store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
	combine: Combine,
	clauses: Vec<Clause>,
}
impl Predicate {
	pub fn always() -> Self {
		Self::default()
	}

	/// Field names must already have passed the tenant's registry.
	pub fn compile(set: &FilterSet) -> Result<Self> {
		if set.conditions.len() > MAX_CONDITIONS {
			return Err(Error::InvalidFilter {
				path: CONDITIONS_PATH.to_string(),
				message: format!("at most {MAX_CONDITIONS} conditions are allowed."),
			});
		}

		let clauses = set
			.conditions
			.iter()
			.enumerate()
			.map(|(index, condition)| Clause::compile(index, condition))
			.collect::<Result<Vec<_>>>()?;

		Ok(Self { combine: set.combine, clauses })
	}

	pub fn combine(&self) -> Combine {
		self.combine
	}

	pub fn clauses(&self) -> &[Clause] {
		&self.clauses
	}

	pub fn is_always(&self) -> bool {
		self.clauses.is_empty()
	}

	/// Every clause is evaluated so a type mismatch surfaces regardless of clause order.
	pub fn evaluate(&self, attributes: &Map<String, Value>) -> Result<bool> {
		if self.clauses.is_empty() {
			return Ok(true);
		}

		let mut matched = 0;

		for clause in &self.clauses {
			if clause.evaluate(attributes)? {
				matched += 1;
			}
		}

		Ok(match self.combine {
			Combine::And => matched == self.clauses.len(),
			Combine::Or => matched > 0,
		})
	}
}

fn check_string_len(path: &str, text: &str) -> Result<()> {
	if text.len() > MAX_STRING_BYTES {
		return Err(Error::InvalidFilter {
			path: path.to_string(),
			message: format!("string values are limited to {MAX_STRING_BYTES} bytes."),
		});
	}

	Ok(())
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn attrs(value: Value) -> Map<String, Value> {
		value.as_object().cloned().expect("attributes must be an object")
	}

	fn cond(field: &str, operator: FilterOp, value: Value) -> FilterCondition {
		FilterCondition::new(field, operator, value)
	}

	#[test]
	fn and_requires_every_condition() {
		let predicate = Predicate::compile(&FilterSet::all(vec![
			cond("category", FilterOp::Eq, json!("shoes")),
			cond("price", FilterOp::Lt, json!(100)),
		]))
		.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "category": "shoes", "price": 80 }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "category": "shoes", "price": 120 }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "category": "bags", "price": 80 }))).unwrap());
	}

	#[test]
	fn or_requires_any_condition() {
		let predicate = Predicate::compile(&FilterSet::any(vec![
			cond("category", FilterOp::Eq, json!("shoes")),
			cond("price", FilterOp::Lt, json!(100)),
		]))
		.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "category": "bags", "price": 80 }))).unwrap());
		assert!(predicate.evaluate(&attrs(json!({ "category": "shoes", "price": 500 }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "category": "bags", "price": 500 }))).unwrap());
	}

	#[test]
	fn empty_set_is_always_true() {
		let predicate = Predicate::compile(&FilterSet::any(Vec::new())).expect("compile");

		assert!(predicate.is_always());
		assert!(predicate.evaluate(&Map::new()).unwrap());
	}

	#[test]
	fn numbers_compare_numerically() {
		let predicate =
			Predicate::compile(&FilterSet::all(vec![cond("price", FilterOp::Eq, json!(5))]))
				.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "price": 5.0 }))).unwrap());

		let predicate =
			Predicate::compile(&FilterSet::all(vec![cond("price", FilterOp::Gte, json!(9.5))]))
				.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "price": 10 }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "price": 9 }))).unwrap());
	}

	#[test]
	fn strings_compare_lexicographically() {
		let predicate =
			Predicate::compile(&FilterSet::all(vec![cond("sku", FilterOp::Gt, json!("b"))]))
				.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "sku": "c1" }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "sku": "a9" }))).unwrap());
	}

	#[test]
	fn missing_attribute_semantics() {
		let empty = Map::new();

		for (operator, value, expected) in [
			(FilterOp::Eq, json!("x"), false),
			(FilterOp::Neq, json!("x"), true),
			(FilterOp::Gt, json!(1), false),
			(FilterOp::Lte, json!("m"), false),
			(FilterOp::In, json!(["x"]), false),
		] {
			let predicate =
				Predicate::compile(&FilterSet::all(vec![cond("color", operator, value)]))
					.expect("compile");

			assert_eq!(predicate.evaluate(&empty).unwrap(), expected, "{}", operator.as_str());
		}
	}

	#[test]
	fn in_matches_any_listed_scalar() {
		let predicate = Predicate::compile(&FilterSet::all(vec![cond(
			"size",
			FilterOp::In,
			json!(["m", "l", 42]),
		)]))
		.expect("compile");

		assert!(predicate.evaluate(&attrs(json!({ "size": "l" }))).unwrap());
		assert!(predicate.evaluate(&attrs(json!({ "size": 42.0 }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "size": "s" }))).unwrap());
		assert!(!predicate.evaluate(&attrs(json!({ "size": ["m"] }))).unwrap());
	}

	#[test]
	fn range_against_incompatible_stored_value_is_type_mismatch() {
		let predicate =
			Predicate::compile(&FilterSet::all(vec![cond("price", FilterOp::Gt, json!(10))]))
				.expect("compile");
		let err = predicate
			.evaluate(&attrs(json!({ "price": "cheap" })))
			.expect_err("expected type mismatch");

		assert!(matches!(
			err,
			Error::TypeMismatch { ref path, .. } if path == "$.attributes.price"
		));
	}

	#[test]
	fn or_still_reports_type_mismatch_after_a_match() {
		let predicate = Predicate::compile(&FilterSet::any(vec![
			cond("category", FilterOp::Eq, json!("shoes")),
			cond("price", FilterOp::Gt, json!(10)),
		]))
		.expect("compile");

		assert!(
			predicate.evaluate(&attrs(json!({ "category": "shoes", "price": true }))).is_err()
		);
	}

	#[test]
	fn compile_rejects_bad_values_with_paths() {
		let err = Predicate::compile(&FilterSet::all(vec![
			cond("category", FilterOp::Eq, json!("shoes")),
			cond("price", FilterOp::Gt, json!(true)),
		]))
		.expect_err("expected type mismatch");

		assert_eq!(
			err,
			Error::TypeMismatch {
				path: "$.filters.conditions[1].value".to_string(),
				message: "gt requires a number or string bound, got boolean.".to_string(),
			}
		);

		let err = Predicate::compile(&FilterSet::all(vec![cond(
			"category",
			FilterOp::Eq,
			json!(["a"]),
		)]))
		.expect_err("expected type mismatch");

		assert!(matches!(err, Error::TypeMismatch { .. }));

		let err = Predicate::compile(&FilterSet::all(vec![cond(
			"category",
			FilterOp::In,
			json!(["a", { "b": 1 }]),
		)]))
		.expect_err("expected type mismatch");

		assert!(matches!(
			err,
			Error::TypeMismatch { ref path, .. } if path == "$.filters.conditions[0].value[1]"
		));
	}

	#[test]
	fn compile_enforces_limits() {
		let err = Predicate::compile(&FilterSet::all(vec![cond("size", FilterOp::In, json!([]))]))
			.expect_err("expected invalid filter");

		assert!(matches!(err, Error::InvalidFilter { .. }));

		let many = Value::Array((0..=MAX_IN_LIST_ITEMS).map(|i| json!(i)).collect());

		let too_many = FilterSet::all(vec![cond("size", FilterOp::In, many)]);

		assert!(Predicate::compile(&too_many).is_err());

		let long = json!("x".repeat(MAX_STRING_BYTES + 1));
		let too_long = FilterSet::all(vec![cond("name", FilterOp::Eq, long)]);

		assert!(Predicate::compile(&too_long).is_err());
	}

	#[test]
	fn filter_set_deserializes_from_wire_shape() {
		let set: FilterSet = serde_json::from_value(json!({
			"combine": "or",
			"conditions": [{ "field": "price", "operator": "lte", "value": 50 }]
		}))
		.expect("Failed to parse filter set.");

		assert_eq!(set.combine, Combine::Or);
		assert_eq!(set.conditions[0].operator, FilterOp::Lte);

		let set: FilterSet =
			serde_json::from_value(json!({ "conditions": [] })).expect("Failed to parse.");

		assert_eq!(set.combine, Combine::And);
	}
}
