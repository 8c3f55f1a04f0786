use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	#[default]
	Asc,
	Desc,
}
impl SortDirection {
	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
	pub field: String,
	#[serde(default)]
	pub direction: SortDirection,
}
impl SortSpec {
	pub fn asc(field: impl Into<String>) -> Self {
		Self { field: field.into(), direction: SortDirection::Asc }
	}

	pub fn desc(field: impl Into<String>) -> Self {
		Self { field: field.into(), direction: SortDirection::Desc }
	}

	/// Missing and null attributes sort last in both directions.
	pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
		let a = a.get(&self.field).filter(|value| !value.is_null());
		let b = b.get(&self.field).filter(|value| !value.is_null());

		match (a, b) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) => Ordering::Greater,
			(Some(_), None) => Ordering::Less,
			(Some(a), Some(b)) => {
				let ordering = compare_present(a, b);

				match self.direction {
					SortDirection::Asc => ordering,
					SortDirection::Desc => ordering.reverse(),
				}
			},
		}
	}
}

// Cross-kind order follows jsonb: string < number < boolean < array < object.
fn kind_rank(value: &Value) -> u8 {
	match value {
		Value::Null => 0,
		Value::String(_) => 1,
		Value::Number(_) => 2,
		Value::Bool(_) => 3,
		Value::Array(_) => 4,
		Value::Object(_) => 5,
	}
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
	match (a, b) {
		(Value::Number(a), Value::Number(b)) => {
			let a = a.as_f64().unwrap_or(f64::NAN);
			let b = b.as_f64().unwrap_or(f64::NAN);

			a.partial_cmp(&b).unwrap_or(Ordering::Equal)
		},
		(Value::String(a), Value::String(b)) => a.cmp(b),
		(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
		_ => kind_rank(a).cmp(&kind_rank(b)),
	}
}
