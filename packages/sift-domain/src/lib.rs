pub mod candidate;
pub mod filter;
pub mod item;
pub mod registry;
pub mod sort;

mod error;

pub use candidate::RankedCandidate;
pub use error::{Error, FieldKind, Result};
pub use filter::{
	Bound, Clause, Combine, FilterCondition, FilterOp, FilterSet, Predicate, RangeOp, Scalar,
};
pub use item::{Item, MAX_RELATED_EXCERPTS};
pub use registry::FieldRegistry;
pub use sort::{SortDirection, SortSpec};
