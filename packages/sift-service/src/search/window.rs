use sift_config::Search;

use crate::{Error, Result};

/// Resolved page window. `size` is already capped at `search.max_page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub page: u32,
	pub size: u32,
}
impl Window {
	pub fn resolve(page: Option<u32>, size: Option<u32>, search: &Search) -> Result<Self> {
		let page = page.unwrap_or(1);
		let requested = size.unwrap_or(search.default_page_size);

		if page == 0 {
			return Err(Error::InvalidRequest {
				message: "page must be a positive integer.".to_string(),
			});
		}
		if requested == 0 {
			return Err(Error::InvalidRequest {
				message: "size must be a positive integer.".to_string(),
			});
		}

		let size = requested.min(search.max_page_size);

		if size < requested {
			tracing::debug!(requested, size, "Capped page size.");
		}

		Ok(Self { page, size })
	}

	pub fn offset(&self) -> u32 {
		(self.page - 1).saturating_mul(self.size)
	}

	/// The slots this page covers in a ranked list.
	pub fn span(&self) -> Span {
		Span { offset: self.offset(), len: self.size }
	}

	/// `factor` pages starting at this one; the pool a reranker reorders before truncation.
	pub fn pool(&self, factor: u32) -> Span {
		Span { offset: self.offset(), len: self.size.saturating_mul(factor.max(1)) }
	}
}

/// Contiguous slots of a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
	pub offset: u32,
	pub len: u32,
}
impl Span {
	/// Position one past the last slot.
	pub fn end(&self) -> u32 {
		self.offset.saturating_add(self.len)
	}

	pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
		items.into_iter().skip(self.offset as usize).take(self.len as usize).collect()
	}
}
