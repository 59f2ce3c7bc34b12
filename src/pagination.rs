//! Pagination deriver for a single page of server results.
//!
//! The server already returns one page per request, so the slice step only
//! trims the result set to the page size; the rest is page-count math for a
//! pager driven by the server's `totalCount`.

/// Page metadata for a pager widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  /// One-based page number.
  pub current_page: u32,
  pub page_size: u32,
  pub total_count: Option<u64>,
  pub total_pages: u32,
  /// One-based index of the first row on this page, 0 when the page is empty.
  pub first_item: u64,
  /// One-based index of the last row on this page, 0 when the page is empty.
  pub last_item: u64,
}

impl Pagination {
  pub fn empty(page_size: u32) -> Self {
    Self {
      current_page: 1,
      page_size,
      total_count: None,
      total_pages: 0,
      first_item: 0,
      last_item: 0,
    }
  }

  pub fn has_previous(&self) -> bool {
    self.current_page > 1
  }

  pub fn has_next(&self) -> bool {
    self.current_page < self.total_pages
  }
}

/// Slice `results` to one page and derive its metadata.
///
/// `total_count` is the server-reported row count across all pages; when it
/// is absent the page count is derived from `results` alone.
pub fn paginate<T: Clone>(
  results: &[T],
  page_size: u32,
  current_page: u32,
  total_count: Option<u64>,
) -> (Vec<T>, Pagination) {
  let page_size = page_size.max(1);
  let current_page = current_page.max(1);
  let items: Vec<T> = results.iter().take(page_size as usize).cloned().collect();

  let total_rows = total_count.unwrap_or(results.len() as u64);
  let total_pages = u32::try_from(total_rows.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);

  let (first_item, last_item) = if items.is_empty() {
    (0, 0)
  } else {
    let first = u64::from(current_page - 1) * u64::from(page_size) + 1;
    (first, first + items.len() as u64 - 1)
  };

  let pagination = Pagination {
    current_page,
    page_size,
    total_count,
    total_pages,
    first_item,
    last_item,
  };
  (items, pagination)
}
