//! Paging requests and paged result envelopes.
//!
//! # Invariants
//! - Page numbers are 0-based.
//! - Page size is at least 1.
//! - `Page::total_pages` is `ceil(total_elements / size)`.

use crate::model::entity::EntityField;
use crate::query::criteria::Sort;
use crate::repo::crud_repo::{RepoError, RepoResult};
use serde::Serialize;

/// Requested window plus ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<F> {
    page: u32,
    size: u32,
    sort: Sort<F>,
}

impl<F: EntityField> PageRequest<F> {
    /// Unsorted request. Fails when `size` is zero.
    pub fn of(page: u32, size: u32) -> RepoResult<Self> {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    pub fn of_sorted(page: u32, size: u32, sort: Sort<F>) -> RepoResult<Self> {
        if size == 0 {
            return Err(RepoError::InvalidQuery(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { page, size, sort })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> &Sort<F> {
        &self.sort
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
            sort: self.sort.clone(),
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            size: self.size,
            sort: self.sort.clone(),
        }
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub number: u32,
    pub size: u32,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, number: u32, size: u32, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            1
        } else {
            u32::try_from(total_elements.div_ceil(u64::from(size))).unwrap_or(u32::MAX)
        };
        let has_next = u64::from(number) + 1 < u64::from(total_pages);
        Self {
            content,
            total_elements,
            number,
            size,
            total_pages,
            first: number == 0,
            last: !has_next,
            has_next,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    /// Converts the content while keeping paging metadata, e.g. entity to DTO.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            number: self.number,
            size: self.size,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
            has_next: self.has_next,
        }
    }
}

/// One window of results without a total count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub first: bool,
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Builds a slice from up to `size + 1` fetched rows; the extra row only
    /// signals that another slice exists.
    pub fn from_lookahead(mut content: Vec<T>, number: u32, size: u32) -> Self {
        let limit = usize::try_from(size).unwrap_or(usize::MAX);
        let has_next = content.len() > limit;
        content.truncate(limit);
        Self {
            content,
            number,
            size,
            first: number == 0,
            has_next,
        }
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            first: self.first,
            has_next: self.has_next,
        }
    }
}

/// Total row count implied by the page content alone, if it is conclusive.
///
/// A first page shorter than the size holds everything; any other non-empty
/// page shorter than the size is the last one.
pub fn total_from_content(offset: u64, size: u32, content_len: usize) -> Option<u64> {
    let content_len = content_len as u64;
    let size = u64::from(size);
    if offset == 0 && content_len < size {
        return Some(content_len);
    }
    if content_len != 0 && content_len < size {
        return Some(offset + content_len);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{total_from_content, Page, PageRequest, Slice};
    use crate::model::member::MemberField;
    use crate::repo::crud_repo::RepoError;

    #[test]
    fn zero_size_request_is_rejected() {
        let err = PageRequest::<MemberField>::of(0, 0).unwrap_err();
        assert!(matches!(err, RepoError::InvalidQuery(_)));
    }

    #[test]
    fn page_metadata_for_first_of_two_pages() {
        let page = Page::new(vec![1, 2, 3], 0, 3, 5);
        assert_eq!(page.total_pages, 2);
        assert!(page.first);
        assert!(page.has_next);
        assert!(!page.last);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: Page<i32> = Page::new(Vec::new(), 0, 10, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
        assert!(!page.has_next);
    }

    #[test]
    fn slice_drops_lookahead_row() {
        let slice = Slice::from_lookahead(vec![1, 2, 3, 4], 0, 3);
        assert_eq!(slice.content, vec![1, 2, 3]);
        assert!(slice.has_next);

        let tail = Slice::from_lookahead(vec![4, 5], 1, 3);
        assert!(!tail.has_next);
        assert!(!tail.first);
    }

    #[test]
    fn total_is_inferred_only_from_short_pages() {
        assert_eq!(total_from_content(0, 10, 4), Some(4));
        assert_eq!(total_from_content(20, 10, 3), Some(23));
        assert_eq!(total_from_content(0, 3, 3), None);
        assert_eq!(total_from_content(30, 10, 0), None);
    }

    #[test]
    fn request_offsets() {
        let request = PageRequest::<MemberField>::of(2, 25).unwrap();
        assert_eq!(request.offset(), 50);
        assert_eq!(request.next().page(), 3);
        assert_eq!(request.previous_or_first().page(), 1);
    }

    #[test]
    fn last_page_index_stays_put() {
        let request = PageRequest::<MemberField>::of(u32::MAX, 10).unwrap();
        assert_eq!(request.next().page(), u32::MAX);
        assert_eq!(request.next().size(), 10);
    }
}
