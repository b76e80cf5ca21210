//! Client-side pagination over the merged rows.

use crate::error::ReconcileError;
use std::fmt;

/// Allowed rows-per-page choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSize {
    #[default]
    Twenty,
    Thirty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [Self; 4] = [Self::Twenty, Self::Thirty, Self::Fifty, Self::Hundred];

    pub const fn get(self) -> usize {
        match self {
            Self::Twenty => 20,
            Self::Thirty => 30,
            Self::Fifty => 50,
            Self::Hundred => 100,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = ReconcileError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or(ReconcileError::InvalidPageSize(value))
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Current page and page size.
///
/// `current_page` is 1-based and kept within `[1, total_pages]` by [`PageState::clamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current_page: usize,
    page_size: PageSize,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl PageState {
    pub const fn new(page_size: PageSize) -> Self {
        Self {
            current_page: 1,
            page_size,
        }
    }

    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// `max(1, ceil(len / page_size))`
    pub const fn total_pages(&self, len: usize) -> usize {
        let pages = len.div_ceil(self.page_size.get());
        if pages == 0 {
            1
        } else {
            pages
        }
    }

    /// Index into the full row list of the first row on the current page.
    pub const fn start_index(&self) -> usize {
        (self.current_page - 1) * self.page_size.get()
    }

    /// The rows shown on the current page.
    pub fn slice<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        let start = self.start_index().min(rows.len());
        let end = (start + self.page_size.get()).min(rows.len());
        &rows[start..end]
    }

    /// Navigate to `page`. Out-of-range or same-page requests are ignored.
    ///
    /// Returns whether the page changed.
    pub const fn go_to(&mut self, page: usize, len: usize) -> bool {
        if page < 1 || page > self.total_pages(len) || page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }

    pub const fn next(&mut self, len: usize) -> bool {
        self.go_to(self.current_page + 1, len)
    }

    pub const fn previous(&mut self, len: usize) -> bool {
        self.go_to(self.current_page.saturating_sub(1), len)
    }

    /// Change the page size and return to the first page.
    pub const fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.current_page = 1;
    }

    /// Pull `current_page` back into range after the row count changed.
    pub const fn clamp(&mut self, len: usize) {
        let total = self.total_pages(len);
        if self.current_page > total {
            self.current_page = total;
        }
    }
}
