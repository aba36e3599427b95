//! Pagination cursor over listing pages
//!
//! The cursor only ever moves forward. It remembers every page it has handed
//! out so a "next" link pointing back into the chain ends the crawl instead of
//! looping, and it stops after a fixed number of pages.

use crate::url::Reference;
use std::collections::HashSet;

/// Why the cursor refused to advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStop {
    /// The page had no next link; the normal end of the crawl
    Exhausted,

    /// The next link points at a page that was already fetched
    Revisit(Reference),

    /// `max_pages` listing pages have already been handed out
    PageLimit { limit: u32, next: Reference },
}

#[derive(Debug)]
pub struct PaginationCursor {
    next: Option<Reference>,
    visited: HashSet<Reference>,
    max_pages: u32,
}

impl PaginationCursor {
    pub fn new(start: Reference, max_pages: u32) -> Self {
        Self {
            next: Some(start),
            visited: HashSet::new(),
            max_pages,
        }
    }

    /// Takes the page to fetch next, marking it visited
    pub fn take(&mut self) -> Option<Reference> {
        let next = self.next.take()?;
        self.visited.insert(next.clone());
        Some(next)
    }

    /// Records the next link parsed from the current page
    pub fn advance(&mut self, next: Option<Reference>) -> Result<(), CursorStop> {
        let next = next.ok_or(CursorStop::Exhausted)?;

        if self.visited.contains(&next) {
            return Err(CursorStop::Revisit(next));
        }

        if self.pages_visited() >= self.max_pages as usize {
            return Err(CursorStop::PageLimit {
                limit: self.max_pages,
                next,
            });
        }

        self.next = Some(next);
        Ok(())
    }

    pub fn pages_visited(&self) -> usize {
        self.visited.len()
    }
}
