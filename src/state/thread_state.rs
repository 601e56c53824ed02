/// Thread state definitions for tracking crawl progress
///
/// This module defines the states a single thread passes through while it is
/// being crawled, and the reasons a crawl can end early.
use std::fmt;

/// Represents the current state of a thread in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    // ===== Active States =====
    /// Crawl has not started
    Start,

    /// Fetching and inspecting the first page
    FetchPage1,

    /// Title found and thread metadata persisted
    MetadataOk,

    /// Walking pages after the first
    FetchNextPage,

    // ===== Terminal States =====
    /// Every reachable page was processed
    Done,

    /// Thread was abandoned; see [`AbortReason`]
    Aborted,
}

impl ThreadState {
    /// Returns true if no further processing happens in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if moving from `self` to `to` is a legal step
    pub fn can_transition_to(&self, to: ThreadState) -> bool {
        use ThreadState::*;
        matches!(
            (self, to),
            (Start, FetchPage1)
                | (FetchPage1, Aborted)
                | (FetchPage1, MetadataOk)
                | (MetadataOk, Aborted)
                | (MetadataOk, FetchNextPage)
                | (MetadataOk, Done)
                | (FetchNextPage, FetchNextPage)
                | (FetchNextPage, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchPage1 => "fetch_page_1",
            Self::MetadataOk => "metadata_ok",
            Self::FetchNextPage => "fetch_next_page",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a thread crawl was aborted, or why its page loop stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// Page 1 could not be fetched after all retries
    Unreachable,

    /// Page 1 carries the forum's "not found" error block
    NotFound,

    /// Page 1 has no `<title>`
    NoTitle,

    /// Page 1 produced no post with both an id and an author
    NoValidPosts,

    /// A later page failed to fetch or produced no usable posts
    PageFailure,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::NotFound => "not found",
            Self::NoTitle => "no title",
            Self::NoValidPosts => "no valid posts",
            Self::PageFailure => "page fetch/parse failure",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
