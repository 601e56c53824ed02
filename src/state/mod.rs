//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ThreadState`: Tracks where a single thread is in its crawl (page 1, later pages, done, aborted)
//! - `AbortReason`: Why a thread was abandoned or its page walk cut short

mod thread_state;

// Re-export main types
pub use thread_state::{AbortReason, ThreadState};
