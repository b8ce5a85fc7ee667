//! Reader core: page progression, layout, and chapter windowing

mod chapters;
mod layout;
mod load_tracker;
mod progress;
mod session;
mod state;
mod types;

pub use chapters::{
    missing_chapter_gap, ReaderChapter, ReaderChapters, LEADING_ORDER_UNSET, TRAILING_ORDER_UNSET,
};
pub use layout::{
    display_index_for, needs_rebuild, next_index_from_page, page_gap, pages_for_mode,
    remap_for_mode_change, start_edge,
};
pub use load_tracker::PageLoadTracker;
pub use progress::{FileProgressSink, ProgressEntry, ProgressReporter, ProgressSink};
pub use session::{ChapterNavigator, PageUrlResolver, ReaderSession};
pub use state::{Command, Effect, ReaderState};
pub use types::*;
