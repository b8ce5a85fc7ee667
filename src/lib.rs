//! tankobon - reader-core engine for a manga reading client
//!
//! Implements the page-loading and progression core of a reader: per-page
//! load tracking, single/double/continuous layout conversion, chapter
//! preload windowing with boundary transitions, and a per-source
//! concurrency-limited fetch queue. Rendering, routing, and the server
//! protocol stay with the host behind the `PageUrlResolver`,
//! `ChapterNavigator`, and `ProgressSink` traits.

pub mod fetch;
pub mod reader;
pub mod settings;

pub use reader::{ChapterNavigator, PageUrlResolver, ReaderSession};
pub use settings::ReaderSettings;
