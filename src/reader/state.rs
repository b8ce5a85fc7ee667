//! Reader progression state machine
//!
//! Pure state over the current chapter's pages: commands mutate it and
//! return effects for the session to execute. Consumers read the state;
//! they never mutate it directly.

use super::layout;
use super::load_tracker::PageLoadTracker;
use super::types::{
    ChapterId, Page, PageEdge, ReadingDirection, ReadingMode, TransitionDirection, TransitionMode,
};

/// Session-wide page state for the chapter being read
#[derive(Debug, Default)]
pub struct ReaderState {
    /// Chapter the page list belongs to
    pub chapter: Option<ChapterId>,

    pub reading_mode: ReadingMode,
    pub direction: ReadingDirection,
    /// Configured inter-page gap; webtoon overrides it to zero
    pub page_gap: u16,

    /// Physical page count
    pub total_pages: usize,

    /// Index into `pages` (display units)
    pub current_page_index: usize,

    /// Pending scroll target, cleared once scrolled into view
    pub page_to_scroll_to: Option<usize>,

    pub transition: TransitionMode,

    /// Ordered physical page URLs
    pub page_urls: Vec<String>,

    /// Display units derived from `page_urls` and the reading mode.
    /// Regenerated on layout-family changes, never patched.
    pub pages: Vec<Page>,

    pub load_tracker: PageLoadTracker,

    /// Page-url resolution for the current chapter failed; the reader
    /// shows an error state instead of pages until retried
    pub resolution_failed: bool,
}

impl ReaderState {
    #[must_use]
    pub fn new(mode: ReadingMode, direction: ReadingDirection, page_gap: u16) -> Self {
        Self {
            reading_mode: mode,
            direction,
            page_gap,
            ..Self::default()
        }
    }

    /// Effective inter-page gap for the active mode
    #[must_use]
    pub fn effective_page_gap(&self) -> u16 {
        layout::page_gap(self.reading_mode, self.page_gap)
    }

    /// Physical index of the furthest page covered by the current display
    /// unit; this is what gets reported as reading progress
    #[must_use]
    pub fn physical_progress_index(&self) -> usize {
        self.pages
            .get(self.current_page_index)
            .map_or(0, |p| layout::next_index_from_page(p, self.total_pages))
    }

    fn check_invariants(&self) {
        if self.load_tracker.len() != self.page_urls.len() {
            log::error!(
                "load state desync: {} states for {} urls",
                self.load_tracker.len(),
                self.page_urls.len()
            );
            debug_assert_eq!(self.load_tracker.len(), self.page_urls.len());
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::SetPages {
                chapter,
                urls,
                initial_page,
            } => {
                self.chapter = Some(chapter);
                self.page_urls = urls;
                self.total_pages = self.page_urls.len();
                self.load_tracker.reset(&self.page_urls);
                self.pages = layout::pages_for_mode(&self.page_urls, self.reading_mode);
                self.resolution_failed = false;
                self.transition = TransitionMode::None;
                self.check_invariants();

                let physical = initial_page.min(self.total_pages.saturating_sub(1));
                self.current_page_index = layout::display_index_for(&self.pages, physical);
                log::debug!(
                    "chapter {chapter}: {} pages, starting at {physical}",
                    self.total_pages
                );

                if physical > 0 {
                    // Resuming mid-chapter: the display must scroll there
                    self.page_to_scroll_to = Some(self.current_page_index);
                    vec![
                        Effect::ScrollToPage(self.current_page_index),
                        Effect::UpdatePrefetch,
                    ]
                } else {
                    self.page_to_scroll_to = None;
                    vec![Effect::UpdatePrefetch]
                }
            }

            Command::PagesUnavailable { chapter } => {
                log::warn!("chapter {chapter}: page list unavailable");
                self.chapter = Some(chapter);
                self.page_urls.clear();
                self.pages.clear();
                self.load_tracker.reset(&[]);
                self.total_pages = 0;
                self.current_page_index = 0;
                self.page_to_scroll_to = None;
                self.transition = TransitionMode::None;
                self.resolution_failed = true;
                vec![]
            }

            Command::SetReadingMode(mode) => {
                if self.reading_mode == mode {
                    return vec![];
                }
                let prev = self.reading_mode;
                self.reading_mode = mode;

                if !layout::needs_rebuild(prev, mode) || self.pages.is_empty() {
                    return vec![];
                }

                let (pages, index) = layout::remap_for_mode_change(
                    &self.page_urls,
                    prev,
                    mode,
                    self.current_page_index,
                );
                self.pages = pages;
                self.current_page_index = index;
                self.page_to_scroll_to = Some(index);
                vec![Effect::ScrollToPage(index)]
            }

            Command::SetDirection(direction) => {
                self.direction = direction;
                vec![]
            }

            Command::SetPageGap(gap) => {
                self.page_gap = gap;
                vec![]
            }

            Command::GoToPage(index) => {
                if self.pages.is_empty() {
                    return vec![];
                }
                let clamped = index.min(self.pages.len() - 1);
                if clamped == self.current_page_index {
                    return vec![];
                }
                self.current_page_index = clamped;
                self.page_to_scroll_to = Some(clamped);

                let mut effects = vec![Effect::ScrollToPage(clamped)];
                if let Some(edge) = layout::start_edge(self.reading_mode, self.direction) {
                    effects.push(Effect::ScrollToStart(edge));
                }
                if let Some(chapter) = self.chapter {
                    effects.push(Effect::ReportProgress {
                        chapter,
                        page_index: self.physical_progress_index(),
                    });
                }
                effects.push(Effect::UpdatePrefetch);
                effects
            }

            Command::ScrollCompleted(index) => {
                if self.pages.is_empty() {
                    return vec![];
                }
                let clamped = index.min(self.pages.len() - 1);

                if self.page_to_scroll_to == Some(clamped) {
                    self.page_to_scroll_to = None;
                    self.transition = TransitionMode::None;
                }
                if clamped == self.current_page_index {
                    return vec![];
                }
                self.current_page_index = clamped;

                let mut effects = vec![];
                if let Some(chapter) = self.chapter {
                    effects.push(Effect::ReportProgress {
                        chapter,
                        page_index: self.physical_progress_index(),
                    });
                }
                effects.push(Effect::UpdatePrefetch);
                effects
            }

            Command::PageLoaded { url } => {
                self.load_tracker.record_success(&url);
                if self.load_tracker.all_loaded() {
                    // Current chapter fully loaded: preloading may advance
                    vec![Effect::UpdatePrefetch]
                } else {
                    vec![]
                }
            }

            Command::PageFailed { url } => {
                self.load_tracker.record_failure(&url);
                vec![]
            }

            Command::RetryFailedPages => {
                let key = self.load_tracker.bump_retry_key();
                log::debug!("retrying failed pages, key {key}");
                vec![]
            }

            Command::BeginTransition(dir) => {
                if self.transition != TransitionMode::None {
                    // A transition is in flight; a second boundary signal
                    // must not race it into a double chapter switch
                    return vec![];
                }
                self.transition = dir.into();
                vec![Effect::OpenNeighbor(dir)]
            }

            Command::Teardown => {
                self.page_to_scroll_to = None;
                self.transition = TransitionMode::None;
                vec![Effect::FlushProgress]
            }
        }
    }
}

/// Commands that modify reader state
#[derive(Clone, Debug)]
pub enum Command {
    /// A chapter's page URLs resolved; `initial_page` is physical
    SetPages {
        chapter: ChapterId,
        urls: Vec<String>,
        initial_page: usize,
    },
    /// Page-url resolution failed for the chapter being opened
    PagesUnavailable { chapter: ChapterId },
    /// Reading mode changed in settings
    SetReadingMode(ReadingMode),
    /// Reading direction changed in settings
    SetDirection(ReadingDirection),
    /// Page gap changed in settings
    SetPageGap(u16),
    /// Navigate to a display unit
    GoToPage(usize),
    /// A display unit finished scrolling into view
    ScrollCompleted(usize),
    /// Image load succeeded for a URL
    PageLoaded { url: String },
    /// Image load failed for a URL
    PageFailed { url: String },
    /// User asked failed pages to retry
    RetryFailedPages,
    /// Scrolled onto a chapter boundary with the neighbor visible
    BeginTransition(TransitionDirection),
    /// Navigating away from the reader
    Teardown,
}

/// Effects produced by state changes, executed by the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Scroll the display unit into view
    ScrollToPage(usize),
    /// Align the fresh page to its starting edge
    ScrollToStart(PageEdge),
    /// Report reading progress (physical page index)
    ReportProgress {
        chapter: ChapterId,
        page_index: usize,
    },
    /// Re-evaluate neighbor-chapter preloading
    UpdatePrefetch,
    /// Open the adjacent chapter in the given direction
    OpenNeighbor(TransitionDirection),
    /// Push any pending progress before state is discarded
    FlushProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://host/p{i}.png")).collect()
    }

    fn loaded_state(n: usize) -> ReaderState {
        let mut state = ReaderState::new(ReadingMode::SinglePage, ReadingDirection::LeftToRight, 4);
        let _ = state.apply(Command::SetPages {
            chapter: ChapterId(7),
            urls: urls(n),
            initial_page: 0,
        });
        state
    }

    #[test]
    fn set_pages_resets_everything() {
        let state = loaded_state(10);
        assert_eq!(state.total_pages, 10);
        assert_eq!(state.load_tracker.len(), 10);
        assert_eq!(state.current_page_index, 0);
        assert_eq!(state.page_to_scroll_to, None);
        assert_eq!(state.transition, TransitionMode::None);
        assert!(!state.resolution_failed);
    }

    #[test]
    fn set_pages_with_resume_point_schedules_scroll() {
        let mut state = ReaderState::new(ReadingMode::SinglePage, ReadingDirection::LeftToRight, 0);
        let effects = state.apply(Command::SetPages {
            chapter: ChapterId(7),
            urls: urls(10),
            initial_page: 5,
        });

        assert_eq!(state.current_page_index, 5);
        assert_eq!(state.page_to_scroll_to, Some(5));
        assert_eq!(
            effects,
            vec![Effect::ScrollToPage(5), Effect::UpdatePrefetch]
        );
    }

    #[test]
    fn resume_point_past_end_is_clamped() {
        let mut state = ReaderState::new(ReadingMode::SinglePage, ReadingDirection::LeftToRight, 0);
        let _ = state.apply(Command::SetPages {
            chapter: ChapterId(7),
            urls: urls(4),
            initial_page: 99,
        });
        assert_eq!(state.current_page_index, 3);
    }

    #[test]
    fn go_to_page_rtl_targets_right_edge() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::SetDirection(ReadingDirection::RightToLeft));

        let effects = state.apply(Command::GoToPage(5));
        assert!(effects.contains(&Effect::ScrollToStart(PageEdge::Right)));
        assert!(!effects.contains(&Effect::ScrollToStart(PageEdge::Left)));
    }

    #[test]
    fn go_to_page_ltr_targets_left_edge() {
        let mut state = loaded_state(10);
        let effects = state.apply(Command::GoToPage(5));
        assert!(effects.contains(&Effect::ScrollToStart(PageEdge::Left)));
    }

    #[test]
    fn continuous_modes_keep_scroll_offset() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::SetReadingMode(ReadingMode::Webtoon));

        let effects = state.apply(Command::GoToPage(5));
        assert!(effects.iter().all(|e| !matches!(e, Effect::ScrollToStart(_))));
    }

    #[test]
    fn go_to_page_reports_progress_and_prefetch() {
        let mut state = loaded_state(10);
        let effects = state.apply(Command::GoToPage(5));
        assert!(effects.contains(&Effect::ReportProgress {
            chapter: ChapterId(7),
            page_index: 5,
        }));
        assert!(effects.contains(&Effect::UpdatePrefetch));
        assert_eq!(state.page_to_scroll_to, Some(5));
    }

    #[test]
    fn go_to_same_page_is_noop() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(5));
        let effects = state.apply(Command::GoToPage(5));
        assert!(effects.is_empty());
    }

    #[test]
    fn go_to_page_clamps_to_last() {
        let mut state = loaded_state(4);
        let _ = state.apply(Command::GoToPage(99));
        assert_eq!(state.current_page_index, 3);
    }

    #[test]
    fn scroll_completion_clears_target_and_transition() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(5));
        state.transition = TransitionMode::Next;

        let effects = state.apply(Command::ScrollCompleted(5));
        assert_eq!(state.page_to_scroll_to, None);
        assert_eq!(state.transition, TransitionMode::None);
        // Index was already 5, nothing further to do
        assert!(effects.is_empty());
    }

    #[test]
    fn natural_scroll_updates_index_and_reports() {
        let mut state = loaded_state(10);
        let effects = state.apply(Command::ScrollCompleted(3));
        assert_eq!(state.current_page_index, 3);
        assert!(effects.contains(&Effect::ReportProgress {
            chapter: ChapterId(7),
            page_index: 3,
        }));
    }

    #[test]
    fn mode_switch_to_double_remaps_current_index() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(5));

        let effects = state.apply(Command::SetReadingMode(ReadingMode::DoublePage));
        // Physical 5 lives in spread (4,5) at display index 2
        assert_eq!(state.current_page_index, 2);
        assert_eq!(effects, vec![Effect::ScrollToPage(2)]);
        assert!(state.pages[2].is_spread());
    }

    #[test]
    fn mode_switch_within_family_keeps_pages() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(5));

        let effects = state.apply(Command::SetReadingMode(ReadingMode::ContinuousVertical));
        assert!(effects.is_empty());
        assert_eq!(state.current_page_index, 5);
        assert_eq!(state.pages.len(), 10);
    }

    #[test]
    fn spread_progress_reports_later_half() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::SetReadingMode(ReadingMode::DoublePage));
        let _ = state.apply(Command::GoToPage(1));
        // Spread (2,3): progress is the later physical page
        assert_eq!(state.physical_progress_index(), 3);
    }

    #[test]
    fn begin_transition_is_serialized() {
        let mut state = loaded_state(10);

        let first = state.apply(Command::BeginTransition(TransitionDirection::Next));
        let second = state.apply(Command::BeginTransition(TransitionDirection::Previous));

        assert_eq!(
            first,
            vec![Effect::OpenNeighbor(TransitionDirection::Next)]
        );
        assert!(second.is_empty());
        assert_eq!(state.transition, TransitionMode::Next);
    }

    #[test]
    fn all_pages_loaded_advances_prefetch() {
        let mut state = loaded_state(2);
        let urls = state.page_urls.clone();

        let effects = state.apply(Command::PageLoaded { url: urls[0].clone() });
        assert!(effects.is_empty());
        let effects = state.apply(Command::PageLoaded { url: urls[1].clone() });
        assert_eq!(effects, vec![Effect::UpdatePrefetch]);
    }

    #[test]
    fn page_failure_stays_local() {
        let mut state = loaded_state(3);
        let url = state.page_urls[1].clone();
        let effects = state.apply(Command::PageFailed { url });
        assert!(effects.is_empty());
        assert_eq!(state.load_tracker.failed_count(), 1);
        assert!(!state.resolution_failed);
    }

    #[test]
    fn resolution_failure_enters_error_state() {
        let mut state = loaded_state(10);
        let effects = state.apply(Command::PagesUnavailable {
            chapter: ChapterId(8),
        });
        assert!(effects.is_empty());
        assert!(state.resolution_failed);
        assert!(state.pages.is_empty());
        assert_eq!(state.total_pages, 0);
    }

    #[test]
    fn teardown_cancels_pending_work() {
        let mut state = loaded_state(10);
        let _ = state.apply(Command::GoToPage(5));
        state.transition = TransitionMode::Next;

        let effects = state.apply(Command::Teardown);
        assert_eq!(state.page_to_scroll_to, None);
        assert_eq!(state.transition, TransitionMode::None);
        assert_eq!(effects, vec![Effect::FlushProgress]);
    }

    #[test]
    fn webtoon_gap_override_applies() {
        let mut state = loaded_state(4);
        let _ = state.apply(Command::SetPageGap(8));
        assert_eq!(state.effective_page_gap(), 8);
        let _ = state.apply(Command::SetReadingMode(ReadingMode::Webtoon));
        assert_eq!(state.effective_page_gap(), 0);
    }
}
