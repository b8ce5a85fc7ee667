//! Chapter window for continuous reading
//!
//! Tracks which neighboring chapters are preloaded around the current one,
//! latches chapter-boundary transitions so a rapid scroll-reverse cannot
//! fire two chapter switches, and detects gaps in the chapter numbering.

use std::collections::HashSet;

use anyhow::bail;

use super::types::{ChapterId, TransitionDirection};

/// "Not yet computed" bound for leading preload progress
pub const LEADING_ORDER_UNSET: i64 = 99_999;
/// "Not yet computed" bound for trailing preload progress
pub const TRAILING_ORDER_UNSET: i64 = -1;

/// One chapter as known to the reading session
#[derive(Clone, Debug, PartialEq)]
pub struct ReaderChapter {
    pub id: ChapterId,
    /// Sequential position within the manga as published (1-based)
    pub source_order: usize,
    /// Author-assigned number; may skip (specials, bonus chapters) and
    /// may be fractional (10.5)
    pub number: f64,
    pub page_count: usize,
    /// Resume point stored server-side (0-indexed)
    pub last_page_read: usize,
    pub read: bool,
    pub bookmarked: bool,
}

/// Number of chapters missing between two adjacent chapters by reading
/// order, computed from chapter numbers rather than source order.
#[must_use]
pub fn missing_chapter_gap(prev: &ReaderChapter, next: &ReaderChapter) -> u32 {
    let gap = next.number.floor() - prev.number.floor() - 1.0;
    if gap > 0.0 { gap as u32 } else { 0 }
}

/// Ordered chapters relevant to the session, with preload bookkeeping
#[derive(Debug)]
pub struct ReaderChapters {
    chapters: Vec<ReaderChapter>,
    current: usize,
    preload_window: usize,

    leading: usize,
    trailing: usize,
    last_leading_source_order: i64,
    last_trailing_source_order: i64,

    /// Chapters fetched ahead of being scrolled into view. Merely
    /// prefetched chapters must not pick up mark-as-read side effects.
    preload_only: HashSet<ChapterId>,

    transition_in_flight: Option<TransitionDirection>,
    triggered: HashSet<TransitionDirection>,
    suspended: HashSet<TransitionDirection>,
}

impl ReaderChapters {
    /// Build a window over the session's chapters.
    ///
    /// Chapters are ordered by source order; `current` must be present.
    pub fn new(
        mut chapters: Vec<ReaderChapter>,
        current: ChapterId,
        preload_window: usize,
    ) -> anyhow::Result<Self> {
        if chapters.is_empty() {
            bail!("reader session needs at least one chapter");
        }
        chapters.sort_by_key(|c| c.source_order);
        let Some(index) = chapters.iter().position(|c| c.id == current) else {
            bail!("chapter {current} is not part of the session");
        };

        Ok(Self {
            chapters,
            current: index,
            preload_window,
            leading: 0,
            trailing: 0,
            last_leading_source_order: LEADING_ORDER_UNSET,
            last_trailing_source_order: TRAILING_ORDER_UNSET,
            preload_only: HashSet::new(),
            transition_in_flight: None,
            triggered: HashSet::new(),
            suspended: HashSet::new(),
        })
    }

    #[must_use]
    pub fn current(&self) -> &ReaderChapter {
        &self.chapters[self.current]
    }

    #[must_use]
    pub fn previous(&self) -> Option<&ReaderChapter> {
        self.current.checked_sub(1).map(|i| &self.chapters[i])
    }

    #[must_use]
    pub fn next(&self) -> Option<&ReaderChapter> {
        self.chapters.get(self.current + 1)
    }

    #[must_use]
    pub fn get(&self, id: ChapterId) -> Option<&ReaderChapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn neighbor(&self, dir: TransitionDirection) -> Option<&ReaderChapter> {
        match dir {
            TransitionDirection::Previous => self.previous(),
            TransitionDirection::Next => self.next(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    #[must_use]
    pub fn leading(&self) -> usize {
        self.leading
    }

    #[must_use]
    pub fn trailing(&self) -> usize {
        self.trailing
    }

    #[must_use]
    pub fn transition_in_flight(&self) -> Option<TransitionDirection> {
        self.transition_in_flight
    }

    /// Scrolled onto the first/last page of the current chapter while the
    /// adjacent chapter is visible.
    ///
    /// Returns the neighbor to open, at most once per direction and never
    /// while another transition is in flight. Both directions firing in
    /// the same tick therefore yields exactly one chapter switch.
    pub fn boundary_reached(&mut self, dir: TransitionDirection) -> Option<ChapterId> {
        if self.transition_in_flight.is_some() {
            log::debug!("boundary {dir:?} ignored: transition already in flight");
            return None;
        }
        if self.triggered.contains(&dir) || self.suspended.contains(&dir) {
            return None;
        }
        let neighbor = self.neighbor(dir)?.id;

        self.triggered.insert(dir);
        self.transition_in_flight = Some(dir);
        log::debug!("boundary {dir:?} opens chapter {neighbor}");
        Some(neighbor)
    }

    /// Make `id` the current chapter, completing any in-flight transition.
    ///
    /// Preload progress restarts around the new position; boundary latches
    /// are re-armed.
    pub fn set_current(&mut self, id: ChapterId) -> anyhow::Result<()> {
        let Some(index) = self.chapters.iter().position(|c| c.id == id) else {
            bail!("chapter {id} is not part of the session");
        };
        self.current = index;
        self.leading = 0;
        self.trailing = 0;
        self.last_leading_source_order = LEADING_ORDER_UNSET;
        self.last_trailing_source_order = TRAILING_ORDER_UNSET;
        self.transition_in_flight = None;
        self.triggered.clear();
        self.preload_only.remove(&id);
        Ok(())
    }

    /// Record the stored resume point for a chapter
    pub fn set_last_page_read(&mut self, id: ChapterId, page: usize) {
        if let Some(chapter) = self.chapters.iter_mut().find(|c| c.id == id) {
            chapter.last_page_read = page;
        }
    }

    /// Advance preloading one chapter further in `dir`, bounded by the
    /// preload window. Returns the chapter to fetch, marked preload-only
    /// until it is scrolled into view.
    pub fn expand_preload(&mut self, dir: TransitionDirection) -> Option<ReaderChapter> {
        if self.suspended.contains(&dir) {
            return None;
        }

        let (count, frontier_order, step) = match dir {
            TransitionDirection::Previous => {
                let frontier = if self.last_leading_source_order == LEADING_ORDER_UNSET {
                    self.current().source_order as i64
                } else {
                    self.last_leading_source_order
                };
                (self.leading, frontier, -1i64)
            }
            TransitionDirection::Next => {
                let frontier = if self.last_trailing_source_order == TRAILING_ORDER_UNSET {
                    self.current().source_order as i64
                } else {
                    self.last_trailing_source_order
                };
                (self.trailing, frontier, 1i64)
            }
        };

        if count >= self.preload_window {
            return None;
        }

        let target_order = frontier_order + step;
        let chapter = self
            .chapters
            .iter()
            .find(|c| c.source_order as i64 == target_order)?
            .clone();

        match dir {
            TransitionDirection::Previous => {
                self.leading += 1;
                self.last_leading_source_order = target_order;
            }
            TransitionDirection::Next => {
                self.trailing += 1;
                self.last_trailing_source_order = target_order;
            }
        }
        self.preload_only.insert(chapter.id);
        log::trace!("preload {dir:?} expands to chapter {}", chapter.id);
        Some(chapter)
    }

    /// A prefetched chapter has been scrolled into view and is now
    /// interactive
    pub fn mark_visible(&mut self, id: ChapterId) {
        self.preload_only.remove(&id);
    }

    #[must_use]
    pub fn is_preload_only(&self, id: ChapterId) -> bool {
        self.preload_only.contains(&id)
    }

    /// Stop auto-preloading toward `dir` after a resolution failure.
    /// Re-enabled only by explicit retry.
    pub fn suspend_preload(&mut self, dir: TransitionDirection) {
        log::warn!("suspending {dir:?} preload until retried");
        self.suspended.insert(dir);
    }

    pub fn resume_preload(&mut self, dir: TransitionDirection) {
        self.suspended.remove(&dir);
    }

    #[must_use]
    pub fn is_preload_suspended(&self, dir: TransitionDirection) -> bool {
        self.suspended.contains(&dir)
    }

    /// Chapters missing between `id` and its successor by reading order.
    /// A positive gap renders a separator without blocking navigation.
    #[must_use]
    pub fn missing_after(&self, id: ChapterId) -> Option<u32> {
        let index = self.chapters.iter().position(|c| c.id == id)?;
        let next = self.chapters.get(index + 1)?;
        Some(missing_chapter_gap(&self.chapters[index], next))
    }
}
