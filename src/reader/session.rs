//! Reading session - wires the progression state machine to its
//! collaborators
//!
//! Owns the page state and the chapter window, submits page-url
//! resolution through the per-source queue, and executes the effects the
//! state machine emits. The host loop feeds it commands and pumps
//! [`poll_responses`](ReaderSession::poll_responses); UI-facing effects
//! (scroll directives) are returned for the display layer to perform.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};

use crate::fetch::{
    pages_request_key, CacheKey, FetchFault, FetchPriority, FetchResponse, RequestId,
    ResolvedPages, ResolvedPagesCache, SourceAwareQueue, SourceId, DEFAULT_CACHE_SIZE,
};
use crate::settings::ReaderSettings;

use super::chapters::{ReaderChapter, ReaderChapters};
use super::progress::{ProgressReporter, ProgressSink};
use super::state::{Command, Effect, ReaderState};
use super::types::{ChapterId, Page, ResumeMode, TransitionDirection, TransitionMode};

/// Resolves a chapter's ordered page URLs (a network call upstream).
///
/// Failure surfaces as an error state on the session, never as a panic
/// into the display tree.
pub trait PageUrlResolver: Send + Sync {
    fn resolve_pages(&self, chapter: ChapterId) -> anyhow::Result<ResolvedPages>;
}

/// Routing collaborator notified when the session switches chapters at a
/// boundary. The session never manipulates routes itself.
pub trait ChapterNavigator {
    fn open_chapter(&mut self, chapter: ChapterId, resume: ResumeMode);
}

#[derive(Debug)]
enum PendingFetch {
    Open,
    Prefetch { direction: TransitionDirection },
}

/// One reading session, scoped to the reader being on screen
pub struct ReaderSession {
    state: ReaderState,
    chapters: ReaderChapters,
    source: SourceId,

    queue: SourceAwareQueue,
    cache: ResolvedPagesCache,
    resolver: Arc<dyn PageUrlResolver>,
    navigator: Box<dyn ChapterNavigator>,
    progress: ProgressReporter,

    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
    next_request_id: u64,
    pending: HashMap<RequestId, PendingFetch>,
    /// Chapter whose resolution will become the displayed page list
    pending_open: Option<(ChapterId, ResumeMode)>,
    /// Most recent open request, for whole-chapter retry
    last_open: Option<(ChapterId, ResumeMode)>,
}

impl ReaderSession {
    pub fn new(
        chapters: Vec<ReaderChapter>,
        current: ChapterId,
        source: SourceId,
        resolver: Arc<dyn PageUrlResolver>,
        navigator: Box<dyn ChapterNavigator>,
        progress_sink: Box<dyn ProgressSink>,
        settings: &ReaderSettings,
    ) -> anyhow::Result<Self> {
        let chapters = ReaderChapters::new(chapters, current, settings.chapter_preload)?;
        let state = ReaderState::new(
            settings.reading_mode,
            settings.reading_direction,
            settings.page_gap,
        );
        let progress = ProgressReporter::new(
            progress_sink,
            Duration::from_millis(settings.progress_debounce_ms),
        );
        let queue = SourceAwareQueue::new(settings.source_concurrency, settings.connections_limited);

        let (response_tx, response_rx) = flume::unbounded();

        Ok(Self {
            state,
            chapters,
            source,
            queue,
            cache: ResolvedPagesCache::new(DEFAULT_CACHE_SIZE),
            resolver,
            navigator,
            progress,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending: HashMap::new(),
            pending_open: None,
            last_open: None,
        })
    }

    /// Current page state (read-only; mutation goes through commands)
    #[must_use]
    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// Chapter window around the current chapter
    #[must_use]
    pub fn chapters(&self) -> &ReaderChapters {
        &self.chapters
    }

    /// Display units of the current chapter
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.state.pages
    }

    /// Get the response receiver for async usage
    #[must_use]
    pub fn response_receiver(&self) -> &Receiver<FetchResponse> {
        &self.response_rx
    }

    /// Open a chapter (host-initiated: route entry or chapter list click)
    pub fn open_chapter(
        &mut self,
        chapter: ChapterId,
        resume: ResumeMode,
    ) -> anyhow::Result<Vec<Effect>> {
        self.chapters.set_current(chapter)?;
        Ok(self.request_open(chapter, resume))
    }

    /// Apply a command to the reader state, executing internal effects.
    /// Returned effects are for the display layer (scroll directives).
    pub fn apply_command(&mut self, cmd: Command) -> Vec<Effect> {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects)
    }

    /// Scrolled onto the first/last page of the chapter with the
    /// adjacent chapter visible
    pub fn boundary_reached(&mut self, direction: TransitionDirection) -> Vec<Effect> {
        self.apply_command(Command::BeginTransition(direction))
    }

    /// A prefetched chapter was scrolled into view and is now interactive
    pub fn chapter_scrolled_into_view(&mut self, chapter: ChapterId) {
        self.chapters.mark_visible(chapter);
    }

    /// Retry resolution of the current chapter after a failure
    pub fn retry_chapter(&mut self) -> Vec<Effect> {
        let Some((chapter, resume)) = self.last_open else {
            return vec![];
        };
        self.cache.invalidate_chapter(chapter);
        self.request_open(chapter, resume)
    }

    /// Re-enable preloading toward a direction after a failure
    pub fn retry_direction(&mut self, direction: TransitionDirection) {
        self.chapters.resume_preload(direction);
        self.schedule_prefetch();
    }

    /// Drain completed fetches, applying their outcome to the state.
    /// Call from the host loop tick.
    pub fn poll_responses(&mut self) -> Vec<Effect> {
        let mut ui = Vec::new();

        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                FetchResponse::Pages { id, chapter, pages } => {
                    self.pending.remove(&id);
                    self.cache
                        .insert(CacheKey::for_chapter(chapter), pages.clone());
                    log::debug!("chapter {chapter}: {} pages resolved", pages.total());

                    if let Some((open, resume)) = self.pending_open {
                        if open == chapter {
                            self.pending_open = None;
                            ui.extend(self.apply_resolved(chapter, pages, resume));
                        }
                    }
                }

                FetchResponse::Error { id, chapter, error } => {
                    let pending = self.pending.remove(&id);
                    log::warn!("chapter {chapter} resolution failed: {error}");

                    if let Some(PendingFetch::Prefetch { direction }) = pending {
                        self.chapters.suspend_preload(direction);
                    }
                    if let Some((open, _)) = self.pending_open {
                        if open == chapter {
                            self.pending_open = None;
                            ui.extend(self.apply_command(Command::PagesUnavailable { chapter }));
                        }
                    }
                }
            }
        }

        ui
    }

    /// Discard the session: flush progress, drop queued fetches.
    /// In-flight fetches finish but their results go nowhere.
    pub fn teardown(&mut self) {
        let _ = self.apply_command(Command::Teardown);
        self.pending_open = None;
        self.pending.clear();
        self.queue.clear();
    }

    fn request_open(&mut self, chapter: ChapterId, resume: ResumeMode) -> Vec<Effect> {
        self.last_open = Some((chapter, resume));

        if let Some(pages) = self.cache.get(&CacheKey::for_chapter(chapter)) {
            log::debug!("chapter {chapter}: cache hit");
            let pages = ResolvedPages::clone(&pages);
            return self.apply_resolved(chapter, pages, resume);
        }

        self.pending_open = Some((chapter, resume));
        let key = pages_request_key(chapter);
        if self.queue.is_processing(&self.source, &key) {
            // Already resolving (a prefetch got there first); its response
            // will satisfy this open
            return vec![];
        }

        let id = self.next_id();
        self.pending.insert(id, PendingFetch::Open);
        self.submit(chapter, id, FetchPriority::Foreground);
        vec![]
    }

    fn apply_resolved(
        &mut self,
        chapter: ChapterId,
        pages: ResolvedPages,
        resume: ResumeMode,
    ) -> Vec<Effect> {
        let initial_page = match resume {
            ResumeMode::FirstPage => 0,
            ResumeMode::LastRead => self
                .chapters
                .get(chapter)
                .map_or(0, |c| c.last_page_read),
        };
        self.apply_command(Command::SetPages {
            chapter,
            urls: pages.urls,
            initial_page,
        })
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut ui = Vec::new();

        for effect in effects {
            match effect {
                Effect::ScrollToPage(_) | Effect::ScrollToStart(_) => ui.push(effect),

                Effect::ReportProgress {
                    chapter,
                    page_index,
                } => {
                    // Merely-prefetched chapters never pick up progress
                    // side effects
                    if !self.chapters.is_preload_only(chapter) {
                        self.progress.page_turned(chapter, page_index);
                    }
                }

                Effect::FlushProgress => self.progress.flush(),

                Effect::UpdatePrefetch => self.schedule_prefetch(),

                Effect::OpenNeighbor(direction) => {
                    ui.extend(self.open_neighbor(direction));
                }
            }
        }

        ui
    }

    fn open_neighbor(&mut self, direction: TransitionDirection) -> Vec<Effect> {
        let Some(chapter) = self.chapters.boundary_reached(direction) else {
            // Vetoed (no neighbor, or preload suspended): back to steady
            // reading
            self.state.transition = TransitionMode::None;
            return vec![];
        };

        let resume = match direction {
            TransitionDirection::Next => ResumeMode::FirstPage,
            TransitionDirection::Previous => ResumeMode::LastRead,
        };
        self.navigator.open_chapter(chapter, resume);

        if let Err(e) = self.chapters.set_current(chapter) {
            log::error!("chapter switch failed: {e}");
            self.state.transition = TransitionMode::None;
            return vec![];
        }
        self.request_open(chapter, resume)
    }

    fn schedule_prefetch(&mut self) {
        for direction in [TransitionDirection::Next, TransitionDirection::Previous] {
            while let Some(chapter) = self.chapters.expand_preload(direction) {
                self.request_prefetch(chapter.id, direction);
            }
        }
    }

    fn request_prefetch(&mut self, chapter: ChapterId, direction: TransitionDirection) {
        if self.cache.contains(&CacheKey::for_chapter(chapter)) {
            return;
        }
        let key = pages_request_key(chapter);
        if self.queue.is_processing(&self.source, &key) {
            return;
        }

        let id = self.next_id();
        self.pending
            .insert(id, PendingFetch::Prefetch { direction });
        self.submit(chapter, id, FetchPriority::Prefetch);
    }

    fn submit(&self, chapter: ChapterId, id: RequestId, priority: FetchPriority) {
        let resolver = Arc::clone(&self.resolver);
        let tx = self.response_tx.clone();

        self.queue
            .enqueue(&self.source, pages_request_key(chapter), priority, move || {
                let response = match resolver.resolve_pages(chapter) {
                    Ok(pages) => FetchResponse::Pages { id, chapter, pages },
                    Err(e) => FetchResponse::Error {
                        id,
                        chapter,
                        error: FetchFault::resolver(e),
                    },
                };
                let _ = tx.send(response);
            });
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
