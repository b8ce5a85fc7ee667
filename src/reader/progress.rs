//! Reading-progress reporting
//!
//! The session pushes last-read positions to a [`ProgressSink`] past a
//! debounce threshold. Reporting is fire-and-forget: failures are logged
//! and surfaced elsewhere, never retried here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::types::ChapterId;

/// Destination for last-read-page updates (normally the server)
pub trait ProgressSink {
    fn update_last_read(&mut self, chapter: ChapterId, page_index: usize) -> anyhow::Result<()>;
}

/// Debounces progress updates so page flipping does not flood the sink
pub struct ProgressReporter {
    sink: Box<dyn ProgressSink>,
    debounce: Duration,
    last_sent_at: Option<Instant>,
    pending: Option<(ChapterId, usize)>,
    last_sent: Option<(ChapterId, usize)>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(sink: Box<dyn ProgressSink>, debounce: Duration) -> Self {
        Self {
            sink,
            debounce,
            last_sent_at: None,
            pending: None,
            last_sent: None,
        }
    }

    /// Record a page turn. Sends immediately on chapter change or once
    /// the debounce window has elapsed; otherwise the position is kept
    /// pending for [`flush`](Self::flush).
    pub fn page_turned(&mut self, chapter: ChapterId, page_index: usize) {
        self.pending = Some((chapter, page_index));

        let chapter_changed = self.last_sent.is_none_or(|(last, _)| last != chapter);
        let due = self
            .last_sent_at
            .is_none_or(|at| at.elapsed() >= self.debounce);

        if chapter_changed || due {
            self.send();
        }
    }

    /// Push the pending position, if any. Called on teardown so the
    /// resume point survives even a quick exit.
    pub fn flush(&mut self) {
        self.send();
    }

    fn send(&mut self) {
        let Some((chapter, page_index)) = self.pending.take() else {
            return;
        };
        if self.last_sent == Some((chapter, page_index)) {
            return;
        }

        if let Err(e) = self.sink.update_last_read(chapter, page_index) {
            log::warn!("progress update for chapter {chapter} failed: {e}");
        }
        self.last_sent = Some((chapter, page_index));
        self.last_sent_at = Some(Instant::now());
    }
}

/// Last-read position as stored by [`FileProgressSink`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub page_index: usize,
    pub last_read: chrono::DateTime<chrono::Utc>,
}

/// File-backed sink for hosts without a server connection.
///
/// Ephemeral by default; with a file path every update is persisted as
/// pretty JSON.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FileProgressSink {
    chapters: HashMap<String, ProgressEntry>,
    #[serde(skip)]
    file_path: Option<String>,
}

impl FileProgressSink {
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(file_path: &str) -> Self {
        Self {
            chapters: HashMap::new(),
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&str>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load progress from {path}: {e}");
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let path = Path::new(file_path);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut sink: Self = serde_json::from_str(&content)?;
            sink.file_path = Some(file_path.to_string());
            Ok(sink)
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                let content = serde_json::to_string_pretty(self)?;
                fs::write(path, content)?;
                Ok(())
            }
            // Ephemeral sinks don't touch disk
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn get(&self, chapter: ChapterId) -> Option<&ProgressEntry> {
        self.chapters.get(&chapter.to_string())
    }

    #[must_use]
    pub fn most_recent(&self) -> Option<(ChapterId, &ProgressEntry)> {
        self.chapters
            .iter()
            .max_by_key(|(_, entry)| entry.last_read)
            .and_then(|(key, entry)| key.parse().ok().map(|id| (ChapterId(id), entry)))
    }
}

impl ProgressSink for FileProgressSink {
    fn update_last_read(&mut self, chapter: ChapterId, page_index: usize) -> anyhow::Result<()> {
        self.chapters.insert(
            chapter.to_string(),
            ProgressEntry {
                page_index,
                last_read: chrono::Utc::now(),
            },
        );
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        updates: Arc<Mutex<Vec<(ChapterId, usize)>>>,
    }

    impl ProgressSink for RecordingSink {
        fn update_last_read(&mut self, chapter: ChapterId, page_index: usize) -> anyhow::Result<()> {
            self.updates.lock().unwrap().push((chapter, page_index));
            Ok(())
        }
    }

    #[test]
    fn zero_debounce_sends_every_turn() {
        let sink = RecordingSink::default();
        let updates = Arc::clone(&sink.updates);
        let mut reporter = ProgressReporter::new(Box::new(sink), Duration::ZERO);

        reporter.page_turned(ChapterId(1), 0);
        reporter.page_turned(ChapterId(1), 1);
        reporter.page_turned(ChapterId(1), 2);

        assert_eq!(
            *updates.lock().unwrap(),
            vec![(ChapterId(1), 0), (ChapterId(1), 1), (ChapterId(1), 2)]
        );
    }

    #[test]
    fn debounce_holds_back_rapid_turns_until_flush() {
        let sink = RecordingSink::default();
        let updates = Arc::clone(&sink.updates);
        let mut reporter = ProgressReporter::new(Box::new(sink), Duration::from_secs(60));

        reporter.page_turned(ChapterId(1), 0);
        reporter.page_turned(ChapterId(1), 1);
        reporter.page_turned(ChapterId(1), 2);

        // First turn went out, the rest are pending
        assert_eq!(*updates.lock().unwrap(), vec![(ChapterId(1), 0)]);

        reporter.flush();
        assert_eq!(
            *updates.lock().unwrap(),
            vec![(ChapterId(1), 0), (ChapterId(1), 2)]
        );
    }

    #[test]
    fn chapter_change_bypasses_debounce() {
        let sink = RecordingSink::default();
        let updates = Arc::clone(&sink.updates);
        let mut reporter = ProgressReporter::new(Box::new(sink), Duration::from_secs(60));

        reporter.page_turned(ChapterId(1), 5);
        reporter.page_turned(ChapterId(2), 0);

        assert_eq!(
            *updates.lock().unwrap(),
            vec![(ChapterId(1), 5), (ChapterId(2), 0)]
        );
    }

    #[test]
    fn flush_without_pending_is_noop() {
        let sink = RecordingSink::default();
        let updates = Arc::clone(&sink.updates);
        let mut reporter = ProgressReporter::new(Box::new(sink), Duration::ZERO);

        reporter.page_turned(ChapterId(1), 3);
        reporter.flush();
        reporter.flush();

        assert_eq!(*updates.lock().unwrap(), vec![(ChapterId(1), 3)]);
    }

    #[test]
    fn file_sink_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let path = path.to_str().unwrap();

        let mut sink = FileProgressSink::with_file(path);
        sink.update_last_read(ChapterId(12), 7).unwrap();

        let restored = FileProgressSink::load_from_file(path).unwrap();
        assert_eq!(restored.get(ChapterId(12)).unwrap().page_index, 7);
    }

    #[test]
    fn ephemeral_sink_never_touches_disk() {
        let mut sink = FileProgressSink::ephemeral();
        sink.update_last_read(ChapterId(1), 3).unwrap();
        assert_eq!(sink.get(ChapterId(1)).unwrap().page_index, 3);
    }

    #[test]
    fn most_recent_tracks_latest_update() {
        let mut sink = FileProgressSink::ephemeral();
        sink.update_last_read(ChapterId(1), 3).unwrap();
        sink.update_last_read(ChapterId(2), 0).unwrap();

        let (chapter, _) = sink.most_recent().unwrap();
        assert_eq!(chapter, ChapterId(2));
    }
}
