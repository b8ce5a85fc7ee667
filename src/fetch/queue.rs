//! Per-source fetch queue
//!
//! Bounds concurrent outbound work per upstream source so one slow source
//! cannot be overwhelmed, while unrelated sources never rate-limit each
//! other. The local source has no network behind it and bypasses the
//! limit. When the environment signals a constrained connection pool
//! (HTTP/1.1), all sources collapse into a single shared lane.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::request::{FetchPriority, SourceId};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum LaneKey {
    Shared,
    Source(SourceId),
}

struct QueuedJob {
    key: String,
    priority: FetchPriority,
    run: Job,
}

struct Lane {
    limit: usize,
    active: Vec<String>,
    pending: VecDeque<QueuedJob>,
}

impl Lane {
    fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            active: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Admit a job if a slot is free, otherwise park it in priority order
    fn admit(&mut self, job: QueuedJob) -> Option<QueuedJob> {
        if self.active.len() < self.limit {
            self.active.push(job.key.clone());
            return Some(job);
        }
        // Foreground jobs go ahead of parked prefetches; FIFO within a
        // priority class
        let position = self
            .pending
            .iter()
            .position(|queued| queued.priority < job.priority)
            .unwrap_or(self.pending.len());
        self.pending.insert(position, job);
        None
    }

    /// Release the slot held by `key` and hand out the next parked job
    fn finish(&mut self, key: &str) -> Option<QueuedJob> {
        if let Some(index) = self.active.iter().position(|k| k == key) {
            self.active.swap_remove(index);
        }
        let next = self.pending.pop_front()?;
        self.active.push(next.key.clone());
        Some(next)
    }

    fn is_processing(&self, key: &str) -> bool {
        self.active.iter().any(|k| k == key) || self.pending.iter().any(|j| j.key == key)
    }
}

struct Inner {
    lanes: HashMap<LaneKey, Lane>,
    per_source_limit: usize,
    connections_limited: bool,
}

/// Queue of outbound fetch work, one lane per upstream source
#[derive(Clone)]
pub struct SourceAwareQueue {
    inner: Arc<Mutex<Inner>>,
}

impl SourceAwareQueue {
    /// Create a queue with a per-source concurrency limit.
    ///
    /// `connections_limited` collapses every source into one shared lane.
    #[must_use]
    pub fn new(per_source_limit: usize, connections_limited: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                lanes: HashMap::new(),
                per_source_limit: per_source_limit.max(1),
                connections_limited,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Submit work for a source.
    ///
    /// `key` identifies the request so callers can avoid duplicate
    /// submission via [`is_processing`](Self::is_processing); duplicates
    /// are tolerated, not rejected.
    pub fn enqueue(
        &self,
        source: &SourceId,
        key: impl Into<String>,
        priority: FetchPriority,
        job: impl FnOnce() + Send + 'static,
    ) {
        let job = QueuedJob {
            key: key.into(),
            priority,
            run: Box::new(job),
        };

        let mut inner = self.lock();
        let lane_key = lane_key_for(source, inner.connections_limited);
        let limit = lane_limit(source, &inner);
        let lane = inner
            .lanes
            .entry(lane_key.clone())
            .or_insert_with(|| Lane::new(limit));
        let admitted = lane.admit(job);
        drop(inner);

        if let Some(job) = admitted {
            self.spawn_worker(lane_key, job);
        } else {
            log::trace!("fetch parked; lane at limit {limit}");
        }
    }

    /// A worker runs its admitted job, then keeps draining the lane until
    /// no parked work remains. This caps live threads per lane at the
    /// lane's limit.
    fn spawn_worker(&self, lane_key: LaneKey, job: QueuedJob) {
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || {
            let mut current = job;
            loop {
                let QueuedJob { key, run, .. } = current;
                run();

                let mut guard = inner
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let Some(lane) = guard.lanes.get_mut(&lane_key) else {
                    break;
                };
                match lane.finish(&key) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        });
    }

    /// Whether work with this identity is queued or in flight
    #[must_use]
    pub fn is_processing(&self, source: &SourceId, key: &str) -> bool {
        let inner = self.lock();
        let lane_key = lane_key_for(source, inner.connections_limited);
        inner
            .lanes
            .get(&lane_key)
            .is_some_and(|lane| lane.is_processing(key))
    }

    /// Jobs currently executing for a source
    #[must_use]
    pub fn active_count(&self, source: &SourceId) -> usize {
        let inner = self.lock();
        let lane_key = lane_key_for(source, inner.connections_limited);
        inner.lanes.get(&lane_key).map_or(0, |l| l.active.len())
    }

    /// Jobs parked behind the concurrency limit for a source
    #[must_use]
    pub fn queued_count(&self, source: &SourceId) -> usize {
        let inner = self.lock();
        let lane_key = lane_key_for(source, inner.connections_limited);
        inner.lanes.get(&lane_key).map_or(0, |l| l.pending.len())
    }

    /// Drop all queued work across all sources. In-flight jobs finish;
    /// full client reset only, not a normal-path operation.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let dropped: usize = inner.lanes.values().map(|l| l.pending.len()).sum();
        for lane in inner.lanes.values_mut() {
            lane.pending.clear();
        }
        if dropped > 0 {
            log::debug!("cleared {dropped} queued fetches");
        }
    }
}

fn lane_key_for(source: &SourceId, connections_limited: bool) -> LaneKey {
    if connections_limited {
        LaneKey::Shared
    } else {
        LaneKey::Source(source.clone())
    }
}

fn lane_limit(source: &SourceId, inner: &Inner) -> usize {
    if inner.connections_limited {
        inner.per_source_limit
    } else if source.is_local() {
        usize::MAX
    } else {
        inner.per_source_limit
    }
}
