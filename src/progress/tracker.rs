//! Pollable progress state for one crawl job
//!
//! A job has exactly one writer (its background pipeline task) and any
//! number of readers polling snapshots. Writers go through
//! [`CrawlProgressTracker`], which maps stage-local percentages onto
//! the overall scale and notifies the registered subscriber.

use super::{CrawlStage, CrawlStatus, HeartbeatManager, ProgressMapper, ProgressUpdate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Notification hook exposed to the polling/API layer: called with the
/// job id and the freshly merged state after every update.
pub type ProgressSubscriber = Arc<dyn Fn(&str, &ProgressState) + Send + Sync>;

/// The externally visible state record for one job
#[derive(Debug, Clone, Serialize)]
pub struct ProgressState {
    pub status: CrawlStatus,
    /// Overall progress in [0, 100]; non-decreasing except that failed
    /// and cancelled transitions freeze it in place
    pub overall_percent: u8,
    /// Last human-readable progress message
    pub log: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stage-specific fields: crawl_type, source_id, processed_pages,
    /// total_pages, chunks_stored, code_examples_found, error, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressState {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            status: CrawlStatus::Starting,
            overall_percent: 0,
            log: String::new(),
            started_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }
}

/// Holds the mutable [`ProgressState`] behind a read-write lock
///
/// All mutations merge in place. Percent updates are clamped to be
/// non-decreasing; the `error` and `cancel` transitions freeze the
/// percentage at its last value instead.
pub struct ProgressTracker {
    state: RwLock<ProgressState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ProgressState::new()),
        }
    }

    /// Marks the job as started, seeding any initial metadata
    pub fn start(&self, initial: Map<String, Value>) -> ProgressState {
        let mut state = self.state.write().unwrap();
        state.status = CrawlStatus::Starting;
        state.log = "Crawl job accepted".to_string();
        state.updated_at = Utc::now();
        state.extra.extend(initial);
        state.clone()
    }

    /// Merges a regular (non-terminal) update into the state
    pub fn update(
        &self,
        status: CrawlStatus,
        percent: u8,
        log: &str,
        extra: Map<String, Value>,
    ) -> ProgressState {
        let mut state = self.state.write().unwrap();
        state.status = status;
        state.overall_percent = state.overall_percent.max(percent.min(100));
        state.log = log.to_string();
        state.updated_at = Utc::now();
        state.extra.extend(extra);
        state.clone()
    }

    /// Terminal success: pins the percentage at 100
    pub fn complete(&self, extra: Map<String, Value>) -> ProgressState {
        let mut state = self.state.write().unwrap();
        state.status = CrawlStatus::Completed;
        state.overall_percent = 100;
        state.log = "Crawl completed".to_string();
        state.updated_at = Utc::now();
        state.extra.extend(extra);
        state.clone()
    }

    /// Terminal failure: records the message and freezes the percentage
    pub fn error(&self, message: &str) -> ProgressState {
        let mut state = self.state.write().unwrap();
        state.status = CrawlStatus::Failed;
        state.log = message.to_string();
        state.updated_at = Utc::now();
        state
            .extra
            .insert("error".to_string(), Value::String(message.to_string()));
        state.clone()
    }

    /// Terminal cancellation: freezes the percentage
    pub fn cancelled(&self, message: &str) -> ProgressState {
        let mut state = self.state.write().unwrap();
        state.status = CrawlStatus::Cancelled;
        state.log = message.to_string();
        state.updated_at = Utc::now();
        state.clone()
    }

    /// Returns a point-in-time copy for pollers
    pub fn snapshot(&self) -> ProgressState {
        self.state.read().unwrap().clone()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Crawl-stage-aware facade over [`ProgressTracker`] + [`ProgressMapper`]
///
/// Every update goes through the mapper and then out to the subscriber.
/// The subscriber is notified even in headless mode (no underlying
/// tracker), so callers relying solely on the callback keep working.
#[derive(Clone)]
pub struct CrawlProgressTracker {
    job_id: String,
    tracker: Option<Arc<ProgressTracker>>,
    mapper: ProgressMapper,
    subscriber: Option<ProgressSubscriber>,
}

impl CrawlProgressTracker {
    pub fn new(
        job_id: impl Into<String>,
        tracker: Arc<ProgressTracker>,
        subscriber: Option<ProgressSubscriber>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            tracker: Some(tracker),
            mapper: ProgressMapper::new(),
            subscriber,
        }
    }

    /// A tracker-less variant that only notifies the subscriber
    pub fn headless(job_id: impl Into<String>, subscriber: Option<ProgressSubscriber>) -> Self {
        Self {
            job_id: job_id.into(),
            tracker: None,
            mapper: ProgressMapper::new(),
            subscriber,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Maps a stage-local percentage to the overall scale, merges the
    /// update, and notifies the subscriber.
    pub fn update_mapped(
        &self,
        stage: CrawlStage,
        stage_percent: u8,
        log: &str,
        extra: Map<String, Value>,
    ) {
        let overall = self.mapper.map_progress(stage, stage_percent);
        let state = match &self.tracker {
            Some(tracker) => tracker.update(stage.into(), overall, log, extra),
            None => {
                // Headless: synthesize a state for subscribers only.
                let mut state = ProgressState::new();
                state.status = stage.into();
                state.overall_percent = overall;
                state.log = log.to_string();
                state.extra = extra;
                state
            }
        };
        self.notify(&state);
    }

    pub fn start(&self, initial: Map<String, Value>) {
        if let Some(tracker) = &self.tracker {
            let state = tracker.start(initial);
            self.notify(&state);
        }
    }

    pub fn complete(&self, extra: Map<String, Value>) {
        if let Some(tracker) = &self.tracker {
            let state = tracker.complete(extra);
            self.notify(&state);
        }
    }

    pub fn fail(&self, message: &str) {
        if let Some(tracker) = &self.tracker {
            let state = tracker.error(message);
            self.notify(&state);
        }
    }

    pub fn cancelled(&self, message: &str) {
        if let Some(tracker) = &self.tracker {
            let state = tracker.cancelled(message);
            self.notify(&state);
        }
    }

    pub fn snapshot(&self) -> Option<ProgressState> {
        self.tracker.as_ref().map(|t| t.snapshot())
    }

    fn notify(&self, state: &ProgressState) {
        if let Some(subscriber) = &self.subscriber {
            subscriber(&self.job_id, state);
        }
    }
}

/// Stage-bound progress reporter handed into fetch strategies
///
/// Bundles the stage tag, the job's tracker, and a heartbeat throttle
/// into one value so strategies never capture orchestrator internals.
pub struct StageReporter {
    stage: CrawlStage,
    tracker: CrawlProgressTracker,
    heartbeat: Mutex<HeartbeatManager>,
}

impl StageReporter {
    pub fn new(stage: CrawlStage, tracker: CrawlProgressTracker, interval: Duration) -> Self {
        let sink = tracker.clone();
        let heartbeat = HeartbeatManager::new(interval).with_callback(Box::new(
            move |update: &ProgressUpdate| {
                let mut extra = Map::new();
                extra.insert("processed_pages".to_string(), update.processed.into());
                extra.insert("total_pages".to_string(), update.total.into());
                sink.update_mapped(update.stage, update.percent, &update.log, extra);
            },
        ));
        Self {
            stage,
            tracker,
            heartbeat: Mutex::new(heartbeat),
        }
    }

    pub fn stage(&self) -> CrawlStage {
        self.stage
    }

    /// Heartbeat-throttled per-unit report; `processed` of `total`
    /// units are done. Returns whether the update went out.
    pub fn report(&self, processed: usize, total: usize, log: &str) -> bool {
        let percent = if total == 0 {
            100
        } else {
            ((processed * 100) / total).min(100) as u8
        };
        let update = ProgressUpdate {
            stage: self.stage,
            percent,
            processed,
            total,
            log: log.to_string(),
        };
        self.heartbeat.lock().unwrap().send_if_needed(&update)
    }

    /// Unthrottled update used at stage boundaries; also forces the
    /// next heartbeat through so in-stage reporting starts fresh.
    pub fn boundary(&self, stage_percent: u8, log: &str, extra: Map<String, Value>) {
        self.heartbeat.lock().unwrap().reset();
        self.tracker.update_mapped(self.stage, stage_percent, log, extra);
    }
}
