//! Process-wide registry of running crawl jobs
//!
//! Maps job ids to their live coordinators so an external cancellation
//! API can look a job up and call `cancel()` on it. Entries are
//! inserted when a job is orchestrated and removed unconditionally on
//! every terminal path. A crashed job must never appear "stuck" here.

use super::CrawlOrchestrationCoordinator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of in-flight jobs, guarded by a single async mutex
///
/// Registry operations are rare relative to steady-state crawling, so
/// one lock is never a contention concern. Constructed explicitly and
/// shared via `Arc` rather than living as a module-level global.
#[derive(Default)]
pub struct OrchestrationRegistry {
    jobs: Mutex<HashMap<String, Arc<CrawlOrchestrationCoordinator>>>,
}

impl OrchestrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, job_id: &str, coordinator: Arc<CrawlOrchestrationCoordinator>) {
        let mut jobs = self.jobs.lock().await;
        if jobs.insert(job_id.to_string(), coordinator).is_some() {
            tracing::warn!("Job {} was already registered, replacing entry", job_id);
        }
    }

    pub async fn unregister(&self, job_id: &str) {
        let mut jobs = self.jobs.lock().await;
        if jobs.remove(job_id).is_none() {
            tracing::debug!("Job {} was not registered at unregister time", job_id);
        }
    }

    /// Looks up the live coordinator for a job, if it is still running
    pub async fn get(&self, job_id: &str) -> Option<Arc<CrawlOrchestrationCoordinator>> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// Ids of every currently registered job
    pub async fn active_jobs(&self) -> Vec<String> {
        self.jobs.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
