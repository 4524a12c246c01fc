//! Background training jobs with status polling and cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::service::TabularService;
use crate::training::{Hyperparameters, TrainingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Arguments of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub dataset: String,
    pub target_column: String,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded(TrainingResult),
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded(_) | JobStatus::Failed(_) | JobStatus::Cancelled
        )
    }
}

struct JobSlot {
    status: Mutex<JobStatus>,
    changed: Condvar,
    cancel: AtomicBool,
}

impl JobSlot {
    fn set(&self, status: JobStatus) {
        let mut current = self.status.lock().unwrap_or_else(|err| err.into_inner());
        *current = status;
        self.changed.notify_all();
    }

    fn get(&self) -> JobStatus {
        self.status
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

/// Runs each submitted training request on its own worker thread.
pub struct TrainingJobs {
    service: Arc<TabularService>,
    next_id: AtomicU64,
    slots: Mutex<HashMap<JobId, Arc<JobSlot>>>,
}

impl TrainingJobs {
    pub fn new(service: Arc<TabularService>) -> Self {
        Self {
            service,
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn submit(&self, request: TrainingRequest) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(JobSlot {
            status: Mutex::new(JobStatus::Queued),
            changed: Condvar::new(),
            cancel: AtomicBool::new(false),
        });
        self.slots
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .insert(id, slot.clone());
        info!(
            "Queued {id}: train '{}' on target '{}'",
            request.dataset, request.target_column
        );

        let service = self.service.clone();
        std::thread::spawn(move || run_job(id, &service, &slot, &request));
        id
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.slot(id).map(|slot| slot.get())
    }

    /// Ask a job to stop; returns `false` for unknown or already finished jobs.
    ///
    /// A running job stops at the next tree boundary.
    pub fn cancel(&self, id: JobId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        if slot.get().is_finished() {
            return false;
        }
        slot.cancel.store(true, Ordering::Relaxed);
        info!("Cancellation requested for {id}");
        true
    }

    /// Block until the job reaches a final state.
    pub fn wait(&self, id: JobId) -> Option<JobStatus> {
        let slot = self.slot(id)?;
        let mut status = slot.status.lock().unwrap_or_else(|err| err.into_inner());
        while !status.is_finished() {
            status = slot
                .changed
                .wait(status)
                .unwrap_or_else(|err| err.into_inner());
        }
        Some(status.clone())
    }

    /// Remove a finished job and return its final status.
    ///
    /// Queued and running jobs stay registered and yield `None`.
    pub fn take(&self, id: JobId) -> Option<JobStatus> {
        let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());
        let status = slots.get(&id)?.get();
        if !status.is_finished() {
            return None;
        }
        slots.remove(&id);
        Some(status)
    }

    /// Number of jobs still registered.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|err| err.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: JobId) -> Option<Arc<JobSlot>> {
        self.slots
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .get(&id)
            .cloned()
    }
}

fn run_job(id: JobId, service: &TabularService, slot: &JobSlot, request: &TrainingRequest) {
    if slot.cancel.load(Ordering::Relaxed) {
        info!("{id} cancelled before start");
        slot.set(JobStatus::Cancelled);
        return;
    }
    slot.set(JobStatus::Running);
    info!("{id} running");
    let result = service.train_with_cancel(
        &request.dataset,
        &request.target_column,
        &request.hyperparameters,
        Some(&slot.cancel),
    );
    let status = match result {
        Ok(result) => {
            info!("{id} succeeded: accuracy {:.4}", result.accuracy);
            JobStatus::Succeeded(result)
        }
        Err(ServiceError::Cancelled) => {
            info!("{id} cancelled");
            JobStatus::Cancelled
        }
        Err(err) => {
            warn!("{id} failed: {err}");
            JobStatus::Failed(err.to_string())
        }
    };
    slot.set(status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use tempfile::tempdir;

    fn service_with_dataset(root: &std::path::Path) -> Arc<TabularService> {
        let config = StorageConfig::rooted_at(root);
        config.ensure_dirs().unwrap();
        let mut csv = String::from("x,label\n");
        for i in 0..20 {
            csv.push_str(&format!("{i},{}\n", if i < 10 { "lo" } else { "hi" }));
        }
        std::fs::write(config.datasets_dir.join("line.csv"), csv).unwrap();
        Arc::new(TabularService::new(config))
    }

    fn request(dataset: &str) -> TrainingRequest {
        TrainingRequest {
            dataset: dataset.to_string(),
            target_column: "label".to_string(),
            hyperparameters: Hyperparameters {
                n_estimators: 5,
                ..Hyperparameters::default()
            },
        }
    }

    #[test]
    fn job_runs_to_success() {
        let dir = tempdir().unwrap();
        let jobs = TrainingJobs::new(service_with_dataset(dir.path()));
        let id = jobs.submit(request("line.csv"));
        let status = jobs.wait(id).unwrap();
        let JobStatus::Succeeded(result) = status.clone() else {
            panic!("unexpected status {status:?}");
        };
        assert!(result.model_path.is_file());
        assert_eq!(jobs.status(id), Some(JobStatus::Succeeded(result)));
    }

    #[test]
    fn failure_keeps_error_text() {
        let dir = tempdir().unwrap();
        let jobs = TrainingJobs::new(service_with_dataset(dir.path()));
        let id = jobs.submit(request("missing.csv"));
        assert_eq!(
            jobs.wait(id),
            Some(JobStatus::Failed("Dataset not found.".to_string()))
        );
        assert!(!jobs.cancel(id));
    }

    #[test]
    fn taken_job_is_forgotten() {
        let dir = tempdir().unwrap();
        let jobs = TrainingJobs::new(service_with_dataset(dir.path()));
        let id = jobs.submit(request("line.csv"));
        let finished = jobs.wait(id).unwrap();
        assert_eq!(jobs.len(), 1);

        assert_eq!(jobs.take(id), Some(finished));
        assert!(jobs.is_empty());
        assert_eq!(jobs.status(id), None);
        assert_eq!(jobs.take(id), None);
    }

    #[test]
    fn unknown_job_has_no_status() {
        let dir = tempdir().unwrap();
        let jobs = TrainingJobs::new(service_with_dataset(dir.path()));
        assert_eq!(jobs.status(JobId(99)), None);
        assert!(!jobs.cancel(JobId(99)));
        assert_eq!(jobs.wait(JobId(99)), None);
    }
}
