//! Background generation jobs and the shared table clients poll.

use serde::Serialize;
use songdeck_pptx::{generate, GenerateOptions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub status: JobStatus,
    pub message: String,
    /// Stored name of the finished presentation in the output directory.
    pub output_file: Option<String>,
    pub created_at: SystemTime,
}

impl Job {
    fn new() -> Self {
        Self {
            status: JobStatus::Starting,
            message: "Starting processing...".to_string(),
            output_file: None,
            created_at: SystemTime::now(),
        }
    }

    /// Body of `GET /status/{id}`.
    pub fn status_response(&self) -> StatusResponse {
        let download_url = match (self.status, &self.output_file) {
            (JobStatus::Completed, Some(file)) => Some(format!("/download/{}", file)),
            _ => None,
        };
        StatusResponse {
            status: self.status,
            message: self.message.clone(),
            download_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Shared job table.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job in the `starting` state.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, Job::new());
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn update(&self, id: &Uuid, status: JobStatus, message: String, output: Option<String>) {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                job.status = status;
                job.message = message;
                if output.is_some() {
                    job.output_file = output;
                }
            }
            None => log::warn!("Job {} disappeared before it finished", id),
        }
    }

    /// Forget jobs created more than `retention` ago.
    pub async fn prune(&self, retention: Duration) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
            return 0;
        };
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        before - jobs.len()
    }

    /// Run one generation on the blocking pool and record how it ended.
    ///
    /// A panic inside the generator only fails this job.
    pub async fn run(&self, id: Uuid, options: GenerateOptions, output_file: String) {
        self.update(&id, JobStatus::Processing, "Parsing songs...".to_string(), None)
            .await;
        log::info!("Job {} started", id);

        let result = tokio::task::spawn_blocking(move || generate(&options)).await;

        match result {
            Ok(outcome) if outcome.success => {
                log::info!("Job {} completed: {}", id, outcome.message);
                self.update(
                    &id,
                    JobStatus::Completed,
                    format!("Successfully generated {} slides!", outcome.slide_count),
                    Some(output_file),
                )
                .await;
            }
            Ok(outcome) => {
                log::warn!("Job {} failed: {}", id, outcome.message);
                self.update(&id, JobStatus::Error, format!("Error: {}", outcome.message), None)
                    .await;
            }
            Err(err) => {
                let reason = panic_message(err);
                log::error!("Job {} crashed: {}", id, reason);
                self.update(
                    &id,
                    JobStatus::Error,
                    format!("Unexpected error: {}", reason),
                    None,
                )
                .await;
            }
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "generator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_job_is_starting() {
        let jobs = JobRegistry::new();
        let id = jobs.create().await;
        let job = jobs.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Starting);
        assert!(job.status_response().download_url.is_none());
        assert_eq!(jobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_status_response_serialization() {
        let job = Job {
            status: JobStatus::Completed,
            message: "Successfully generated 3 slides!".to_string(),
            output_file: Some("abc_deck.pptx".to_string()),
            created_at: SystemTime::now(),
        };
        let json = serde_json::to_value(job.status_response()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["download_url"], "/download/abc_deck.pptx");

        let pending = Job::new();
        let json = serde_json::to_value(pending.status_response()).unwrap();
        assert_eq!(json["status"], "starting");
        assert!(json.get("download_url").is_none());
    }

    #[tokio::test]
    async fn test_run_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = JobRegistry::new();
        let id = jobs.create().await;

        let options = GenerateOptions::new(dir.path().join("missing.txt"), dir.path().join("out"));
        jobs.run(id, options, "out.pptx".to_string()).await;

        let job = jobs.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.message.starts_with("Error: File not found: "));
        assert!(job.output_file.is_none());
    }

    #[tokio::test]
    async fn test_run_records_success() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("songs.txt");
        std::fs::write(&input, "# One\na\n\nb\n\n# Two\nc\n").unwrap();
        let jobs = JobRegistry::new();
        let id = jobs.create().await;

        let options = GenerateOptions::new(&input, dir.path().join("deck.pptx"));
        jobs.run(id, options, "deck.pptx".to_string()).await;

        let job = jobs.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.message, "Successfully generated 3 slides!");
        assert_eq!(job.output_file.as_deref(), Some("deck.pptx"));
        assert!(dir.path().join("deck.pptx").exists());
    }

    #[tokio::test]
    async fn test_prune() {
        let jobs = JobRegistry::new();
        jobs.create().await;
        assert_eq!(jobs.prune(Duration::from_secs(3600)).await, 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(jobs.prune(Duration::ZERO).await, 1);
        assert!(jobs.is_empty().await);
    }
}
