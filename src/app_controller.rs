use anyhow::Result;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::app_config::Config;
use crate::errors::{JobError, SubtitleError};
use crate::subtitle_processor::{SrtDocument, SubtitleEntry};
use crate::translation::batch::INITIAL_PROGRESS;
use crate::translation::{BatchScheduler, GeminiTranslationClient, TranslationClient};

// @module: Job table and sequential job queue

/// Process-local identifier of an uploaded file
pub type JobId = Uuid;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

// @struct: One uploaded file moving through parse, translate and export
#[derive(Debug, Clone)]
pub struct FileJob {
    // @field: Stable id assigned at upload
    pub file_id: JobId,

    // @field: Original file name
    pub file_name: String,

    // @field: Parsed entries, never modified
    pub original_entries: Arc<[SubtitleEntry]>,

    // @field: Translated entries, empty until completed
    pub translated_entries: Arc<[SubtitleEntry]>,

    // @field: Free-text style hint for the model
    pub style_prompt: String,

    // @field: Lifecycle state
    pub state: JobState,

    // @field: 0-100
    pub progress_percent: u8,

    // @field: Set only while failed
    pub last_error: Option<String>,

    // @field: Blocks the parser discarded
    pub dropped_blocks: usize,
}

impl FileJob {
    /// Name of the translated file offered for download
    pub fn output_file_name(&self) -> String {
        format!("translated_{}", self.file_name)
    }

    /// Number of subtitle entries parsed from the file
    pub fn entry_count(&self) -> usize {
        self.original_entries.len()
    }
}

/// Output of a completed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFile {
    /// `translated_<original name>`
    pub file_name: String,
    /// SRT text
    pub content: String,
}

impl TranslatedFile {
    /// Content as bytes, ready to be written
    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

/// Outcome counts of one queue run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct JobTable {
    jobs: HashMap<JobId, FileJob>,
    // Upload order, used for listing and queueing
    order: Vec<JobId>,
    // Jobs waiting in the active queue run
    queued: HashSet<JobId>,
}

impl JobTable {
    // @transitions: Idle/Failed -> Processing, atomically with the busy checks
    fn begin(&mut self, id: JobId, from_queue: bool) -> Result<(Arc<[SubtitleEntry]>, String), JobError> {
        if !from_queue && self.queued.contains(&id) {
            return Err(JobError::Busy(id.to_string()));
        }

        let job = self.jobs.get_mut(&id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        match job.state {
            JobState::Processing => return Err(JobError::Busy(id.to_string())),
            JobState::Completed => return Err(JobError::AlreadyCompleted(id.to_string())),
            JobState::Idle | JobState::Failed => {}
        }
        if job.original_entries.is_empty() {
            return Err(JobError::NoEntries(id.to_string()));
        }

        job.state = JobState::Processing;
        job.progress_percent = INITIAL_PROGRESS;
        job.last_error = None;
        job.translated_entries = Arc::from(Vec::new());
        Ok((Arc::clone(&job.original_entries), job.style_prompt.clone()))
    }
}

// Clears the running flag and the queued set when a queue run ends
struct QueueGuard {
    running: Arc<AtomicBool>,
    jobs: Arc<Mutex<JobTable>>,
}

impl Drop for QueueGuard {
    fn drop(&mut self) {
        self.jobs.lock().queued.clear();
        self.running.store(false, Ordering::SeqCst);
    }
}

// Fails a job whose run was dropped before the scheduler returned
struct RunGuard {
    jobs: Arc<Mutex<JobTable>>,
    id: JobId,
    finished: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(job) = self.jobs.lock().jobs.get_mut(&self.id) {
            if job.state == JobState::Processing {
                job.state = JobState::Failed;
                job.last_error = Some("Interrupted before completion".to_string());
                warn!("Run of {} was interrupted", job.file_name);
            }
        }
    }
}

/// Owns every job and runs them through the batch scheduler
///
/// Cloning is cheap and every clone shares the same job table, so a front end
/// can keep listing jobs while a queue run is in progress.
#[derive(Clone)]
pub struct Controller {
    // @field: Job table, never locked across an await
    jobs: Arc<Mutex<JobTable>>,

    // @field: Set while a queue run is active
    queue_running: Arc<AtomicBool>,

    // @field: Scheduler shared by queue runs and retries
    scheduler: Arc<BatchScheduler>,
}

impl Controller {
    /// Create a controller translating through the given client
    pub fn new(client: Arc<dyn TranslationClient>) -> Self {
        Self::with_scheduler(BatchScheduler::new(client))
    }

    /// Create a controller around a preconfigured scheduler
    pub fn with_scheduler(scheduler: BatchScheduler) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(JobTable::default())),
            queue_running: Arc::new(AtomicBool::new(false)),
            scheduler: Arc::new(scheduler),
        }
    }

    // @method: Create a controller talking to Gemini with the given configuration
    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = GeminiTranslationClient::from_config(config);
        Ok(Self::new(Arc::new(client)))
    }

    /// Parse an uploaded file and register it as a job
    ///
    /// A file without usable entries still becomes a job, directly in the
    /// failed state, so the caller can show why it was rejected.
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> FileJob {
        let content = String::from_utf8_lossy(bytes);
        let document = SrtDocument::parse(&content);

        if document.dropped_blocks > 0 {
            warn!(
                "{}: dropped {} malformed subtitle blocks",
                file_name, document.dropped_blocks
            );
        }

        let (state, last_error) = if document.entries.is_empty() {
            let error = SubtitleError::NoEntries { file_name: file_name.to_string() };
            warn!("{}", error);
            (JobState::Failed, Some(error.to_string()))
        } else {
            (JobState::Idle, None)
        };

        let job = FileJob {
            file_id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            original_entries: Arc::from(document.entries),
            translated_entries: Arc::from(Vec::new()),
            style_prompt: String::new(),
            state,
            progress_percent: 0,
            last_error,
            dropped_blocks: document.dropped_blocks,
        };

        info!("Added {} ({} entries)", job.file_name, job.entry_count());
        let mut table = self.jobs.lock();
        table.order.push(job.file_id);
        table.jobs.insert(job.file_id, job.clone());
        job
    }

    /// Snapshot of every job in upload order
    pub fn list_jobs(&self) -> Vec<FileJob> {
        let table = self.jobs.lock();
        table.order.iter()
            .filter_map(|id| table.jobs.get(id).cloned())
            .collect()
    }

    /// Snapshot of one job
    pub fn job(&self, id: JobId) -> Result<FileJob, JobError> {
        self.jobs.lock().jobs.get(&id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Change the style hint of a job
    ///
    /// The prompt is frozen once processing starts: refused while the job
    /// is processing and after it completed. Failed jobs can be edited
    /// before a retry.
    pub fn update_prompt(&self, id: JobId, prompt: &str) -> Result<(), JobError> {
        let mut table = self.jobs.lock();
        let job = table.jobs.get_mut(&id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        match job.state {
            JobState::Processing => return Err(JobError::Busy(id.to_string())),
            JobState::Completed => return Err(JobError::AlreadyCompleted(id.to_string())),
            JobState::Idle | JobState::Failed => {}
        }
        job.style_prompt = prompt.to_string();
        Ok(())
    }

    /// Whether a queue run is active
    pub fn is_queue_running(&self) -> bool {
        self.queue_running.load(Ordering::SeqCst)
    }

    /// Translate every job that is not completed, one job at a time
    ///
    /// Returns `None` without doing anything when a queue run is already
    /// active. A failing job is marked failed and the run moves on.
    pub async fn start_queue(&self) -> Option<QueueSummary> {
        if self.queue_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Queue already running, ignoring start request");
            return None;
        }
        let _guard = QueueGuard {
            running: Arc::clone(&self.queue_running),
            jobs: Arc::clone(&self.jobs),
        };

        let pending: Vec<JobId> = {
            let mut table = self.jobs.lock();
            let pending: Vec<JobId> = table.order.iter()
                .filter(|id| {
                    table.jobs.get(*id).is_some_and(|job| {
                        !matches!(job.state, JobState::Completed | JobState::Processing)
                            && !job.original_entries.is_empty()
                    })
                })
                .copied()
                .collect();
            table.queued.extend(pending.iter().copied());
            pending
        };

        info!("Starting queue with {} jobs", pending.len());
        let mut summary = QueueSummary::default();
        for id in pending {
            match self.process(id, true).await {
                Ok(JobState::Completed) => summary.completed += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => debug!("Skipping job {}: {}", id, e),
            }
            self.jobs.lock().queued.remove(&id);
        }

        info!(
            "Queue finished: {} completed, {} failed",
            summary.completed, summary.failed
        );
        Some(summary)
    }

    /// Run one idle or failed job on its own, outside the queue
    ///
    /// Refused while the job is processing or still waiting in an active
    /// queue run, and for completed jobs so their output is never discarded.
    /// Returns the job's final state.
    pub async fn retry(&self, id: JobId) -> Result<JobState, JobError> {
        self.process(id, false).await
    }

    /// Forget a job; refused while it is processing
    pub fn remove(&self, id: JobId) -> Result<FileJob, JobError> {
        let mut table = self.jobs.lock();
        match table.jobs.get(&id) {
            None => return Err(JobError::NotFound(id.to_string())),
            Some(job) if job.state == JobState::Processing => {
                return Err(JobError::Busy(id.to_string()));
            }
            Some(_) => {}
        }

        table.order.retain(|other| *other != id);
        table.queued.remove(&id);
        table.jobs.remove(&id).ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Serialized translation of a completed job
    pub fn download(&self, id: JobId) -> Result<TranslatedFile, JobError> {
        let job = self.job(id)?;
        if job.state != JobState::Completed {
            return Err(JobError::NotCompleted(id.to_string()));
        }
        Ok(TranslatedFile {
            file_name: job.output_file_name(),
            content: SrtDocument::serialize(&job.translated_entries),
        })
    }

    // @runs: One job through the scheduler and records the outcome
    async fn process(&self, id: JobId, from_queue: bool) -> Result<JobState, JobError> {
        let (entries, style_prompt) = self.jobs.lock().begin(id, from_queue)?;
        info!("Translating job {} ({} entries)", id, entries.len());
        let mut run = RunGuard { jobs: Arc::clone(&self.jobs), id, finished: false };

        let jobs = Arc::clone(&self.jobs);
        let result = self.scheduler
            .run(&entries, &style_prompt, move |percent| {
                if let Some(job) = jobs.lock().jobs.get_mut(&id) {
                    job.progress_percent = job.progress_percent.max(percent);
                }
            })
            .await;
        run.finished = true;

        let mut table = self.jobs.lock();
        let job = table.jobs.get_mut(&id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        match result {
            Ok(translated) => {
                job.state = JobState::Completed;
                job.progress_percent = 100;
                job.translated_entries = Arc::from(translated);
                info!("Completed {}", job.file_name);
            }
            Err(e) => {
                job.state = JobState::Failed;
                job.last_error = Some(e.to_string());
                warn!("Failed {}: {}", job.file_name, e);
            }
        }
        Ok(job.state)
    }
}
