/*!
 * Tests for the job table and the sequential queue
 */

use std::sync::Arc;
use std::time::Duration;

use srtbatch::app_config::Config;
use srtbatch::app_controller::{Controller, JobState};
use srtbatch::errors::JobError;
use srtbatch::providers::mock::{MockErrorType, MockProvider};
use srtbatch::translation::LlmTranslationClient;
use crate::common::{self, ScriptedClient, FAIL_MARKER};

fn scripted_controller() -> (Controller, ScriptedClient) {
    let client = ScriptedClient::new();
    (Controller::new(Arc::new(client.clone())), client)
}

fn failing_srt() -> String {
    format!("1\n00:00:01,000 --> 00:00:02,000\n{} here\n", FAIL_MARKER)
}

/// Test the queue runs every pending job and keeps going past failures
#[tokio::test(start_paused = true)]
async fn test_start_queue_withFailingMiddleJob_shouldProcessAllJobs() {
    let (controller, _) = scripted_controller();
    let first = controller.upload("a.srt", common::sample_srt(3).as_bytes());
    let broken = controller.upload("b.srt", failing_srt().as_bytes());
    let last = controller.upload("c.srt", common::sample_srt(60).as_bytes());

    let summary = controller.start_queue().await.unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);

    assert_eq!(controller.job(first.file_id).unwrap().state, JobState::Completed);
    assert_eq!(controller.job(last.file_id).unwrap().progress_percent, 100);

    let failed = controller.job(broken.file_id).unwrap();
    assert_eq!(failed.state, JobState::Failed);
    assert!(failed.last_error.unwrap().contains("Rate limited"));
    assert!(failed.translated_entries.is_empty());
    assert!(!controller.is_queue_running());
}

/// Test a second start request while the queue runs is ignored
#[tokio::test(start_paused = true)]
async fn test_start_queue_whileRunning_shouldReturnNone() {
    let client = ScriptedClient::new().with_delay(Duration::from_secs(1));
    let controller = Controller::new(Arc::new(client.clone()));
    controller.upload("a.srt", common::sample_srt(5).as_bytes());

    let running = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_queue().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(controller.is_queue_running());
    assert_eq!(controller.start_queue().await, None);

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(client.call_count(), 1);
}

/// Test busy jobs refuse removal, prompt edits and retries
#[tokio::test(start_paused = true)]
async fn test_processing_job_shouldRefuseMutations() {
    let client = ScriptedClient::new().with_delay(Duration::from_secs(1));
    let controller = Controller::new(Arc::new(client));
    let current = controller.upload("a.srt", common::sample_srt(5).as_bytes());
    let waiting = controller.upload("b.srt", common::sample_srt(5).as_bytes());

    let running = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_queue().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = controller.job(current.file_id).unwrap();
    assert_eq!(snapshot.state, JobState::Processing);
    assert_eq!(snapshot.progress_percent, 5);

    let busy = JobError::Busy(current.file_id.to_string());
    assert_eq!(controller.remove(current.file_id).unwrap_err(), busy);
    assert_eq!(controller.update_prompt(current.file_id, "formal").unwrap_err(), busy);
    assert_eq!(controller.retry(current.file_id).await.unwrap_err(), busy);

    // Waiting in the queue: prompt edits are fine, a parallel retry is not
    assert!(controller.update_prompt(waiting.file_id, "formal").is_ok());
    assert_eq!(
        controller.retry(waiting.file_id).await.unwrap_err(),
        JobError::Busy(waiting.file_id.to_string())
    );

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(controller.job(waiting.file_id).unwrap().style_prompt, "formal");
}

/// Test a job removed while waiting in the queue is skipped
#[tokio::test(start_paused = true)]
async fn test_remove_ofQueuedJob_shouldSkipIt() {
    let client = ScriptedClient::new().with_delay(Duration::from_secs(1));
    let controller = Controller::new(Arc::new(client.clone()));
    controller.upload("a.srt", common::sample_srt(5).as_bytes());
    let waiting = controller.upload("b.srt", common::sample_srt(5).as_bytes());

    let running = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_queue().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(controller.remove(waiting.file_id).is_ok());
    let summary = running.await.unwrap().unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(client.call_count(), 1);
    assert_eq!(controller.list_jobs().len(), 1);
}

/// Test completed jobs are not re-run and failed jobs can be retried
#[tokio::test(start_paused = true)]
async fn test_start_queue_again_shouldOnlyRunUnfinishedJobs() {
    let (controller, client) = scripted_controller();
    let done = controller.upload("a.srt", common::sample_srt(2).as_bytes());
    let broken = controller.upload("b.srt", failing_srt().as_bytes());

    controller.start_queue().await.unwrap();
    assert_eq!(client.call_count(), 2);

    let summary = controller.start_queue().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(client.call_count(), 3);

    assert_eq!(controller.retry(broken.file_id).await, Ok(JobState::Failed));
    assert_eq!(controller.job(done.file_id).unwrap().state, JobState::Completed);
}

/// Test a completed job keeps its prompt and output frozen
#[tokio::test(start_paused = true)]
async fn test_completed_job_shouldRefusePromptEditAndRetry() {
    let (controller, client) = scripted_controller();
    let job = controller.upload("a.srt", common::sample_srt(1).as_bytes());
    controller.update_prompt(job.file_id, "casual").unwrap();

    controller.start_queue().await.unwrap();
    let completed = JobError::AlreadyCompleted(job.file_id.to_string());

    assert_eq!(controller.update_prompt(job.file_id, "new style").unwrap_err(), completed);
    assert_eq!(controller.retry(job.file_id).await.unwrap_err(), completed);
    assert_eq!(client.call_count(), 1);

    let snapshot = controller.job(job.file_id).unwrap();
    assert_eq!(snapshot.style_prompt, "casual");
    assert_eq!(snapshot.state, JobState::Completed);
    assert!(controller.download(job.file_id).unwrap().content.contains("Line 1 [vi]"));
}

/// Test a completed output survives a refused retry against a failing model
#[tokio::test(start_paused = true)]
async fn test_retry_ofCompletedJob_shouldKeepDownload() {
    let client = LlmTranslationClient::new(MockProvider::failing_on(2, MockErrorType::RateLimit), "Vietnamese");
    let controller = Controller::new(Arc::new(client));
    let job = controller.upload("a.srt", common::sample_srt(2).as_bytes());

    assert_eq!(controller.start_queue().await.unwrap().completed, 1);
    assert!(matches!(controller.retry(job.file_id).await, Err(JobError::AlreadyCompleted(_))));
    assert!(controller.download(job.file_id).unwrap().content.contains("[TRANSLATED] Line 2"));
}

/// Test a failed job can get a new prompt before it is retried
#[tokio::test(start_paused = true)]
async fn test_failed_job_shouldAcceptPromptEdit() {
    let (controller, _) = scripted_controller();
    let job = controller.upload("b.srt", failing_srt().as_bytes());

    assert_eq!(controller.retry(job.file_id).await, Ok(JobState::Failed));
    assert!(controller.update_prompt(job.file_id, "formal").is_ok());
    assert_eq!(controller.job(job.file_id).unwrap().style_prompt, "formal");
}

/// Test a run dropped midway leaves the job failed instead of stuck processing
#[tokio::test(start_paused = true)]
async fn test_aborted_run_shouldMarkJobInterrupted() {
    let client = ScriptedClient::new().with_delay(Duration::from_secs(5));
    let controller = Controller::new(Arc::new(client));
    let job = controller.upload("a.srt", common::sample_srt(5).as_bytes());

    let running = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start_queue().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.job(job.file_id).unwrap().state, JobState::Processing);

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    let snapshot = controller.job(job.file_id).unwrap();
    assert_eq!(snapshot.state, JobState::Failed);
    assert!(snapshot.last_error.unwrap().contains("Interrupted"));
    assert!(!controller.is_queue_running());
    assert!(controller.remove(job.file_id).is_ok());
}

/// Test an omitted id keeps its text and the original entries stay untouched
#[tokio::test(start_paused = true)]
async fn test_download_withOmittedId_shouldKeepOriginalText() {
    let client = LlmTranslationClient::new(MockProvider::omitting(vec![2]), "Vietnamese");
    let controller = Controller::new(Arc::new(client));
    let job = controller.upload("movie.srt", common::sample_srt(3).as_bytes());

    assert_eq!(controller.retry(job.file_id).await, Ok(JobState::Completed));
    let file = controller.download(job.file_id).unwrap();

    assert_eq!(file.file_name, "translated_movie.srt");
    assert!(file.content.contains("\n[TRANSLATED] Line 1\n"));
    assert!(file.content.contains("\nLine 2\n"));
    assert!(file.content.contains("\n[TRANSLATED] Line 3\n"));

    let job = controller.job(job.file_id).unwrap();
    assert_eq!(job.original_entries[0].text, "Line 1");
    assert_eq!(job.translated_entries.len(), 3);
}

/// Test failed jobs cannot be downloaded and keep their entries
#[tokio::test(start_paused = true)]
async fn test_download_ofFailedJob_shouldBeRefused() {
    let (controller, _) = scripted_controller();
    let job = controller.upload("b.srt", failing_srt().as_bytes());

    assert_eq!(controller.retry(job.file_id).await, Ok(JobState::Failed));
    assert_eq!(
        controller.download(job.file_id),
        Err(JobError::NotCompleted(job.file_id.to_string()))
    );
    assert_eq!(controller.job(job.file_id).unwrap().original_entries.len(), 1);
}

/// Test files without entries are failed at upload and skipped by the queue
#[tokio::test]
async fn test_upload_withInvalidFile_shouldFailAndBeSkipped() {
    let (controller, client) = scripted_controller();
    let job = controller.upload("notes.srt", b"just some words");

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.last_error.as_deref(), Some("No subtitle entries found in notes.srt"));

    let summary = controller.start_queue().await.unwrap();
    assert_eq!(summary.completed + summary.failed, 0);
    assert_eq!(client.call_count(), 0);
}

/// Test unknown ids are reported as not found
#[tokio::test]
async fn test_operations_withUnknownId_shouldReturnNotFound() {
    let (controller, _) = scripted_controller();
    let id = uuid::Uuid::new_v4();
    let not_found = JobError::NotFound(id.to_string());

    assert_eq!(controller.job(id).unwrap_err(), not_found);
    assert_eq!(controller.update_prompt(id, "x").unwrap_err(), not_found);
    assert_eq!(controller.remove(id).unwrap_err(), not_found);
    assert_eq!(controller.retry(id).await.unwrap_err(), not_found);
}

/// Test building from a configuration validates it first
#[test]
fn test_with_config_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.translation.api_key = String::new();
    config.translation.endpoint = "not a url".to_string();

    assert!(Controller::with_config(&config).is_err());
}
