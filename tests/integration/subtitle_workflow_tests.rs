/*!
 * Integration tests for the upload, queue and download workflow
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use srtbatch::app_controller::{Controller, JobState};
use srtbatch::file_utils::FileManager;
use srtbatch::providers::Provider;
use srtbatch::providers::mock::{MockErrorType, MockProvider};
use srtbatch::subtitle_processor::parse_srt;
use srtbatch::translation::LlmTranslationClient;
use crate::common;

/// Test a directory of files goes through the whole workflow onto disk
#[tokio::test(start_paused = true)]
async fn test_workflow_withDirectoryOfFiles_shouldWriteTranslatedCopies() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    common::create_test_subtitle(&input_dir, "episode1.srt")?;
    common::create_test_file(&input_dir, "episode2.srt", &common::sample_srt(120))?;
    common::create_test_file(&input_dir, "broken.srt", "nothing to see")?;

    let provider = MockProvider::working();
    let client = LlmTranslationClient::new(provider.clone(), "Vietnamese");
    let controller = Controller::new(Arc::new(client));

    for path in FileManager::collect_subtitle_files(&[input_dir.clone()])? {
        let (name, bytes) = FileManager::read_subtitle_file(&path)?;
        let job = controller.upload(&name, &bytes);
        controller.update_prompt(job.file_id, "casual")?;
    }

    let summary = controller.start_queue().await.expect("queue was idle");
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 0);
    // One batch for the small file, three for the large one
    assert_eq!(provider.call_count(), 4);

    let mut written = Vec::new();
    for job in controller.list_jobs() {
        if job.state == JobState::Completed {
            let file = controller.download(job.file_id)?;
            if let Some(path) = FileManager::write_translated(&output_dir, &file, false)? {
                written.push(path);
            }
        }
    }
    written.sort();

    assert_eq!(written, vec![
        output_dir.join("translated_episode1.srt"),
        output_dir.join("translated_episode2.srt"),
    ]);

    let translated = parse_srt(&fs::read_to_string(output_dir.join("translated_episode2.srt"))?);
    assert_eq!(translated.len(), 120);
    assert_eq!(translated[0].text, "[TRANSLATED] Line 1");
    assert_eq!(translated[119].text, "[TRANSLATED] Line 120");
    assert_eq!(translated[119].id, 120);

    let broken = controller.list_jobs().into_iter()
        .find(|job| job.file_name == "broken.srt")
        .expect("broken file is listed");
    assert_eq!(broken.state, JobState::Failed);
    Ok(())
}

/// Test a lenient input file comes out as strict SRT
#[tokio::test(start_paused = true)]
async fn test_workflow_withLenientFile_shouldExportNormalizedSrt() -> Result<()> {
    let lenient = "\u{FEFF}0:00:01.50 --> 0:00:02.75\r\nHello\r\nthere\r\n\r\n9\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
    let client = LlmTranslationClient::new(MockProvider::working(), "Vietnamese");
    let controller = Controller::new(Arc::new(client));

    let job = controller.upload("lenient.srt", lenient.as_bytes());
    assert_eq!(job.entry_count(), 2);
    controller.retry(job.file_id).await?;

    let file = controller.download(job.file_id)?;
    assert_eq!(
        file.content,
        "1\n00:00:01,500 --> 00:00:02,750\n[TRANSLATED] Hello there\n\n2\n00:00:03,000 --> 00:00:04,000\n[TRANSLATED] Bye\n"
    );
    Ok(())
}

/// Test non-UTF-8 bytes are decoded lossily rather than rejected
#[tokio::test(start_paused = true)]
async fn test_workflow_withInvalidUtf8_shouldStillTranslate() -> Result<()> {
    let mut bytes = b"1\n00:00:01,000 --> 00:00:02,000\nCaf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"\n");

    let client = LlmTranslationClient::new(MockProvider::working(), "Vietnamese");
    let controller = Controller::new(Arc::new(client));
    let job = controller.upload("latin1.srt", &bytes);

    assert_eq!(controller.retry(job.file_id).await?, JobState::Completed);
    assert!(controller.download(job.file_id)?.content.contains("[TRANSLATED] Caf\u{FFFD}"));
    Ok(())
}

/// Test the connection check reports provider failures
#[test]
fn test_connection_check_withFailingProvider_shouldReportError() {
    let result = tokio_test::block_on(async {
        let healthy = MockProvider::working().test_connection().await;
        let unauthorized = MockProvider::failing(MockErrorType::Auth).test_connection().await;
        (healthy, unauthorized)
    });

    assert!(result.0.is_ok());
    let message = result.1.unwrap_err().to_string();
    assert!(message.contains("rejected the credentials"));
}
