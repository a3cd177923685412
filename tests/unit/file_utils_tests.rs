/*!
 * Tests for file and directory utilities
 */

use anyhow::Result;
use std::fs;

use srtbatch::app_controller::TranslatedFile;
use srtbatch::file_utils::FileManager;
use crate::common;

/// Test collecting from a directory walks it recursively and sorts
#[test]
fn test_collect_subtitle_files_withNestedDirectory_shouldFindSortedSubtitles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("season1"))?;

    common::create_test_subtitle(root, "b.srt")?;
    common::create_test_subtitle(&root.join("season1"), "a.SRT")?;
    common::create_test_file(root, "notes.txt", "plain text")?;
    common::create_test_file(root, "movie.mkv", "binary")?;

    let files = FileManager::collect_subtitle_files(&[root.to_path_buf()])?;
    let names: Vec<String> = files.iter()
        .map(|path| path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();

    assert_eq!(names, vec!["b.srt", "notes.txt", "season1/a.SRT"]);
    Ok(())
}

/// Test explicit files are kept as given, whatever their extension
#[test]
fn test_collect_subtitle_files_withExplicitFile_shouldKeepIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "subs.data", "x")?;

    let files = FileManager::collect_subtitle_files(&[path.clone()])?;
    assert_eq!(files, vec![path]);
    Ok(())
}

/// Test a missing input path is an error
#[test]
fn test_collect_subtitle_files_withMissingPath_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = temp_dir.path().join("missing.srt");

    assert!(FileManager::collect_subtitle_files(&[missing]).is_err());
    Ok(())
}

/// Test reading returns the bare file name and raw bytes
#[test]
fn test_read_subtitle_file_withValidFile_shouldReturnNameAndBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;

    let (name, bytes) = FileManager::read_subtitle_file(&path)?;
    assert_eq!(name, "movie.srt");
    assert!(String::from_utf8(bytes)?.contains("For testing purposes."));
    Ok(())
}

/// Test existing outputs are kept unless overwriting is forced
#[test]
fn test_write_translated_withExistingFile_shouldRespectForceFlag() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("out");
    let file = TranslatedFile {
        file_name: "translated_movie.srt".to_string(),
        content: "1\n00:00:01,000 --> 00:00:02,000\nXin chào\n".to_string(),
    };

    let first = FileManager::write_translated(&output_dir, &file, false)?;
    assert_eq!(first, Some(output_dir.join("translated_movie.srt")));

    let newer = TranslatedFile { content: "changed".to_string(), ..file.clone() };
    assert_eq!(FileManager::write_translated(&output_dir, &newer, false)?, None);
    assert_eq!(fs::read_to_string(output_dir.join("translated_movie.srt"))?, file.content);

    assert!(FileManager::write_translated(&output_dir, &newer, true)?.is_some());
    assert_eq!(fs::read_to_string(output_dir.join("translated_movie.srt"))?, "changed");
    Ok(())
}
