use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::app_controller::TranslatedFile;

// @module: File and directory utilities

// @const: Extensions accepted as subtitle input
const SUBTITLE_EXTENSIONS: [&str; 2] = ["srt", "txt"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: Subtitle file by extension, case-insensitive
    pub fn is_subtitle_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                SUBTITLE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Expand input paths into subtitle files
    ///
    /// Files are taken as given; directories are walked recursively and only
    /// subtitle files are kept, sorted by path.
    pub fn collect_subtitle_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for input in inputs {
            if input.is_file() {
                result.push(input.clone());
            } else if input.is_dir() {
                let mut found = Vec::new();
                for entry in WalkDir::new(input).follow_links(true) {
                    let entry = entry.context("Failed to read directory entry")?;
                    let path = entry.path();
                    if path.is_file() && Self::is_subtitle_file(path) {
                        found.push(path.to_path_buf());
                    }
                }
                found.sort();
                debug!("Found {} subtitle files in {:?}", found.len(), input);
                result.extend(found);
            } else {
                return Err(anyhow!("Input path does not exist: {:?}", input));
            }
        }

        Ok(result)
    }

    /// Read a subtitle file, returning its file name and raw bytes
    pub fn read_subtitle_file<P: AsRef<Path>>(path: P) -> Result<(String, Vec<u8>)> {
        let path = path.as_ref();
        let file_name = path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Path has no file name: {:?}", path))?;
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        Ok((file_name, bytes))
    }

    /// Write a translated file into `output_dir`
    ///
    /// Returns `None` when the target exists and `force_overwrite` is off.
    pub fn write_translated<P: AsRef<Path>>(
        output_dir: P,
        file: &TranslatedFile,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let output_dir = output_dir.as_ref();
        Self::ensure_dir(output_dir)?;

        let path = output_dir.join(&file.file_name);
        if path.exists() && !force_overwrite {
            return Ok(None);
        }

        fs::write(&path, file.as_bytes())
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(Some(path))
    }
}
