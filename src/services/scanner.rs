//! Working copy scanner.
//!
//! Walks a cloned repository, recording every non-hidden entry and guessing
//! the source language and test framework from the first matching file.
//! Detection is first-match: once set, a guess is never revised.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::models::{FileInfo, FileStructure, FileType};

/// Scan failure. Any unreadable directory aborts the whole scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to analyze repository structure: {0}")]
    Io(String),

    #[error("Scan task failed: {0}")]
    Join(String),
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn language_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        ".java" => Some("Java"),
        ".py" => Some("Python"),
        ".cs" => Some("C#"),
        ".js" | ".ts" => Some("JavaScript/TypeScript"),
        _ => None,
    }
}

fn framework_for_filename(name: &str) -> Option<&'static str> {
    match name {
        "pom.xml" | "testng.xml" => Some("TestNG"),
        _ if name.contains("junit") => Some("JUnit"),
        "pytest.ini" => Some("PyTest"),
        "cypress.json" | "cypress.config.js" => Some("Cypress"),
        _ => None,
    }
}

/// Relative `/`-separated path of `path` under `root`.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_size(path: &Path) -> Result<u64, ScanError> {
    std::fs::symlink_metadata(path)
        .map(|m| m.len())
        .map_err(|e| ScanError::Io(format!("{}: {}", path.display(), e)))
}

fn scan_blocking(root: &Path) -> Result<FileStructure, ScanError> {
    let mut structure = FileStructure::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| ScanError::Io(e.to_string()))?;
        if entry.depth() == 0 {
            continue;
        }

        let path = relative_path(root, entry.path());

        if entry.file_type().is_dir() {
            structure.files.push(FileInfo {
                path,
                file_type: FileType::Directory,
                extension: None,
                size: None,
            });
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let extension = entry
            .path()
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()));
        let size = Some(file_size(entry.path())?);

        if structure.detected_language.is_none()
            && let Some(lang) = extension.as_deref().and_then(language_for_extension)
        {
            structure.detected_language = Some(lang.to_string());
        }
        if structure.detected_framework.is_none()
            && let Some(framework) = framework_for_filename(&name)
        {
            structure.detected_framework = Some(framework.to_string());
        }

        structure.files.push(FileInfo {
            path,
            file_type: FileType::File,
            extension,
            size,
        });
    }

    Ok(structure)
}

/// Scan the working copy at `root`.
pub async fn scan_repository(root: &Path) -> Result<FileStructure, ScanError> {
    let root: PathBuf = root.to_path_buf();
    let structure = tokio::task::spawn_blocking(move || scan_blocking(&root))
        .await
        .map_err(|e| ScanError::Join(e.to_string()))??;

    debug!(
        "Scanned {} entries (language={:?}, framework={:?})",
        structure.files.len(),
        structure.detected_language,
        structure.detected_framework
    );

    Ok(structure)
}
