//! Test file extraction from a scanned working copy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::FileInfo;

/// File name suffixes that mark a test file.
const TEST_FILE_SUFFIXES: &[&str] = &[
    "Test.java",
    "test.py",
    ".test.js",
    ".test.ts",
    "Tests.cs",
    "spec.js",
    "spec.ts",
];

/// Whether `path` looks like a test file.
///
/// Any path containing "test" (case-insensitive) matches, so files under
/// directories such as `testdata/` are included too.
pub fn is_test_file(path: &str) -> bool {
    TEST_FILE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
        || path.to_lowercase().contains("test")
}

/// Resolve `relative` under `root`, following links. Returns `None` when the
/// resolved path lands outside `root`.
async fn resolve_inside(root: &Path, relative: &str) -> std::io::Result<Option<PathBuf>> {
    let root = tokio::fs::canonicalize(root).await?;
    let resolved = tokio::fs::canonicalize(root.join(relative)).await?;
    Ok(resolved.starts_with(&root).then_some(resolved))
}

/// Read every test file listed in `files`, keyed by relative path.
///
/// Unreadable files (including non UTF-8 content) and links resolving
/// outside `root` are logged and skipped.
pub async fn extract_test_files(root: &Path, files: &[FileInfo]) -> BTreeMap<String, String> {
    let mut extracted = BTreeMap::new();

    for file in files.iter().filter(|f| f.is_file() && is_test_file(&f.path)) {
        let path = match resolve_inside(root, &file.path).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!("Skipping file {}: resolves outside the repository", file.path);
                continue;
            }
            Err(e) => {
                warn!("Failed to read file {}: {}", file.path, e);
                continue;
            }
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                extracted.insert(file.path.clone(), content);
            }
            Err(e) => {
                warn!("Failed to read file {}: {}", file.path, e);
            }
        }
    }

    debug!("Extracted {} test files", extracted.len());
    extracted
}
