//! Zip packaging of an output directory.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Archive errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Converted files not found")]
    Missing,

    #[error("Failed to read output directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive task failed: {0}")]
    Join(String),
}

fn zip_blocking(dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    if !dir.is_dir() {
        return Err(ArchiveError::Missing);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // Version control metadata left behind by a deploy is not part of the output.
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            let io_err = |source| ArchiveError::Io {
                path: entry.path().display().to_string(),
                source,
            };
            let mut file = File::open(entry.path()).map_err(io_err)?;
            zip.start_file(name, options)?;
            std::io::copy(&mut file, &mut zip).map_err(io_err)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

/// Zip the contents of `dir` (paths relative to `dir`) into memory.
pub async fn zip_directory(dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    let dir: PathBuf = dir.to_path_buf();
    tokio::task::spawn_blocking(move || zip_blocking(&dir))
        .await
        .map_err(|e| ArchiveError::Join(e.to_string()))?
}
