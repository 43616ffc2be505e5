//! Writes generated output to a job's output directory.
//!
//! Layout: primary files and resource files at their declared relative paths
//! (conventionally under `tests/` and `resources/`), plus `requirements.txt`
//! and a generated `README.md` at the root.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::models::{ConversionResult, StackSelection};
use crate::services::workspace::remove_dir_if_exists;

/// Materialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("Generated file path is not a safe relative path: {0}")]
    UnsafePath(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MaterializeError + '_ {
    move |source| MaterializeError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Join a generated relative path onto `root`, rejecting absolute paths and
/// any `..` component.
pub fn safe_join(root: &Path, relative: &str) -> Result<PathBuf, MaterializeError> {
    let rel = Path::new(relative);
    let is_safe = !relative.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !is_safe {
        return Err(MaterializeError::UnsafePath(relative.to_string()));
    }
    Ok(root.join(rel))
}

async fn write_file(path: &Path, content: &str) -> Result<(), MaterializeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_error(parent))?;
    }
    tokio::fs::write(path, content).await.map_err(io_error(path))
}

fn is_robot_framework(target_framework: &str) -> bool {
    target_framework.to_lowercase().contains("robot")
}

/// Render the README summarizing a conversion.
pub fn generate_readme(result: &ConversionResult, stack: &StackSelection) -> String {
    let summary = &result.summary;
    let mut readme = String::new();

    let _ = writeln!(readme, "# {} Test Suite\n", stack.target_framework);
    let _ = writeln!(
        readme,
        "This test suite was automatically converted from {} ({} with {}) to {} using {}.\n",
        stack.source_language,
        stack.source_framework,
        stack.source_automation_tool,
        stack.target_framework,
        stack.target_library
    );

    readme.push_str("## Summary\n");
    let _ = writeln!(readme, "- Total Test Files: {}", summary.total_test_files);
    let _ = writeln!(readme, "- Total Test Cases: {}", summary.total_test_cases);
    let _ = writeln!(
        readme,
        "- Total Resource Files: {}\n",
        summary.total_resource_files
    );

    if is_robot_framework(&stack.target_framework) {
        readme.push_str("## Setup\n");
        readme.push_str("1. Install Python 3.8+\n");
        readme.push_str("2. Install dependencies: `pip install -r requirements.txt`\n");
        readme.push_str("3. Run tests: `robot tests/`\n\n");
    } else {
        readme.push_str("## Setup\n");
        readme.push_str("Install the dependencies listed in `requirements.txt`.\n\n");
    }

    readme.push_str("## Structure\n");
    readme.push_str("- `tests/` - Test case files\n");
    readme.push_str("- `resources/` - Reusable keyword libraries\n\n");

    if !summary.warnings.is_empty() {
        readme.push_str("## Warnings\n");
        for warning in &summary.warnings {
            let _ = writeln!(readme, "- {}", warning);
        }
        readme.push('\n');
    }

    if !summary.recommendations.is_empty() {
        readme.push_str("## Recommendations\n");
        for recommendation in &summary.recommendations {
            let _ = writeln!(readme, "- {}", recommendation);
        }
        readme.push('\n');
    }

    readme.push_str("Generated by Test Converter\n");
    readme
}

/// Write `result` into `output_dir`, replacing any previous content.
pub async fn write_output(
    output_dir: &Path,
    result: &ConversionResult,
    stack: &StackSelection,
) -> Result<(), MaterializeError> {
    // Validate every path before touching the filesystem.
    let primary = result
        .primary_files
        .iter()
        .map(|f| safe_join(output_dir, &f.path).map(|path| (path, f.content.as_str())))
        .collect::<Result<Vec<_>, _>>()?;
    let resources = result
        .resource_files
        .iter()
        .map(|f| safe_join(output_dir, &f.path).map(|path| (path, f.content.as_str())))
        .collect::<Result<Vec<_>, _>>()?;

    remove_dir_if_exists(output_dir)
        .await
        .map_err(io_error(output_dir))?;

    for dir in ["tests", "resources"] {
        let path = output_dir.join(dir);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(io_error(&path))?;
    }

    for (path, content) in primary.iter().chain(resources.iter()) {
        write_file(path, content).await?;
    }

    write_file(
        &output_dir.join("requirements.txt"),
        &result.requirements.join("\n"),
    )
    .await?;
    write_file(
        &output_dir.join("README.md"),
        &generate_readme(result, stack),
    )
    .await?;

    debug!(
        "Wrote {} primary and {} resource files to {}",
        primary.len(),
        resources.len(),
        output_dir.display()
    );
    Ok(())
}
