//! File system helpers for writing rendered documents.
//!
//! Every document is written to a temporary file next to its destination and then
//! renamed into place, so a reader never observes a half-written file.

use anyhow::{Context, Result, bail};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Creates `path` and its parents unless it already is a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        bail!("Path exists but is not a directory: {}", path.display());
    }
    Ok(())
}

/// Writes `content` to `path` atomically, creating parent directories.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
    Ok(())
}

/// Joins a document name onto `dir`, refusing names that would escape it.
pub fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    if name.is_empty() {
        bail!("Document name is empty");
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("Document name '{name}' must be a relative path inside the output directory"),
        }
    }
    Ok(dir.join(relative))
}

/// Writes every document under `dir` concurrently on the blocking pool.
///
/// Returns the written paths in document-name order. All failures are reported
/// together.
pub async fn write_documents(dir: &Path, documents: &BTreeMap<String, String>) -> Result<Vec<PathBuf>> {
    let mut tasks = Vec::with_capacity(documents.len());
    for (name, content) in documents {
        let path = output_path(dir, name)?;
        let content = content.clone();
        tasks.push(tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()).map(|()| path)));
    }

    let results = try_join_all(tasks).await.context("Failed to join write tasks")?;

    let mut written = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(path) => written.push(path),
            Err(e) => errors.push(format!("  {e:#}")),
        }
    }
    if !errors.is_empty() {
        bail!("Failed to write {} document(s):\n{}", errors.len(), errors.join("\n"));
    }
    Ok(written)
}
