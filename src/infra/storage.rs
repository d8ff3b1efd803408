//! Filesystem-backed content storage.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::warn;

use crate::application::repos::{ContentStore, StoreError, WriteOutcome};
use crate::domain::context::HostEnvironment;

/// Stores whole UTF-8 files under whatever paths it is handed.
///
/// Each write lands in a temporary sibling that is renamed over the
/// destination, so readers see either the old or the new file. Concurrent
/// writers to one path are not coordinated; the last rename wins.
#[derive(Debug, Default, Clone)]
pub struct FsContentStore;

impl FsContentStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn read(&self, path: &Path) -> Result<Option<String>, StoreError> {
        if is_blank(path) {
            return Ok(None);
        }

        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> Result<WriteOutcome, StoreError> {
        if is_blank(path) {
            return Err(StoreError::invalid_path("write destination is empty"));
        }
        if content.trim().is_empty() {
            return Ok(WriteOutcome::Skipped);
        }

        let destination = path.to_path_buf();
        let content = content.to_owned();
        let result =
            tokio::task::spawn_blocking(move || replace_file(&destination, &content)).await;

        let outcome = match result {
            Ok(Ok(())) => WriteOutcome::Written,
            Ok(Err(err)) => WriteOutcome::Failed {
                reason: err.to_string(),
            },
            Err(err) => WriteOutcome::Failed {
                reason: format!("write task did not complete: {err}"),
            },
        };

        if let WriteOutcome::Failed { reason } = &outcome {
            warn!(
                target = "infra::storage",
                path = %path.display(),
                reason = %reason,
                "content write failed"
            );
        }

        Ok(outcome)
    }

    fn resolve_directory(
        &self,
        environment: &HostEnvironment,
        logical_key: &str,
    ) -> Result<PathBuf, StoreError> {
        let key = logical_key.trim();
        if key.is_empty() {
            return Err(StoreError::invalid_path("logical directory key is empty"));
        }

        let relative = Path::new(key);
        if relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(StoreError::invalid_path(format!(
                "logical directory key `{key}` must stay inside the content root"
            )));
        }

        Ok(environment.content_root().join(relative))
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.to_str().is_some_and(|value| value.trim().is_empty())
}

fn replace_file(destination: &Path, content: &str) -> io::Result<()> {
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|err| err.error)?;
    Ok(())
}
