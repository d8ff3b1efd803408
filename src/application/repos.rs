//! Storage port describing the content persistence adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::context::HostEnvironment;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage path: {reason}")]
    InvalidPath { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            reason: reason.into(),
        }
    }
}

/// Result of a write that was allowed to run.
///
/// `Skipped` is the no-op outcome for empty content and is not an error at
/// this layer; `Failed` is a soft failure the caller decides how to escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
    Failed { reason: String },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Written => "written",
            WriteOutcome::Skipped => "skipped",
            WriteOutcome::Failed { .. } => "failed",
        }
    }
}

/// Whole-file UTF-8 text storage.
///
/// Writes fully replace the destination. There is no locking between writers:
/// concurrent writes to the same path race and the last one wins. Callers that
/// need stronger guarantees must serialise externally.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the whole file. Blank paths and missing files yield `Ok(None)`.
    async fn read(&self, path: &Path) -> Result<Option<String>, StoreError>;

    /// Replace the file at `path` with `content`, creating parent directories.
    /// Blank content is skipped; a blank path is an error.
    async fn write(&self, path: &Path, content: &str) -> Result<WriteOutcome, StoreError>;

    /// Map a logical directory key onto the environment's content root.
    /// Does not touch the filesystem.
    fn resolve_directory(
        &self,
        environment: &HostEnvironment,
        logical_key: &str,
    ) -> Result<PathBuf, StoreError>;
}
