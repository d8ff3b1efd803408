//! Publication orchestrator: persist markdown, obtain rendered HTML, persist HTML.
//!
//! The three publish stages run strictly in order and never in parallel. A
//! failure stops the pipeline where it happened; artifacts written by earlier
//! stages stay on disk (no rollback) and no retry is attempted here.

use std::{future::Future, sync::Arc, time::Instant as StdInstant};

use metrics::{counter, histogram};
use thiserror::Error;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::application::render::{
    RenderError, RenderRequest, RenderService, RenderTransport, TransportError,
};
use crate::application::repos::{ContentStore, StoreError, WriteOutcome};
use crate::domain::context::{HostEnvironment, RequestContext};
use crate::domain::publication::{
    HTML_FILE_NAME, MARKDOWN_FILE_NAME, PublishStage, PublishedPostPath, virtual_path,
};

pub const MARKDOWN_NOT_PUBLISHED: &str = "Markdown not published";
pub const POST_NOT_PUBLISHED: &str = "Post not published";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid argument: {0} is required")]
    InvalidArgument(&'static str),
    #[error("{message}")]
    NotPublished {
        message: &'static str,
        reason: Option<String>,
    },
    #[error("render transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("deadline elapsed during {operation}")]
    DeadlineElapsed { operation: &'static str },
}

impl PublishError {
    fn not_published(message: &'static str, outcome: &WriteOutcome) -> Self {
        let reason = match outcome {
            WriteOutcome::Failed { reason } => Some(reason.clone()),
            WriteOutcome::Skipped => Some("content was empty".to_string()),
            WriteOutcome::Written => None,
        };
        Self::NotPublished { message, reason }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::InvalidArgument(_) => "invalid_argument",
            PublishError::NotPublished { .. } => "not_published",
            PublishError::Transport(_) => "transport",
            PublishError::Store(_) => "store",
            PublishError::Render(_) => "render",
            PublishError::DeadlineElapsed { .. } => "deadline",
        }
    }
}

/// Optional point in time after which every pending stage is abandoned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishDeadline(Option<Instant>);

impl PublishDeadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    /// Fail with `DeadlineElapsed` when the deadline has already passed.
    fn ensure_open(self, operation: &'static str) -> Result<(), PublishError> {
        match self.0 {
            Some(deadline) if Instant::now() >= deadline => {
                Err(PublishError::DeadlineElapsed { operation })
            }
            _ => Ok(()),
        }
    }

    /// Await a cancellable `future` unless the deadline passes first. The
    /// stage is not started at all once the deadline has elapsed.
    async fn run<F: Future>(
        self,
        operation: &'static str,
        future: F,
    ) -> Result<F::Output, PublishError> {
        self.ensure_open(operation)?;
        match self.0 {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| PublishError::DeadlineElapsed { operation }),
            None => Ok(future.await),
        }
    }
}

/// Logical roots and theme the orchestrator works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationConfig {
    pub markdown_root: String,
    pub html_root: String,
    pub theme: String,
}

impl From<&crate::config::ContentSettings> for PublicationConfig {
    fn from(settings: &crate::config::ContentSettings) -> Self {
        Self {
            markdown_root: settings.markdown_path.clone(),
            html_root: settings.html_path.clone(),
            theme: settings.theme.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PublicationService {
    config: PublicationConfig,
    store: Arc<dyn ContentStore>,
    renderer: Arc<dyn RenderService>,
    transport: Arc<dyn RenderTransport>,
}

struct Artifact {
    logical_root: String,
    file_name: &'static str,
    failure_message: &'static str,
    operation: &'static str,
}

impl PublicationService {
    pub fn new(
        config: PublicationConfig,
        store: Arc<dyn ContentStore>,
        renderer: Arc<dyn RenderService>,
        transport: Arc<dyn RenderTransport>,
    ) -> Self {
        Self {
            config,
            store,
            renderer,
            transport,
        }
    }

    /// Persist the markdown source and return its virtual path.
    pub async fn publish_markdown(
        &self,
        markdown: &str,
        environment: Option<&HostEnvironment>,
        deadline: PublishDeadline,
    ) -> Result<String, PublishError> {
        require_text(markdown, "markdown")?;
        let environment = environment.ok_or(PublishError::InvalidArgument("environment"))?;
        self.write_artifact(self.markdown_artifact(), markdown, environment, deadline)
            .await
    }

    /// Persist rendered HTML and return its virtual path.
    pub async fn publish_html(
        &self,
        html: &str,
        environment: Option<&HostEnvironment>,
        deadline: PublishDeadline,
    ) -> Result<String, PublishError> {
        require_text(html, "html")?;
        let environment = environment.ok_or(PublishError::InvalidArgument("environment"))?;
        self.write_artifact(self.html_artifact(), html, environment, deadline)
            .await
    }

    /// Render locally for previews. Never performs network I/O.
    pub fn get_preview_html(&self, markdown: &str) -> Result<String, PublishError> {
        require_text(markdown, "markdown")?;
        let request = RenderRequest::new(markdown).with_theme(self.config.theme.as_str());
        Ok(self.renderer.render(&request)?)
    }

    /// Render through the remote endpoint on the caller's host. This is the
    /// render used by the publish path.
    pub async fn get_published_html(
        &self,
        markdown: &str,
        request: Option<&RequestContext>,
        deadline: PublishDeadline,
    ) -> Result<String, PublishError> {
        require_text(markdown, "markdown")?;
        let request = request.ok_or(PublishError::InvalidArgument("request context"))?;

        let started = StdInstant::now();
        let result = deadline
            .run(
                "remote render",
                self.transport.fetch_rendered_output(markdown, request),
            )
            .await?;
        histogram!("folio_render_remote_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        Ok(result?)
    }

    /// Publish a post: markdown first, then the remote render, then the HTML.
    ///
    /// A failure after the markdown write leaves the markdown file in place.
    pub async fn publish_post(
        &self,
        markdown: &str,
        environment: Option<&HostEnvironment>,
        request: Option<&RequestContext>,
        deadline: PublishDeadline,
    ) -> Result<PublishedPostPath, PublishError> {
        require_text(markdown, "markdown")?;
        let environment = environment.ok_or(PublishError::InvalidArgument("environment"))?;
        let request = request.ok_or(PublishError::InvalidArgument("request context"))?;

        let mut stage = PublishStage::Start;

        let markdown_path = match self
            .write_artifact(self.markdown_artifact(), markdown, environment, deadline)
            .await
        {
            Ok(path) => path,
            Err(err) => return Err(fail(stage, err)),
        };
        stage = advance(stage);

        let html = match self
            .get_published_html(markdown, Some(request), deadline)
            .await
        {
            Ok(html) => html,
            Err(err) => return Err(fail(stage, err)),
        };
        stage = advance(stage);

        // The rendered HTML skips argument validation: empty output is a
        // failed post publish, not a caller mistake.
        let html_path = match self
            .write_artifact(self.html_artifact(), &html, environment, deadline)
            .await
        {
            Ok(path) => path,
            Err(err) => return Err(fail(stage, err)),
        };
        stage = advance(stage);

        counter!("folio_publish_total", "outcome" => "complete").increment(1);
        info!(
            target = "application::publish",
            stage = %stage,
            markdown_path = %markdown_path,
            html_path = %html_path,
            "post published"
        );

        Ok(PublishedPostPath {
            markdown_path,
            html_path,
        })
    }

    fn markdown_artifact(&self) -> Artifact {
        Artifact {
            logical_root: self.config.markdown_root.clone(),
            file_name: MARKDOWN_FILE_NAME,
            failure_message: MARKDOWN_NOT_PUBLISHED,
            operation: "markdown write",
        }
    }

    fn html_artifact(&self) -> Artifact {
        Artifact {
            logical_root: self.config.html_root.clone(),
            file_name: HTML_FILE_NAME,
            failure_message: POST_NOT_PUBLISHED,
            operation: "html write",
        }
    }

    async fn write_artifact(
        &self,
        artifact: Artifact,
        content: &str,
        environment: &HostEnvironment,
        deadline: PublishDeadline,
    ) -> Result<String, PublishError> {
        let directory = self
            .store
            .resolve_directory(environment, &artifact.logical_root)?;
        let path = directory.join(artifact.file_name);

        // Writes run to completion once started; the deadline gates their start.
        deadline.ensure_open(artifact.operation)?;
        let outcome = self.store.write(&path, content).await?;
        counter!("folio_storage_write_total", "outcome" => outcome.as_str()).increment(1);

        if !outcome.is_written() {
            warn!(
                target = "application::publish",
                path = %path.display(),
                outcome = outcome.as_str(),
                "{}",
                artifact.failure_message
            );
            return Err(PublishError::not_published(
                artifact.failure_message,
                &outcome,
            ));
        }

        debug!(
            target = "application::publish",
            path = %path.display(),
            "artifact written"
        );
        Ok(virtual_path(&artifact.logical_root, artifact.file_name))
    }
}

fn require_text(value: &str, name: &'static str) -> Result<(), PublishError> {
    if value.trim().is_empty() {
        return Err(PublishError::InvalidArgument(name));
    }
    Ok(())
}

fn advance(stage: PublishStage) -> PublishStage {
    stage.next().unwrap_or(PublishStage::Complete)
}

fn fail(stage: PublishStage, error: PublishError) -> PublishError {
    counter!("folio_publish_total", "outcome" => error.kind()).increment(1);
    warn!(
        target = "application::publish",
        stage = %stage,
        kind = error.kind(),
        error = %error,
        "publish failed"
    );
    error
}
