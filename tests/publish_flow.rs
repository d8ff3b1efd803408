use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use folio::application::publish::{
    MARKDOWN_NOT_PUBLISHED, POST_NOT_PUBLISHED, PublicationConfig, PublicationService,
    PublishDeadline, PublishError,
};
use folio::application::render::render_service;
use folio::domain::context::{HostEnvironment, RequestContext};
use folio::domain::publication::PublishedPostPath;
use folio::infra::http::{self, HttpState, PUBLISH_PATH};
use folio::infra::render_client::HttpRenderTransport;
use folio::infra::storage::FsContentStore;
use tempfile::TempDir;
use tokio::net::TcpListener;

const MARKDOWN_ROOT: &str = "App_Data/posts/markdown";
const HTML_ROOT: &str = "App_Data/posts/html";

fn publication_service() -> Arc<PublicationService> {
    let transport =
        HttpRenderTransport::new("default", Duration::from_secs(5)).expect("client builds");
    Arc::new(PublicationService::new(
        PublicationConfig {
            markdown_root: MARKDOWN_ROOT.to_string(),
            html_root: HTML_ROOT.to_string(),
            theme: "default".to_string(),
        },
        Arc::new(FsContentStore::new()),
        render_service(),
        Arc::new(transport),
    ))
}

/// Serve the full router over a real socket, rooted at `root`.
async fn spawn_site(root: &Path) -> (SocketAddr, Arc<PublicationService>) {
    let publication = publication_service();
    let state = HttpState {
        publication: Arc::clone(&publication),
        renderer: render_service(),
        environment: Arc::new(HostEnvironment::new(root.to_path_buf())),
        publish_timeout: Duration::from_secs(10),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = http::build_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (addr, publication)
}

fn caller(addr: SocketAddr) -> RequestContext {
    RequestContext::new("http", addr.to_string()).expect("valid context")
}

#[tokio::test]
async fn publish_post_persists_source_and_rendered_html() {
    let root = TempDir::new().expect("tempdir");
    let (addr, publication) = spawn_site(root.path()).await;
    let environment = HostEnvironment::new(root.path().to_path_buf());

    let paths = publication
        .publish_post(
            "**Hello World**",
            Some(&environment),
            Some(&caller(addr)),
            PublishDeadline::after(Duration::from_secs(10)),
        )
        .await
        .expect("publish succeeds");

    assert!(paths.markdown_path.ends_with("/markdown.md"));
    assert!(paths.html_path.ends_with("/post.html"));

    let markdown = std::fs::read_to_string(root.path().join(MARKDOWN_ROOT).join("markdown.md"))
        .expect("markdown file exists");
    assert_eq!(markdown, "**Hello World**");

    let html = std::fs::read_to_string(root.path().join(HTML_ROOT).join("post.html"))
        .expect("html file exists");
    assert!(html.contains("<p><strong>Hello World</strong></p>"));
    assert!(html.starts_with("<article class=\"post\" data-theme=\"default\">"));
}

#[tokio::test]
async fn republishing_overwrites_both_artifacts() {
    let root = TempDir::new().expect("tempdir");
    let (addr, publication) = spawn_site(root.path()).await;
    let environment = HostEnvironment::new(root.path().to_path_buf());

    for markdown in ["# First", "# Second"] {
        publication
            .publish_post(
                markdown,
                Some(&environment),
                Some(&caller(addr)),
                PublishDeadline::none(),
            )
            .await
            .expect("publish succeeds");
    }

    let markdown = std::fs::read_to_string(root.path().join(MARKDOWN_ROOT).join("markdown.md"))
        .expect("markdown file exists");
    assert_eq!(markdown, "# Second");
    let html = std::fs::read_to_string(root.path().join(HTML_ROOT).join("post.html"))
        .expect("html file exists");
    assert!(html.contains("<h1>Second</h1>"));
    assert!(!html.contains("First"));
}

#[tokio::test]
async fn unreachable_render_endpoint_keeps_markdown_only() {
    let root = TempDir::new().expect("tempdir");
    let publication = publication_service();
    let environment = HostEnvironment::new(root.path().to_path_buf());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let dead = listener.local_addr().expect("local addr");
    drop(listener);

    let err = publication
        .publish_post(
            "# Orphan",
            Some(&environment),
            Some(&caller(dead)),
            PublishDeadline::none(),
        )
        .await
        .expect_err("render call fails");

    assert!(matches!(err, PublishError::Transport(_)));
    assert!(root.path().join(MARKDOWN_ROOT).join("markdown.md").exists());
    assert!(!root.path().join(HTML_ROOT).join("post.html").exists());
}

#[tokio::test]
async fn html_write_failure_leaves_markdown_in_place() {
    let root = TempDir::new().expect("tempdir");
    let (addr, publication) = spawn_site(root.path()).await;
    let environment = HostEnvironment::new(root.path().to_path_buf());

    // A directory squatting on the html destination makes the rename fail.
    std::fs::create_dir_all(root.path().join(HTML_ROOT).join("post.html"))
        .expect("blocking directory");

    let err = publication
        .publish_post(
            "# Kept",
            Some(&environment),
            Some(&caller(addr)),
            PublishDeadline::none(),
        )
        .await
        .expect_err("html write fails");

    match err {
        PublishError::NotPublished { message, reason } => {
            assert_eq!(message, POST_NOT_PUBLISHED);
            assert!(reason.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let markdown = std::fs::read_to_string(root.path().join(MARKDOWN_ROOT).join("markdown.md"))
        .expect("markdown file survives");
    assert_eq!(markdown, "# Kept");
}

#[tokio::test]
async fn markdown_write_failure_stops_before_render() {
    let root = TempDir::new().expect("tempdir");
    let publication = publication_service();
    let environment = HostEnvironment::new(root.path().to_path_buf());

    std::fs::create_dir_all(root.path().join(MARKDOWN_ROOT).join("markdown.md"))
        .expect("blocking directory");

    // The caller points nowhere; reaching the render stage would surface a
    // transport error instead.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let dead = listener.local_addr().expect("local addr");
    drop(listener);

    let err = publication
        .publish_post(
            "# Blocked",
            Some(&environment),
            Some(&caller(dead)),
            PublishDeadline::none(),
        )
        .await
        .expect_err("markdown write fails");

    assert!(matches!(
        err,
        PublishError::NotPublished {
            message: MARKDOWN_NOT_PUBLISHED,
            ..
        }
    ));
    assert!(!root.path().join(HTML_ROOT).exists());
}

#[tokio::test]
async fn publish_endpoint_round_trips_through_own_host() {
    let root = TempDir::new().expect("tempdir");
    let (addr, _) = spawn_site(root.path()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}{PUBLISH_PATH}"))
        .json(&serde_json::json!({ "markdown": "Some *emphasis*" }))
        .send()
        .await
        .expect("request sent");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let paths: PublishedPostPath = response.json().await.expect("json body");
    assert_eq!(paths.markdown_path, format!("{MARKDOWN_ROOT}/markdown.md"));
    assert_eq!(paths.html_path, format!("{HTML_ROOT}/post.html"));

    let html = std::fs::read_to_string(root.path().join(HTML_ROOT).join("post.html"))
        .expect("html file exists");
    assert!(html.contains("<em>emphasis</em>"));
}

#[tokio::test]
async fn elapsed_deadline_leaves_content_root_untouched() {
    let root = TempDir::new().expect("tempdir");
    let (addr, publication) = spawn_site(root.path()).await;
    let environment = HostEnvironment::new(root.path().to_path_buf());

    let err = publication
        .publish_post(
            "# Late",
            Some(&environment),
            Some(&caller(addr)),
            PublishDeadline::after(Duration::ZERO),
        )
        .await
        .expect_err("deadline already elapsed");

    assert!(matches!(
        err,
        PublishError::DeadlineElapsed {
            operation: "markdown write"
        }
    ));

    // Nothing may land afterwards either.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!root.path().join(MARKDOWN_ROOT).join("markdown.md").exists());
    assert!(!root.path().join(HTML_ROOT).join("post.html").exists());
}
