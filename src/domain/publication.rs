use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed file name for the persisted markdown source.
pub const MARKDOWN_FILE_NAME: &str = "markdown.md";
/// Fixed file name for the persisted rendered post.
pub const HTML_FILE_NAME: &str = "post.html";

/// Payload exchanged with the render endpoint. The same shape is used in both
/// directions, so `html` is left empty on the request leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedContent {
    pub theme: String,
    pub markdown: String,
    #[serde(default)]
    pub html: String,
}

impl PublishedContent {
    pub fn render_request(theme: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            markdown: markdown.into(),
            html: String::new(),
        }
    }
}

/// Virtual paths of both artifacts written by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPostPath {
    pub markdown_path: String,
    pub html_path: String,
}

/// Progress of a single publish call. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Start,
    MarkdownPublished,
    HtmlRendered,
    Complete,
}

impl PublishStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStage::Start => "start",
            PublishStage::MarkdownPublished => "markdown_published",
            PublishStage::HtmlRendered => "html_rendered",
            PublishStage::Complete => "complete",
        }
    }

    /// The stage that follows this one, or `None` once complete.
    pub fn next(self) -> Option<Self> {
        match self {
            PublishStage::Start => Some(PublishStage::MarkdownPublished),
            PublishStage::MarkdownPublished => Some(PublishStage::HtmlRendered),
            PublishStage::HtmlRendered => Some(PublishStage::Complete),
            PublishStage::Complete => None,
        }
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join a logical root from settings with a fixed file name using `/`,
/// regardless of the host platform.
pub fn virtual_path(logical_root: &str, file_name: &str) -> String {
    let root = logical_root.trim().trim_end_matches(['/', '\\']);
    if root.is_empty() {
        return file_name.to_string();
    }
    format!("{}/{file_name}", root.replace('\\', "/"))
}
