//! Fetching remote resources and rendering JSON responses.
//!
//! The transport is the host's business; the plugin only sees [`Fetcher`].

use std::collections::HashMap;

use async_trait::async_trait;

use crate::document::{Document, FontName, NodeId};
use crate::errors::{PluginError, SourceContext};
use crate::log::debug;
use crate::text::add_populated_text_node;

/// Retrieves the body behind a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PluginError>;
}

/// Serves canned bodies. Unknown URLs fail.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PluginError> {
        self.bodies.get(url).cloned().ok_or_else(|| PluginError::Fetch {
            url: url.to_string(),
            reason: "no response registered for this URL".into(),
        })
    }
}

/// Fetch `url` and parse the body as JSON.
pub async fn fetch_json<F: Fetcher + ?Sized>(
    fetcher: &F,
    url: &str,
) -> Result<serde_json::Value, PluginError> {
    let body = fetcher.fetch(url).await?;
    debug!(url, bytes = body.len(), "fetched");
    serde_json::from_slice(&body).map_err(|e| {
        SourceContext::new(url, String::from_utf8_lossy(&body)).json_error(&e)
    })
}

/// Pretty-print with a two-space indent.
pub fn render_json(value: &serde_json::Value) -> Result<String, PluginError> {
    serde_json::to_string_pretty(value).map_err(|e| PluginError::Other(e.to_string()))
}

/// Fetch JSON from `url` and drop its pretty-printed form into a new text
/// node.
pub async fn fetch_and_render<D, F>(
    doc: &mut D,
    fetcher: &F,
    url: &str,
    font: &FontName,
) -> Result<NodeId, PluginError>
where
    D: Document + ?Sized,
    F: Fetcher + ?Sized,
{
    let value = fetch_json(fetcher, url).await?;
    let text = render_json(&value)?;
    add_populated_text_node(doc, &text, font).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, Node};

    const URL: &str = "https://jsonplaceholder.typicode.com/posts/1";

    #[test]
    fn render_uses_two_space_indent() {
        let value = serde_json::json!({ "id": 1, "tags": ["a"] });
        insta::assert_snapshot!(render_json(&value).unwrap(), @r#"
        {
          "id": 1,
          "tags": [
            "a"
          ]
        }
        "#);
    }

    #[tokio::test]
    async fn unknown_url_fails() {
        let err = fetch_json(&StaticFetcher::new(), URL).await.unwrap_err();
        assert!(matches!(err, PluginError::Fetch { .. }));
    }

    #[tokio::test]
    async fn non_json_body_points_at_the_error() {
        let fetcher = StaticFetcher::new().with(URL, "<html>");
        match fetch_json(&fetcher, URL).await.unwrap_err() {
            PluginError::Json { span, .. } => assert_eq!(span.offset(), 0),
            other => panic!("expected a JSON error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn renders_into_a_new_text_node() {
        let body = r#"{"userId":1,"id":1,"title":"t","body":"b"}"#;
        let fetcher = StaticFetcher::new().with(URL, body);
        let mut doc = MemoryDocument::new();
        let id = fetch_and_render(&mut doc, &fetcher, URL, &FontName::new("Inter", "Regular"))
            .await
            .unwrap();

        let text = doc.node(id).and_then(Node::as_text).unwrap();
        insta::assert_snapshot!(text.characters.as_str(), @r#"
        {
          "userId": 1,
          "id": 1,
          "title": "t",
          "body": "b"
        }
        "#);
    }
}
