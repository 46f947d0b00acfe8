//! Read-only client for the posts feed shown on the home surface.

use crate::{config::ClientConfig, error::Error, APP_USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

pub const POSTS_PATH: &str = "/api/posts";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize)]
struct PostsEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct PostsClient {
    http: Client,
    config: ClientConfig,
}

impl PostsClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// Fetches every post.
    ///
    /// # Errors
    /// `Transport` when the server cannot be reached or answers with an error
    /// status, `Malformed` when the payload is not `{success: true, data: [..]}`.
    #[instrument(skip(self))]
    pub async fn get_posts(&self) -> Result<Vec<Post>, Error> {
        let response = self
            .http
            .get(self.config.endpoint(POSTS_PATH))
            .send()
            .await?
            .error_for_status()?;

        let envelope: PostsEnvelope = response
            .json()
            .await
            .map_err(|_| unexpected_shape())?;

        let data = match envelope.data {
            Some(data) if envelope.success && data.is_array() => data,
            _ => return Err(unexpected_shape()),
        };

        let posts: Vec<Post> = serde_json::from_value(data).map_err(|_| unexpected_shape())?;
        debug!(count = posts.len(), "Fetched posts");
        Ok(posts)
    }
}

fn unexpected_shape() -> Error {
    Error::Malformed("unexpected payload shape".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    async fn serve(template: ResponseTemplate) -> (MockServer, PostsClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(POSTS_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        let client = PostsClient::new(ClientConfig::parse(&server.uri()).unwrap()).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn get_posts_returns_feed() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let (_server, client) = serve(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "id": 2, "content": "second", "image_path": "/img/2.png", "created_at": "2024-05-02T09:00:00Z" },
                { "id": 1, "content": "first", "image_path": null, "created_at": "2024-05-01T09:00:00Z" }
            ]
        })))
        .await;

        let posts = client.get_posts().await?;
        if posts.len() != 2 || posts[0].image_path.as_deref() != Some("/img/2.png") {
            bail!("unexpected posts: {posts:?}");
        }
        if posts[1].image_path.is_some() {
            bail!("expected no image on the first post");
        }
        Ok(())
    }

    #[tokio::test]
    async fn unsuccessful_payload_is_rejected() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let (_server, client) = serve(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": "db down" })),
        )
        .await;

        match client.get_posts().await {
            Err(Error::Malformed(message)) if message == "unexpected payload shape" => Ok(()),
            other => bail!("expected shape error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_a_transport_failure() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let (_server, client) = serve(ResponseTemplate::new(500)).await;

        match client.get_posts().await {
            Err(Error::Transport(_)) => Ok(()),
            other => bail!("expected transport error, got {other:?}"),
        }
    }
}
