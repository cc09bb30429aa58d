//! HTTP client for the listen-along server.
//!
//! `ActivityApi` is the collaborator boundary the poller and the session
//! controller are written against; `ApiClient` is the reqwest implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::activity::{ActivityFeed, FriendActivity, ListenStatus};
use crate::config::ServerConfig;
use crate::error::ApiError;

/// The three calls the client makes against the server.
///
/// How the server treats a `listen_along` while another session is running
/// is not part of this contract; see `session::SwitchPolicy`.
pub trait ActivityApi: Send + Sync {
    /// `GET /api/get-activity`
    fn fetch_activity(&self) -> impl Future<Output = Result<Vec<FriendActivity>, ApiError>> + Send;

    /// `GET /api/listen-along?user_uri=...`
    fn listen_along(&self, user_uri: &str) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// `GET /api/stop-listening`
    fn stop_listening(&self) -> impl Future<Output = Result<String, ApiError>> + Send;
}

impl<T: ActivityApi> ActivityApi for Arc<T> {
    fn fetch_activity(&self) -> impl Future<Output = Result<Vec<FriendActivity>, ApiError>> + Send {
        (**self).fetch_activity()
    }

    fn listen_along(&self, user_uri: &str) -> impl Future<Output = Result<String, ApiError>> + Send {
        (**self).listen_along(user_uri)
    }

    fn stop_listening(&self) -> impl Future<Output = Result<String, ApiError>> + Send {
        (**self).stop_listening()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("listen-along/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let base_url: String = base_url.into();
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        handle_response(response).await
    }
}

impl ActivityApi for ApiClient {
    async fn fetch_activity(&self) -> Result<Vec<FriendActivity>, ApiError> {
        let feed: ActivityFeed = self.get_json(self.http.get(self.url("/api/get-activity"))).await?;
        debug!("get-activity: {} friends", feed.friends.len());
        Ok(feed.friends)
    }

    async fn listen_along(&self, user_uri: &str) -> Result<String, ApiError> {
        let request = self
            .http
            .get(self.url("/api/listen-along"))
            .query(&[("user_uri", user_uri)]);
        let status: ListenStatus = self.get_json(request).await?;
        Ok(status.status)
    }

    async fn stop_listening(&self) -> Result<String, ApiError> {
        let status: ListenStatus = self.get_json(self.http.get(self.url("/api/stop-listening"))).await?;
        Ok(status.status)
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        // Body is only a hint; an unreadable one falls back to the generic text.
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        });
    }
    response.json::<T>().await.map_err(ApiError::from)
}

/// Human-readable message for a non-2xx body: `detail`, then `message`, then
/// a generic status line.
pub fn error_message(status: u16, body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return ApiError::generic_status_message(status);
    };
    ["detail", "message"]
        .iter()
        .find_map(|key| message_field(&value[*key]))
        .unwrap_or_else(|| ApiError::generic_status_message(status))
}

fn message_field(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_detail() {
        let body = r#"{"detail": "Failed to fetch Spotify activity", "message": "ignored"}"#;
        assert_eq!(error_message(502, body), "Failed to fetch Spotify activity");
    }

    #[test]
    fn test_error_message_falls_back_to_message() {
        assert_eq!(error_message(400, r#"{"message": "bad uri"}"#), "bad uri");
        assert_eq!(error_message(400, r#"{"detail": "", "message": "bad uri"}"#), "bad uri");
    }

    #[test]
    fn test_error_message_generic() {
        assert_eq!(error_message(500, "Internal Server Error"), "Request failed with status 500");
        assert_eq!(error_message(404, r#"{"other": 1}"#), "Request failed with status 404");
        assert_eq!(error_message(503, ""), "Request failed with status 503");
    }

    #[test]
    fn test_error_message_structured_detail() {
        let body = r#"{"detail": [{"loc": ["query", "user_uri"], "msg": "field required"}]}"#;
        let msg = error_message(422, body);
        assert!(msg.contains("field required"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:8000/", None).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        assert_eq!(client.url("/api/log"), "http://127.0.0.1:8000/api/log");
    }
}
