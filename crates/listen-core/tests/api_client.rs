//! ApiClient against a local axum server.
//!
//! Each test binds its own mock on 127.0.0.1:0 so they can run in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;

use listen_core::client::{ActivityApi, ApiClient};
use listen_core::error::ApiError;

#[derive(Clone, Default)]
struct MockState {
    listen_requests: Arc<Mutex<Vec<String>>>,
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn sample_feed() -> serde_json::Value {
    json!({
        "friends": [
            {
                "timestamp": 1_700_000_000_000i64,
                "user": { "uri": "spotify:user:alice", "name": "Alice", "imageUrl": "" },
                "track": {
                    "uri": "spotify:track:1",
                    "name": "Song One",
                    "imageUrl": "",
                    "album": { "uri": "spotify:album:1", "name": "Album" },
                    "artist": { "uri": "spotify:artist:1", "name": "Artist" },
                    "context": { "uri": "spotify:album:1", "name": "Album", "index": 0 }
                }
            },
            {
                "timestamp": 1_700_000_100_000i64,
                "user": { "uri": "spotify:user:bob", "name": "Bob" },
                "track": {
                    "uri": "spotify:track:2",
                    "name": "Song Two",
                    "album": { "uri": "spotify:album:2", "name": "Other Album" },
                    "artist": { "uri": "spotify:artist:2", "name": "Other Artist" },
                    "context": { "uri": "spotify:playlist:9", "name": "Mix" }
                }
            }
        ]
    })
}

fn happy_app(state: MockState) -> Router {
    Router::new()
        .route("/api/get-activity", get(|| async { Json(sample_feed()) }))
        .route("/api/listen-along", get(listen_along))
        .route(
            "/api/stop-listening",
            get(|| async { Json(json!({ "status": "stopped" })) }),
        )
        .with_state(state)
}

async fn listen_along(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match params.get("user_uri") {
        Some(uri) => {
            state.listen_requests.lock().unwrap().push(uri.clone());
            Json(json!({ "status": "listening" })).into_response()
        }
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "user_uri is required" })),
        )
            .into_response(),
    }
}

#[tokio::test]
async fn test_fetch_activity_parses_friends() {
    let base = serve(happy_app(MockState::default())).await;
    let client = ApiClient::new(base, None).unwrap();

    let friends = client.fetch_activity().await.unwrap();
    assert_eq!(friends.len(), 2);
    assert_eq!(friends[0].user.name, "Alice");
    assert_eq!(friends[1].user.image_url, "");
    assert_eq!(friends[1].track.context.index, 0);
    assert_eq!(friends[1].timestamp, 1_700_000_100_000);
}

#[tokio::test]
async fn test_listen_along_encodes_user_uri() {
    let state = MockState::default();
    let base = serve(happy_app(state.clone())).await;
    let client = ApiClient::new(base, None).unwrap();

    let tricky = "spotify:user:a b&c=d";
    let status = client.listen_along(tricky).await.unwrap();
    assert_eq!(status, "listening");
    assert_eq!(client.stop_listening().await.unwrap(), "stopped");

    let seen = state.listen_requests.lock().unwrap().clone();
    assert_eq!(seen, vec![tricky.to_string()]);
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let app = Router::new().route(
        "/api/get-activity",
        get(|| async {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "detail": "Failed to fetch Spotify activity" })),
            )
        }),
    );
    let client = ApiClient::new(serve(app).await, None).unwrap();

    let err = client.fetch_activity().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Api {
            status: 502,
            message: "Failed to fetch Spotify activity".to_string()
        }
    );
}

#[tokio::test]
async fn test_error_message_field_is_used_without_detail() {
    let app = Router::new().route(
        "/api/listen-along",
        get(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "friend is not playing" })),
            )
        }),
    );
    let client = ApiClient::new(serve(app).await, None).unwrap();

    let err = client.listen_along("spotify:user:alice").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "friend is not playing");
}

#[tokio::test]
async fn test_unreadable_error_body_gets_generic_message() {
    let app = Router::new().route(
        "/api/stop-listening",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
    );
    let client = ApiClient::new(serve(app).await, None).unwrap();

    let err = client.stop_listening().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Api {
            status: 500,
            message: "Request failed with status 500".to_string()
        }
    );
}

#[tokio::test]
async fn test_missing_route_is_an_api_error() {
    let client = ApiClient::new(serve(Router::new()).await, None).unwrap();
    let err = client.fetch_activity().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let app = Router::new().route("/api/get-activity", get(|| async { "not json" }));
    let client = ApiClient::new(serve(app).await, None).unwrap();

    let err = client.fetch_activity().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {:?}", err);
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Grab a free port, then close it again.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}", addr), None).unwrap();
    let err = client.fetch_activity().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    assert_eq!(err.status(), None);
}
