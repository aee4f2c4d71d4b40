use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{CourseId, SequenceId, UnitId};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::error::ApiFailure;
use crate::transport::{CourseApi, HttpCourseApi};

fn course_id() -> CourseId {
    CourseId::new("course-v1:edX+DemoX+Demo_Course")
}

fn seq_id() -> SequenceId {
    SequenceId::new("block-v1:edX+DemoX+Demo_Course+type@sequential+block@seq1")
}

fn unit_id() -> UnitId {
    UnitId::new("block-v1:edX+DemoX+Demo_Course+type@vertical+block@unit1")
}

#[derive(Clone)]
struct Capture<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

fn capture<T>() -> (Capture<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Capture {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn course_metadata_parses_wire_payload() {
    async fn metadata(Path(course_id): Path<String>) -> Json<Value> {
        Json(json!({
            "id": course_id,
            "name": "Demonstration Course",
            "org": "edX",
            "course_access": { "has_access": true },
        }))
    }
    let app = Router::new().route("/api/courses/v2/courses/:course_id", get(metadata));
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    let payload = api.get_course_metadata(&course_id()).await.expect("payload");

    assert_eq!(payload.id, course_id());
    assert_eq!(payload.name, "Demonstration Course");
    assert!(payload.course_access.has_access);
}

#[tokio::test]
async fn non_2xx_maps_to_status_failure() {
    async fn forbidden() -> StatusCode {
        StatusCode::FORBIDDEN
    }
    let app = Router::new().route("/api/courses/v2/courses/:course_id", get(forbidden));
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    let err = api
        .get_course_metadata(&course_id())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiFailure::Status { code: 403 }));
}

#[tokio::test]
async fn unreachable_server_maps_to_network_failure() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr")
    };

    let api = HttpCourseApi::new(format!("http://{addr}"), "staff").expect("api");
    let err = api
        .get_course_metadata(&course_id())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiFailure::Network(_)));
}

#[tokio::test]
async fn malformed_body_maps_to_parse_failure() {
    async fn not_json() -> &'static str {
        "<html>maintenance</html>"
    }
    let app = Router::new().route("/api/courseware/sequence/:sequence_id", get(not_json));
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    let err = api
        .get_sequence_metadata(&seq_id())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiFailure::Parse(_)));
}

#[tokio::test]
async fn blocks_request_carries_user_scoped_query() {
    async fn blocks(
        State(state): State<Capture<HashMap<String, String>>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        if let Some(tx) = state.tx.lock().await.take() {
            let _ = tx.send(params);
        }
        Json(json!({ "root": "r", "blocks": {} }))
    }
    let (state, rx) = capture();
    let app = Router::new()
        .route("/api/courses/v2/blocks/", get(blocks))
        .with_state(state);
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    api.get_course_blocks(&course_id()).await.expect("blocks");

    let params = rx.await.expect("params");
    assert_eq!(params.get("course_id"), Some(&course_id().0));
    assert_eq!(params.get("username"), Some(&"staff".to_string()));
    assert_eq!(params.get("depth"), Some(&"all".to_string()));
}

#[tokio::test]
async fn position_post_targets_course_and_sequence_with_wire_position() {
    async fn position(
        State(state): State<Capture<(String, String, Value)>>,
        Path((course_id, sequence_id)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if let Some(tx) = state.tx.lock().await.take() {
            let _ = tx.send((course_id, sequence_id, body));
        }
        StatusCode::CREATED
    }
    let (state, rx) = capture();
    let app = Router::new()
        .route(
            "/api/courseware/course/:course_id/sequence/:sequence_id/position",
            post(position),
        )
        .with_state(state);
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    api.post_sequence_position(&course_id(), &seq_id(), 124)
        .await
        .expect("a 201 response is success");

    let (posted_course, posted_sequence, body) = rx.await.expect("request");
    assert_eq!(posted_course, course_id().0);
    assert_eq!(posted_sequence, seq_id().0);
    assert_eq!(body, json!({ "position": 124 }));
}

#[tokio::test]
async fn completion_check_posts_batch_body() {
    async fn completion(
        State(state): State<Capture<Value>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        if let Some(tx) = state.tx.lock().await.take() {
            let _ = tx.send(body);
        }
        Json(json!({ "complete": true }))
    }
    let (state, rx) = capture();
    let app = Router::new()
        .route("/api/completion/v1/completion-batch", post(completion))
        .with_state(state);
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    let payload = api
        .post_completion_check(&course_id(), &seq_id(), &unit_id())
        .await
        .expect("completion");
    assert!(payload.complete);

    let body = rx.await.expect("body");
    assert_eq!(body["username"], json!("staff"));
    assert_eq!(body["course_key"], json!(course_id().0));
    assert_eq!(body["blocks"][&unit_id().0], json!(1.0));
}

#[tokio::test]
async fn bookmark_create_and_remove_use_distinct_routes() {
    async fn create(State(state): State<Capture<Value>>, Json(body): Json<Value>) -> StatusCode {
        if let Some(tx) = state.tx.lock().await.take() {
            let _ = tx.send(body);
        }
        StatusCode::CREATED
    }
    let (create_state, create_rx) = capture();

    async fn remove(State(state): State<Capture<String>>, Path(key): Path<String>) -> StatusCode {
        if let Some(tx) = state.tx.lock().await.take() {
            let _ = tx.send(key);
        }
        StatusCode::NO_CONTENT
    }
    let (remove_state, remove_rx) = capture();

    let app = Router::new()
        .route(
            "/api/bookmarks/v1/bookmarks/",
            post(create).with_state(create_state),
        )
        .route(
            "/api/bookmarks/v1/bookmarks/:key/",
            delete(remove).with_state(remove_state),
        );
    let base = spawn_server(app).await;

    let api = HttpCourseApi::new(&base, "staff").expect("api");
    api.post_bookmark(&seq_id(), true).await.expect("create");
    api.post_bookmark(&seq_id(), false).await.expect("remove");

    let body = create_rx.await.expect("create body");
    assert_eq!(body["usage_id"], json!(seq_id().0));
    let key = remove_rx.await.expect("remove key");
    assert_eq!(key, format!("staff,{}", seq_id().0));
}

#[tokio::test]
async fn rejects_invalid_base_url() {
    assert!(HttpCourseApi::new("not a url", "staff").is_err());
}
