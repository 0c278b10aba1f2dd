//! HTTP status-code contract
//!
//! Drives the router in-process and checks the four-verb table: PATCH
//! fire-and-forget writes, GET version reads, POST/DELETE optimistic
//! membership changes, and the 405 + Allow fallback for everything else.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use monoreg::core::{ConfChange, ConfChangeKind, CoreHandle, FileSnapshotStore, LocalCore};
use monoreg::http::{register_router, ApiState};
use monoreg::store::{RegisterStore, WriteAheadBuffer};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct TestApi {
    router: Router,
    store: Arc<RegisterStore>,
    _dir: TempDir,
}

/// Router backed by a live single-node pipeline.
fn live_api() -> TestApi {
    let dir = TempDir::new().unwrap();
    let snapshots = Arc::new(FileSnapshotStore::open(dir.path()).unwrap());
    let core = LocalCore::spawn(1);
    let pending = Arc::new(WriteAheadBuffer::new());
    let (reunion_tx, _reunion_rx) = mpsc::channel(64);

    let store = Arc::new(
        RegisterStore::new(
            1,
            core.handle.clone(),
            snapshots,
            pending,
            reunion_tx,
        )
        .unwrap(),
    );
    tokio::spawn(store.clone().apply_commits(core.commits, core.errors));

    let state = Arc::new(ApiState {
        store: store.clone(),
        core: core.handle.clone(),
    });
    TestApi {
        router: register_router(state),
        store,
        _dir: dir,
    }
}

fn request(method: &str, path: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_get_before_any_commit_is_404() {
    let api = live_api();
    let response = api
        .router
        .oneshot(request("GET", "/", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_then_get_returns_version_line() {
    let api = live_api();

    let response = api
        .router
        .clone()
        .oneshot(request("PATCH", "/anything", b"{\"name\":\"alice\"}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_text(response).await.is_empty());

    // PATCH is fire-and-forget; the commit lands asynchronously.
    let store = api.store.clone();
    wait_until(move || store.current().is_some()).await;

    let response = api
        .router
        .oneshot(request("GET", "/", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1\n");
}

#[tokio::test]
async fn test_patch_after_core_shutdown_is_500() {
    let dir = TempDir::new().unwrap();
    let snapshots = Arc::new(FileSnapshotStore::open(dir.path()).unwrap());
    let (prop_tx, prop_rx) = mpsc::unbounded_channel();
    let (conf_tx, _conf_rx) = mpsc::unbounded_channel();
    let (reunion_tx, _reunion_rx) = mpsc::channel(64);

    let store = Arc::new(
        RegisterStore::new(
            1,
            CoreHandle::new(prop_tx, conf_tx),
            snapshots,
            Arc::new(WriteAheadBuffer::new()),
            reunion_tx,
        )
        .unwrap(),
    );
    let state = Arc::new(ApiState {
        store: store.clone(),
        core: CoreHandle::new(
            mpsc::unbounded_channel().0,
            mpsc::unbounded_channel().0,
        ),
    });
    let router = register_router(state);

    // Core gone: the proposal channel has no receiver.
    drop(prop_rx);

    let response = router
        .oneshot(request("PATCH", "/", b"payload"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_post_submits_add_node_with_context() {
    let (conf_tx, mut conf_rx) = mpsc::unbounded_channel();
    let router = stub_router(conf_tx);

    let response = router
        .oneshot(request("POST", "/5", b"http://10.0.0.5:9121"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let change: ConfChange = conf_rx.try_recv().unwrap();
    assert_eq!(change.node_id, 5);
    assert_eq!(change.kind, ConfChangeKind::AddNode);
    assert_eq!(change.context, b"http://10.0.0.5:9121");
}

#[tokio::test]
async fn test_delete_submits_remove_node_optimistically() {
    let (conf_tx, mut conf_rx) = mpsc::unbounded_channel();
    let router = stub_router(conf_tx);

    // 204 regardless of whether the core ever applies the change.
    let response = router
        .oneshot(request("DELETE", "/5", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let change: ConfChange = conf_rx.try_recv().unwrap();
    assert_eq!(change.node_id, 5);
    assert_eq!(change.kind, ConfChangeKind::RemoveNode);
    assert!(change.context.is_empty());
}

#[tokio::test]
async fn test_membership_with_bad_node_id_is_400() {
    let (conf_tx, mut conf_rx) = mpsc::unbounded_channel();
    let router = stub_router(conf_tx);

    let response = router
        .clone()
        .oneshot(request("POST", "/not-a-number", b"ctx"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(request("DELETE", "/12x", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(conf_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unsupported_method_is_405_with_allow() {
    let api = live_api();
    let response = api
        .router
        .oneshot(request("PUT", "/", b"body"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let allow = response.headers().get(header::ALLOW).unwrap();
    let allow = allow.to_str().unwrap();
    for verb in ["PATCH", "GET", "POST", "DELETE"] {
        assert!(allow.contains(verb), "Allow header missing {}", verb);
    }
}

/// Router whose membership channel is observable and whose store is inert.
fn stub_router(conf_tx: mpsc::UnboundedSender<ConfChange>) -> Router {
    let dir = TempDir::new().unwrap();
    let snapshots = Arc::new(FileSnapshotStore::open(dir.path()).unwrap());
    let (prop_tx, prop_rx) = mpsc::unbounded_channel();
    let (reunion_tx, _reunion_rx) = mpsc::channel(4);
    let handle = CoreHandle::new(prop_tx, conf_tx);

    let store = Arc::new(
        RegisterStore::new(
            1,
            handle.clone(),
            snapshots,
            Arc::new(WriteAheadBuffer::new()),
            reunion_tx,
        )
        .unwrap(),
    );
    // Membership tests never write; the proposal receiver may go.
    drop(prop_rx);

    register_router(Arc::new(ApiState {
        store,
        core: handle,
    }))
}
