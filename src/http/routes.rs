//! Register API routes
//!
//! A stateless dispatcher over four verbs. The path is opaque to reads and
//! writes; membership operations read a node id out of it. Membership
//! responses are optimistic: 204 means the change was submitted to the
//! replication core, not that it was applied.
//!
//! | Verb   | Path       | Success             | Failure                 |
//! |--------|------------|---------------------|-------------------------|
//! | PATCH  | any        | 204, empty          | 400 bad body, 500 write |
//! | GET    | any        | 200, `version\n`    | 404 no current value    |
//! | POST   | `/<node>`  | 204                 | 400 bad body or id      |
//! | DELETE | `/<node>`  | 204                 | 400 bad id              |
//! | other  |            | 405 + `Allow`       |                         |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::core::{ConfChange, ConfChangeKind, CoreHandle};
use crate::observability::Logger;
use crate::store::RegisterStore;

/// Shared state behind every request: the store and the membership
/// submission handle. The adapter itself holds nothing else.
pub struct ApiState {
    pub store: Arc<RegisterStore>,
    pub core: CoreHandle,
}

/// Builds the register router: a single fallback handler dispatching on the
/// request method, since the path carries no routing information.
pub fn register_router(state: Arc<ApiState>) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(
    State(state): State<Arc<ApiState>>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match method {
        Method::PATCH => patch(&state, body),
        Method::GET => get(&state),
        Method::POST => post(&state, &uri, body),
        Method::DELETE => delete(&state, &uri),
        _ => method_not_allowed(),
    }
}

/// PATCH: stage the payload and propose a write, fire-and-forget.
fn patch(state: &ApiState, body: Result<Bytes, BytesRejection>) -> Response {
    let payload = match body {
        Ok(bytes) => bytes,
        Err(e) => {
            Logger::warn("PATCH_BODY_UNREADABLE", &[("error", &e.to_string())]);
            return (StatusCode::BAD_REQUEST, "Failed on PATCH").into_response();
        }
    };

    match state.store.write(payload.to_vec()) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            Logger::error("PATCH_WRITE_FAILED", &[("error", &e.to_string())]);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed on PATCH").into_response()
        }
    }
}

/// GET: the current version as decimal text, newline-terminated.
fn get(state: &ApiState) -> Response {
    match state.store.current() {
        Some(value) => (StatusCode::OK, format!("{}\n", value.version)).into_response(),
        None => (StatusCode::NOT_FOUND, "Failed to GET").into_response(),
    }
}

/// POST /<nodeID>: submit an add-node membership change; the body is the
/// opaque context forwarded to the core (e.g. the new peer's URL).
fn post(state: &ApiState, uri: &Uri, body: Result<Bytes, BytesRejection>) -> Response {
    let context = match body {
        Ok(bytes) => bytes,
        Err(e) => {
            Logger::warn("POST_BODY_UNREADABLE", &[("error", &e.to_string())]);
            return (StatusCode::BAD_REQUEST, "Failed on POST").into_response();
        }
    };
    let Some(node_id) = parse_node_id(uri) else {
        return (StatusCode::BAD_REQUEST, "Failed on POST").into_response();
    };

    submit_conf_change(
        state,
        ConfChange {
            node_id,
            kind: ConfChangeKind::AddNode,
            context: context.to_vec(),
        },
        "Failed on POST",
    )
}

/// DELETE /<nodeID>: submit a remove-node membership change.
fn delete(state: &ApiState, uri: &Uri) -> Response {
    let Some(node_id) = parse_node_id(uri) else {
        return (StatusCode::BAD_REQUEST, "Failed on DELETE").into_response();
    };

    submit_conf_change(
        state,
        ConfChange {
            node_id,
            kind: ConfChangeKind::RemoveNode,
            context: Vec::new(),
        },
        "Failed on DELETE",
    )
}

fn submit_conf_change(state: &ApiState, change: ConfChange, failure_text: &'static str) -> Response {
    match state.core.propose_conf_change(change) {
        // Optimistic: the core decides later whether the change applies.
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            Logger::error("CONF_CHANGE_REJECTED", &[("error", &e.to_string())]);
            (StatusCode::INTERNAL_SERVER_ERROR, failure_text).into_response()
        }
    }
}

fn method_not_allowed() -> Response {
    let mut response = (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    response.headers_mut().insert(
        header::ALLOW,
        HeaderValue::from_static("PATCH, GET, POST, DELETE"),
    );
    response
}

/// The whole path after `/`, parsed as a decimal node id.
fn parse_node_id(uri: &Uri) -> Option<u64> {
    uri.path().strip_prefix('/')?.parse().ok()
}
