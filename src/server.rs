//! HTTP surface for pushes and polling clients.
//!
//! Two route families share one listener:
//!
//! * `GET /input/{name}` publishes a song change to a dynamic input from
//!   query parameters (`title`, `artist`, `song_id`, `duration`,
//!   `secret`). Radio automation software speaks exactly this.
//! * `GET /output/{name}` and `GET /output/{name}/plain` serve the HTTP
//!   output's current state as JSON or as the bare rendered line.
//!
//! Publish rejections map onto HTTP status codes; a rejected push changes
//! no state. The server shuts down gracefully with the router's
//! cancellation token.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, ErrorKind, Result},
    input::{DynamicInput, PushRequest},
    output::HttpOutput,
};

/// Handles the server routes can reach.
pub struct AppState {
    /// Dynamic inputs by name, for the push endpoint.
    pub inputs: HashMap<String, Arc<DynamicInput>>,

    /// HTTP outputs by name, for the polling endpoints.
    pub outputs: HashMap<String, Arc<HttpOutput>>,
}

/// JSON document served for an HTTP output.
#[derive(Debug, Serialize)]
struct OutputInfo {
    /// Output name.
    name: String,

    /// The fully rendered line, empty before the first delivery.
    text: String,

    artist: String,
    title: String,

    /// Name of the input the current value originated from.
    source: String,

    /// Priority sources and their availability, highest priority first.
    sources: Vec<SourceInfo>,
}

/// One priority source in [`OutputInfo`].
#[derive(Debug, Serialize)]
struct SourceInfo {
    name: String,
    available: bool,
}

/// Builds the route table.
pub fn app(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/input/{name}", get(push))
        .route("/output/{name}", get(output_json))
        .route("/output/{name}/plain", get(output_plain))
        .with_state(state)
}

/// Serves until cancellation.
///
/// # Errors
///
/// Returns error if the listener cannot bind or serving fails.
pub async fn serve(
    bind: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on {bind}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

/// Maps a publish rejection onto an HTTP status.
fn status_for(error: &Error) -> StatusCode {
    match error.kind {
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// `GET /input/{name}`: publish to a dynamic input.
async fn push(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(request): Query<PushRequest>,
) -> Response {
    let Some(input) = state.inputs.get(&name) else {
        return (StatusCode::NOT_FOUND, "no such input\n").into_response();
    };

    match input.publish(request) {
        Ok(()) => (StatusCode::OK, "OK\n").into_response(),
        Err(e) => {
            warn!("push to {name} rejected: {e}");
            (status_for(&e), format!("{e}\n")).into_response()
        }
    }
}

/// `GET /output/{name}`: current state as JSON.
async fn output_json(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let Some(output) = state.outputs.get(&name) else {
        return (StatusCode::NOT_FOUND, "no such output\n").into_response();
    };

    let snapshot = output.snapshot();
    let info = OutputInfo {
        name,
        text: snapshot
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        artist: snapshot
            .as_ref()
            .map(|text| text.artist.clone())
            .unwrap_or_default(),
        title: snapshot
            .as_ref()
            .map(|text| text.title.clone())
            .unwrap_or_default(),
        source: snapshot
            .as_ref()
            .map(|text| text.input_name.clone())
            .unwrap_or_default(),
        sources: output
            .sources()
            .into_iter()
            .map(|(name, available)| SourceInfo { name, available })
            .collect(),
    };
    Json(info).into_response()
}

/// `GET /output/{name}/plain`: the bare rendered line.
async fn output_plain(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let Some(output) = state.outputs.get(&name) else {
        return (StatusCode::NOT_FOUND, "no such output\n").into_response();
    };

    match output.snapshot() {
        Some(text) => text.to_string().into_response(),
        None => (StatusCode::NO_CONTENT, String::new()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::input::Input;

    #[test]
    fn rejections_map_onto_http_statuses() {
        assert_eq!(
            status_for(&Error::permission_denied("secret mismatch")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&Error::invalid_argument("title is required")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::not_found("no such input")),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn push_and_poll_round_trip() {
        let input = Arc::new(DynamicInput::new("live", None, None));
        let output = Arc::new(HttpOutput::new("poll", Duration::ZERO));
        let state = Arc::new(AppState {
            inputs: HashMap::from([("live".to_string(), Arc::clone(&input))]),
            outputs: HashMap::from([("poll".to_string(), Arc::clone(&output))]),
        });

        let response = push(
            State(Arc::clone(&state)),
            Path("live".to_string()),
            Query(PushRequest {
                title: Some("One Vision".to_string()),
                artist: Some("Queen".to_string()),
                ..PushRequest::default()
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(input.metadata().unwrap().title, "One Vision");

        let response = push(
            State(Arc::clone(&state)),
            Path("ghost".to_string()),
            Query(PushRequest::default()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = output_plain(State(state), Path("poll".to_string())).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
