use crate::api::documents;
use crate::sessions::SessionLookupError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{instrument, warn};

/// Configuration documents consumed by the launcher page.
#[rustfmt::skip]
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/xapi/volview/config/projects/{project}", get(project_config))
        .route("/xapi/volview/config/projects/{project}/sessions/{session}", get(session_config))
}

#[instrument(skip_all, fields(project = %project))]
async fn project_config(
	State(state): State<AppState>,
	Path(project): Path<String>,
	headers: HeaderMap,
) -> impl IntoResponse {
	Json(documents(&state, &headers).viewer_config(&project))
}

#[instrument(skip_all, fields(project = %project, session = %session))]
async fn session_config(
	State(state): State<AppState>,
	Path((project, session)): Path<(String, String)>,
	headers: HeaderMap,
) -> Response {
	match state.sessions.lookup(&project, &session).await {
		Ok(record) => Json(documents(&state, &headers).session_info(&project, &record)).into_response(),
		Err(error @ SessionLookupError::NotFound(_)) => {
			(StatusCode::NOT_FOUND, error.to_string()).into_response()
		}
		Err(error @ SessionLookupError::ProjectMismatch { .. }) => {
			warn!(%error, "Rejected session lookup from foreign project");
			(
				StatusCode::FORBIDDEN,
				format!("Session {session} is not part of project {project}"),
			)
				.into_response()
		}
	}
}
