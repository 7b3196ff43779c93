use crate::launch::{resolve_launch, Gesture, GestureKind, PageContext};
use crate::AppState;
use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::Deserialize;
use tracing::{instrument, warn};

pub fn routes() -> Router<AppState> {
	Router::new().route("/xapi/volview/launch", get(launch))
}

/// Page context and pointer gesture, as sent by the session page's launch control.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
struct LaunchParameters {
	#[serde(rename = "projectID")]
	project_id: Option<String>,
	#[serde(rename = "projectId")]
	project_id_alias: Option<String>,
	#[serde(rename = "ID")]
	session_id: Option<String>,
	#[serde(rename = "id")]
	session_id_alias: Option<String>,
	#[serde(default)]
	event: GestureKind,
	#[serde(default)]
	button: u8,
	#[serde(default, rename = "metaKey")]
	meta_key: bool,
	#[serde(default, rename = "ctrlKey")]
	ctrl_key: bool,
}

impl LaunchParameters {
	fn split(self) -> (PageContext, Gesture) {
		let first = |primary: Option<String>, alias: Option<String>| {
			primary
				.filter(|value| !value.is_empty())
				.or_else(|| alias.filter(|value| !value.is_empty()))
		};
		let page = PageContext {
			project_id: first(self.project_id, self.project_id_alias),
			session_id: first(self.session_id, self.session_id_alias),
		};
		let gesture = Gesture {
			kind: self.event,
			button: self.button,
			meta_key: self.meta_key,
			ctrl_key: self.ctrl_key,
		};
		(page, gesture)
	}
}

fn accepts_json(headers: &HeaderMap) -> bool {
	headers
		.get(ACCEPT)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|accept| accept.contains(mime::APPLICATION_JSON.essence_str()))
}

#[instrument(skip_all)]
async fn launch(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(parameters): Query<LaunchParameters>,
) -> Response {
	let (page, gesture) = parameters.split();
	match resolve_launch(&state.config.server.http.context_path(), &page, gesture) {
		Ok(Some(action)) if accepts_json(&headers) => Json(action).into_response(),
		Ok(Some(action)) => Redirect::to(&action.url).into_response(),
		Ok(None) => StatusCode::NO_CONTENT.into_response(),
		Err(error) => {
			warn!(%error, "Rejected launch request");
			(StatusCode::BAD_REQUEST, error.to_string()).into_response()
		}
	}
}
