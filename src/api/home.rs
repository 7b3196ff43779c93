use crate::AppState;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

pub fn routes() -> Router<AppState> {
	Router::new().route("/", get(index))
}

async fn index() -> impl IntoResponse {
	format!(
		"This server is running volview-launcher (v{}). Open /xapi/volview/app/projects/{{projectId}} to launch VolView.",
		env!("CARGO_PKG_VERSION")
	)
}
