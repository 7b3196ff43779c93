use crate::api::{documents, request_origin};
use crate::archive::HttpArchiveClient;
use crate::client::PlatformClient;
use crate::config::ConfigSource;
use crate::context::ProjectContext;
use crate::launcher::{Event, Launcher, StatusLine, ViewerTarget};
use crate::loader::{ConfigLoader, HttpConfigLoader, LocalConfigLoader};
use crate::types::UI;
use crate::view::render_page;
use crate::AppState;
use axum::extract::{OriginalUri, State};
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::Query;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use url::Url;

/// Route prefixes the launcher page is served under.
const PAGE_PREFIXES: &[&str] = &[
	"/xapi/volview/app/projects",
	"/volview/app/projects",
	"/app/volview/projects",
];

pub fn routes() -> Router<AppState> {
	PAGE_PREFIXES.iter().fold(Router::new(), |router, prefix| {
		router
			.route(&format!("{prefix}/{{project}}"), get(launcher_page))
			.route(&format!("{prefix}/{{project}}/{{*rest}}"), get(launcher_page))
	})
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpenTarget {
	Study,
	Series,
}

/// Form state submitted by the launcher page itself.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
struct PageParameters {
	#[serde(rename = "selectedStudy")]
	selected_study: Option<UI>,
	#[serde(rename = "selectedSeries")]
	selected_series: Option<UI>,
	open: Option<OpenTarget>,
	#[serde(rename = "viewerStudy")]
	viewer_study: Option<UI>,
	#[serde(rename = "viewerSeries")]
	viewer_series: Option<UI>,
}

fn non_empty(value: UI) -> Option<UI> {
	Some(value).filter(|value| !value.is_empty())
}

impl PageParameters {
	/// Whether the request came from the page's own form rather than a fresh navigation.
	fn is_submission(&self) -> bool {
		self.selected_study.is_some()
			|| self.selected_series.is_some()
			|| self.open.is_some()
			|| self.viewer_study.is_some()
	}

	/// Carries the viewer of the submitting page over. Precedes everything else.
	fn resumed(&mut self) -> Option<Event> {
		if !self.is_submission() {
			return None;
		}
		let series_uid = self.viewer_series.take().and_then(non_empty);
		let viewer = self
			.viewer_study
			.take()
			.and_then(non_empty)
			.map(|study_uid| ViewerTarget { study_uid, series_uid });
		Some(Event::Resumed(viewer))
	}

	/// The interaction that produced this request, in the order a user performs it.
	fn events(self) -> Vec<Event> {
		let mut events = Vec::new();
		if let Some(study) = self.selected_study {
			events.push(Event::StudySelected(non_empty(study)));
		}
		if let Some(series) = self.selected_series {
			events.push(Event::SeriesSelected(non_empty(series)));
		}
		match self.open {
			Some(OpenTarget::Study) => events.push(Event::OpenStudyClicked),
			Some(OpenTarget::Series) => events.push(Event::OpenSeriesClicked),
			None => {}
		}
		events
	}
}

fn parse_origin(origin: &str) -> Result<Url, Response> {
	Url::parse(origin).map_err(|error| {
		warn!(%origin, %error, "Cannot resolve origin");
		(StatusCode::BAD_REQUEST, "Invalid request origin").into_response()
	})
}

#[instrument(skip_all, fields(path = %uri.path()))]
async fn launcher_page(
	State(state): State<AppState>,
	OriginalUri(uri): OriginalUri,
	headers: HeaderMap,
	Query(mut parameters): Query<PageParameters>,
) -> Response {
	let page_origin = request_origin(&state, &headers);
	let archive_origin = state
		.config
		.launcher
		.archive_origin
		.clone()
		.unwrap_or_else(|| page_origin.clone());
	let (page_origin, archive_origin) = match (parse_origin(&page_origin), parse_origin(&archive_origin)) {
		(Ok(page_origin), Ok(archive_origin)) => (page_origin, archive_origin),
		(Err(response), _) | (_, Err(response)) => return response,
	};

	let cookie = headers
		.get(COOKIE)
		.and_then(|value| value.to_str().ok())
		.map(str::to_owned);
	let platform = PlatformClient::new(state.http.clone(), page_origin).with_cookie(cookie.clone());
	let archive = PlatformClient::new(state.http.clone(), archive_origin).with_cookie(cookie);

	let context = ProjectContext::resolve(uri.path(), uri.query());
	let launcher_config = &state.config.launcher;
	let loader: Arc<dyn ConfigLoader> = match (&launcher_config.config_url, launcher_config.config_source) {
		(Some(config_url), _) => Arc::new(HttpConfigLoader::new(platform, config_url.as_str())),
		(None, ConfigSource::Platform) => {
			let context_path = context
				.as_ref()
				.map(|context| context.context_path.clone())
				.unwrap_or_default();
			Arc::new(HttpConfigLoader::new(platform, context_path))
		}
		(None, ConfigSource::Local) => Arc::new(LocalConfigLoader::new(
			documents(&state, &headers),
			Arc::clone(&state.sessions),
		)),
	};

	let mut launcher = Launcher::new(loader, Arc::new(HttpArchiveClient::new(archive)), StatusLine::default());
	if let Some(resumed) = parameters.resumed() {
		launcher.dispatch(resumed).await;
	}
	launcher.start(context).await;
	launcher.replay(parameters.events()).await;

	let status = launcher.notifier().current();
	Html(render_page(launcher.state(), status.as_ref(), launcher.viewer_url())).into_response()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{serve, test_state, FakeArchive};
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, Uri};
	use serde_json::json;
	use std::sync::Mutex;
	use tower::ServiceExt;

	#[test]
	fn parse_page_params() {
		let uri = Uri::from_static(
			"http://test?session=XNAT_E1&selectedStudy=1.2.3&selectedSeries=&open=series&viewerStudy=4.5.6&viewerSeries=",
		);
		let Query(mut params) = Query::<PageParameters>::try_from_uri(&uri).unwrap();

		assert_eq!(
			params,
			PageParameters {
				selected_study: Some(String::from("1.2.3")),
				selected_series: Some(String::new()),
				open: Some(OpenTarget::Series),
				viewer_study: Some(String::from("4.5.6")),
				viewer_series: Some(String::new()),
			}
		);
		assert!(matches!(
			params.resumed(),
			Some(Event::Resumed(Some(ViewerTarget { ref study_uid, series_uid: None }))) if study_uid == "4.5.6"
		));
		assert!(matches!(
			params.events().as_slice(),
			[
				Event::StudySelected(Some(_)),
				Event::SeriesSelected(None),
				Event::OpenSeriesClicked
			]
		));
	}

	#[test]
	fn parse_page_params_default() {
		let uri = Uri::from_static("http://test?session=XNAT_E1");
		let Query(mut params) = Query::<PageParameters>::try_from_uri(&uri).unwrap();
		assert_eq!(params, PageParameters::default());
		assert!(params.resumed().is_none());
		assert!(params.events().is_empty());
	}

	#[test]
	fn submission_without_open_viewer() {
		let uri = Uri::from_static("http://test?selectedStudy=1.2.3");
		let Query(mut params) = Query::<PageParameters>::try_from_uri(&uri).unwrap();
		assert!(matches!(params.resumed(), Some(Event::Resumed(None))));
	}

	/// Requests `uri` from a launcher mounted at `base` whose platform and DICOMweb
	/// service are served by `platform`.
	async fn render(platform: Router, base: &str, settings: &str, uri: &str) -> String {
		let origin = serve(platform).await;
		let state = test_state(&format!(
			r#"
			[server.http]
			public_url = "{}"
			context_path = "{base}"

			[volview]
			dicomweb_base_path = "/dicomweb/projects"
			viewer_entry_point = "/volview/index.html"

			[[sessions]]
			id = "XNAT_E00001"
			project = "P1"
			study_instance_uid = "1.2.3"

			{settings}
			"#,
			origin.as_str().trim_end_matches('/')
		));

		let request = Request::builder()
			.uri(uri)
			.header(COOKIE, "JSESSIONID=abc")
			.body(Body::empty())
			.unwrap();
		let response = crate::api::routes(base)
			.with_state(state)
			.oneshot(request)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		String::from_utf8(body.to_vec()).unwrap()
	}

	/// A launcher whose DICOMweb service is `archive`.
	async fn page(archive: &FakeArchive, uri: &str) -> String {
		render(archive.router(), "", "", uri).await
	}

	fn frame(html: &str) -> Option<&str> {
		let start = html.find("<iframe")?;
		let end = html[start..].find('>')?;
		Some(&html[start..start + end])
	}

	#[tokio::test]
	async fn session_page_opens_session_study() {
		let archive = FakeArchive::with_studies(&[("1.2.3", "CT Thorax"), ("4.5.6", "MR Head")])
			.with_series("1.2.3", &[("1.2.3.1", "Axial")]);
		let html = page(&archive, "/xapi/volview/app/projects/P1?session=XNAT_E00001").await;

		assert!(html.contains("<option value=\"1.2.3\" selected>"));
		assert!(html.contains("<iframe id=\"viewer\""));
		assert!(html.contains("dicomweb%2Fprojects%2FP1%2Fstudies%2F1.2.3\""));
		assert!(html.contains("Axial"));

		let requests = archive.requests();
		assert_eq!(requests.len(), 2);
		assert!(requests
			.iter()
			.all(|request| request.cookie.as_deref() == Some("JSESSIONID=abc")));
	}

	#[tokio::test]
	async fn form_submission_opens_series() {
		let archive = FakeArchive::with_studies(&[("1.2.3", "CT Thorax"), ("4.5.6", "MR Head")])
			.with_series("4.5.6", &[("4.5.6.1", "Sagittal")]);
		let html = page(
			&archive,
			"/volview/app/projects/P1?selectedStudy=4.5.6&selectedSeries=4.5.6.1&open=series",
		)
		.await;

		assert!(html.contains("<option value=\"4.5.6.1\" selected>Sagittal</option>"));
		assert!(html.contains("%2Fstudies%2F4.5.6%2Fseries%2F4.5.6.1\""));
		assert!(html.contains("<input type=\"hidden\" name=\"viewerSeries\" value=\"4.5.6.1\">"));
		assert!(html.contains("Launching VolView…"));
	}

	#[tokio::test]
	async fn dropdown_change_keeps_open_viewer() {
		let archive = FakeArchive::with_studies(&[("1.2.3", "CT Thorax"), ("4.5.6", "MR Head")])
			.with_series("4.5.6", &[("4.5.6.1", "Sagittal")]);
		let study_frame = |html: &str| frame(html).is_some_and(|frame| frame.ends_with("%2Fstudies%2F4.5.6\""));
		let opened = page(&archive, "/xapi/volview/app/projects/P1?selectedStudy=4.5.6&open=study").await;
		assert!(study_frame(&opened));
		assert!(opened.contains("<input type=\"hidden\" name=\"viewerStudy\" value=\"4.5.6\">"));

		// What the series dropdown submits next.
		let changed = page(
			&archive,
			"/xapi/volview/app/projects/P1?viewerStudy=4.5.6&selectedStudy=4.5.6&selectedSeries=4.5.6.1",
		)
		.await;
		assert!(study_frame(&changed));
		assert!(changed.contains("<option value=\"4.5.6.1\" selected>Sagittal</option>"));
		assert!(!changed.contains("Launching VolView…"));

		// A selection change before anything was opened shows no viewer.
		let untouched = page(&archive, "/xapi/volview/app/projects/P1?selectedStudy=1.2.3").await;
		assert_eq!(frame(&untouched), None);
	}

	#[tokio::test]
	async fn session_page_submission_does_not_relaunch() {
		let archive = FakeArchive::with_studies(&[("1.2.3", "CT Thorax"), ("4.5.6", "MR Head")]);
		let html = page(
			&archive,
			"/xapi/volview/app/projects/P1?session=XNAT_E00001&viewerStudy=4.5.6&selectedStudy=4.5.6",
		)
		.await;

		assert!(html.contains("<option value=\"4.5.6\" selected>"));
		assert!(!html.contains("<option value=\"1.2.3\" selected>"));
		assert!(frame(&html).is_some_and(|frame| frame.ends_with("%2Fstudies%2F4.5.6\"")));
	}

	#[tokio::test]
	async fn platform_configuration_below_context_path() {
		let archive = FakeArchive::with_studies(&[("1.2.3", "CT Thorax")]);
		let requested = Arc::new(Mutex::new(Vec::new()));
		let recorded = Arc::clone(&requested);
		let platform = archive.router().route(
			"/xnat/xapi/volview/config/projects/{project}",
			get(move |uri: Uri, headers: HeaderMap| {
				let recorded = Arc::clone(&recorded);
				async move {
					let cookie = headers.get(COOKIE).and_then(|value| value.to_str().ok()).map(str::to_owned);
					recorded.lock().unwrap().push((uri.path().to_owned(), cookie));
					axum::Json(json!({
						"projectId": "P1",
						"dicomweb": {
							"root": "/dicomweb/projects/P1",
							"studies": "/dicomweb/projects/P1/studies",
							"series": "/dicomweb/projects/P1/studies/{studyInstanceUID}/series",
						},
						"viewer": { "entryPoint": "/remote/viewer.html" },
					}))
				}
			}),
		);

		let html = render(
			platform,
			"/xnat",
			"[launcher]\nconfig_source = \"platform\"",
			"/xnat/xapi/volview/app/projects/P1",
		)
		.await;

		assert_eq!(
			*requested.lock().unwrap(),
			vec![(
				String::from("/xnat/xapi/volview/config/projects/P1"),
				Some(String::from("JSESSIONID=abc"))
			)]
		);
		assert!(html.contains("<dd id=\"viewer-entry-point\">/remote/viewer.html</dd>"));
		assert!(html.contains("Loaded 1 studies."));
	}

	#[tokio::test]
	async fn page_without_project_reports_error() {
		let archive = FakeArchive::with_studies(&[]);
		let html = page(&archive, "/xapi/volview/app/projects/P1/volview/index.html").await;

		assert!(html.contains("style=\"color: #ff8b8b\">Unable to determine project identifier"));
		assert!(archive.requests().is_empty());
	}
}
