//! Fakes shared by the unit tests.

use crate::archive::ArchiveClient;
use crate::client::FetchError;
use crate::config::{AppConfig, SessionConfig};
use crate::dicomweb::{DicomRecord, QidoQuery};
use crate::documents::DocumentBuilder;
use crate::launcher::{Notifier, Status};
use crate::loader::LocalConfigLoader;
use crate::sessions::StaticSessionDirectory;
use crate::types::QueryRetrieveLevel;
use crate::utils::encoding::decode_component;
use crate::AppState;
use async_trait::async_trait;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::{ACCEPT, COOKIE};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

pub const PLATFORM_URL: &str = "https://xnat.example.org";

pub fn study_record(uid: &str, description: &str) -> DicomRecord {
	DicomRecord::from_value(study_json(uid, description)).unwrap()
}

pub fn series_record(uid: &str, description: &str) -> DicomRecord {
	DicomRecord::from_value(series_json(uid, description)).unwrap()
}

fn study_json(uid: &str, description: &str) -> Value {
	json!({
		"0020000D": { "vr": "UI", "Value": [uid] },
		"00081030": { "vr": "LO", "Value": [description] },
		"00080020": { "vr": "DA", "Value": ["20240102"] },
		"00100010": { "vr": "PN", "Value": [{ "Alphabetic": "DOE^JANE" }] },
	})
}

fn series_json(uid: &str, description: &str) -> Value {
	json!({
		"0020000E": { "vr": "UI", "Value": [uid] },
		"0008103E": { "vr": "LO", "Value": [description] },
	})
}

/// Application state built from the embedded defaults plus `overrides`.
pub fn test_state(overrides: &str) -> AppState {
	AppState::new(AppConfig::from_toml(overrides).unwrap())
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> Url {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, router).await.unwrap();
	});
	Url::parse(&format!("http://{addr}/")).unwrap()
}

/// A configuration loader for project `P1` knowing session `XNAT_E00001` (study `1.2.3`).
pub fn local_loader() -> LocalConfigLoader {
	let config = AppConfig::from_toml("").unwrap();
	let sessions = StaticSessionDirectory::new(&[SessionConfig {
		id: String::from("XNAT_E00001"),
		project: String::from("P1"),
		label: Some(String::from("MR_01")),
		study_instance_uid: Some(String::from("1.2.3")),
		shared_projects: Vec::new(),
	}]);
	LocalConfigLoader::new(
		DocumentBuilder::new(config.volview, PLATFORM_URL),
		Arc::new(sessions),
	)
}

/// Records every status it is shown.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	statuses: Mutex<Vec<Status>>,
}

impl RecordingNotifier {
	pub fn statuses(&self) -> Vec<Status> {
		self.statuses.lock().unwrap().clone()
	}

	pub fn messages(&self) -> Vec<String> {
		self.statuses()
			.into_iter()
			.map(|status| status.message)
			.collect()
	}
}

impl Notifier for RecordingNotifier {
	fn notify(&self, status: &Status) {
		self.statuses.lock().unwrap().push(status.clone());
	}
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub query: String,
	pub accept: Option<String>,
	pub cookie: Option<String>,
}

#[derive(Debug, Default)]
struct ArchiveData {
	studies: Vec<Value>,
	series: HashMap<String, Vec<Value>>,
	failing: HashSet<String>,
	requests: Vec<RecordedRequest>,
}

/// A DICOMweb archive for project `P1`, usable over HTTP or in-process.
#[derive(Debug, Clone, Default)]
pub struct FakeArchive {
	data: Arc<Mutex<ArchiveData>>,
}

impl FakeArchive {
	pub fn with_studies(studies: &[(&str, &str)]) -> Self {
		let archive = Self::default();
		archive.data.lock().unwrap().studies = studies
			.iter()
			.map(|(uid, description)| study_json(uid, description))
			.collect();
		archive
	}

	pub fn with_series(self, study_uid: &str, series: &[(&str, &str)]) -> Self {
		self.data.lock().unwrap().series.insert(
			study_uid.to_owned(),
			series
				.iter()
				.map(|(uid, description)| series_json(uid, description))
				.collect(),
		);
		self
	}

	/// Series searches for `study_uid` answer `500 Internal Server Error`.
	pub fn failing_series(self, study_uid: &str) -> Self {
		self.data.lock().unwrap().failing.insert(study_uid.to_owned());
		self
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.data.lock().unwrap().requests.clone()
	}

	pub fn router(&self) -> Router {
		Router::new()
			.route("/dicomweb/projects/P1/studies", get(search_studies))
			.route(
				"/dicomweb/projects/P1/studies/{study}/series",
				get(search_series),
			)
			.with_state(self.clone())
	}

	fn record(&self, query: Option<String>, headers: &HeaderMap) {
		let header = |name: HeaderName| {
			headers
				.get(name)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned)
		};
		self.data.lock().unwrap().requests.push(RecordedRequest {
			query: query.unwrap_or_default(),
			accept: header(ACCEPT),
			cookie: header(COOKIE),
		});
	}

	fn studies(&self) -> Vec<Value> {
		self.data.lock().unwrap().studies.clone()
	}

	fn series(&self, study_uid: &str) -> Result<Vec<Value>, StatusCode> {
		let data = self.data.lock().unwrap();
		if data.failing.contains(study_uid) {
			return Err(StatusCode::INTERNAL_SERVER_ERROR);
		}
		Ok(data.series.get(study_uid).cloned().unwrap_or_default())
	}
}

fn matches(items: Vec<Value>) -> Response {
	if items.is_empty() {
		return StatusCode::NO_CONTENT.into_response();
	}
	Json(Value::Array(items)).into_response()
}

async fn search_studies(
	State(archive): State<FakeArchive>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	archive.record(query, &headers);
	matches(archive.studies())
}

async fn search_series(
	State(archive): State<FakeArchive>,
	Path(study): Path<String>,
	RawQuery(query): RawQuery,
	headers: HeaderMap,
) -> Response {
	archive.record(query, &headers);
	match archive.series(&study) {
		Ok(series) => matches(series),
		Err(status) => status.into_response(),
	}
}

/// The StudyInstanceUID following the `studies` segment of an endpoint.
fn study_of(endpoint: &str) -> Option<String> {
	let url = Url::parse(endpoint).ok()?;
	let mut segments = url.path_segments()?;
	segments.find(|segment| *segment == "studies")?;
	segments
		.next()
		.map(|segment| decode_component(segment).into_owned())
}

#[async_trait]
impl ArchiveClient for FakeArchive {
	async fn search(&self, query: &QidoQuery) -> Result<Vec<DicomRecord>, FetchError> {
		let url = query.to_url(&Url::parse(PLATFORM_URL)?)?;
		self.record(url.query().map(str::to_owned), &HeaderMap::new());

		let items = match query.level {
			QueryRetrieveLevel::Study => self.studies(),
			QueryRetrieveLevel::Series => {
				let study_uid = study_of(url.as_str()).unwrap_or_default();
				self.series(&study_uid).map_err(FetchError::Status)?
			}
		};
		Ok(items.into_iter().filter_map(DicomRecord::from_value).collect())
	}
}
