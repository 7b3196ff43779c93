use crate::client::{FetchError, PlatformClient};
use crate::documents::DocumentBuilder;
use crate::sessions::{SessionDirectory, SessionLookupError};
use crate::types::UI;
use crate::utils::encoding::encode_component;
use crate::viewer::ViewerConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Session-scoped metadata, as served by `/xapi/volview/config/projects/{projectId}/sessions/{sessionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
	#[serde(default)]
	pub project_id: String,
	#[serde(default)]
	pub session_id: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(rename = "studyInstanceUID", default)]
	pub study_instance_uid: Option<UI>,
	#[serde(default)]
	pub dicomweb_study_url: Option<String>,
	#[serde(default)]
	pub viewer_entry_point: Option<String>,
}

/// Path of the project configuration document below the platform base.
pub fn project_config_path(project_id: &str) -> String {
	format!(
		"/xapi/volview/config/projects/{}",
		encode_component(project_id)
	)
}

/// Path of the session configuration document below the platform base.
pub fn session_config_path(project_id: &str, session_id: &str) -> String {
	format!(
		"{}/sessions/{}",
		project_config_path(project_id),
		encode_component(session_id)
	)
}

#[async_trait]
pub trait ConfigLoader: Send + Sync {
	async fn load_config(&self, project_id: &str) -> Result<ViewerConfig, FetchError>;

	async fn load_session_config(
		&self,
		project_id: &str,
		session_id: &str,
	) -> Result<SessionInfo, FetchError>;
}

/// Fetches the configuration documents from the platform's configuration API.
pub struct HttpConfigLoader {
	client: PlatformClient,
	/// Absolute URL, or a context path relative to the client origin.
	api_base: String,
}

impl HttpConfigLoader {
	pub fn new(client: PlatformClient, api_base: impl Into<String>) -> Self {
		let mut api_base = api_base.into();
		while api_base.ends_with('/') {
			api_base.pop();
		}
		Self { client, api_base }
	}
}

#[async_trait]
impl ConfigLoader for HttpConfigLoader {
	#[instrument(skip(self))]
	async fn load_config(&self, project_id: &str) -> Result<ViewerConfig, FetchError> {
		let url = self
			.client
			.resolve(&format!("{}{}", self.api_base, project_config_path(project_id)))?;
		self.client.get_json(url).await
	}

	#[instrument(skip(self))]
	async fn load_session_config(
		&self,
		project_id: &str,
		session_id: &str,
	) -> Result<SessionInfo, FetchError> {
		let url = self.client.resolve(&format!(
			"{}{}",
			self.api_base,
			session_config_path(project_id, session_id)
		))?;
		self.client.get_json(url).await
	}
}

/// Computes the configuration documents in-process, as the configuration API would.
pub struct LocalConfigLoader {
	documents: DocumentBuilder,
	sessions: Arc<dyn SessionDirectory>,
}

impl LocalConfigLoader {
	pub fn new(documents: DocumentBuilder, sessions: Arc<dyn SessionDirectory>) -> Self {
		Self {
			documents,
			sessions,
		}
	}
}

impl From<SessionLookupError> for FetchError {
	fn from(error: SessionLookupError) -> Self {
		match error {
			SessionLookupError::NotFound(_) => Self::Status(StatusCode::NOT_FOUND),
			SessionLookupError::ProjectMismatch { .. } => Self::Status(StatusCode::FORBIDDEN),
		}
	}
}

#[async_trait]
impl ConfigLoader for LocalConfigLoader {
	async fn load_config(&self, project_id: &str) -> Result<ViewerConfig, FetchError> {
		Ok(self.documents.viewer_config(project_id))
	}

	async fn load_session_config(
		&self,
		project_id: &str,
		session_id: &str,
	) -> Result<SessionInfo, FetchError> {
		let session = self.sessions.lookup(project_id, session_id).await?;
		Ok(self.documents.session_info(project_id, &session))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{AppConfig, SessionConfig};
	use crate::sessions::StaticSessionDirectory;
	use crate::testing::{serve, test_state};

	#[test]
	fn encodes_document_paths() {
		assert_eq!(
			project_config_path("My Project"),
			"/xapi/volview/config/projects/My%20Project"
		);
		assert_eq!(
			session_config_path("P1", "XNAT_E00001"),
			"/xapi/volview/config/projects/P1/sessions/XNAT_E00001"
		);
	}

	#[test]
	fn parses_session_document_without_uid() {
		let info: SessionInfo = serde_json::from_str(
			r#"{"projectId":"P1","sessionId":"XNAT_E00001","label":"MR_01","studyInstanceUID":null}"#,
		)
		.unwrap();
		assert_eq!(info.study_instance_uid, None);
		assert_eq!(info.label.as_deref(), Some("MR_01"));
	}

	fn local_loader() -> LocalConfigLoader {
		let config = AppConfig::from_toml("").unwrap();
		let sessions = StaticSessionDirectory::new(&[SessionConfig {
			id: String::from("XNAT_E00001"),
			project: String::from("P1"),
			label: None,
			study_instance_uid: Some(String::from("1.2.3")),
			shared_projects: Vec::new(),
		}]);
		LocalConfigLoader::new(
			DocumentBuilder::new(config.volview, "http://localhost:8080"),
			Arc::new(sessions),
		)
	}

	#[tokio::test]
	async fn local_loader_maps_lookup_failures_to_status() {
		let loader = local_loader();

		let info = loader.load_session_config("P1", "XNAT_E00001").await.unwrap();
		assert_eq!(info.study_instance_uid.as_deref(), Some("1.2.3"));

		let missing = loader.load_session_config("P1", "XNAT_E0").await.unwrap_err();
		assert_eq!(missing.status(), Some(StatusCode::NOT_FOUND));

		let foreign = loader.load_session_config("P2", "XNAT_E00001").await.unwrap_err();
		assert_eq!(foreign.status(), Some(StatusCode::FORBIDDEN));
	}

	#[tokio::test]
	async fn http_loader_reads_configuration_api() {
		let state = test_state(
			r#"
			[server.http]
			context_path = "/xnat"

			[[sessions]]
			id = "XNAT_E00001"
			project = "P1"
			study_instance_uid = "1.2.3"
			"#,
		);
		let router = crate::api::routes("/xnat").with_state(state);
		let origin = serve(router).await;
		let loader = HttpConfigLoader::new(
			PlatformClient::new(reqwest::Client::new(), origin.clone()),
			"/xnat/",
		);

		let config = loader.load_config("P1").await.unwrap();
		assert_eq!(config.project_id, "P1");
		assert!(config
			.dicomweb
			.root
			.ends_with("/xnat/xapi/dicomweb/projects/P1"));

		let info = loader.load_session_config("P1", "XNAT_E00001").await.unwrap();
		assert_eq!(info.study_instance_uid.as_deref(), Some("1.2.3"));

		let error = loader.load_session_config("P2", "XNAT_E00001").await.unwrap_err();
		assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
	}
}
