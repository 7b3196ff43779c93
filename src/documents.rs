//! Computes the configuration documents served to the launcher page.

use crate::config::VolViewConfig;
use crate::loader::SessionInfo;
use crate::sessions::SessionRecord;
use crate::viewer::{DicomwebEndpoints, ViewerConfig, ViewerEndpoints, STUDY_UID_PLACEHOLDER};

#[derive(Debug, Clone)]
pub struct DocumentBuilder {
	settings: VolViewConfig,
	/// `{scheme}://{host}{context_path}` of the platform as seen by the browser.
	base_url: String,
}

impl DocumentBuilder {
	pub fn new(settings: VolViewConfig, base_url: impl Into<String>) -> Self {
		let mut base_url = base_url.into();
		while base_url.ends_with('/') {
			base_url.pop();
		}
		Self { settings, base_url }
	}

	pub fn dicomweb_root(&self, project_id: &str) -> String {
		format!(
			"{}{}",
			self.base_url,
			self.settings.project_dicomweb_path(project_id)
		)
	}

	/// Absolute URLs pass through, everything else is anchored at the base URL.
	pub fn resolve_url(&self, path: &str) -> String {
		let trimmed = path.trim();
		if trimmed.is_empty() {
			return self.base_url.clone();
		}
		if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
			return trimmed.to_owned();
		}
		if trimmed.starts_with('/') {
			return format!("{}{trimmed}", self.base_url);
		}
		format!("{}/{trimmed}", self.base_url)
	}

	pub fn viewer_config(&self, project_id: &str) -> ViewerConfig {
		let root = self.dicomweb_root(project_id);
		let entry_point = self.resolve_url(&self.settings.viewer_entry_point);

		ViewerConfig {
			project_id: project_id.to_owned(),
			server_name: Some(self.settings.server_name.clone()),
			dicomweb: DicomwebEndpoints {
				studies: format!("{root}/studies"),
				series: format!("{root}/studies/{STUDY_UID_PLACEHOLDER}/series"),
				instances: Some(format!(
					"{root}/studies/{STUDY_UID_PLACEHOLDER}/series/{{seriesInstanceUID}}/instances"
				)),
				root,
			},
			viewer: ViewerEndpoints {
				shell_url: Some(self.resolve_url(&self.settings.shell_path)),
				launch_url_template: Some(format!("{entry_point}?dicomweb=%s")),
				entry_point,
			},
		}
	}

	pub fn session_info(&self, project_id: &str, session: &SessionRecord) -> SessionInfo {
		let root = self.dicomweb_root(project_id);
		SessionInfo {
			project_id: project_id.to_owned(),
			session_id: session.id.clone(),
			label: session.label.clone(),
			study_instance_uid: session.study_instance_uid.clone(),
			dicomweb_study_url: session
				.study_instance_uid
				.as_ref()
				.map(|uid| format!("{root}/studies/{uid}")),
			viewer_entry_point: Some(self.resolve_url(&self.settings.viewer_entry_point)),
		}
	}
}
