use crate::utils::encoding::encode_component;
use serde::{Deserialize, Serialize};

/// Placeholder in the viewer entry point that receives the encoded DICOMweb resource path.
pub const DICOMWEB_PLACEHOLDER: &str = "{dicomweb}";

/// Placeholder in the series endpoint template that receives the encoded study UID.
pub const STUDY_UID_PLACEHOLDER: &str = "{studyInstanceUID}";

/// Per-project viewer configuration, as served by `/xapi/volview/config/projects/{projectId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
	#[serde(default)]
	pub project_id: String,
	#[serde(default)]
	pub server_name: Option<String>,
	pub dicomweb: DicomwebEndpoints,
	pub viewer: ViewerEndpoints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicomwebEndpoints {
	/// Root of the project's DICOMweb service.
	pub root: String,
	/// QIDO-RS "all studies" endpoint.
	pub studies: String,
	/// QIDO-RS "study's series" endpoint with a `{studyInstanceUID}` placeholder.
	pub series: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instances: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerEndpoints {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shell_url: Option<String>,
	/// Either contains [`DICOMWEB_PLACEHOLDER`] or is a base URL receiving a `dicomweb` parameter.
	pub entry_point: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub launch_url_template: Option<String>,
}

impl ViewerConfig {
	pub fn dicomweb_root(&self) -> &str {
		&self.dicomweb.root
	}

	pub fn studies_endpoint(&self) -> &str {
		&self.dicomweb.studies
	}

	pub fn series_endpoint(&self, study_instance_uid: &str) -> String {
		self.dicomweb
			.series
			.replacen(STUDY_UID_PLACEHOLDER, &encode_component(study_instance_uid), 1)
	}

	pub fn entry_point(&self) -> &str {
		&self.viewer.entry_point
	}
}

/// The DICOMweb resource the viewer should load: `{root}/studies/{study}[/series/{series}]`.
///
/// Each identifier is encoded on its own; the composed path is left as is.
pub fn dicomweb_resource(config: &ViewerConfig, study_uid: &str, series_uid: Option<&str>) -> String {
	let mut target = format!(
		"{}/studies/{}",
		config.dicomweb_root(),
		encode_component(study_uid)
	);
	if let Some(series_uid) = series_uid.filter(|uid| !uid.is_empty()) {
		target.push_str("/series/");
		target.push_str(&encode_component(series_uid));
	}
	target
}

/// Builds the URL that opens the viewer on a study, or on one series of it.
///
/// The resource path is encoded once more as a whole before it is embedded,
/// because the viewer expects a single opaque parameter value.
pub fn build_viewer_url(config: &ViewerConfig, study_uid: &str, series_uid: Option<&str>) -> String {
	let encoded_target = encode_component(&dicomweb_resource(config, study_uid, series_uid));
	let entry_point = config.entry_point();

	if entry_point.contains(DICOMWEB_PLACEHOLDER) {
		return entry_point.replace(DICOMWEB_PLACEHOLDER, &encoded_target);
	}
	let separator = if entry_point.contains('?') { '&' } else { '?' };
	format!("{entry_point}{separator}dicomweb={encoded_target}")
}

#[cfg(test)]
pub(crate) fn test_config(entry_point: &str) -> ViewerConfig {
	let root = "https://xnat.example.org/xapi/dicomweb/projects/P1";
	ViewerConfig {
		project_id: String::from("P1"),
		server_name: Some(String::from("XNAT DICOMweb")),
		dicomweb: DicomwebEndpoints {
			root: root.to_owned(),
			studies: format!("{root}/studies"),
			series: format!("{root}/studies/{{studyInstanceUID}}/series"),
			instances: None,
		},
		viewer: ViewerEndpoints {
			shell_url: None,
			entry_point: entry_point.to_owned(),
			launch_url_template: None,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ENCODED_ROOT: &str =
		"https%3A%2F%2Fxnat.example.org%2Fxapi%2Fdicomweb%2Fprojects%2FP1";

	#[test]
	fn appends_query_parameter() {
		let config = test_config("https://viewer.example.org/index.html");
		assert_eq!(
			build_viewer_url(&config, "1.2.3", None),
			format!("https://viewer.example.org/index.html?dicomweb={ENCODED_ROOT}%2Fstudies%2F1.2.3")
		);
	}

	#[test]
	fn appends_to_existing_query() {
		let config = test_config("/volview/app/index.html?theme=dark");
		let url = build_viewer_url(&config, "1.2.3", None);
		assert!(url.starts_with("/volview/app/index.html?theme=dark&dicomweb="));
		assert_eq!(url.matches('?').count(), 1);
	}

	#[test]
	fn substitutes_placeholder() {
		let config = test_config("/volview/#/load?src={dicomweb}&mode={dicomweb}");
		let url = build_viewer_url(&config, "1.2.3", Some("4.5"));
		assert!(!url.contains(DICOMWEB_PLACEHOLDER));
		assert_eq!(
			url,
			format!(
				"/volview/#/load?src={ENCODED_ROOT}%2Fstudies%2F1.2.3%2Fseries%2F4.5&mode={ENCODED_ROOT}%2Fstudies%2F1.2.3%2Fseries%2F4.5"
			)
		);
	}

	#[test]
	fn encodes_identifiers_twice_in_total() {
		let config = test_config("/viewer");
		// `/` inside a UID is encoded as a segment (%2F), then the whole path again (%252F).
		let url = build_viewer_url(&config, "a/b", Some("c d"));
		assert!(url.ends_with("%2Fstudies%2Fa%252Fb%2Fseries%2Fc%2520d"));
	}

	#[test]
	fn series_url_extends_study_url() {
		let config = test_config("/viewer");
		let study = dicomweb_resource(&config, "1.2.3", None);
		let series = dicomweb_resource(&config, "1.2.3", Some("1.2.3.4"));
		assert!(series.starts_with(&format!("{study}/")));

		let first = build_viewer_url(&config, "1.2.3", Some("1.2.3.4"));
		let second = build_viewer_url(&config, "1.2.3", Some("1.2.3.4"));
		assert_eq!(first, second);
	}

	#[test]
	fn series_endpoint_substitutes_uid() {
		let config = test_config("/viewer");
		assert_eq!(
			config.series_endpoint("1.2 3"),
			"https://xnat.example.org/xapi/dicomweb/projects/P1/studies/1.2%203/series"
		);
	}

	#[test]
	fn parses_config_document() {
		let config: ViewerConfig = serde_json::from_str(
			r#"{
				"projectId": "P1",
				"serverName": "XNAT DICOMweb",
				"dicomweb": {
					"root": "http://localhost/xapi/dicomweb/projects/P1",
					"studies": "http://localhost/xapi/dicomweb/projects/P1/studies",
					"series": "http://localhost/xapi/dicomweb/projects/P1/studies/{studyInstanceUID}/series",
					"instances": "http://localhost/xapi/dicomweb/projects/P1/studies/{studyInstanceUID}/series/{seriesInstanceUID}/instances"
				},
				"viewer": {
					"shellUrl": "http://localhost/plugin-resources/xnat-volview/index.html",
					"entryPoint": "http://localhost/volview/app/index.html",
					"launchUrlTemplate": "http://localhost/volview/app/index.html?dicomweb=%s"
				}
			}"#,
		)
		.unwrap();

		assert_eq!(config.project_id, "P1");
		assert_eq!(config.entry_point(), "http://localhost/volview/app/index.html");
		assert_eq!(
			config.studies_endpoint(),
			"http://localhost/xapi/dicomweb/projects/P1/studies"
		);
	}
}
