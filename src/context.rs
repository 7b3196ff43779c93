use crate::types::UI;
use crate::utils::encoding::decode_component;
use thiserror::Error;

/// Route prefixes the launcher page is served under. Whatever precedes the
/// first match is the platform's context path.
const ROUTE_MARKERS: &[&str] = &["/xapi/volview/app/", "/volview/app/", "/app/volview/"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
	#[error(
		"Unable to determine project identifier from URL. Expected /xapi/volview/app/projects/{{projectId}}."
	)]
	MissingProject,
}

/// A study requested before the study list is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preselection {
	pub study_uid: UI,
	/// Open the viewer on the study as soon as it is selected.
	pub auto_launch: bool,
}

/// What the launcher page was opened for. Resolved once from the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
	pub project_id: String,
	pub session_id: Option<String>,
	pub preselect: Option<Preselection>,
	pub context_path: String,
}

impl ProjectContext {
	/// Resolves the context from the page path and its raw query string.
	pub fn resolve(path: &str, query: Option<&str>) -> Result<Self, ContextError> {
		let params = QueryParams::parse(query.unwrap_or_default());
		let project_id = project_from_path(path)
			.or_else(|| params.first_of(&["project"]))
			.ok_or(ContextError::MissingProject)?;

		let preselect = params
			.first_of(&["study", "studyInstanceUID"])
			.map(|study_uid| Preselection {
				study_uid,
				auto_launch: true,
			});

		Ok(Self {
			project_id,
			session_id: params.first_of(&["session", "sessionId"]),
			preselect,
			context_path: context_path(path),
		})
	}
}

/// Finds `volview/projects/{id}` or `volview/app/projects/{id}` after the last
/// `volview` segment and decodes the identifier once.
pub fn project_from_path(path: &str) -> Option<String> {
	let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
	let volview = segments.iter().rposition(|segment| *segment == "volview")?;
	let rest = &segments[volview + 1..];

	let encoded = match rest {
		["projects", id, ..] | ["app", "projects", id, ..] => *id,
		_ => return None,
	};
	Some(decode_component(encoded).into_owned()).filter(|id| !id.is_empty())
}

/// The part of `path` in front of the launcher route, e.g. `/xnat`.
pub fn context_path(path: &str) -> String {
	ROUTE_MARKERS
		.iter()
		.find_map(|marker| path.find(marker))
		.map(|index| path[..index].to_owned())
		.unwrap_or_default()
}

/// Decoded query pairs in their original order.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
	fn parse(query: &str) -> Self {
		Self(
			url::form_urlencoded::parse(query.as_bytes())
				.map(|(key, value)| (key.into_owned(), value.into_owned()))
				.collect(),
		)
	}

	fn get(&self, name: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}

	/// The first non-empty value, trying the names in order.
	fn first_of(&self, names: &[&str]) -> Option<String> {
		names
			.iter()
			.filter_map(|name| self.get(name))
			.find(|value| !value.is_empty())
			.map(str::to_owned)
	}
}
