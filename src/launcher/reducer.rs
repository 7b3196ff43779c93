use super::state::{
	Choice, Dropdown, LauncherState, Phase, ViewerTarget, NO_SERIES, NO_STUDIES, SERIES_AWAITING_STUDY,
	SERIES_LOADING, SERIES_PLACEHOLDER, SERIES_UNAVAILABLE, STUDY_LOADING, STUDY_PLACEHOLDER,
};
use super::{LauncherError, Status};
use crate::client::FetchError;
use crate::context::{ContextError, Preselection, ProjectContext};
use crate::dicomweb::{DicomRecord, QidoQuery, SeriesRecord, StudyRecord};
use crate::loader::SessionInfo;
use crate::types::UI;
use crate::viewer::build_viewer_url;

pub const MISSING_SESSION_STUDY: &str =
	"Session metadata does not include a StudyInstanceUID. Please choose a study manually.";
pub const NO_STUDIES_RETURNED: &str = "No DICOM studies were returned for this project.";
pub const LAUNCHING: &str = "Launching VolView…";

/// Everything that can happen to a launcher session.
#[derive(Debug)]
pub enum Event {
	/// The page was submitted from an earlier rendering that showed `viewer`.
	/// Must precede [`Event::ContextResolved`].
	Resumed(Option<ViewerTarget>),
	ContextResolved(Result<ProjectContext, ContextError>),
	ConfigLoaded(Result<crate::viewer::ViewerConfig, FetchError>),
	SessionLoaded(Result<SessionInfo, FetchError>),
	StudiesLoaded(Result<Vec<DicomRecord>, FetchError>),
	SeriesLoaded {
		study_uid: UI,
		result: Result<Vec<DicomRecord>, FetchError>,
	},
	/// The study dropdown changed; `None` is the placeholder option.
	StudySelected(Option<UI>),
	/// The series dropdown changed; `None` is the placeholder option.
	SeriesSelected(Option<UI>),
	OpenStudyClicked,
	OpenSeriesClicked,
	/// A failure nothing else accounted for.
	Crashed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
	Config {
		project_id: String,
	},
	Session {
		project_id: String,
		session_id: String,
	},
	Studies(QidoQuery),
	Series {
		study_uid: UI,
		query: QidoQuery,
	},
}

/// Side effects requested by [`reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Fetch(Fetch),
	Notify(Status),
	/// Point the viewer frame at a URL.
	Navigate(String),
}

/// Applies one event to the state and returns the side effects it calls for.
///
/// Interaction events on disabled controls are ignored, as are all events once a
/// fatal error has been reported.
pub fn reduce(state: &mut LauncherState, event: Event) -> Vec<Command> {
	if state.phase == Phase::Failed {
		return Vec::new();
	}

	match event {
		Event::Resumed(viewer) => {
			state.resumed = true;
			state.viewer = viewer;
			Vec::new()
		}
		Event::ContextResolved(Ok(context)) => context_resolved(state, context),
		Event::ContextResolved(Err(error)) => fail(state, error.into()),
		Event::ConfigLoaded(Ok(config)) => {
			state.config = Some(config);
			match session_to_load(state) {
				Some((project_id, session_id)) => vec![Command::Fetch(Fetch::Session {
					project_id,
					session_id,
				})],
				None => search_studies(state),
			}
		}
		Event::ConfigLoaded(Err(error)) => fail(state, LauncherError::ConfigFetch(error)),
		Event::SessionLoaded(result) => session_loaded(state, result),
		Event::StudiesLoaded(Ok(records)) => studies_loaded(state, records),
		Event::StudiesLoaded(Err(error)) => fail(state, LauncherError::StudyQuery(error)),
		Event::SeriesLoaded { study_uid, result } => series_loaded(state, study_uid, result),
		Event::StudySelected(study_uid) if state.study_select.enabled => {
			select_study(state, study_uid)
		}
		Event::SeriesSelected(series_uid) if state.series_select.enabled => {
			select_series(state, series_uid);
			Vec::new()
		}
		Event::OpenStudyClicked if state.open_study_enabled => open_study(state),
		Event::OpenSeriesClicked if state.open_series_enabled => open_series(state),
		Event::Crashed(message) => fail(state, LauncherError::Unexpected(message)),
		Event::StudySelected(_)
		| Event::SeriesSelected(_)
		| Event::OpenStudyClicked
		| Event::OpenSeriesClicked => Vec::new(),
	}
}

fn fail(state: &mut LauncherState, error: LauncherError) -> Vec<Command> {
	debug_assert!(error.is_fatal());
	state.phase = Phase::Failed;
	state.disable_controls();
	vec![Command::Notify(error.status())]
}

fn context_resolved(state: &mut LauncherState, context: ProjectContext) -> Vec<Command> {
	let project_id = context.project_id.clone();
	// A resumed page carries its own selection.
	if !state.resumed {
		state.preselect = context.preselect.clone();
	}
	state.context = Some(context);
	vec![Command::Fetch(Fetch::Config { project_id })]
}

fn session_to_load(state: &LauncherState) -> Option<(String, String)> {
	let context = state.context.as_ref()?;
	let session_id = context.session_id.clone()?;
	Some((context.project_id.clone(), session_id))
}

fn session_loaded(state: &mut LauncherState, result: Result<SessionInfo, FetchError>) -> Vec<Command> {
	let mut commands = Vec::new();
	match result {
		Ok(info) => {
			match info.study_instance_uid.clone().filter(|uid| !uid.is_empty()) {
				Some(_) if state.resumed => {}
				// A study requested in the URL takes precedence, but the session still launches it.
				Some(study_uid) => {
					state
						.preselect
						.get_or_insert(Preselection {
							study_uid,
							auto_launch: true,
						})
						.auto_launch = true;
				}
				None => commands.push(Command::Notify(Status::info(MISSING_SESSION_STUDY))),
			}
			state.session = Some(info);
		}
		Err(error) => commands.push(Command::Notify(Status::info(format!(
			"Failed to resolve session metadata: {error}"
		)))),
	}
	commands.extend(search_studies(state));
	commands
}

fn search_studies(state: &mut LauncherState) -> Vec<Command> {
	let Some(config) = state.config.as_ref() else {
		return fail(state, configuration_missing());
	};
	vec![
		Command::Notify(Status::info(STUDY_LOADING)),
		Command::Fetch(Fetch::Studies(QidoQuery::studies(config))),
	]
}

fn studies_loaded(state: &mut LauncherState, records: Vec<DicomRecord>) -> Vec<Command> {
	state.studies = records.into_iter().map(StudyRecord::from).collect();
	let choices: Vec<Choice> = state.studies.iter().filter_map(Choice::for_study).collect();
	state.phase = Phase::Ready;

	let mut commands = Vec::new();
	if choices.is_empty() {
		state.study_select.populate(NO_STUDIES, choices);
		state.open_study_enabled = false;
		commands.push(Command::Notify(Status::info(NO_STUDIES_RETURNED)));
	} else {
		let count = choices.len();
		state.study_select.populate(STUDY_PLACEHOLDER, choices);
		commands.push(Command::Notify(Status::info(format!("Loaded {count} studies."))));
	}

	if let Some(preselect) = state.preselect.take() {
		if state.study_select.contains(&preselect.study_uid) {
			commands.extend(select_study(state, Some(preselect.study_uid)));
			if preselect.auto_launch {
				commands.extend(open_study(state));
			}
		} else {
			let missing = LauncherError::MissingPreselection {
				study_uid: preselect.study_uid,
			};
			commands.push(Command::Notify(missing.status()));
		}
	}
	// The frame of a resumed page keeps showing what was opened before.
	let restored = state.viewer.as_ref().filter(|_| state.resumed);
	if let (Some(config), Some(viewer)) = (state.config.as_ref(), restored) {
		commands.push(Command::Navigate(build_viewer_url(
			config,
			&viewer.study_uid,
			viewer.series_uid.as_deref(),
		)));
	}
	commands
}

fn select_study(state: &mut LauncherState, study_uid: Option<UI>) -> Vec<Command> {
	let Some(study_uid) = study_uid.filter(|uid| !uid.is_empty()) else {
		state.study_select.selected = None;
		state.series_select.reset(SERIES_AWAITING_STUDY);
		state.open_study_enabled = false;
		state.open_series_enabled = false;
		return Vec::new();
	};

	if !state.study_select.select(&study_uid) {
		let missing = LauncherError::MissingPreselection { study_uid };
		return vec![Command::Notify(missing.status())];
	}
	state.open_study_enabled = true;
	state.open_series_enabled = false;

	if let Some(series) = state.series_cache.get(&study_uid) {
		let choices = series.iter().filter_map(Choice::for_series).collect();
		show_series(&mut state.series_select, choices);
		return Vec::new();
	}

	let Some(config) = state.config.as_ref() else {
		return fail(state, configuration_missing());
	};
	let query = QidoQuery::series(config, &study_uid);
	state.series_select.reset(SERIES_LOADING);
	vec![
		Command::Notify(Status::info(SERIES_LOADING)),
		Command::Fetch(Fetch::Series { study_uid, query }),
	]
}

fn series_loaded(
	state: &mut LauncherState,
	study_uid: UI,
	result: Result<Vec<DicomRecord>, FetchError>,
) -> Vec<Command> {
	let is_selected = state.selected_study() == Some(study_uid.as_str());
	match result {
		Ok(records) => {
			let series: Vec<SeriesRecord> = records.into_iter().map(SeriesRecord::from).collect();
			let choices: Vec<Choice> = series.iter().filter_map(Choice::for_series).collect();
			state.series_cache.insert(study_uid, series);
			if !is_selected {
				return Vec::new();
			}
			let count = choices.len();
			show_series(&mut state.series_select, choices);
			state.open_series_enabled = false;
			vec![Command::Notify(Status::info(format!("Loaded {count} series.")))]
		}
		// Failures for studies that are cached or no longer selected are stale.
		Err(_) if !is_selected || state.series_cache.contains(&study_uid) => Vec::new(),
		Err(error) => {
			state.series_select.reset(SERIES_UNAVAILABLE);
			state.disable_series_controls();
			vec![Command::Notify(LauncherError::SeriesQuery(error).status())]
		}
	}
}

fn show_series(dropdown: &mut Dropdown, choices: Vec<Choice>) {
	if choices.is_empty() {
		dropdown.populate(NO_SERIES, choices);
	} else {
		dropdown.populate(SERIES_PLACEHOLDER, choices);
	}
}

fn select_series(state: &mut LauncherState, series_uid: Option<UI>) {
	if state.selected_study().is_none() {
		return;
	}
	match series_uid.filter(|uid| !uid.is_empty()) {
		Some(series_uid) if state.series_select.select(&series_uid) => {
			state.open_series_enabled = true;
		}
		_ => {
			state.series_select.selected = None;
			state.open_series_enabled = false;
		}
	}
}

fn open_study(state: &mut LauncherState) -> Vec<Command> {
	let Some(study_uid) = state.selected_study() else {
		return Vec::new();
	};
	let target = ViewerTarget {
		study_uid: study_uid.to_owned(),
		series_uid: None,
	};
	launch(state, target)
}

fn open_series(state: &mut LauncherState) -> Vec<Command> {
	let (Some(study_uid), Some(series_uid)) = (state.selected_study(), state.selected_series()) else {
		return Vec::new();
	};
	let target = ViewerTarget {
		study_uid: study_uid.to_owned(),
		series_uid: Some(series_uid.to_owned()),
	};
	launch(state, target)
}

fn launch(state: &mut LauncherState, target: ViewerTarget) -> Vec<Command> {
	let Some(config) = state.config.as_ref() else {
		return Vec::new();
	};
	let url = build_viewer_url(config, &target.study_uid, target.series_uid.as_deref());
	state.viewer = Some(target);
	vec![
		Command::Navigate(url),
		Command::Notify(Status::info(LAUNCHING)),
	]
}

fn configuration_missing() -> LauncherError {
	LauncherError::Unexpected(String::from("viewer configuration is not loaded"))
}
