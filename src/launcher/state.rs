use crate::context::{Preselection, ProjectContext};
use crate::dicomweb::{SeriesRecord, StudyRecord};
use crate::loader::SessionInfo;
use crate::types::UI;
use crate::viewer::ViewerConfig;
use std::collections::HashMap;

pub const STUDY_LOADING: &str = "Loading studies…";
pub const STUDY_PLACEHOLDER: &str = "Choose a study…";
pub const NO_STUDIES: &str = "No studies available";
pub const SERIES_PLACEHOLDER: &str = "Open entire study…";
pub const SERIES_LOADING: &str = "Loading series…";
pub const SERIES_AWAITING_STUDY: &str = "Select a study first";
pub const SERIES_UNAVAILABLE: &str = "Series unavailable";
pub const NO_SERIES: &str = "No series available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
	pub value: UI,
	pub label: String,
}

impl Choice {
	pub fn for_study(study: &StudyRecord) -> Option<Self> {
		Some(Self {
			value: study.study_instance_uid()?,
			label: study.label(),
		})
	}

	pub fn for_series(series: &SeriesRecord) -> Option<Self> {
		Some(Self {
			value: series.series_instance_uid()?,
			label: series.label(),
		})
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DropdownPhase {
	Empty,
	Populated,
	Selected,
}

/// A selection control: a placeholder option followed by choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropdown {
	pub placeholder: String,
	pub choices: Vec<Choice>,
	pub selected: Option<UI>,
	pub enabled: bool,
}

impl Dropdown {
	pub fn new(placeholder: &str) -> Self {
		Self {
			placeholder: placeholder.to_owned(),
			choices: Vec::new(),
			selected: None,
			enabled: false,
		}
	}

	pub fn phase(&self) -> DropdownPhase {
		match (&self.selected, self.choices.is_empty()) {
			(Some(_), _) => DropdownPhase::Selected,
			(None, true) => DropdownPhase::Empty,
			(None, false) => DropdownPhase::Populated,
		}
	}

	pub fn contains(&self, value: &str) -> bool {
		self.choices.iter().any(|choice| choice.value == value)
	}

	/// Drops all choices and disables the control.
	pub fn reset(&mut self, placeholder: &str) {
		*self = Self::new(placeholder);
	}

	/// Replaces the choices; enabled only when there is something to choose.
	pub fn populate(&mut self, placeholder: &str, choices: Vec<Choice>) {
		self.placeholder = placeholder.to_owned();
		self.enabled = !choices.is_empty();
		self.choices = choices;
		self.selected = None;
	}

	/// Selects a known value. Unknown values leave the control unchanged.
	pub fn select(&mut self, value: &str) -> bool {
		if !self.contains(value) {
			return false;
		}
		self.selected = Some(value.to_owned());
		true
	}
}

/// Series already fetched, by StudyInstanceUID. Only successful results are stored.
#[derive(Debug, Clone, Default)]
pub struct SeriesCache(HashMap<UI, Vec<SeriesRecord>>);

impl SeriesCache {
	pub fn get(&self, study_uid: &str) -> Option<&[SeriesRecord]> {
		self.0.get(study_uid).map(Vec::as_slice)
	}

	pub fn contains(&self, study_uid: &str) -> bool {
		self.0.contains_key(study_uid)
	}

	pub fn insert(&mut self, study_uid: UI, series: Vec<SeriesRecord>) {
		self.0.insert(study_uid, series);
	}
}

/// The DICOMweb resource the viewer frame was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerTarget {
	pub study_uid: UI,
	pub series_uid: Option<UI>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
	/// Context, configuration and the study list are being resolved.
	#[default]
	Starting,
	Ready,
	/// A fatal error occurred; all controls stay disabled.
	Failed,
}

/// Everything the launcher page shows, owned by one launcher session.
#[derive(Debug, Clone)]
pub struct LauncherState {
	pub phase: Phase,
	pub context: Option<ProjectContext>,
	pub config: Option<ViewerConfig>,
	pub session: Option<SessionInfo>,
	/// Study to select once the study list is loaded.
	pub preselect: Option<Preselection>,
	pub studies: Vec<StudyRecord>,
	pub series_cache: SeriesCache,
	pub study_select: Dropdown,
	pub series_select: Dropdown,
	pub open_study_enabled: bool,
	pub open_series_enabled: bool,
	/// What the viewer frame shows. Only the open actions change it.
	pub viewer: Option<ViewerTarget>,
	/// The page was submitted from an earlier rendering, so the form carries the selection.
	pub resumed: bool,
}

impl Default for LauncherState {
	fn default() -> Self {
		Self {
			phase: Phase::Starting,
			context: None,
			config: None,
			session: None,
			preselect: None,
			studies: Vec::new(),
			series_cache: SeriesCache::default(),
			study_select: Dropdown::new(STUDY_LOADING),
			series_select: Dropdown::new(SERIES_AWAITING_STUDY),
			open_study_enabled: false,
			open_series_enabled: false,
			viewer: None,
			resumed: false,
		}
	}
}

impl LauncherState {
	pub fn selected_study(&self) -> Option<&str> {
		self.study_select.selected.as_deref()
	}

	pub fn selected_series(&self) -> Option<&str> {
		self.series_select.selected.as_deref()
	}

	pub fn disable_controls(&mut self) {
		self.study_select.enabled = false;
		self.series_select.enabled = false;
		self.open_study_enabled = false;
		self.open_series_enabled = false;
	}

	pub fn disable_series_controls(&mut self) {
		self.series_select.enabled = false;
		self.open_series_enabled = false;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn choice(value: &str) -> Choice {
		Choice {
			value: value.to_owned(),
			label: value.to_owned(),
		}
	}

	#[test]
	fn dropdown_phases() {
		let mut dropdown = Dropdown::new(STUDY_LOADING);
		assert_eq!(dropdown.phase(), DropdownPhase::Empty);
		assert!(!dropdown.enabled);

		dropdown.populate(STUDY_PLACEHOLDER, vec![choice("1.2.3")]);
		assert_eq!(dropdown.phase(), DropdownPhase::Populated);
		assert!(dropdown.enabled);

		assert!(!dropdown.select("9.9.9"));
		assert_eq!(dropdown.phase(), DropdownPhase::Populated);

		assert!(dropdown.select("1.2.3"));
		assert_eq!(dropdown.phase(), DropdownPhase::Selected);

		dropdown.reset(SERIES_AWAITING_STUDY);
		assert_eq!(dropdown.phase(), DropdownPhase::Empty);
		assert_eq!(dropdown.placeholder, SERIES_AWAITING_STUDY);
	}

	#[test]
	fn populate_without_choices_stays_disabled() {
		let mut dropdown = Dropdown::new(STUDY_LOADING);
		dropdown.populate(NO_STUDIES, Vec::new());
		assert!(!dropdown.enabled);
		assert_eq!(dropdown.phase(), DropdownPhase::Empty);
	}
}
