//! Opening the launcher from an imaging session page.

use crate::utils::encoding::encode_component;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
	#[error("Unable to determine project or session id for VolView.")]
	MissingContext,
}

/// Identifiers of the platform page the launch originates from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
	pub project_id: Option<String>,
	pub session_id: Option<String>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
	#[default]
	MouseDown,
	ContextMenu,
}

/// The pointer interaction on the launch control.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Gesture {
	pub kind: GestureKind,
	/// 0 primary, 1 middle, 2 secondary.
	pub button: u8,
	pub meta_key: bool,
	pub ctrl_key: bool,
}

impl Gesture {
	const fn opens_new_tab(&self) -> bool {
		matches!(self.kind, GestureKind::ContextMenu)
			|| self.button == 1
			|| self.meta_key
			|| self.ctrl_key
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum LaunchTarget {
	#[serde(rename = "_self")]
	SameTab,
	#[serde(rename = "_blank")]
	NewTab,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchAction {
	pub url: String,
	pub target: LaunchTarget,
}

/// Decides where a gesture on the launch control leads.
///
/// A plain secondary-button press does nothing; the context menu that follows it
/// opens the launcher in a new tab instead.
pub fn resolve_launch(
	context_path: &str,
	page: &PageContext,
	gesture: Gesture,
) -> Result<Option<LaunchAction>, LaunchError> {
	if gesture.kind == GestureKind::MouseDown && gesture.button == 2 {
		return Ok(None);
	}

	let present = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());
	let (Some(project_id), Some(session_id)) = (present(&page.project_id), present(&page.session_id))
	else {
		return Err(LaunchError::MissingContext);
	};

	let url = format!(
		"{context_path}/xapi/volview/app/projects/{}?session={}",
		encode_component(&project_id),
		encode_component(&session_id)
	);
	let target = if gesture.opens_new_tab() {
		LaunchTarget::NewTab
	} else {
		LaunchTarget::SameTab
	};
	Ok(Some(LaunchAction { url, target }))
}
