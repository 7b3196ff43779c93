//! HTML rendering of the launcher page.
//!
//! The page is a plain form: changing a dropdown or pressing a button submits it,
//! and the next request replays the interaction against a fresh launcher.

use crate::launcher::{Dropdown, DropdownPhase, LauncherState, Status};
use crate::utils::html::escape_html;
use std::fmt::Write;

pub const STUDY_FIELD: &str = "selectedStudy";
pub const SERIES_FIELD: &str = "selectedSeries";
pub const OPEN_FIELD: &str = "open";
pub const VIEWER_STUDY_FIELD: &str = "viewerStudy";
pub const VIEWER_SERIES_FIELD: &str = "viewerSeries";

pub fn render_page(state: &LauncherState, status: Option<&Status>, viewer_url: Option<&str>) -> String {
	let project_id = state
		.context
		.as_ref()
		.map(|context| context.project_id.as_str())
		.unwrap_or_default();
	let (dicomweb_root, entry_point) = state
		.config
		.as_ref()
		.map(|config| (config.dicomweb_root(), config.entry_point()))
		.unwrap_or_default();

	let mut html = String::with_capacity(4096);
	html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
	let _ = writeln!(html, "<title>VolView · {}</title>", escape_html(project_id));
	html.push_str(STYLE);
	html.push_str("</head>\n<body>\n<header>\n<h1>VolView</h1>\n<dl>\n");
	let _ = writeln!(
		html,
		"<dt>Project</dt><dd id=\"project-name\">{}</dd>",
		escape_html(project_id)
	);
	if let Some(label) = state.session.as_ref().and_then(|session| session.label.as_deref()) {
		let _ = writeln!(
			html,
			"<dt>Session</dt><dd id=\"session-label\">{}</dd>",
			escape_html(label)
		);
	}
	let _ = writeln!(
		html,
		"<dt>DICOMweb</dt><dd id=\"dicomweb-root\">{}</dd>",
		escape_html(dicomweb_root)
	);
	let _ = writeln!(
		html,
		"<dt>Viewer</dt><dd id=\"viewer-entry-point\">{}</dd>",
		escape_html(entry_point)
	);
	html.push_str("</dl>\n</header>\n");

	html.push_str("<form id=\"launcher\" method=\"get\">\n");
	if let Some(session_id) = state.context.as_ref().and_then(|context| context.session_id.as_deref()) {
		render_hidden(&mut html, "session", session_id);
	}
	if let Some(viewer) = &state.viewer {
		render_hidden(&mut html, VIEWER_STUDY_FIELD, &viewer.study_uid);
		if let Some(series_uid) = &viewer.series_uid {
			render_hidden(&mut html, VIEWER_SERIES_FIELD, series_uid);
		}
	}
	render_select(&mut html, "Study", STUDY_FIELD, &state.study_select);
	render_select(&mut html, "Series", SERIES_FIELD, &state.series_select);
	render_button(&mut html, "study", "Open study", state.open_study_enabled);
	render_button(&mut html, "series", "Open series", state.open_series_enabled);
	html.push_str("</form>\n");

	match status {
		Some(status) => {
			let _ = writeln!(
				html,
				"<p id=\"status\" role=\"status\" style=\"color: {}\">{}</p>",
				status.color(),
				escape_html(&status.message)
			);
		}
		None => html.push_str("<p id=\"status\" role=\"status\"></p>\n"),
	}

	if let Some(viewer_url) = viewer_url {
		let _ = writeln!(
			html,
			"<iframe id=\"viewer\" title=\"VolView\" src=\"{}\"></iframe>",
			escape_html(viewer_url)
		);
	}
	html.push_str("</body>\n</html>\n");
	html
}

fn render_select(html: &mut String, label: &str, name: &str, dropdown: &Dropdown) {
	let disabled = if dropdown.enabled { "" } else { " disabled" };
	let _ = writeln!(
		html,
		"<label>{label} <select name=\"{name}\" onchange=\"this.form.submit()\"{disabled}>"
	);
	let placeholder = if dropdown.phase() == DropdownPhase::Selected {
		""
	} else {
		" selected"
	};
	let _ = writeln!(
		html,
		"<option value=\"\"{placeholder}>{}</option>",
		escape_html(&dropdown.placeholder)
	);
	for choice in &dropdown.choices {
		let selected = if dropdown.selected.as_deref() == Some(choice.value.as_str()) {
			" selected"
		} else {
			""
		};
		let _ = writeln!(
			html,
			"<option value=\"{}\"{selected}>{}</option>",
			escape_html(&choice.value),
			escape_html(&choice.label)
		);
	}
	html.push_str("</select></label>\n");
}

fn render_hidden(html: &mut String, name: &str, value: &str) {
	let _ = writeln!(
		html,
		"<input type=\"hidden\" name=\"{name}\" value=\"{}\">",
		escape_html(value)
	);
}

fn render_button(html: &mut String, value: &str, text: &str, enabled: bool) {
	let disabled = if enabled { "" } else { " disabled" };
	let _ = writeln!(
		html,
		"<button type=\"submit\" name=\"{OPEN_FIELD}\" value=\"{value}\"{disabled}>{text}</button>"
	);
}

const STYLE: &str = "<style>
body { margin: 0; font-family: sans-serif; background: #1e1e1e; color: #eee; }
header, form, #status { padding: 0 1rem; }
dl { display: grid; grid-template-columns: max-content auto; gap: 0.25rem 1rem; }
form { display: flex; gap: 1rem; align-items: center; }
#viewer { width: 100%; height: 80vh; border: 0; }
</style>
";
