//! The launcher's selection controller.
//!
//! UI interaction is modelled as [`Event`]s fed to a pure [`reduce`] function, which
//! updates the [`LauncherState`] and returns [`Command`]s. The [`Launcher`] runtime
//! executes those commands against the configuration loader, the archive and the
//! host's [`Notifier`].

mod reducer;
mod runtime;
mod state;
mod status;

pub use reducer::*;
pub use runtime::Launcher;
pub use state::*;
pub use status::*;

use crate::client::FetchError;
use crate::context::ContextError;
use crate::types::UI;
use thiserror::Error;

/// Everything that can go wrong while launching, as shown to the user.
#[derive(Debug, Error)]
pub enum LauncherError {
	#[error(transparent)]
	ContextResolution(#[from] ContextError),
	#[error(
		"Failed to load VolView configuration: {}",
		describe_failure("Config request failed", .0)
	)]
	ConfigFetch(#[source] FetchError),
	#[error("{}", describe_failure("Study query failed", .0))]
	StudyQuery(#[source] FetchError),
	#[error("Series query failed: {0}")]
	SeriesQuery(#[source] FetchError),
	#[error("Study {study_uid} is not available via the DICOMweb proxy.")]
	MissingPreselection { study_uid: UI },
	#[error("Unexpected error: {0}")]
	Unexpected(String),
}

impl LauncherError {
	/// Fatal errors leave every control disabled for the rest of the session.
	pub const fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::ContextResolution(_)
				| Self::ConfigFetch(_)
				| Self::StudyQuery(_)
				| Self::Unexpected(_)
		)
	}

	pub fn status(&self) -> Status {
		Status::error(self.to_string())
	}
}

/// `{what} with status {code}` for HTTP failures, `{what}: {error}` otherwise.
fn describe_failure(what: &str, error: &FetchError) -> String {
	match error.status() {
		Some(status) => format!("{what} with status {}", status.as_u16()),
		None => format!("{what}: {error}"),
	}
}
