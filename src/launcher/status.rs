use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StatusLevel {
	#[default]
	Info,
	Error,
}

/// One line of user-facing status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
	pub message: String,
	pub level: StatusLevel,
}

impl Status {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			level: StatusLevel::Info,
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			level: StatusLevel::Error,
		}
	}

	pub const fn is_error(&self) -> bool {
		matches!(self.level, StatusLevel::Error)
	}

	/// Text colour of the status line.
	pub const fn color(&self) -> &'static str {
		match self.level {
			StatusLevel::Info => "#ffb347",
			StatusLevel::Error => "#ff8b8b",
		}
	}
}

/// Capability to surface status messages, supplied by the host.
pub trait Notifier: Send + Sync {
	fn notify(&self, status: &Status);
}

/// Keeps the most recent status for rendering.
#[derive(Debug, Default)]
pub struct StatusLine {
	current: Mutex<Option<Status>>,
}

impl StatusLine {
	pub fn current(&self) -> Option<Status> {
		self.current
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl Notifier for StatusLine {
	fn notify(&self, status: &Status) {
		if status.is_error() {
			warn!(status = %status.message, "Launcher status changed");
		} else {
			info!(status = %status.message, "Launcher status changed");
		}
		*self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(status.clone());
	}
}
