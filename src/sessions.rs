use crate::config::SessionConfig;
use crate::types::UI;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// An imaging session as far as the launcher is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
	pub id: String,
	pub project: String,
	pub label: Option<String>,
	pub study_instance_uid: Option<UI>,
	pub shared_projects: Vec<String>,
}

impl SessionRecord {
	/// Owning projects match case-insensitively; shared projects match exactly.
	pub fn belongs_to(&self, project_id: &str) -> bool {
		self.project.eq_ignore_ascii_case(project_id)
			|| self.shared_projects.iter().any(|shared| shared == project_id)
	}
}

impl From<&SessionConfig> for SessionRecord {
	fn from(config: &SessionConfig) -> Self {
		Self {
			id: config.id.clone(),
			project: config.project.clone(),
			label: config.label.clone(),
			study_instance_uid: config
				.study_instance_uid
				.clone()
				.filter(|uid| !uid.trim().is_empty()),
			shared_projects: config.shared_projects.clone(),
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionLookupError {
	#[error("session {0} not found")]
	NotFound(String),
	#[error("session {session_id} belongs to project {owner}")]
	ProjectMismatch { session_id: String, owner: String },
}

/// Resolves imaging sessions by identifier.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
	async fn find(&self, session_id: &str) -> Option<SessionRecord>;

	/// Finds a session and checks that it is visible within `project_id`.
	async fn lookup(
		&self,
		project_id: &str,
		session_id: &str,
	) -> Result<SessionRecord, SessionLookupError> {
		let session = self
			.find(session_id)
			.await
			.ok_or_else(|| SessionLookupError::NotFound(session_id.to_owned()))?;
		if !session.belongs_to(project_id) {
			return Err(SessionLookupError::ProjectMismatch {
				session_id: session_id.to_owned(),
				owner: session.project,
			});
		}
		Ok(session)
	}
}

/// Sessions declared in the application configuration.
#[derive(Debug, Default)]
pub struct StaticSessionDirectory {
	sessions: HashMap<String, SessionRecord>,
}

impl StaticSessionDirectory {
	pub fn new(sessions: &[SessionConfig]) -> Self {
		Self {
			sessions: sessions
				.iter()
				.map(|config| (config.id.clone(), SessionRecord::from(config)))
				.collect(),
		}
	}
}

#[async_trait]
impl SessionDirectory for StaticSessionDirectory {
	async fn find(&self, session_id: &str) -> Option<SessionRecord> {
		self.sessions.get(session_id).cloned()
	}
}
