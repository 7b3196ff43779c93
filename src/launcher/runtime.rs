use super::{reduce, Command, Event, Fetch, LauncherState, Notifier};
use crate::archive::ArchiveClient;
use crate::context::{ContextError, ProjectContext};
use crate::loader::ConfigLoader;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Drives one launcher session: feeds events to [`reduce`] and executes the
/// resulting commands.
///
/// Fetches run concurrently and their results are fed back in completion order.
pub struct Launcher<N> {
	state: LauncherState,
	loader: Arc<dyn ConfigLoader>,
	archive: Arc<dyn ArchiveClient>,
	notifier: N,
	viewer_url: Option<String>,
}

impl<N: Notifier> Launcher<N> {
	pub fn new(loader: Arc<dyn ConfigLoader>, archive: Arc<dyn ArchiveClient>, notifier: N) -> Self {
		Self {
			state: LauncherState::default(),
			loader,
			archive,
			notifier,
			viewer_url: None,
		}
	}

	pub const fn state(&self) -> &LauncherState {
		&self.state
	}

	/// The URL the viewer frame was last pointed at.
	pub fn viewer_url(&self) -> Option<&str> {
		self.viewer_url.as_deref()
	}

	pub const fn notifier(&self) -> &N {
		&self.notifier
	}

	/// Runs the resolved page context until the study list is settled.
	#[instrument(skip_all)]
	pub async fn start(&mut self, context: Result<ProjectContext, ContextError>) {
		self.dispatch(Event::ContextResolved(context)).await;
	}

	/// Applies UI events in order, each one running to completion.
	pub async fn replay(&mut self, events: impl IntoIterator<Item = Event>) {
		for event in events {
			self.dispatch(event).await;
		}
	}

	/// Applies an event and everything that follows from it, until no fetch is outstanding.
	pub async fn dispatch(&mut self, event: Event) {
		let mut events = VecDeque::from([event]);
		let mut pending: FuturesUnordered<BoxFuture<'static, Event>> = FuturesUnordered::new();

		loop {
			while let Some(event) = events.pop_front() {
				for command in reduce(&mut self.state, event) {
					match command {
						Command::Fetch(fetch) => pending.push(self.execute(fetch)),
						Command::Notify(status) => self.notifier.notify(&status),
						Command::Navigate(url) => {
							info!(%url, "Opening viewer");
							self.viewer_url = Some(url);
						}
					}
				}
			}

			match pending.next().await {
				Some(event) => events.push_back(event),
				None => break,
			}
		}
	}

	fn execute(&self, fetch: Fetch) -> BoxFuture<'static, Event> {
		let loader = Arc::clone(&self.loader);
		let archive = Arc::clone(&self.archive);

		let future = async move {
			match fetch {
				Fetch::Config { project_id } => {
					Event::ConfigLoaded(loader.load_config(&project_id).await)
				}
				Fetch::Session {
					project_id,
					session_id,
				} => Event::SessionLoaded(loader.load_session_config(&project_id, &session_id).await),
				Fetch::Studies(query) => Event::StudiesLoaded(archive.search(&query).await),
				Fetch::Series { study_uid, query } => {
					let result = archive.search(&query).await;
					Event::SeriesLoaded { study_uid, result }
				}
			}
		};

		AssertUnwindSafe(future)
			.catch_unwind()
			.map(|outcome| {
				outcome.unwrap_or_else(|panic| {
					let message = panic_message(panic.as_ref());
					error!(panic = %message, "Launcher fetch panicked");
					Event::Crashed(message)
				})
			})
			.boxed()
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		return (*message).to_owned();
	}
	if let Some(message) = panic.downcast_ref::<String>() {
		return message.clone();
	}
	String::from("internal error")
}
