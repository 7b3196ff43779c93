use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Media type of QIDO-RS responses.
pub const DICOM_JSON: &str = "application/dicom+json";

#[derive(Debug, Error)]
pub enum FetchError {
	#[error("HTTP {}", .0.as_u16())]
	Status(StatusCode),
	#[error(transparent)]
	Transport(#[from] reqwest::Error),
	#[error("invalid request URL: {0}")]
	Url(#[from] url::ParseError),
	#[error("malformed response body: {0}")]
	Decode(#[from] serde_json::Error),
}

impl FetchError {
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Status(status) => Some(*status),
			_ => None,
		}
	}
}

/// HTTP access to the platform on behalf of one page request.
///
/// Relative targets resolve against the page origin. The page's cookies are
/// forwarded as they are; no credentials are ever constructed here.
#[derive(Debug, Clone)]
pub struct PlatformClient {
	http: reqwest::Client,
	origin: Url,
	cookie: Option<String>,
}

impl PlatformClient {
	pub const fn new(http: reqwest::Client, origin: Url) -> Self {
		Self {
			http,
			origin,
			cookie: None,
		}
	}

	#[must_use]
	pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
		self.cookie = cookie;
		self
	}

	pub const fn origin(&self) -> &Url {
		&self.origin
	}

	pub fn resolve(&self, target: &str) -> Result<Url, FetchError> {
		Ok(self.origin.join(target)?)
	}

	/// Issues a GET and fails on any non-success status.
	pub async fn get(&self, url: Url, accept: &str) -> Result<Response, FetchError> {
		debug!(%url, accept, "GET");
		let mut request = self.http.get(url).header(ACCEPT, accept);
		if let Some(cookie) = &self.cookie {
			request = request.header(COOKIE, cookie);
		}

		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status(status));
		}
		Ok(response)
	}

	pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
		let body = self
			.get(url, mime::APPLICATION_JSON.as_ref())
			.await?
			.bytes()
			.await?;
		Ok(serde_json::from_slice(&body)?)
	}
}
