use crate::client::{FetchError, PlatformClient, DICOM_JSON};
use crate::dicomweb::{DicomRecord, QidoQuery};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

/// Searches a DICOMweb archive.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
	async fn search(&self, query: &QidoQuery) -> Result<Vec<DicomRecord>, FetchError>;
}

/// QIDO-RS over HTTP.
pub struct HttpArchiveClient {
	client: PlatformClient,
}

impl HttpArchiveClient {
	pub const fn new(client: PlatformClient) -> Self {
		Self { client }
	}
}

#[async_trait]
impl ArchiveClient for HttpArchiveClient {
	#[instrument(skip_all, fields(level = %query.level))]
	async fn search(&self, query: &QidoQuery) -> Result<Vec<DicomRecord>, FetchError> {
		let url = query.to_url(self.client.origin())?;
		let response = self.client.get(url, DICOM_JSON).await?;
		if response.status() == StatusCode::NO_CONTENT {
			return Ok(Vec::new());
		}

		let body = response.bytes().await?;
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Vec::new());
		}

		// Anything but a JSON array counts as "no matches".
		let records: Vec<DicomRecord> = match serde_json::from_slice(&body)? {
			Value::Array(items) => items.into_iter().filter_map(DicomRecord::from_value).collect(),
			_ => Vec::new(),
		};
		debug!(matches = records.len(), "QIDO-RS search completed");
		Ok(records)
	}
}
