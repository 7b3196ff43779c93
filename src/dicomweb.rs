//! DICOM JSON records and QIDO-RS queries as used by the launcher.
//!
//! Records are kept as loosely typed JSON: archives differ in which attributes they
//! return, and only a handful of tags are ever read.

use crate::types::{QueryRetrieveLevel, UI};
use crate::viewer::ViewerConfig;
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use serde_json::{Map, Value};
use url::Url;

/// Result cap of the study search.
pub const STUDY_LIMIT: usize = 200;

/// Result cap of the series search.
pub const SERIES_LIMIT: usize = 400;

/// Attributes requested from the study search.
pub const STUDY_INCLUDE_FIELDS: &[Tag] = &[
	tags::STUDY_DATE,
	tags::STUDY_DESCRIPTION,
	tags::PATIENT_NAME,
	tags::STUDY_INSTANCE_UID,
];

/// Attributes requested from the series search.
pub const SERIES_INCLUDE_FIELDS: &[Tag] = &[tags::SERIES_DESCRIPTION, tags::SERIES_INSTANCE_UID];

/// Formats a tag the way DICOM JSON keys it, e.g. `0020000D`.
pub fn tag_key(tag: Tag) -> String {
	format!("{:04X}{:04X}", tag.group(), tag.element())
}

/// One entry of a QIDO-RS response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DicomRecord(Map<String, Value>);

impl DicomRecord {
	/// Returns `None` for anything but a JSON object.
	pub fn from_value(value: Value) -> Option<Self> {
		match value {
			Value::Object(attributes) => Some(Self(attributes)),
			_ => None,
		}
	}

	/// The first value of an attribute as text.
	///
	/// Person names yield their alphabetic representation, other structured values
	/// their `Text` member or their string members joined by spaces.
	/// Empty values count as absent.
	pub fn string(&self, tag: Tag) -> Option<String> {
		let first = self.0.get(&tag_key(tag))?.get("Value")?.as_array()?.first()?;
		let text = match first {
			Value::Null => return None,
			Value::String(text) => text.clone(),
			Value::Bool(flag) => flag.to_string(),
			Value::Number(number) => number.to_string(),
			Value::Array(items) => items
				.iter()
				.map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
				.collect::<Vec<_>>()
				.join(","),
			Value::Object(members) => structured_text(members),
		};
		Some(text).filter(|text| !text.is_empty())
	}
}

fn structured_text(members: &Map<String, Value>) -> String {
	for key in ["Alphabetic", "Text"] {
		if let Some(text) = members.get(key).and_then(Value::as_str) {
			if !text.is_empty() {
				return text.to_owned();
			}
		}
	}
	members
		.values()
		.filter_map(Value::as_str)
		.collect::<Vec<_>>()
		.join(" ")
}

/// Formats an 8-digit DICOM date (`YYYYMMDD`) as `YYYY-MM-DD`. Other values pass through.
pub fn format_dicom_date(raw: &str) -> String {
	let chars: Vec<char> = raw.chars().collect();
	if chars.len() != 8 {
		return raw.to_owned();
	}
	let part = |range: std::ops::Range<usize>| chars[range].iter().collect::<String>();
	format!("{}-{}-{}", part(0..4), part(4..6), part(6..8))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyRecord(DicomRecord);

impl StudyRecord {
	pub fn study_instance_uid(&self) -> Option<UI> {
		self.0.string(tags::STUDY_INSTANCE_UID)
	}

	pub fn description(&self) -> Option<String> {
		self.0.string(tags::STUDY_DESCRIPTION)
	}

	pub fn date(&self) -> Option<String> {
		self.0.string(tags::STUDY_DATE)
	}

	pub fn patient_name(&self) -> Option<String> {
		self.0.string(tags::PATIENT_NAME)
	}

	/// `description · date · patient`, skipping absent parts.
	pub fn label(&self) -> String {
		let mut parts = vec![self
			.description()
			.unwrap_or_else(|| String::from("Unnamed study"))];
		if let Some(date) = self.date() {
			parts.push(format_dicom_date(&date));
		}
		if let Some(patient_name) = self.patient_name() {
			parts.push(patient_name);
		}
		parts.join(" · ")
	}
}

impl From<DicomRecord> for StudyRecord {
	fn from(record: DicomRecord) -> Self {
		Self(record)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord(DicomRecord);

impl SeriesRecord {
	pub fn series_instance_uid(&self) -> Option<UI> {
		self.0.string(tags::SERIES_INSTANCE_UID)
	}

	pub fn label(&self) -> String {
		self.0
			.string(tags::SERIES_DESCRIPTION)
			.unwrap_or_else(|| String::from("Unnamed series"))
	}
}

impl From<DicomRecord> for SeriesRecord {
	fn from(record: DicomRecord) -> Self {
		Self(record)
	}
}

/// A QIDO-RS search against one of the configured endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QidoQuery {
	pub level: QueryRetrieveLevel,
	/// Absolute URL or a path relative to the page origin.
	pub endpoint: String,
	pub limit: usize,
	pub include_fields: Vec<Tag>,
}

impl QidoQuery {
	/// Searches all studies of the project.
	pub fn studies(config: &ViewerConfig) -> Self {
		Self {
			level: QueryRetrieveLevel::Study,
			endpoint: config.studies_endpoint().to_owned(),
			limit: STUDY_LIMIT,
			include_fields: STUDY_INCLUDE_FIELDS.to_vec(),
		}
	}

	/// Searches the series of one study.
	pub fn series(config: &ViewerConfig, study_instance_uid: &str) -> Self {
		Self {
			level: QueryRetrieveLevel::Series,
			endpoint: config.series_endpoint(study_instance_uid),
			limit: SERIES_LIMIT,
			include_fields: SERIES_INCLUDE_FIELDS.to_vec(),
		}
	}

	/// Resolves the endpoint against `origin` and applies `limit` and `includefield`.
	///
	/// Query parameters already present on the endpoint are kept, except `limit`.
	pub fn to_url(&self, origin: &Url) -> Result<Url, url::ParseError> {
		let mut url = origin.join(&self.endpoint)?;
		let retained: Vec<(String, String)> = url
			.query_pairs()
			.filter(|(key, _)| key != "limit")
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect();

		{
			let mut pairs = url.query_pairs_mut();
			pairs.clear();
			pairs.extend_pairs(retained);
			pairs.append_pair("limit", &self.limit.to_string());
			for tag in &self.include_fields {
				pairs.append_pair("includefield", &tag_key(*tag));
			}
		}
		Ok(url)
	}
}
