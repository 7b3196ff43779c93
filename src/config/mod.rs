use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
	pub telemetry: TelemetryConfig,
	pub server: ServerConfig,
	pub volview: VolViewConfig,
	#[serde(default)]
	pub launcher: LauncherConfig,
	/// Imaging sessions known to the launcher, looked up by the session configuration API.
	#[serde(default)]
	pub sessions: Vec<SessionConfig>,
}

impl AppConfig {
	pub fn new() -> Result<Self, config::ConfigError> {
		Self::load(environment())
	}

	fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
		config::Config::builder()
			.add_source(config::File::from_str(
				include_str!("defaults.toml"),
				config::FileFormat::Toml,
			))
			.add_source(config::File::with_name("config.toml").required(false))
			.add_source(environment)
			.build()?
			.try_deserialize()
	}

	/// Layers an inline TOML document over the embedded defaults.
	#[cfg(test)]
	pub fn from_toml(overrides: &str) -> Result<Self, config::ConfigError> {
		config::Config::builder()
			.add_source(config::File::from_str(
				include_str!("defaults.toml"),
				config::FileFormat::Toml,
			))
			.add_source(config::File::from_str(overrides, config::FileFormat::Toml))
			.build()?
			.try_deserialize()
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
	// Also configurable via RUST_LOG
	pub level: String,
	/// Sentry DSN. Tracing to Sentry is disabled when unset.
	pub sentry: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	pub http: HttpServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
	// The interface the launcher will be listening on
	pub interface: IpAddr,
	pub port: u16,
	/// Upper bound for a whole request, in seconds.
	pub request_timeout: u64,
	pub graceful_shutdown: bool,
	/// Path prefix of the hosting platform, e.g. `/xnat`. Empty when served at the root.
	#[serde(default)]
	pub context_path: String,
	/// Externally visible origin (`https://host:port`). Derived from the Host header when unset.
	pub public_url: Option<String>,
}

impl HttpServerConfig {
	pub fn context_path(&self) -> String {
		normalize_path(&self.context_path)
	}
}

/// Settings that shape the viewer configuration documents served to the launcher page.
#[derive(Debug, Clone, Deserialize)]
pub struct VolViewConfig {
	pub dicomweb_base_path: String,
	pub viewer_entry_point: String,
	pub shell_path: String,
	pub server_name: String,
}

impl VolViewConfig {
	pub fn dicomweb_base_path(&self) -> String {
		normalize_path(&self.dicomweb_base_path)
	}

	pub fn project_dicomweb_path(&self, project_id: &str) -> String {
		format!("{}/{project_id}", self.dicomweb_base_path())
	}
}

/// Where the launcher page takes its configuration documents from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
	/// Computed in-process from these settings.
	#[default]
	Local,
	/// Fetched from `{context_path}/xapi/volview/config/...` on the page origin.
	Platform,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LauncherConfig {
	#[serde(default)]
	pub config_source: ConfigSource,
	/// Base URL of a remote platform serving `/xapi/volview/config/...`.
	/// Takes precedence over `config_source`.
	pub config_url: Option<String>,
	/// Origin used to resolve relative DICOMweb endpoints.
	/// Falls back to the origin of the incoming page request.
	pub archive_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
	pub id: String,
	pub project: String,
	pub label: Option<String>,
	pub study_instance_uid: Option<String>,
	/// Further projects the session is shared into.
	#[serde(default)]
	pub shared_projects: Vec<String>,
}

/// Variables like `VOLVIEW__SERVER__HTTP__PORT`. The prefix is separated by `__` as well.
fn environment() -> config::Environment {
	config::Environment::with_prefix("VOLVIEW").separator("__")
}

/// Trims the value and ensures a single leading slash and no trailing slash.
/// Blank values normalize to the empty string.
pub fn normalize_path(value: &str) -> String {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return String::new();
	}
	let mut normalized = if trimmed.starts_with('/') {
		trimmed.to_owned()
	} else {
		format!("/{trimmed}")
	};
	if normalized.ends_with('/') {
		normalized.pop();
	}
	normalized
}
