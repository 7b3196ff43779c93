use crate::config::normalize_path;
use crate::documents::DocumentBuilder;
use crate::AppState;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::Router;

mod app;
mod config;
mod home;
mod launch;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

pub fn routes(base_path: &str) -> Router<AppState> {
	let router = Router::new()
		.merge(home::routes())
		.merge(config::routes())
		.merge(app::routes())
		.merge(launch::routes());

	// axum no longer supports nesting at the root
	match base_path {
		"/" | "" => router,
		base_path => Router::new().nest(base_path, router),
	}
}

/// `{scheme}://{host}` of the platform as seen by the browser.
fn request_origin(state: &AppState, headers: &HeaderMap) -> String {
	if let Some(public_url) = &state.config.server.http.public_url {
		return public_url.trim_end_matches('/').to_owned();
	}

	let header = |name: &str| {
		headers
			.get(name)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.split(',').next())
			.map(str::trim)
			.filter(|value| !value.is_empty())
	};
	let scheme = header(X_FORWARDED_PROTO).unwrap_or("http");
	match header(X_FORWARDED_HOST).or_else(|| header(HOST.as_str())) {
		Some(host) => format!("{scheme}://{host}"),
		None => {
			let http = &state.config.server.http;
			format!("{scheme}://{}:{}", http.interface, http.port)
		}
	}
}

/// The origin followed by the platform's context path.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
	format!(
		"{}{}",
		request_origin(state, headers),
		normalize_path(&state.config.server.http.context_path)
	)
}

fn documents(state: &AppState, headers: &HeaderMap) -> DocumentBuilder {
	DocumentBuilder::new(state.config.volview.clone(), base_url(state, headers))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::test_state;
	use axum::http::HeaderValue;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut headers = HeaderMap::new();
		for (name, value) in pairs {
			headers.insert(*name, HeaderValue::from_static(value));
		}
		headers
	}

	#[test]
	fn base_url_from_host_header() {
		let state = test_state(
			r#"
			[server.http]
			context_path = "xnat/"
			"#,
		);

		assert_eq!(
			base_url(&state, &headers(&[("host", "xnat.example.org:8443")])),
			"http://xnat.example.org:8443/xnat"
		);
		assert_eq!(
			base_url(
				&state,
				&headers(&[
					("host", "internal:8080"),
					("x-forwarded-proto", "https"),
					("x-forwarded-host", "xnat.example.org, proxy"),
				])
			),
			"https://xnat.example.org/xnat"
		);
	}

	#[test]
	fn public_url_wins() {
		let state = test_state(
			r#"
			[server.http]
			public_url = "https://xnat.example.org/"
			"#,
		);

		assert_eq!(
			base_url(&state, &headers(&[("host", "internal:8080")])),
			"https://xnat.example.org"
		);
	}

	#[test]
	fn falls_back_to_listen_address() {
		let state = test_state("");
		assert_eq!(base_url(&state, &HeaderMap::new()), "http://0.0.0.0:8080");
	}
}
