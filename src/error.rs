//! Error types shared by the transports and the sync controllers.

use crate::api::body;

/// Failure of one call against the pipeline server.
///
/// `Display` is what the view shows inline, so every variant renders as a
/// short human-readable sentence.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
	/// The request never produced a response.
	#[error("unable to reach the server: {0}")]
	Network(String),

	/// Non-2xx response. `message` comes from the body when it carries one,
	/// otherwise it is the per-operation fallback.
	#[error("{message}")]
	Server { status: u16, message: String },

	/// 2xx response whose body could not be used.
	#[error("{0}")]
	Payload(String),

	/// The browser refused to build the request (form data, blobs...).
	#[error("browser error: {0}")]
	Browser(String),
}

impl ApiError {
	/// Build a [`ApiError::Server`] from a raw response body.
	pub fn server(status: u16, body: &str, fallback: &str) -> Self {
		ApiError::Server {
			status,
			message: body::error_detail(body).unwrap_or_else(|| fallback.to_string()),
		}
	}
}

/// Invalid build-time configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
	#[error("unknown data source `{0}` (expected `live` or `fixture`)")]
	UnknownDataSource(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_error_prefers_body_detail() {
		let err = ApiError::server(404, r#"{"detail":"Concept not found"}"#, "lookup failed");
		assert_eq!(err.to_string(), "Concept not found");
	}

	#[test]
	fn server_error_falls_back_on_garbage() {
		let err =
			ApiError::server(502, "<html>bad gateway</html>", "Failed to fetch pipeline status");
		assert_eq!(
			err,
			ApiError::Server {
				status: 502,
				message: "Failed to fetch pipeline status".into()
			}
		);
	}
}
