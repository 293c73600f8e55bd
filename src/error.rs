//! Relay-level error types shared across flows, stores, and the HTTP surface.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Access-token acquisition failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Upstream API failure outside the token exchange.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Stream resolution or relay failure.
	#[error(transparent)]
	Stream(#[from] StreamError),
}
impl Error {
	/// Maps the error onto the HTTP status code reported by the public surface.
	///
	/// Upstream statuses are propagated unchanged where the upstream response is the
	/// authoritative answer; relay-local faults collapse onto the 4xx/5xx families below.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Storage(_) | Self::Config(_) => 500,
			Self::Auth(e) => match e {
				AuthError::Unobtainable { status: Some(429) } => 429,
				_ => 401,
			},
			Self::Upstream(e) => match e {
				UpstreamError::CuratorNotFound => 404,
				UpstreamError::Format { .. } => 500,
				UpstreamError::Status { status } => *status,
				UpstreamError::Network { .. } => 502,
			},
			Self::Stream(e) => match e {
				StreamError::UntrustedTrackUrl => 400,
				StreamError::NoProgressiveTranscoding => 404,
				StreamError::Resolution => 500,
				StreamError::Unavailable { status } => *status,
			},
		}
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client credentials were absent from the environment at startup.
	#[error("SoundCloud client credentials are not configured.")]
	MissingCredentials,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Upstream descriptor derived an invalid endpoint URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{name}` is invalid: {message}.")]
	InvalidVar {
		/// Variable name as it appears in the environment.
		name: &'static str,
		/// Human-readable parsing failure.
		message: String,
	},
	/// Neither curator locator variable is present.
	#[error("Either MIZU_CURATOR_URL or MIZU_CURATOR_ID must be set.")]
	MissingCurator,
	/// Both curator locator variables are present.
	#[error("MIZU_CURATOR_URL and MIZU_CURATOR_ID are mutually exclusive.")]
	CuratorConflict,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Access-token acquisition failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive or oversized lifetime.
	#[error("The expires_in value is outside the supported range.")]
	ExpiresInOutOfRange,
	/// Refresh failed and no previously issued token was available to fall back on.
	///
	/// The display string is the canonical body the front-end matches on; keep it verbatim.
	#[error("rate_limited_or_unreachable")]
	Unobtainable {
		/// HTTP status reported by the token endpoint, when one was received.
		status: Option<u16>,
	},
}

/// Upstream API failures outside the token exchange.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Curator profile could not be resolved to an account id.
	#[error("Curator account could not be resolved.")]
	CuratorNotFound,
	/// Upstream body did not decode into the expected shape.
	#[error("Upstream {endpoint} response is malformed JSON.")]
	Format {
		/// Endpoint label used in logs and error bodies.
		endpoint: &'static str,
		/// Structured parsing failure carrying the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Upstream replied with a non-success status that is propagated verbatim.
	#[error("Upstream request failed with status {status}.")]
	Status {
		/// Status code returned by the upstream API.
		status: u16,
	},
	/// Network failure while reaching the upstream API.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Stream resolution and relay failures.
#[derive(Debug, ThisError)]
pub enum StreamError {
	/// Requested track URL does not live under the configured upstream API.
	#[error("Track URL must point at the configured upstream API.")]
	UntrustedTrackUrl,
	/// Track metadata lists no progressive transcoding.
	#[error("No progressive stream is available for this track.")]
	NoProgressiveTranscoding,
	/// Transcoding endpoint returned no usable stream URL.
	#[error("Stream URL resolution returned no usable URL.")]
	Resolution,
	/// Media host rejected the signed URL.
	#[error("Stream source responded with status {status}.")]
	Unavailable {
		/// Status code returned by the media host.
		status: u16,
	},
}
