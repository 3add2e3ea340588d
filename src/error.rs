//! Client-level error types shared across the fetch core, sessions, search, and API helpers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// How callers must react to an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
	/// The session is unusable; clear it and send the user back to authentication.
	Fatal,
	/// Report a transient failure and leave the prior state intact for a manual retry.
	Recoverable,
}

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The access token was rejected and exchanging the refresh token failed.
	#[error("Token refresh failed: {0}")]
	TokenRefreshFailed(#[from] RefreshError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credentials are absent or malformed.
	#[error(transparent)]
	Credentials(#[from] CredentialsError),
	/// Persisting rotated tokens into the session failed.
	#[error(transparent)]
	Session(#[from] SessionError),
	/// Temporary upstream failure; report it and allow a manual retry.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The request was superseded or aborted through its cancellation handle.
	#[error("Request was cancelled before it completed.")]
	Cancelled,
}
impl Error {
	/// Classifies the error into the two-tier taxonomy callers branch on.
	pub fn severity(&self) -> ErrorSeverity {
		match self {
			Self::TokenRefreshFailed(_) => ErrorSeverity::Fatal,
			_ => ErrorSeverity::Recoverable,
		}
	}

	/// Returns `true` when the session must be torn down.
	pub fn is_token_refresh_failed(&self) -> bool {
		matches!(self, Self::TokenRefreshFailed(_))
	}

	/// Returns `true` when the request was aborted through a cancellation handle.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Reasons a refresh-token exchange is considered failed.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// The refresh request never produced a response.
	#[error("refresh request could not be delivered.")]
	Network(#[from] TransportError),
	/// The refresh endpoint answered with a non-success status.
	#[error("refresh endpoint responded with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
		/// Truncated response body for diagnostics.
		body_preview: String,
	},
	/// The refresh endpoint answered with a body that is not a token pair.
	#[error("refresh endpoint returned a malformed token pair.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The refresh endpoint answered with an empty access token.
	#[error("refresh endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// The refresh endpoint cannot be resolved from the descriptor.
	#[error("refresh endpoint is misconfigured.")]
	Endpoint(#[from] ConfigError),
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Descriptor validation failed.
	#[error(transparent)]
	Descriptor(#[from] crate::config::ApiDescriptorError),
	/// A required environment variable is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// A request target cannot be resolved against the API base.
	#[error("Request target `{target}` cannot be resolved against the API base.")]
	InvalidTarget {
		/// Target as supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains characters that cannot be sent.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] http::header::InvalidHeaderValue),
	/// A JSON request body could not be encoded.
	#[error("Request body could not be encoded as JSON.")]
	EncodeBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Missing or malformed session credentials.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialsError {
	/// The session holds no credentials.
	#[error("No session credentials are available.")]
	NoSession,
	/// The access token is empty.
	#[error("Access token must not be empty.")]
	EmptyAccessToken,
	/// The refresh token is empty.
	#[error("Refresh token must not be empty.")]
	EmptyRefreshToken,
}

/// Error type produced by session providers while reading or persisting credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the session storage.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Temporary failure variants (safe to retry manually).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned a status the caller does not accept.
	#[error("Endpoint responded with unexpected HTTP {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Truncated response body for diagnostics.
		body_preview: String,
	},
	/// Endpoint responded with JSON that could not be parsed into the expected shape.
	#[error("Endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request body could not be converted into the transport's representation.
	#[error("Request body could not be prepared for the transport.")]
	Body {
		/// Transport-specific conversion error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific body conversion error.
	pub fn body(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Body { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Renders a bounded, lossy UTF-8 preview of a response body.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &text[..idx]),
		None => text.into_owned(),
	}
}
