//! Transport primitives for authenticated API calls.
//!
//! The module exposes [`ApiTransport`] alongside [`PreparedRequest`] and [`ApiResponse`] so
//! downstream crates can plug in custom HTTP stacks. Transports only move bytes: they never
//! interpret status codes, never retry, and never touch credentials beyond sending the
//! headers they are handed. The refresh-and-retry policy lives entirely in
//! [`crate::client`].

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{self, TransientError, TransportError},
	request::RequestBody,
};
#[cfg(feature = "reqwest")] use crate::request::{MultipartForm, PartContent};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing prepared API requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of [`crate::client::AuthClient`], and the futures they return must be `Send` so
/// calls can hop executors.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and buffers the full response.
	///
	/// Any response, whatever its status, is `Ok`. `Err` is reserved for failures that
	/// prevented a response from being received.
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Fully resolved request handed to a transport for one attempt.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including query.
	pub url: Url,
	/// Headers, including `Authorization` where applicable.
	pub headers: HeaderMap,
	/// Request body.
	pub body: RequestBody,
}

/// Buffered HTTP response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// HTTP status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.body
	}

	/// Consumes the response, returning its body.
	pub fn into_bytes(self) -> Vec<u8> {
		self.body
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for 401, the only status that triggers a token refresh.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Returns `true` for 404, which several resources use to signal absence.
	pub fn is_not_found(&self) -> bool {
		self.status == StatusCode::NOT_FOUND
	}

	/// Parses the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| {
			TransientError::ResponseParse { source, status: self.status.as_u16() }.into()
		})
	}

	/// Converts non-2xx responses into [`TransientError::UnexpectedStatus`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(TransientError::UnexpectedStatus {
				status: self.status.as_u16(),
				body_preview: error::body_preview(&self.body),
			}
			.into())
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are followed per the wrapped client's policy; API endpoints are expected to
/// answer directly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport with a request timeout applied to every call.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let PreparedRequest { method, url, headers, body } = request;
			let mut builder = client.request(method, url).headers(headers);

			builder = match body {
				RequestBody::Empty => builder,
				RequestBody::Json(value) => builder.json(&value),
				RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?;

			Ok(ApiResponse::new(status, headers, body.to_vec()))
		})
	}
}

#[cfg(feature = "reqwest")]
fn to_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
	use reqwest::multipart::{Form, Part};

	let mut out = Form::new();

	for part in form.parts {
		out = match part.content {
			PartContent::Text(value) => out.text(part.name, value),
			PartContent::File { file_name, mime, bytes } => {
				let file =
					Part::bytes(bytes).file_name(file_name).mime_str(&mime).map_err(TransportError::body)?;

				out.part(part.name, file)
			},
		};
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_reports_the_failing_path() {
		let response = ApiResponse::new(
			StatusCode::OK,
			HeaderMap::new(),
			br#"{"username": 42}"#.to_vec(),
		);

		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Profile {
			username: String,
		}

		let err = response.json::<Profile>().expect_err("Numeric username should fail to parse.");

		match err {
			Error::Transient(TransientError::ResponseParse { source, status }) => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "username");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn error_for_status_passes_success_and_wraps_failures() {
		let ok = ApiResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), Vec::new());

		assert!(ok.error_for_status().is_ok());

		let err = ApiResponse::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), b"upstream".to_vec())
			.error_for_status()
			.expect_err("502 should be converted into an error.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::UnexpectedStatus { status: 502, ref body_preview })
				if body_preview == "upstream"
		));
	}

	#[test]
	fn status_helpers_classify_responses() {
		let unauthorized = ApiResponse::new(StatusCode::UNAUTHORIZED, HeaderMap::new(), Vec::new());
		let missing = ApiResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Vec::new());

		assert!(unauthorized.is_unauthorized());
		assert!(!unauthorized.is_not_found());
		assert!(missing.is_not_found());
		assert!(!missing.is_success());
	}
}
