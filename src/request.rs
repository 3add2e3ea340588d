//! Request descriptors built per call and prepared for a transport on every attempt.
//!
//! An [`ApiRequest`] is owned by the caller and borrowed by the fetch core, which turns it
//! into a fresh [`PreparedRequest`] for the original attempt and again for the retry. Bodies
//! therefore own their data: multipart forms are kept as [`MultipartPart`] values instead of
//! transport-specific streams.

// crates.io
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ApiDescriptor,
	error::ConfigError,
	http::PreparedRequest,
};

/// Body attached to an [`ApiRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document; the transport sets `Content-Type: application/json`.
	Json(serde_json::Value),
	/// Multipart form; the transport sets the `Content-Type` including its boundary.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Returns `true` for multipart bodies.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Owned multipart form that can be re-sent on retry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
	/// Ordered form parts.
	pub parts: Vec<MultipartPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(MultipartPart {
			name: name.into(),
			content: PartContent::Text(value.into()),
		});

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(MultipartPart {
			name: name.into(),
			content: PartContent::File {
				file_name: file_name.into(),
				mime: mime.into(),
				bytes: bytes.into(),
			},
		});

		self
	}
}

/// Single named part of a [`MultipartForm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// Part payload.
	pub content: PartContent,
}

/// Payload of a [`MultipartPart`].
#[derive(Clone, PartialEq, Eq)]
pub enum PartContent {
	/// Plain text value.
	Text(String),
	/// Binary file upload.
	File {
		/// File name reported to the server.
		file_name: String,
		/// MIME type of the payload.
		mime: String,
		/// Raw file bytes.
		bytes: Vec<u8>,
	},
}
impl Debug for PartContent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Self::File { file_name, mime, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("mime", mime)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}

/// Caller-built description of a single API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL or path relative to the API base.
	pub target: String,
	/// Query parameters appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Caller-supplied headers; `Authorization` is always overwritten.
	pub headers: HeaderMap,
	/// Request body.
	pub body: RequestBody,
}
impl ApiRequest {
	/// Creates a request with the given method and target.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self {
			method,
			target: target.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: RequestBody::Empty,
		}
	}

	/// `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// `POST` request.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(Method::POST, target)
	}

	/// `PUT` request.
	pub fn put(target: impl Into<String>) -> Self {
		Self::new(Method::PUT, target)
	}

	/// `PATCH` request.
	pub fn patch(target: impl Into<String>) -> Self {
		Self::new(Method::PATCH, target)
	}

	/// `DELETE` request.
	pub fn delete(target: impl Into<String>) -> Self {
		Self::new(Method::DELETE, target)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a header, replacing any previous value.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn json<T>(mut self, value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let value =
			serde_json::to_value(value).map_err(|source| ConfigError::EncodeBody { source })?;

		self.body = RequestBody::Json(value);

		Ok(self)
	}

	/// Attaches a multipart body.
	pub fn multipart(mut self, form: MultipartForm) -> Self {
		self.body = RequestBody::Multipart(form);

		self
	}

	/// Builds the outgoing request for one attempt, authorized with `access_token`.
	pub(crate) fn prepare(
		&self,
		descriptor: &ApiDescriptor,
		access_token: &TokenSecret,
	) -> Result<PreparedRequest, ConfigError> {
		let mut url = descriptor.resolve(&self.target)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut headers = self.headers.clone();

		if self.body.is_multipart() {
			// The transport owns the boundary parameter.
			headers.remove(CONTENT_TYPE);
		}

		let mut authorization = HeaderValue::from_str(&format!(
			"{} {}",
			descriptor.auth_scheme,
			access_token.expose()
		))?;

		authorization.set_sensitive(true);
		headers.insert(AUTHORIZATION, authorization);

		Ok(PreparedRequest { method: self.method.clone(), url, headers, body: self.body.clone() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor() -> ApiDescriptor {
		ApiDescriptor::builder(Url::parse("https://api.example.com/api/").expect("Base should parse."))
			.build()
			.expect("Descriptor fixture should build.")
	}

	#[test]
	fn prepare_attaches_bearer_and_query() {
		let request = ApiRequest::get("offices/search/").query("q", "berlin mitte");
		let prepared = request
			.prepare(&descriptor(), &TokenSecret::new("A1"))
			.expect("Request should prepare.");

		assert_eq!(prepared.url.as_str(), "https://api.example.com/api/offices/search/?q=berlin+mitte");
		assert_eq!(
			prepared.headers.get(AUTHORIZATION).expect("Authorization header should be set."),
			"Bearer A1",
		);
		assert!(prepared.headers.get(AUTHORIZATION).is_some_and(HeaderValue::is_sensitive));
	}

	#[test]
	fn prepare_strips_content_type_for_multipart() {
		let request = ApiRequest::post("auth/profile/image/")
			.header(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"))
			.multipart(MultipartForm::new().file("image", "me.png", "image/png", vec![1, 2, 3]));
		let prepared = request
			.prepare(&descriptor(), &TokenSecret::new("A1"))
			.expect("Multipart request should prepare.");

		assert!(prepared.headers.get(CONTENT_TYPE).is_none());
		assert!(prepared.body.is_multipart());
	}

	#[test]
	fn prepare_keeps_caller_content_type_for_other_bodies() {
		let request = ApiRequest::post("offices/")
			.header(CONTENT_TYPE, HeaderValue::from_static("application/merge-patch+json"))
			.json(&serde_json::json!({ "name": "Mitte" }))
			.expect("JSON body should encode.");
		let prepared = request
			.prepare(&descriptor(), &TokenSecret::new("A1"))
			.expect("JSON request should prepare.");

		assert_eq!(
			prepared.headers.get(CONTENT_TYPE).expect("Caller content type should survive."),
			"application/merge-patch+json",
		);
	}

	#[test]
	fn prepare_rejects_tokens_with_control_characters() {
		let err = ApiRequest::get("auth/profile/")
			.prepare(&descriptor(), &TokenSecret::new("bad\ntoken"))
			.expect_err("Control characters cannot be sent in headers.");

		assert!(matches!(err, ConfigError::InvalidHeader(_)));
	}

	#[test]
	fn file_parts_do_not_dump_bytes_in_debug() {
		let form = MultipartForm::new().file("image", "me.png", "image/png", vec![0; 1024]);
		let rendered = format!("{form:?}");

		assert!(rendered.contains("len: 1024"));
	}
}
