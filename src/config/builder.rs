// self
use crate::{
	_prelude::*,
	config::{ApiDescriptor, ApiEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ApiDescriptorError {
	/// The base URL cannot have relative paths joined onto it (e.g. `mailto:`).
	#[error("The base URL cannot serve as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoints must use HTTPS unless insecure HTTP is explicitly allowed.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// An endpoint path cannot be resolved against the base URL.
	#[error("The {endpoint} endpoint path `{path}` cannot be resolved.")]
	UnresolvableEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed to resolve.
		path: String,
	},
	/// The authorization scheme must be a non-empty token without whitespace.
	#[error("Authorization scheme `{scheme}` is invalid.")]
	InvalidAuthScheme {
		/// Rejected scheme.
		scheme: String,
	},
	/// The refresh body field must be non-empty.
	#[error("Refresh body field must not be empty.")]
	EmptyRefreshField,
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// Base URL for relative targets.
	pub base_url: Url,
	/// Relative endpoint paths.
	pub endpoints: ApiEndpoints,
	/// Authorization scheme (defaults to `Bearer`).
	pub auth_scheme: String,
	/// Refresh body field (defaults to `refresh`).
	pub refresh_field: String,
	/// Permits `http` URLs.
	pub allow_insecure_http: bool,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: ApiEndpoints::default(),
			auth_scheme: "Bearer".into(),
			refresh_field: "refresh".into(),
			allow_insecure_http: false,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_endpoint(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Replaces every endpoint path.
	pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the authorization scheme.
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Overrides the JSON field carrying the refresh token.
	pub fn refresh_field(mut self, field: impl Into<String>) -> Self {
		self.refresh_field = field.into();

		self
	}

	/// Permits or forbids plain-HTTP endpoints.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let mut base_url = self.base_url;

		if base_url.cannot_be_a_base() {
			return Err(ApiDescriptorError::CannotBeABase { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let descriptor = ApiDescriptor {
			base_url,
			endpoints: self.endpoints,
			auth_scheme: self.auth_scheme,
			refresh_field: self.refresh_field,
			allow_insecure_http: self.allow_insecure_http,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ApiDescriptorError> {
		if self.auth_scheme.is_empty() || self.auth_scheme.contains(char::is_whitespace) {
			return Err(ApiDescriptorError::InvalidAuthScheme { scheme: self.auth_scheme.clone() });
		}
		if self.refresh_field.trim().is_empty() {
			return Err(ApiDescriptorError::EmptyRefreshField);
		}

		self.validate_scheme("base", &self.base_url)?;

		let refresh = self.refresh_url().map_err(|_| ApiDescriptorError::UnresolvableEndpoint {
			endpoint: "refresh",
			path: self.endpoints.refresh.clone(),
		})?;

		self.validate_scheme("refresh", &refresh)
	}

	fn validate_scheme(&self, name: &'static str, url: &Url) -> Result<(), ApiDescriptorError> {
		match url.scheme() {
			"https" => Ok(()),
			"http" if self.allow_insecure_http => Ok(()),
			_ => Err(ApiDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
		}
	}
}
