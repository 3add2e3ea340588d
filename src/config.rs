//! API descriptor: base URL, endpoint paths, and the auth conventions of the remote API.
//!
//! Descriptors are assembled through [`ApiDescriptorBuilder`] (or loaded from the
//! environment via [`ApiDescriptor::from_env`]) and validated once, so every request
//! target the client resolves later is known to sit under a usable base.

/// Builder API for assembling API descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "PARCEL_API_BASE_URL";
/// Environment variable overriding the refresh endpoint path.
pub const ENV_REFRESH_PATH: &str = "PARCEL_API_REFRESH_PATH";
/// Environment variable permitting plain-HTTP base URLs (`1`/`true`).
pub const ENV_ALLOW_INSECURE: &str = "PARCEL_API_ALLOW_INSECURE";

/// Relative endpoint paths resolved against [`ApiDescriptor::base_url`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
	/// Refresh-token exchange endpoint.
	pub refresh: String,
	/// Agent profile resource.
	pub profile: String,
	/// Agent profile image resource.
	pub profile_image: String,
	/// Office collection resource.
	pub offices: String,
	/// Office search resource.
	pub office_search: String,
}
impl Default for ApiEndpoints {
	fn default() -> Self {
		Self {
			refresh: "auth/token/refresh/".into(),
			profile: "auth/profile/".into(),
			profile_image: "auth/profile/image/".into(),
			offices: "offices/".into(),
			office_search: "offices/search/".into(),
		}
	}
}

/// Immutable, validated description of the remote API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Base URL every relative target is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Relative endpoint paths.
	pub endpoints: ApiEndpoints,
	/// Authorization scheme placed before the access token.
	pub auth_scheme: String,
	/// JSON field carrying the refresh token in the refresh request body.
	pub refresh_field: String,
	/// Permits `http` URLs (local development and tests).
	pub allow_insecure_http: bool,
}
impl ApiDescriptor {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(base_url)
	}

	/// Loads a descriptor from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads a descriptor through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let raw = lookup(ENV_BASE_URL)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { name: ENV_BASE_URL })?;
		let base_url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidTarget {
			target: raw.clone(),
			source,
		})?;
		let mut builder = Self::builder(base_url);

		if let Some(path) = lookup(ENV_REFRESH_PATH).filter(|value| !value.trim().is_empty()) {
			builder = builder.refresh_endpoint(path.trim());
		}
		if let Some(flag) = lookup(ENV_ALLOW_INSECURE) {
			builder = builder
				.allow_insecure_http(matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true"));
		}

		Ok(builder.build()?)
	}

	/// Resolves an absolute or base-relative target into a full URL.
	///
	/// Absolute targets are used verbatim. Relative targets are always appended beneath the
	/// base path; a leading `/` does not escape it.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		let invalid = |source| ConfigError::InvalidTarget { target: target.to_owned(), source };

		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) =>
				self.base_url.join(target.trim_start_matches('/')).map_err(invalid),
			Err(source) => Err(invalid(source)),
		}
	}

	/// Resolved refresh endpoint URL.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.endpoints.refresh)
	}
}
