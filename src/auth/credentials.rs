//! Access/refresh token pairs and the rotation events emitted after a refresh.

// self
use crate::{_prelude::*, auth::TokenSecret, error::CredentialsError};

/// Access/refresh token pair owned by an external session.
///
/// The fetch core reads these per call and never retains them; rotated values are
/// reported through [`TokenRotation`] so the owner can persist them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
	/// Short-lived bearer credential.
	pub access_token: TokenSecret,
	/// Longer-lived credential exchanged for a new pair.
	pub refresh_token: TokenSecret,
}
impl SessionCredentials {
	/// Creates a validated credential pair; both tokens must be non-empty.
	pub fn new(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Result<Self, CredentialsError> {
		let credentials =
			Self { access_token: access_token.into(), refresh_token: refresh_token.into() };

		credentials.validate()?;

		Ok(credentials)
	}

	/// Re-checks the non-empty invariant, e.g. after deserializing a snapshot.
	pub fn validate(&self) -> Result<(), CredentialsError> {
		if self.access_token.is_blank() {
			return Err(CredentialsError::EmptyAccessToken);
		}
		if self.refresh_token.is_blank() {
			return Err(CredentialsError::EmptyRefreshToken);
		}

		Ok(())
	}

	/// Returns a copy with the rotated pair applied.
	pub fn rotated(&self, rotation: &TokenRotation) -> Self {
		Self {
			access_token: rotation.access_token.clone(),
			refresh_token: rotation.refresh_token.clone(),
		}
	}
}

/// New token pair produced by a successful refresh exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRotation {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token, or the previous one if the server did not rotate it.
	pub refresh_token: TokenSecret,
	/// Instant the refresh endpoint answered.
	#[serde(with = "time::serde::rfc3339")]
	pub rotated_at: OffsetDateTime,
}
impl TokenRotation {
	/// Creates a rotation stamped with the current time.
	pub fn new(access_token: impl Into<TokenSecret>, refresh_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			rotated_at: OffsetDateTime::now_utc(),
		}
	}

	/// Converts the rotation into a credential pair.
	pub fn into_credentials(self) -> SessionCredentials {
		SessionCredentials { access_token: self.access_token, refresh_token: self.refresh_token }
	}
}
