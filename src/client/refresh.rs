//! Refresh-token exchange against the API's refresh endpoint.

// crates.io
use http::header::{ACCEPT, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{TokenRotation, TokenSecret},
	client::AuthClient,
	error::{self, RefreshError},
	http::{ApiTransport, PreparedRequest},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::RequestBody,
};

/// Token pair returned by the refresh endpoint.
#[derive(Deserialize)]
struct RefreshResponse {
	#[serde(alias = "access_token")]
	access: String,
	#[serde(default, alias = "refresh_token")]
	refresh: Option<String>,
}

impl<C> AuthClient<C>
where
	C: ?Sized + ApiTransport,
{
	/// Exchanges `refresh_token` for a new pair, through the coordinator when one is installed.
	pub(crate) async fn refresh(
		&self,
		refresh_token: &TokenSecret,
	) -> Result<TokenRotation, RefreshError> {
		match self.coordinator.as_ref() {
			Some(coordinator) =>
				coordinator.run(refresh_token, || self.exchange_refresh_token(refresh_token)).await,
			None => self.exchange_refresh_token(refresh_token).await,
		}
	}

	/// Sends one refresh request and validates the returned pair.
	///
	/// If the endpoint does not rotate the refresh token, the current one is carried into the
	/// returned [`TokenRotation`].
	pub async fn exchange_refresh_token(
		&self,
		refresh_token: &TokenSecret,
	) -> Result<TokenRotation, RefreshError> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "exchange_refresh_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_refresh();

				let url = self.descriptor.refresh_url()?;
				let mut body = serde_json::Map::new();

				body.insert(
					self.descriptor.refresh_field.clone(),
					serde_json::Value::String(refresh_token.expose().to_owned()),
				);

				let mut headers = HeaderMap::new();

				headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

				let response = self
					.transport
					.send(PreparedRequest {
						method: Method::POST,
						url,
						headers,
						body: RequestBody::Json(serde_json::Value::Object(body)),
					})
					.await?;

				if !response.is_success() {
					return Err(RefreshError::Rejected {
						status: response.status().as_u16(),
						body_preview: error::body_preview(response.bytes()),
					});
				}

				let mut de = serde_json::Deserializer::from_slice(response.bytes());
				let pair: RefreshResponse = serde_path_to_error::deserialize(&mut de)
					.map_err(|source| RefreshError::Malformed { source })?;

				if pair.access.trim().is_empty() {
					return Err(RefreshError::EmptyAccessToken);
				}

				let rotated_refresh = pair
					.refresh
					.filter(|value| !value.trim().is_empty())
					.map(TokenSecret::new)
					.unwrap_or_else(|| refresh_token.clone());

				Ok(TokenRotation::new(pair.access, rotated_refresh))
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => {
				self.metrics.record_refresh_failure();
				obs::record_call_outcome(KIND, CallOutcome::Fatal);
			},
		}

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn refresh_posts_configured_field_and_keeps_unrotated_token() {
		let (client, transport) = scripted_client(|_| json_response(200, r#"{"access_token":"A2"}"#));
		let rotation = client
			.exchange_refresh_token(&TokenSecret::new("R1"))
			.await
			.expect("Refresh without rotation should succeed.");

		assert_eq!(rotation.access_token.expose(), "A2");
		assert_eq!(rotation.refresh_token.expose(), "R1");

		let sent = transport.requests();

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].method, Method::POST);
		assert_eq!(sent[0].body, RequestBody::Json(serde_json::json!({ "refresh": "R1" })));
		assert!(authorization(&sent[0]).is_none());
	}

	#[tokio::test]
	async fn empty_access_token_is_rejected() {
		let (client, _) = scripted_client(|_| json_response(200, r#"{"access":" ","refresh":"R2"}"#));
		let err = client
			.exchange_refresh_token(&TokenSecret::new("R1"))
			.await
			.expect_err("Blank access tokens should be rejected.");

		assert!(matches!(err, RefreshError::EmptyAccessToken));
		assert_eq!(client.metrics.refresh_failures(), 1);
	}

	#[tokio::test]
	async fn transport_failures_are_refresh_failures() {
		let transport = Arc::new(ScriptedTransport::failing());
		let client: AuthClient<ScriptedTransport> =
			AuthClient::with_transport(test_descriptor(), transport);
		let err = client
			.exchange_refresh_token(&TokenSecret::new("R1"))
			.await
			.expect_err("Transport errors should fail the refresh.");

		assert!(matches!(err, RefreshError::Network(_)));
	}
}
