//! Authenticated fetch core.
//!
//! [`AuthClient::fetch_with_auth`] sends a request with the caller's access token. A 401
//! triggers exactly one refresh-token exchange; the rotated pair is handed to the caller's
//! [`TokenUpdate`] and the original request is retried once with the new access token.
//! Every other status is returned untouched, and a failed refresh surfaces as the fatal
//! [`Error::TokenRefreshFailed`]. No credentials are cached between calls.

mod metrics;
mod refresh;
mod single_flight;

pub use metrics::CallMetrics;
pub use single_flight::RefreshCoordinator;

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::SessionCredentials,
	config::ApiDescriptor,
	error::CredentialsError,
	http::{ApiResponse, ApiTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::ApiRequest,
	session::{SessionProvider, TokenUpdate},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// Position of a request in the retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attempt {
	/// First send with the caller's access token.
	Original,
	/// Single resend with a freshly rotated access token.
	Retrying,
}
impl Attempt {
	/// Next attempt after a 401, or `None` once the policy is exhausted.
	pub const fn after_unauthorized(self) -> Option<Self> {
		match self {
			Attempt::Original => Some(Attempt::Retrying),
			Attempt::Retrying => None,
		}
	}

	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Attempt::Original => "original",
			Attempt::Retrying => "retrying",
		}
	}
}

/// Token-refresh-aware API client.
///
/// The client owns the transport and the API descriptor; it holds no session state. Clones
/// share the transport, counters, and (when enabled) the refresh coordinator.
pub struct AuthClient<C>
where
	C: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<C>,
	/// Validated description of the remote API.
	pub descriptor: ApiDescriptor,
	/// Shared counters for requests, refreshes, and retries.
	pub metrics: Arc<CallMetrics>,
	coordinator: Option<Arc<RefreshCoordinator>>,
}
impl<C> AuthClient<C>
where
	C: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(descriptor: ApiDescriptor, transport: impl Into<Arc<C>>) -> Self {
		Self {
			transport: transport.into(),
			descriptor,
			metrics: Default::default(),
			coordinator: None,
		}
	}

	/// Deduplicates concurrent refreshes of the same refresh token.
	///
	/// Without this, callers racing on a 401 each perform their own refresh.
	pub fn with_single_flight(self) -> Self {
		self.with_refresh_coordinator(Arc::new(RefreshCoordinator::default()))
	}

	/// Installs a specific (possibly shared) refresh coordinator.
	pub fn with_refresh_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = Some(coordinator);

		self
	}

	/// Returns `true` when concurrent refreshes are deduplicated.
	pub fn is_single_flight(&self) -> bool {
		self.coordinator.is_some()
	}

	/// Sends `request` authorized with `credentials`, refreshing and retrying once on 401.
	///
	/// Returns the final response for any status, including a 401 from the retry. Fails with
	/// [`Error::TokenRefreshFailed`] when the refresh exchange fails, and with
	/// [`Error::Session`] when `on_token_update` rejects the rotated pair; in both cases the
	/// original request is not retried.
	pub async fn fetch_with_auth<U>(
		&self,
		request: &ApiRequest,
		credentials: &SessionCredentials,
		on_token_update: &U,
	) -> Result<ApiResponse>
	where
		U: ?Sized + TokenUpdate,
	{
		self.fetch(request, credentials, on_token_update, None).await
	}

	/// Same as [`fetch_with_auth`](Self::fetch_with_auth), abandoning the call with
	/// [`Error::Cancelled`] if `cancel` fires while the original request is in flight.
	///
	/// Once a 401 has started a refresh, the call is no longer interruptible: the refresh
	/// token is spent at that point, so the exchange, `on_token_update`, and the retry always
	/// run to completion. Callers check `cancel` afterwards to discard the result.
	pub async fn fetch_with_auth_cancellable<U>(
		&self,
		request: &ApiRequest,
		credentials: &SessionCredentials,
		on_token_update: &U,
		cancel: &CancellationToken,
	) -> Result<ApiResponse>
	where
		U: ?Sized + TokenUpdate,
	{
		self.fetch(request, credentials, on_token_update, Some(cancel)).await
	}

	async fn fetch<U>(
		&self,
		request: &ApiRequest,
		credentials: &SessionCredentials,
		on_token_update: &U,
		cancel: Option<&CancellationToken>,
	) -> Result<ApiResponse>
	where
		U: ?Sized + TokenUpdate,
	{
		const KIND: CallKind = CallKind::Fetch;

		let span = CallSpan::new(KIND, "fetch_with_auth");
		let attempt_span = span.clone();

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_request();

				let mut attempt = Attempt::Original;
				let mut access_token = credentials.access_token.clone();

				loop {
					attempt_span.record_attempt(attempt.as_str());

					let prepared = request.prepare(&self.descriptor, &access_token)?;
					let send = self.transport.send(prepared);
					let sent = match (attempt, cancel) {
						(Attempt::Original, Some(cancel)) => tokio::select! {
							biased;

							_ = cancel.cancelled() => None,
							sent = send => Some(sent),
						},
						_ => Some(send.await),
					};
					let Some(sent) = sent else {
						obs::trace_transition(KIND, "cancelled");

						return Err(Error::Cancelled);
					};
					let response = sent?;

					if !response.is_unauthorized() {
						return Ok(response);
					}

					let Some(next) = attempt.after_unauthorized() else {
						obs::trace_transition(KIND, "retry_unauthorized");

						return Ok(response);
					};

					obs::trace_transition(KIND, "unauthorized");

					let rotation = self.refresh(&credentials.refresh_token).await?;

					obs::trace_transition(KIND, "refresh_succeeded");

					access_token = rotation.access_token.clone();

					on_token_update.update_session(rotation).await?;
					self.metrics.record_retry();

					attempt = next;
				}
			})
			.await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Same as [`fetch_with_auth`](Self::fetch_with_auth), reading credentials from `session`
	/// and persisting rotations into it.
	///
	/// Fails with [`CredentialsError::NoSession`] without touching the network when the
	/// session is empty, and clears the session when the refresh fails.
	pub async fn fetch_with_session<S>(&self, request: &ApiRequest, session: &S) -> Result<ApiResponse>
	where
		S: ?Sized + SessionProvider,
	{
		let credentials = session.credentials().await?.ok_or(CredentialsError::NoSession)?;

		credentials.validate()?;

		let result = self.fetch_with_auth(request, &credentials, session).await;

		if result.as_ref().is_err_and(Error::is_token_refresh_failed) {
			obs::trace_transition(CallKind::Fetch, "session_cleared");

			// The refresh failure is what the caller must act on.
			if let Err(e) = session.clear().await {
				obs::trace_error(CallKind::Fetch, "session_clear_failed", &e);
			}
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(descriptor: ApiDescriptor) -> Self {
		Self::with_transport(descriptor, ReqwestTransport::default())
	}
}
impl<C> Clone for AuthClient<C>
where
	C: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			descriptor: self.descriptor.clone(),
			metrics: self.metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<C> Debug for AuthClient<C>
where
	C: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("descriptor", &self.descriptor)
			.field("single_flight", &self.is_single_flight())
			.finish()
	}
}
