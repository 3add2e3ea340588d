//! Debounced office search with cooperative cancellation.
//!
//! Every search begins by cancelling whatever search was still in flight, then waits out the
//! debounce interval before touching the network. Cancellation is an explicit
//! [`SearchHandle`] per call rather than a shared flag, and a superseded search resolves to
//! [`SearchOutcome::Superseded`] so callers can drop it silently.
//!
//! A handle only interrupts the debounce and the original request. A refresh that already
//! started runs to completion so the rotated pair still reaches the session.

// std
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	api::Office,
	auth::SessionCredentials,
	client::AuthClient,
	http::ApiTransport,
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::ApiRequest,
	session::TokenUpdate,
};

/// Cancellation handle for one search call.
#[derive(Clone, Debug)]
pub struct SearchHandle {
	token: CancellationToken,
	generation: u64,
}
impl SearchHandle {
	/// Creates a standalone handle that nothing else cancels.
	pub fn detached() -> Self {
		Self { token: CancellationToken::new(), generation: 0 }
	}

	/// Monotonic sequence number assigned by the controller.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Underlying cancellation token.
	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	/// Returns `true` once the handle was cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Cancels this handle.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Resolves once the handle is cancelled.
	pub async fn cancelled(&self) {
		self.token.cancelled().await
	}
}

/// Hands out search handles, cancelling the previous one each time.
#[derive(Debug, Default)]
pub struct SearchController {
	current: Mutex<Option<CancellationToken>>,
	generation: AtomicU64,
}
impl SearchController {
	/// Cancels the in-flight search (if any) and returns a handle for a new one.
	pub fn begin(&self) -> SearchHandle {
		let token = CancellationToken::new();
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

		if let Some(previous) = self.current.lock().replace(token.clone()) {
			previous.cancel();
		}

		SearchHandle { token, generation }
	}

	/// Cancels the in-flight search without starting a new one.
	pub fn cancel(&self) {
		if let Some(previous) = self.current.lock().take() {
			previous.cancel();
		}
	}

	/// Generation of the most recently started search.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}
}

/// Races `future` against `handle`, failing with [`Error::Cancelled`] if the handle wins.
pub async fn with_cancellation<F, T>(handle: &SearchHandle, future: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	tokio::select! {
		biased;

		_ = handle.cancelled() => Err(Error::Cancelled),
		result = future => result,
	}
}

/// Result of a search call.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
	/// Offices matching the query.
	Results(Vec<Office>),
	/// The query was too short; callers should clear their result list.
	Cleared,
	/// A newer search replaced this one; discard silently.
	Superseded,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OfficePage {
	List(Vec<Office>),
	Paginated { results: Vec<Office> },
}
impl OfficePage {
	fn into_offices(self) -> Vec<Office> {
		match self {
			Self::List(offices) | Self::Paginated { results: offices } => offices,
		}
	}
}

/// Debounced, self-cancelling office search over an [`AuthClient`].
pub struct OfficeSearch<C>
where
	C: ?Sized + ApiTransport,
{
	client: AuthClient<C>,
	controller: SearchController,
	debounce: StdDuration,
	min_query_len: usize,
}
impl<C> OfficeSearch<C>
where
	C: ?Sized + ApiTransport,
{
	/// Default quiet period before a search is sent.
	pub const DEFAULT_DEBOUNCE: StdDuration = StdDuration::from_millis(300);

	/// Creates a search with the default debounce and a one-character minimum query.
	pub fn new(client: AuthClient<C>) -> Self {
		Self {
			client,
			controller: SearchController::default(),
			debounce: Self::DEFAULT_DEBOUNCE,
			min_query_len: 1,
		}
	}

	/// Overrides the debounce interval.
	pub fn with_debounce(mut self, debounce: StdDuration) -> Self {
		self.debounce = debounce;

		self
	}

	/// Overrides the minimum trimmed query length (in characters).
	pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
		self.min_query_len = min_query_len;

		self
	}

	/// Controller owning the in-flight handle; exposed so UIs can cancel on close.
	pub fn controller(&self) -> &SearchController {
		&self.controller
	}

	/// Searches offices for `query`, superseding any search still in flight.
	pub async fn search<U>(
		&self,
		query: &str,
		credentials: &SessionCredentials,
		on_token_update: &U,
	) -> Result<SearchOutcome>
	where
		U: ?Sized + TokenUpdate,
	{
		const KIND: CallKind = CallKind::Search;

		let handle = self.controller.begin();
		let query = query.trim();

		if query.chars().count() < self.min_query_len.max(1) {
			return Ok(SearchOutcome::Cleared);
		}

		let span = CallSpan::new(KIND, "office_search");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				with_cancellation(&handle, async {
					tokio::time::sleep(self.debounce).await;

					Ok(())
				})
				.await?;

				obs::trace_transition(KIND, "debounce_elapsed");

				let request =
					ApiRequest::get(self.client.descriptor.endpoints.office_search.clone())
						.query("q", query);
				let response = self
					.client
					.fetch_with_auth_cancellable(
						&request,
						credentials,
						on_token_update,
						handle.token(),
					)
					.await?
					.error_for_status()?;

				Ok::<_, Error>(response.json::<OfficePage>()?.into_offices())
			})
			.await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		match result {
			Ok(_) if handle.is_cancelled() => Ok(SearchOutcome::Superseded),
			Ok(offices) => Ok(SearchOutcome::Results(offices)),
			Err(Error::Cancelled) => Ok(SearchOutcome::Superseded),
			// A dead session must still reach the caller.
			Err(err) if handle.is_cancelled() && !err.is_token_refresh_failed() =>
				Ok(SearchOutcome::Superseded),
			Err(err) => Err(err),
		}
	}
}
impl<C> Debug for OfficeSearch<C>
where
	C: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OfficeSearch")
			.field("debounce", &self.debounce)
			.field("min_query_len", &self.min_query_len)
			.field("generation", &self.controller.generation())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, session::MemorySession};

	const BERLIN: &str = r#"[{"id":1,"name":"Mitte","city":"Berlin","latitude":52.52,"longitude":13.40}]"#;

	fn credentials() -> SessionCredentials {
		SessionCredentials::new("A1", "R1").expect("Credential fixture should validate.")
	}

	#[test]
	fn begin_cancels_previous_handle() {
		let controller = SearchController::default();
		let first = controller.begin();
		let second = controller.begin();

		assert!(first.is_cancelled());
		assert!(!second.is_cancelled());
		assert_eq!(second.generation(), first.generation() + 1);

		controller.cancel();

		assert!(second.is_cancelled());
	}

	#[tokio::test]
	async fn with_cancellation_prefers_the_handle() {
		let handle = SearchHandle::detached();

		handle.cancel();

		let err = with_cancellation(&handle, async { Ok(1) })
			.await
			.expect_err("Cancelled handle should win the race.");

		assert!(err.is_cancelled());
		assert!(!err.is_token_refresh_failed());
	}

	#[tokio::test]
	async fn blank_query_clears_without_network() {
		let (client, transport) = scripted_client(|_| json_response(200, "[]"));
		let search = OfficeSearch::new(client).with_min_query_len(2);
		let session = MemorySession::default();

		assert_eq!(
			search.search("   ", &credentials(), &session).await.expect("Blank query should clear."),
			SearchOutcome::Cleared,
		);
		assert_eq!(
			search.search(" b ", &credentials(), &session).await.expect("Short query should clear."),
			SearchOutcome::Cleared,
		);
		assert!(transport.requests().is_empty());
	}

	#[tokio::test]
	async fn newer_search_supersedes_older_one() {
		let (client, transport) = scripted_client(|_| json_response(200, BERLIN));
		let search = OfficeSearch::new(client).with_debounce(StdDuration::from_millis(40));
		let session = MemorySession::default();
		let creds = credentials();
		let (first, second) = tokio::join!(search.search("ber", &creds, &session), async {
			tokio::time::sleep(StdDuration::from_millis(5)).await;

			search.search("berlin", &creds, &session).await
		});

		assert_eq!(first.expect("Superseded search should not fail."), SearchOutcome::Superseded);

		match second.expect("Latest search should succeed.") {
			SearchOutcome::Results(offices) => {
				assert_eq!(offices.len(), 1);
				assert_eq!(offices[0].name, "Mitte");
			},
			other => panic!("Unexpected outcome: {other:?}"),
		}

		let sent = transport.requests();

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].url.query(), Some("q=berlin"));
	}

	#[tokio::test]
	async fn paginated_results_are_accepted() {
		let (client, _) = scripted_client(|_| {
			json_response(200, r#"{"count":1,"next":null,"results":[{"id":9,"name":"Altona"}]}"#)
		});
		let search = OfficeSearch::new(client).with_debounce(StdDuration::ZERO);
		let outcome = search
			.search("altona", &credentials(), &MemorySession::default())
			.await
			.expect("Paginated payload should parse.");

		assert!(matches!(outcome, SearchOutcome::Results(ref offices) if offices[0].id == 9));
	}

	#[tokio::test]
	async fn server_errors_are_recoverable() {
		let (client, _) = scripted_client(|_| json_response(503, "maintenance"));
		let search = OfficeSearch::new(client).with_debounce(StdDuration::ZERO);
		let err = search
			.search("altona", &credentials(), &MemorySession::default())
			.await
			.expect_err("503 should surface as an error.");

		assert_eq!(err.severity(), crate::error::ErrorSeverity::Recoverable);
	}

	#[tokio::test]
	async fn cancellation_during_refresh_still_persists_the_rotation() {
		let transport = ScriptedTransport::new(|request| {
			if request.url.path().ends_with("/auth/token/refresh/") {
				json_response(200, r#"{"access":"A2","refresh":"R2"}"#)
			} else if authorization(request).as_deref() == Some("Bearer A2") {
				json_response(200, BERLIN)
			} else {
				json_response(401, r#"{"detail":"expired"}"#)
			}
		})
		.with_refresh_delay(StdDuration::from_millis(50));
		let (client, transport) = client_over(transport);
		let search = OfficeSearch::new(client).with_debounce(StdDuration::ZERO);
		let session = MemorySession::new(credentials());
		let creds = credentials();
		let (outcome, ()) = tokio::join!(search.search("mitte", &creds, &session), async {
			tokio::time::sleep(StdDuration::from_millis(20)).await;
			search.controller().cancel();
		});

		assert_eq!(outcome.expect("Cancelled search should not fail."), SearchOutcome::Superseded);
		assert_eq!(transport.refresh_calls(), 1);

		let stored = session.snapshot().expect("Session should keep the rotated pair.");

		assert_eq!(stored.access_token.expose(), "A2");
		assert_eq!(stored.refresh_token.expose(), "R2");
	}
}
