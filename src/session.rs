//! Session contracts consumed by the fetch core, plus built-in session backends.
//!
//! The fetch core never stores credentials. It reads them from the caller on every call and
//! reports rotations through [`TokenUpdate`]; a [`SessionProvider`] additionally lets
//! [`crate::client::AuthClient::fetch_with_session`] look credentials up and tear the session
//! down after a fatal refresh failure.

pub mod file;
pub mod memory;

pub use file::FileSession;
pub use memory::MemorySession;

// self
use crate::{
	_prelude::*,
	auth::{SessionCredentials, TokenRotation},
	error::SessionError,
};

/// Boxed future returned by session operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + 'a + Send>>;

/// Receiver of rotated tokens.
///
/// Invoked at most once per fetch, only after a refresh succeeded and before the original
/// request is retried. A returned error aborts the retry and is surfaced to the caller.
pub trait TokenUpdate
where
	Self: Send + Sync,
{
	/// Durably applies the rotated pair to the session.
	fn update_session(&self, rotation: TokenRotation) -> SessionFuture<'_, ()>;
}

/// Session owner that can also supply and discard credentials.
pub trait SessionProvider
where
	Self: TokenUpdate,
{
	/// Returns the current credentials, if a session exists.
	fn credentials(&self) -> SessionFuture<'_, Option<SessionCredentials>>;

	/// Discards the session (logout).
	fn clear(&self) -> SessionFuture<'_, ()>;
}

/// Adapts an async closure into a [`TokenUpdate`].
pub struct TokenUpdateFn<F>(pub F);
impl<F, Fut> TokenUpdate for TokenUpdateFn<F>
where
	F: Send + Sync + Fn(TokenRotation) -> Fut,
	Fut: 'static + Send + Future<Output = Result<(), SessionError>>,
{
	fn update_session(&self, rotation: TokenRotation) -> SessionFuture<'_, ()> {
		Box::pin((self.0)(rotation))
	}
}
impl<F> Debug for TokenUpdateFn<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenUpdateFn(..)")
	}
}
