//! Process-local [`SessionProvider`] for tests, demos, and short-lived tools.

// self
use crate::{
	_prelude::*,
	auth::{SessionCredentials, TokenRotation},
	session::{SessionFuture, SessionProvider, TokenUpdate},
};

/// Thread-safe session that keeps credentials in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySession(Arc<RwLock<Option<SessionCredentials>>>);
impl MemorySession {
	/// Creates a session holding `credentials`.
	pub fn new(credentials: SessionCredentials) -> Self {
		Self(Arc::new(RwLock::new(Some(credentials))))
	}

	/// Synchronous snapshot of the current credentials.
	pub fn snapshot(&self) -> Option<SessionCredentials> {
		self.0.read().clone()
	}

	/// Replaces the credentials (login).
	pub fn replace(&self, credentials: SessionCredentials) {
		*self.0.write() = Some(credentials);
	}
}
impl TokenUpdate for MemorySession {
	fn update_session(&self, rotation: TokenRotation) -> SessionFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(rotation.into_credentials());

			Ok(())
		})
	}
}
impl SessionProvider for MemorySession {
	fn credentials(&self) -> SessionFuture<'_, Option<SessionCredentials>> {
		let snapshot = self.snapshot();

		Box::pin(async move { Ok(snapshot) })
	}

	fn clear(&self) -> SessionFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
