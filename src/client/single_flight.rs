//! Optional single-flight guard for refresh exchanges.
//!
//! Concurrent 401s carrying the same refresh token would otherwise each hit the refresh
//! endpoint, and servers that rotate refresh tokens reject every exchange after the first.
//! The coordinator serializes exchanges per refresh-token fingerprint and lets late arrivals
//! reuse the completed rotation for a short retention window.

// self
use crate::{
	_prelude::*,
	auth::{TokenRotation, TokenSecret},
	error::RefreshError,
	obs::{self, CallKind},
};

type RotationSlot = Arc<AsyncMutex<Option<SharedRotation>>>;

#[derive(Clone, Debug)]
struct SharedRotation {
	rotation: TokenRotation,
	completed_at: OffsetDateTime,
}

/// Deduplicates refresh exchanges keyed by refresh token.
#[derive(Debug)]
pub struct RefreshCoordinator {
	slots: Mutex<HashMap<String, RotationSlot>>,
	retention: Duration,
}
impl RefreshCoordinator {
	/// Default window during which a completed rotation is shared.
	pub const DEFAULT_RETENTION: Duration = Duration::seconds(30);

	/// Creates a coordinator sharing completed rotations for `retention`.
	pub fn new(retention: Duration) -> Self {
		let retention = if retention.is_negative() { Duration::ZERO } else { retention };

		Self { slots: Default::default(), retention }
	}

	/// Number of refresh tokens currently tracked.
	pub fn tracked(&self) -> usize {
		self.slots.lock().len()
	}

	/// Runs `exchange` unless another caller already rotated `refresh_token` recently.
	///
	/// Failed exchanges are not shared; the next waiter performs its own attempt.
	pub async fn run<F, Fut>(
		&self,
		refresh_token: &TokenSecret,
		exchange: F,
	) -> Result<TokenRotation, RefreshError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenRotation, RefreshError>>,
	{
		let slot = self.slot(refresh_token.fingerprint());
		let mut guard = slot.lock().await;

		let now = OffsetDateTime::now_utc();

		if let Some(shared) = guard.as_ref().filter(|shared| self.is_fresh(shared, now)) {
			obs::trace_transition(CallKind::Refresh, "single_flight_reused");

			return Ok(shared.rotation.clone());
		}

		let result = exchange().await;

		if let Ok(rotation) = &result {
			*guard = Some(SharedRotation {
				rotation: rotation.clone(),
				completed_at: OffsetDateTime::now_utc(),
			});
		}

		drop(guard);
		drop(slot);
		// Failed exchanges leave an empty slot behind; prune on both paths.
		self.prune(OffsetDateTime::now_utc());

		result
	}

	fn slot(&self, key: String) -> RotationSlot {
		self.slots.lock().entry(key).or_default().clone()
	}

	fn is_fresh(&self, shared: &SharedRotation, now: OffsetDateTime) -> bool {
		now - shared.completed_at <= self.retention
	}

	fn prune(&self, now: OffsetDateTime) {
		self.slots.lock().retain(|_, slot| {
			if Arc::strong_count(slot) > 1 {
				return true;
			}

			match slot.try_lock() {
				Some(guard) => guard.as_ref().is_some_and(|shared| self.is_fresh(shared, now)),
				None => true,
			}
		});
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self::new(Self::DEFAULT_RETENTION)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[tokio::test]
	async fn recent_rotation_is_reused() {
		let coordinator = RefreshCoordinator::default();
		let calls = AtomicUsize::new(0);
		let token = TokenSecret::new("R1");
		let exchange = || async {
			calls.fetch_add(1, Ordering::SeqCst);

			Ok(TokenRotation::new("A2", "R2"))
		};
		let first =
			coordinator.run(&token, exchange).await.expect("First exchange should succeed.");
		let second =
			coordinator.run(&token, exchange).await.expect("Second exchange should be shared.");

		assert_eq!(first.access_token, second.access_token);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.tracked(), 1);
	}

	#[tokio::test]
	async fn failures_are_not_shared_and_expired_entries_are_pruned() {
		let coordinator = RefreshCoordinator::new(Duration::ZERO);
		let token = TokenSecret::new("R1");
		let err = coordinator
			.run(&token, || async { Err(RefreshError::EmptyAccessToken) })
			.await
			.expect_err("Failed exchange should propagate.");

		assert!(matches!(err, RefreshError::EmptyAccessToken));

		let rotation = coordinator
			.run(&token, || async { Ok(TokenRotation::new("A2", "R2")) })
			.await
			.expect("Retry after a failure should run its own exchange.");

		assert_eq!(rotation.access_token.expose(), "A2");

		coordinator.prune(OffsetDateTime::now_utc() + Duration::seconds(1));

		assert_eq!(coordinator.tracked(), 0);
	}

	#[tokio::test]
	async fn failed_exchanges_leave_no_slots_behind() {
		let coordinator = RefreshCoordinator::default();

		for i in 0..100 {
			let token = TokenSecret::new(format!("R{i}"));

			coordinator
				.run(&token, || async {
					Err(RefreshError::Rejected { status: 401, body_preview: String::new() })
				})
				.await
				.expect_err("Rejected exchange should propagate.");
		}

		assert_eq!(coordinator.tracked(), 0);
	}
}
