// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for fetch calls, refresh exchanges, and retries.
#[derive(Debug, Default)]
pub struct CallMetrics {
	requests: AtomicU64,
	refreshes: AtomicU64,
	refresh_failures: AtomicU64,
	retries: AtomicU64,
}
impl CallMetrics {
	/// Returns the number of `fetch_with_auth` invocations.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh exchanges sent to the refresh endpoint.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh exchanges that failed.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of retried original requests.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_failure(&self) {
		self.refresh_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}
}
