//! Optional observability helpers for client calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `parcel_agent_client.call` with the `kind`
//!   and `stage` fields, plus debug events for every fetch state transition.
//! - Enable `metrics` to increment the `parcel_agent_client_call_total` counter for every
//!   attempt/outcome, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Kinds of calls observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Authenticated resource call through the fetch core.
	Fetch,
	/// Refresh-token exchange.
	Refresh,
	/// Debounced office search.
	Search,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Fetch => "fetch",
			CallKind::Refresh => "refresh",
			CallKind::Search => "search",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Completed with a response or result.
	Success,
	/// Failed with a recoverable error.
	Failure,
	/// Failed with a session-ending error.
	Fatal,
	/// Abandoned through a cancellation handle.
	Cancelled,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
			CallOutcome::Fatal => "fatal",
			CallOutcome::Cancelled => "cancelled",
		}
	}

	/// Maps a finished call result onto its outcome label.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => CallOutcome::Success,
			Err(err) if err.is_cancelled() => CallOutcome::Cancelled,
			Err(err) if err.is_token_refresh_failed() => CallOutcome::Fatal,
			Err(_) => CallOutcome::Failure,
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
