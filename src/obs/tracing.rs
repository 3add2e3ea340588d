// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"parcel_agent_client.call",
				kind = kind.as_str(),
				stage,
				attempt = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records which retry-policy attempt the call is on.
	pub fn record_attempt(&self, attempt: &'static str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("attempt", attempt);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = attempt;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for a state transition inside the current span.
pub fn trace_transition(kind: CallKind, transition: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(kind = kind.as_str(), transition, "call state transition");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, transition);
	}
}

/// Emits a warning for a failed step whose error is not returned to the caller.
pub fn trace_error(kind: CallKind, transition: &'static str, err: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = kind.as_str(), transition, error = %err, "call step failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, transition, err);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::Fetch, "instrument_wraps_future");
		span.record_attempt("original");

		let value = span.instrument(async { 42 }).await;

		trace_transition(CallKind::Fetch, "noop");
		trace_error(
			CallKind::Fetch,
			"noop_failed",
			&crate::error::SessionError::Backend { message: "noop".into() },
		);

		assert_eq!(value, 42);
	}
}
