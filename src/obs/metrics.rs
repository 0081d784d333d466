// self
use crate::{_prelude::*, obs::RequestOutcome, request::ContentKind};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(kind: ContentKind, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"taxon_rest_request_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Notes that a caller is about to sleep because the throttle window is exhausted.
pub fn record_throttle_wait(pause: Duration, in_window: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
			in_window,
			"Request budget exhausted; waiting for the window to roll over."
		);
	}
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("taxon_rest_throttle_wait_total").increment(1);
	}

	#[cfg(not(any(feature = "tracing", feature = "metrics")))]
	{
		let _ = (pause, in_window);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_safe_without_a_global_recorder() {
		record_request_outcome(ContentKind::Xml, RequestOutcome::Failure);
		record_throttle_wait(Duration::from_millis(750), 3);
	}
}
