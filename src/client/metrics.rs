//! Lifetime request counters kept per client.

// self
use crate::{_prelude::*, obs::RequestOutcome};

/// Lifetime counters for one client instance.
///
/// `sent` counts requests that received a response, whatever its status. The remaining
/// counters classify completed typed operations.
#[derive(Debug, Default)]
pub struct RequestMetrics {
	sent: AtomicU64,
	success: AtomicU64,
	absent: AtomicU64,
	failure: AtomicU64,
	cancelled: AtomicU64,
}
impl RequestMetrics {
	/// Returns the number of requests that reached the upstream API.
	pub fn sent(&self) -> u64 {
		self.sent.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that produced a value.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that resolved to "no value".
	pub fn absences(&self) -> u64 {
		self.absent.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of operations aborted by the caller.
	pub fn cancellations(&self) -> u64 {
		self.cancelled.load(Ordering::Relaxed)
	}

	pub(crate) fn record_sent(&self) {
		self.sent.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record(&self, outcome: RequestOutcome) {
		let counter = match outcome {
			RequestOutcome::Attempt => return,
			RequestOutcome::Success => &self.success,
			RequestOutcome::Absent => &self.absent,
			RequestOutcome::Failure => &self.failure,
			RequestOutcome::Cancelled => &self.cancelled,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_land_in_their_own_counter() {
		let metrics = RequestMetrics::default();

		metrics.record_sent();
		metrics.record(RequestOutcome::Attempt);
		metrics.record(RequestOutcome::Success);
		metrics.record(RequestOutcome::Absent);
		metrics.record(RequestOutcome::Failure);
		metrics.record(RequestOutcome::Failure);
		metrics.record(RequestOutcome::Cancelled);

		assert_eq!(metrics.sent(), 1);
		assert_eq!(metrics.successes(), 1);
		assert_eq!(metrics.absences(), 1);
		assert_eq!(metrics.failures(), 2);
		assert_eq!(metrics.cancellations(), 1);
	}
}
