//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `taxon_rest.request` with the `kind`
//!   (declared content kind) and `stage` (call site) fields, plus debug events for throttle waits.
//! - Enable `metrics` to increment the `taxon_rest_request_total` counter for every
//!   attempt and terminal outcome, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each typed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a typed operation.
	Attempt,
	/// Decoded value handed back to the caller.
	Success,
	/// Upstream signalled "no content" and the caller received `None`.
	Absent,
	/// Error propagated back to the caller.
	Failure,
	/// The caller's cancellation token fired.
	Cancelled,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Absent => "absent",
			RequestOutcome::Failure => "failure",
			RequestOutcome::Cancelled => "cancelled",
		}
	}

	pub(crate) fn of<T>(result: &Result<T>, is_absent: impl FnOnce(&T) -> bool) -> Self {
		match result {
			Ok(value) if is_absent(value) => Self::Absent,
			Ok(_) => Self::Success,
			Err(e) if e.is_cancelled() => Self::Cancelled,
			Err(_) => Self::Failure,
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_follow_the_result_shape() {
		assert_eq!(RequestOutcome::of(&Ok(Some(1)), Option::is_none), RequestOutcome::Success);
		assert_eq!(RequestOutcome::of(&Ok(None::<u8>), Option::is_none), RequestOutcome::Absent);
		assert_eq!(RequestOutcome::of(&Ok(0_u64), |_| false), RequestOutcome::Success);
		assert_eq!(
			RequestOutcome::of::<u8>(&Err(Error::Cancelled), |_| false),
			RequestOutcome::Cancelled
		);
		assert_eq!(
			RequestOutcome::of::<u64>(
				&Err(Error::EmptyDownload { url: "https://x.test".into() }),
				|_| false
			),
			RequestOutcome::Failure
		);
	}
}
