//! Per-client self-throttling over a one-second window.
//!
//! Counting happens only while auto-wait is enabled and a positive limit is configured.
//! The first counted request arms a single-shot timer; when it fires the window counter
//! drops to zero and the limiter is idle again. Callers that find the window exhausted
//! sleep a jittered 500–2000 ms and re-check. The wait is best-effort: the check and the
//! send are not atomic, so the eventual send may still exceed the upstream budget.

// std
use std::ops::Range;
// crates.io
use rand::Rng;
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{_prelude::*, obs};

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_millis(1_000);

const WAIT_JITTER_MS: Range<u64> = 500..2_000;

/// Shared best-effort request budget for one client instance.
///
/// Cloning yields another handle to the same window.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter(Arc<WindowState>);

#[derive(Debug, Default)]
struct WindowState {
	requests_in_window: AtomicU64,
	max_per_window: AtomicI64,
	auto_wait: AtomicBool,
	window_active: AtomicBool,
	timer: Mutex<Option<JoinHandle<()>>>,
}
impl WindowState {
	// Disarm before zeroing so a non-zero count always has a timer pending.
	fn close_window(&self) {
		self.window_active.store(false, Ordering::SeqCst);
		self.requests_in_window.store(0, Ordering::SeqCst);
	}
}

impl RateLimiter {
	/// Creates a limiter with the provided limit (`<= 0` means unlimited) and wait toggle.
	pub fn new(max_per_window: i64, auto_wait: bool) -> Self {
		let limiter = Self::default();

		limiter.0.max_per_window.store(max_per_window, Ordering::SeqCst);
		limiter.0.auto_wait.store(auto_wait, Ordering::SeqCst);

		limiter
	}

	/// Requests counted in the current window.
	pub fn requests_in_window(&self) -> u64 {
		self.0.requests_in_window.load(Ordering::SeqCst)
	}

	/// Configured limit; `<= 0` means unlimited.
	pub fn max_per_window(&self) -> i64 {
		self.0.max_per_window.load(Ordering::SeqCst)
	}

	/// Changes the limit; takes effect on the next check.
	pub fn set_max_per_window(&self, max: i64) {
		self.0.max_per_window.store(max, Ordering::SeqCst);
	}

	/// Whether callers wait for the window to roll over.
	pub fn auto_wait(&self) -> bool {
		self.0.auto_wait.load(Ordering::SeqCst)
	}

	/// Toggles waiting. Switching it off zeroes the counter and disarms the timer.
	pub fn set_auto_wait(&self, enabled: bool) {
		let was_enabled = self.0.auto_wait.swap(enabled, Ordering::SeqCst);

		if was_enabled && !enabled {
			self.reset();
		}
	}

	/// Whether a window timer is currently armed.
	pub fn is_window_active(&self) -> bool {
		self.0.window_active.load(Ordering::SeqCst)
	}

	/// Whether the current window's budget is exhausted.
	pub fn is_at_limit(&self) -> bool {
		let max = self.max_per_window();

		max > 0 && self.requests_in_window() >= max.unsigned_abs()
	}

	/// Read-only view for observability.
	pub fn snapshot(&self) -> RateLimitSnapshot {
		RateLimitSnapshot {
			requests_in_window: self.requests_in_window(),
			max_per_window: self.max_per_window(),
			auto_wait: self.auto_wait(),
			window_active: self.is_window_active(),
			at_limit: self.is_at_limit(),
		}
	}

	/// Counts one sent request and arms the window timer if it is idle.
	///
	/// Outside a Tokio runtime no timer can be armed, so nothing is counted.
	pub fn record_request(&self) {
		if !self.auto_wait() || self.max_per_window() <= 0 {
			return;
		}

		let Ok(runtime) = Handle::try_current() else {
			#[cfg(feature = "tracing")]
			tracing::debug!("request not counted: no Tokio runtime to arm the window timer");

			return;
		};

		self.0.requests_in_window.fetch_add(1, Ordering::SeqCst);

		if self
			.0
			.window_active
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
		{
			self.arm_window(&runtime);
		}
	}

	/// Sleeps in jittered steps while the window is exhausted.
	///
	/// Returns immediately when auto-wait is off. Cancellation aborts the wait.
	pub async fn wait_for_slot(&self, cancel: &CancellationToken) -> Result<()> {
		while self.auto_wait() && self.is_at_limit() {
			let pause = jitter();

			obs::record_throttle_wait(pause, self.requests_in_window());

			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = tokio::time::sleep(pause) => {},
			}
		}

		Ok(())
	}

	fn arm_window(&self, runtime: &Handle) {
		let state = Arc::downgrade(&self.0);
		let handle = runtime.spawn(async move {
			tokio::time::sleep(WINDOW).await;

			if let Some(state) = state.upgrade() {
				state.close_window();
			}
		});

		*self.0.timer.lock() = Some(handle);
	}

	fn reset(&self) {
		if let Some(timer) = self.0.timer.lock().take() {
			timer.abort();
		}

		self.0.close_window();
	}
}

/// Point-in-time view of a [`RateLimiter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSnapshot {
	/// Requests counted in the current window.
	pub requests_in_window: u64,
	/// Configured limit; `<= 0` means unlimited.
	pub max_per_window: i64,
	/// Whether callers wait for the window to roll over.
	pub auto_wait: bool,
	/// Whether a window timer is armed.
	pub window_active: bool,
	/// Whether the budget is exhausted.
	pub at_limit: bool,
}

fn jitter() -> Duration {
	Duration::from_millis(rand::rng().random_range(WAIT_JITTER_MS))
}
