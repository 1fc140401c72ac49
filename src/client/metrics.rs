// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token rotations.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	reused: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh grants sent to the token endpoint.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh grants that produced a new access token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh grants that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how often a caller waiting on the refresh latch reused a token rotated by
	/// another caller instead of refreshing again.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reuse(&self) {
		self.reused.fetch_add(1, Ordering::Relaxed);
	}
}
