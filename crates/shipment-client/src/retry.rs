//! Backoff schedule for transient request failures.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::time::Duration;

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Exponential backoff without jitter: `initial * 2^(attempt-1)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	initial_backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Duration::from_secs(1))
	}
}

impl RetryPolicy {
	pub fn new(initial_backoff: Duration) -> Self {
		Self { initial_backoff }
	}

	pub fn initial_backoff(&self) -> Duration {
		self.initial_backoff
	}

	/// Fresh backoff state for one logical request.
	pub fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			current_interval: self.initial_backoff,
			initial_interval: self.initial_backoff,
			randomization_factor: 0.0,
			multiplier: 2.0,
			max_interval: MAX_BACKOFF,
			max_elapsed_time: None,
			..Default::default()
		}
	}

	/// Sleeps taken between `attempts` failed attempts.
	///
	/// There is no sleep after the final attempt, so this yields
	/// `attempts - 1` delays.
	pub fn delays(&self, attempts: u32) -> Vec<Duration> {
		let mut backoff = self.backoff();
		(1..attempts)
			.map(|_| backoff.next_backoff().unwrap_or(MAX_BACKOFF))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_schedule_doubles() {
		let delays: Vec<u128> = RetryPolicy::default()
			.delays(4)
			.into_iter()
			.map(|d| d.as_millis())
			.collect();
		assert_eq!(delays, vec![1000, 2000, 4000]);
	}

	#[test]
	fn test_no_sleep_after_last_attempt() {
		assert_eq!(RetryPolicy::default().delays(3).len(), 2);
		assert!(RetryPolicy::default().delays(1).is_empty());
	}
}
