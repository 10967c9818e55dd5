//! Login throttle: a pure state machine over an account's throttle fields.
//!
//! Blocks expire lazily. Nothing sweeps expired blocks; the next login attempt after
//! `blocked_until` clears the block and starts a fresh window before checking the password.
//! The caller owns persistence and is expected to write the mutated account back with
//! compare-and-set.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountStatus},
	error::ValidationError,
};

/// Consecutive failures that trigger a block.
pub const DEFAULT_ATTEMPT_THRESHOLD: u32 = 8;
/// Length of an automatic block.
pub const DEFAULT_BLOCK_DURATION: Duration = Duration::minutes(30);
/// Longest block, automatic or administrative, that the throttle accepts.
pub const MAX_BLOCK_DURATION: Duration = Duration::days(366 * 100);

/// Throttle parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottlePolicy {
	/// Failures in one window that block the account.
	pub attempt_threshold: u32,
	/// How long an automatic (or default administrative) block lasts.
	#[serde(with = "crate::config::duration_secs")]
	pub block_duration: Duration,
}
impl ThrottlePolicy {
	/// Decides whether a login attempt may check the password at all.
	///
	/// An unexpired block yields [`Error::AccountBlocked`] without touching the account. A lapsed
	/// block is cleared in place and reported as [`Admission::BlockLapsed`], so the caller knows
	/// the record changed even if the password turns out wrong.
	pub fn admit(&self, account: &mut Account, now: OffsetDateTime) -> Result<Admission> {
		if account.status != AccountStatus::Blocked {
			return Ok(Admission::Open);
		}

		match account.blocked_until {
			Some(blocked_until) if blocked_until > now =>
				Err(Error::AccountBlocked { blocked_until }),
			_ => {
				account.clear_throttle();

				Ok(Admission::BlockLapsed)
			},
		}
	}

	/// Applies the result of the password comparison to an admitted account.
	pub fn settle(
		&self,
		account: &mut Account,
		matched: bool,
		now: OffsetDateTime,
	) -> LoginOutcome {
		if matched {
			account.clear_throttle();
			account.last_successful_login = Some(now);

			return LoginOutcome::Accepted;
		}

		account.failed_attempt_count = account.failed_attempt_count.saturating_add(1);

		if account.failed_attempt_count >= self.attempt_threshold {
			let blocked_until = now.saturating_add(self.block_duration);

			account.block_until(blocked_until);

			LoginOutcome::Blocked { blocked_until }
		} else {
			LoginOutcome::Rejected { attempts_so_far: account.failed_attempt_count }
		}
	}

	/// Administrative block or unblock that bypasses the attempt counter.
	///
	/// Blocking lasts `duration` (or the policy's block duration) from `now`. Both directions
	/// reset the counter. A block that would end past [`MAX_BLOCK_DURATION`] or outside the
	/// representable calendar is refused and leaves the account untouched.
	pub fn set_blocked(
		&self,
		account: &mut Account,
		blocked: bool,
		duration: Option<Duration>,
		now: OffsetDateTime,
	) -> Result<(), ValidationError> {
		let blocked_until = if blocked {
			let duration = duration.unwrap_or(self.block_duration);

			if !duration.is_positive() || duration > MAX_BLOCK_DURATION {
				return Err(ValidationError::InvalidBlockDuration);
			}

			Some(now.checked_add(duration).ok_or(ValidationError::InvalidBlockDuration)?)
		} else {
			None
		};

		account.clear_throttle();

		if let Some(blocked_until) = blocked_until {
			account.block_until(blocked_until);
		}

		Ok(())
	}

	/// Checks that the policy can ever admit and ever block.
	pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
		use crate::error::ConfigError;

		if self.attempt_threshold == 0 {
			return Err(ConfigError::ZeroAttemptThreshold);
		}
		if !self.block_duration.is_positive() {
			return Err(ConfigError::NonPositiveBlockDuration);
		}
		if self.block_duration > MAX_BLOCK_DURATION {
			return Err(ConfigError::BlockDurationTooLong { max: MAX_BLOCK_DURATION });
		}

		Ok(())
	}
}
impl Default for ThrottlePolicy {
	fn default() -> Self {
		Self {
			attempt_threshold: DEFAULT_ATTEMPT_THRESHOLD,
			block_duration: DEFAULT_BLOCK_DURATION,
		}
	}
}

/// Result of [`ThrottlePolicy::admit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
	/// The account was not blocked.
	Open,
	/// A block had run out and was cleared.
	BlockLapsed,
}

/// Result of [`ThrottlePolicy::settle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
	/// Password matched; the window was reset.
	Accepted,
	/// Password mismatched below the threshold.
	Rejected {
		/// Failures in the current window, including this one.
		attempts_so_far: u32,
	},
	/// Password mismatched and the threshold was reached.
	Blocked {
		/// End of the new block.
		blocked_until: OffsetDateTime,
	},
}
impl LoginOutcome {
	/// Maps rejections onto the crate error.
	pub fn into_result(self) -> Result<()> {
		match self {
			LoginOutcome::Accepted => Ok(()),
			LoginOutcome::Rejected { attempts_so_far } =>
				Err(Error::InvalidCredentials { attempts_so_far }),
			LoginOutcome::Blocked { blocked_until } => Err(Error::AccountBlocked { blocked_until }),
		}
	}
}

/// Converts an administrative block length in minutes; `None` means the policy default.
pub fn block_minutes(minutes: Option<i64>) -> Result<Option<Duration>, ValidationError> {
	match minutes {
		None => Ok(None),
		Some(m) if m > 0 => m
			.checked_mul(60)
			.map(Duration::seconds)
			.filter(|d| *d <= MAX_BLOCK_DURATION)
			.map(Some)
			.ok_or(ValidationError::InvalidBlockDuration),
		Some(_) => Err(ValidationError::InvalidBlockDuration),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{Role, Username};

	fn account() -> Account {
		let username = Username::new("alice").expect("Username fixture should be valid.");

		Account::new(username, "hash", Role::User, macros::datetime!(2025-01-01 00:00 UTC))
	}

	#[test]
	fn eighth_failure_blocks_for_thirty_minutes() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let t = macros::datetime!(2025-01-01 12:00 UTC);

		for expected in 1..=7 {
			policy.admit(&mut account, t).expect("Account should be admitted below the threshold.");

			assert_eq!(
				policy.settle(&mut account, false, t),
				LoginOutcome::Rejected { attempts_so_far: expected }
			);
		}

		policy.admit(&mut account, t).expect("Seventh failure must not block yet.");

		let outcome = policy.settle(&mut account, false, t);

		assert_eq!(outcome, LoginOutcome::Blocked { blocked_until: t + Duration::minutes(30) });
		assert_eq!(account.status, AccountStatus::Blocked);
		assert_eq!(account.failed_attempt_count, 8);
	}

	#[test]
	fn unexpired_block_rejects_before_password_check() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let until = macros::datetime!(2025-01-01 12:30 UTC);

		account.failed_attempt_count = 8;
		account.block_until(until);

		let before = account.clone();
		let result = policy.admit(&mut account, macros::datetime!(2025-01-01 12:29 UTC));

		assert!(matches!(
			result,
			Err(Error::AccountBlocked { blocked_until }) if blocked_until == until
		));
		assert_eq!(account, before);
	}

	#[test]
	fn lapsed_block_is_cleared_lazily() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let until = macros::datetime!(2025-01-01 12:30 UTC);

		account.failed_attempt_count = 8;
		account.block_until(until);

		assert_eq!(
			policy.admit(&mut account, until).expect("Lapsed block should admit."),
			Admission::BlockLapsed
		);
		assert_eq!(account.failed_attempt_count, 0);
		assert_eq!(
			policy.settle(&mut account, false, until),
			LoginOutcome::Rejected { attempts_so_far: 1 }
		);
	}

	#[test]
	fn success_resets_window_and_stamps_login() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let t = macros::datetime!(2025-01-01 12:00 UTC);

		account.failed_attempt_count = 3;

		assert_eq!(policy.settle(&mut account, true, t), LoginOutcome::Accepted);
		assert_eq!(account.failed_attempt_count, 0);
		assert_eq!(account.last_successful_login, Some(t));
	}

	#[test]
	fn admin_block_and_unblock_reset_counter() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let t = macros::datetime!(2025-01-01 12:00 UTC);

		account.failed_attempt_count = 5;
		policy
			.set_blocked(&mut account, true, Some(Duration::minutes(10)), t)
			.expect("Ten-minute block should apply.");

		assert_eq!(account.status, AccountStatus::Blocked);
		assert_eq!(account.blocked_until, Some(t + Duration::minutes(10)));
		assert_eq!(account.failed_attempt_count, 0);

		policy.set_blocked(&mut account, false, None, t).expect("Unblock should apply.");

		assert_eq!(account.status, AccountStatus::Active);
		assert_eq!(account.blocked_until, None);
	}

	#[test]
	fn block_minutes_must_be_positive() {
		assert_eq!(block_minutes(None), Ok(None));
		assert_eq!(block_minutes(Some(5)), Ok(Some(Duration::minutes(5))));
		assert_eq!(block_minutes(Some(0)), Err(ValidationError::InvalidBlockDuration));
	}

	#[test]
	fn oversized_blocks_are_refused_without_panicking() {
		let policy = ThrottlePolicy::default();
		let mut account = account();
		let t = macros::datetime!(2025-01-01 12:00 UTC);

		account.failed_attempt_count = 5;

		let before = account.clone();

		assert_eq!(block_minutes(Some(10_000_000_000)), Err(ValidationError::InvalidBlockDuration));
		assert_eq!(block_minutes(Some(i64::MAX)), Err(ValidationError::InvalidBlockDuration));
		assert_eq!(
			policy.set_blocked(&mut account, true, Some(Duration::MAX), t),
			Err(ValidationError::InvalidBlockDuration)
		);
		assert_eq!(account, before);

		let lax = ThrottlePolicy { attempt_threshold: 1, block_duration: Duration::MAX };
		let outcome = lax.settle(&mut account, false, t);

		assert!(matches!(outcome, LoginOutcome::Blocked { blocked_until } if blocked_until > t));
	}

	#[test]
	fn degenerate_policies_fail_validation() {
		let zero = ThrottlePolicy { attempt_threshold: 0, ..Default::default() };
		let instant = ThrottlePolicy { block_duration: Duration::ZERO, ..Default::default() };
		let endless = ThrottlePolicy { block_duration: Duration::MAX, ..Default::default() };

		assert!(ThrottlePolicy::default().validate().is_ok());
		assert!(zero.validate().is_err());
		assert!(instant.validate().is_err());
		assert!(matches!(
			endless.validate(),
			Err(crate::error::ConfigError::BlockDurationTooLong { .. })
		));
	}
}
