//! Password login through the throttle, and bearer token authentication.
//!
//! Each login runs a compare-and-set loop over the account record: read the freshest copy,
//! let [`ThrottlePolicy`](crate::throttle::ThrottlePolicy) decide, write back only if nobody
//! else wrote in between. In-process attempts for the same username additionally queue on a
//! per-username guard so they do not burn retries against each other.

mod metrics;

pub use metrics::LoginMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountStatus, Role},
	flows::{Gatekeeper, common},
	obs::OperationKind,
	session::{Claims, SessionKind, SessionToken},
};

/// Accepted login: a fresh interactive token plus the account as stored after the login.
#[derive(Clone, Debug)]
pub struct LoginSuccess {
	/// Bearer token for subsequent requests.
	pub token: SessionToken,
	/// Account state after the throttle reset.
	pub account: Account,
}

/// Verified caller of a protected operation.
#[derive(Clone, Debug)]
pub struct AuthContext {
	/// Claims carried by the presented token.
	pub claims: Claims,
	/// Live account record resolved from the claims.
	pub account: Account,
}
impl AuthContext {
	/// Returns `true` for administrators.
	pub fn is_admin(&self) -> bool {
		self.account.role == Role::Admin
	}
}

impl Gatekeeper {
	/// Checks `password` for `username`, applying the throttle, and issues an interactive token.
	pub async fn login(
		&self,
		username: &str,
		password: &str,
		now: OffsetDateTime,
	) -> Result<LoginSuccess> {
		common::observe(OperationKind::Login, "login", username, now, async move {
			self.login_metrics.record_attempt();

			let result = self.login_inner(username, password, now).await;

			match &result {
				Ok(_) => self.login_metrics.record_success(),
				Err(e) => {
					self.login_metrics.record_failure();

					if matches!(e, Error::AccountBlocked { .. }) {
						self.login_metrics.record_block();
					}
				},
			}

			result
		})
		.await
	}

	async fn login_inner(
		&self,
		username: &str,
		password: &str,
		now: OffsetDateTime,
	) -> Result<LoginSuccess> {
		common::require("username", username)?;
		common::require("password", password)?;

		let account =
			self.credentials.find_by_username(username).await?.ok_or(Error::AccountNotFound)?;
		let guard = common::login_guard(self, username);
		let _serialized = guard.lock().await;
		let (account, outcome) = self
			.credentials
			.update(&account.id, |account| {
				self.throttle.admit(account, now)?;

				let matched = self.passwords.verify(password, &account.password_hash)?;

				Ok(self.throttle.settle(account, matched, now))
			})
			.await?;

		outcome.into_result()?;

		let token = self.sessions.issue(&account, SessionKind::Interactive, now)?;

		Ok(LoginSuccess { token, account })
	}

	/// Verifies a bearer token and re-resolves the account it names.
	///
	/// The token alone is not enough: an account that is blocked right now, or inactive, is
	/// refused even if its token is still within its lifetime.
	pub async fn authenticate(
		&self,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<AuthContext> {
		let claims = self.sessions.verify(token, now)?;
		let account =
			self.credentials.find_by_id(&claims.sub).await?.ok_or(Error::AccountNotFound)?;

		if let Some(blocked_until) = account.active_block(now) {
			return Err(Error::AccountBlocked { blocked_until });
		}
		if account.status == AccountStatus::Inactive {
			return Err(Error::Forbidden { reason: "account is inactive".into() });
		}

		Ok(AuthContext { claims, account })
	}

	/// [`Gatekeeper::authenticate`] plus an administrator role check.
	pub async fn authorize_admin(
		&self,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<AuthContext> {
		let context = self.authenticate(token, now).await?;

		if !context.is_admin() {
			return Err(Error::Forbidden { reason: "admin role required".into() });
		}

		Ok(context)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::{build_test_gatekeeper, register_fixture};

	#[tokio::test]
	async fn login_issues_a_token_that_authenticates() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);
		let account = register_fixture(&gatekeeper, "alice", "secret1", Role::User, now).await;
		let success = gatekeeper
			.login("alice", "secret1", now)
			.await
			.expect("Correct password should log in.");

		assert_eq!(success.account.last_successful_login, Some(now));

		let context = gatekeeper
			.authenticate(&success.token, now + Duration::minutes(5))
			.await
			.expect("Fresh token should authenticate.");

		assert_eq!(context.account.id, account.id);
		assert!(!context.is_admin());
		assert!(matches!(
			gatekeeper.authorize_admin(&success.token, now).await,
			Err(Error::Forbidden { .. })
		));
		assert_eq!(gatekeeper.login_metrics.successes(), 1);
	}

	#[tokio::test]
	async fn unknown_usernames_are_not_found() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);

		assert!(matches!(
			gatekeeper.login("ghost", "whatever", now).await,
			Err(Error::AccountNotFound)
		));
		assert!(matches!(
			gatekeeper.login("", "whatever", now).await,
			Err(Error::Validation(_))
		));
	}

	#[tokio::test]
	async fn tokens_of_blocked_accounts_are_refused() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);

		register_fixture(&gatekeeper, "alice", "secret1", Role::User, now).await;

		let success = gatekeeper
			.login("alice", "secret1", now)
			.await
			.expect("Correct password should log in.");

		for _ in 0..8 {
			let _ = gatekeeper.login("alice", "wrong-password", now).await;
		}

		assert!(matches!(
			gatekeeper.authenticate(&success.token, now).await,
			Err(Error::AccountBlocked { .. })
		));
		assert!(
			gatekeeper.authenticate(&success.token, now + Duration::minutes(30)).await.is_ok(),
			"A lapsed block must not keep refusing a still-valid token."
		);
		assert_eq!(gatekeeper.login_metrics.blocks(), 1);
		assert_eq!(gatekeeper.login_metrics.failures(), 8);
	}
}
