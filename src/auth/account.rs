//! Account records owned by the credential store.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, AccountStatus, Role, Username},
};

/// Persisted account state: identity, credentials, role, throttle fields, and link data.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Store-assigned identifier.
	pub id: AccountId,
	/// Unique login name.
	pub username: Username,
	/// PHC-formatted password hash.
	pub password_hash: String,
	/// Role copied from the redeemed account code; never changes afterwards.
	pub role: Role,
	/// Current lifecycle status.
	pub status: AccountStatus,
	/// Consecutive failed logins in the current throttle window.
	pub failed_attempt_count: u32,
	/// End of the current block, when blocked.
	pub blocked_until: Option<OffsetDateTime>,
	/// Instant of the most recent accepted login.
	pub last_successful_login: Option<OffsetDateTime>,
	/// Subject identifier asserted by the external identity provider.
	pub external_identity_id: Option<String>,
	/// Email asserted by the external identity provider.
	pub external_identity_email: Option<String>,
	/// Whether the provider vouched for the linked email.
	pub external_identity_verified: bool,
	/// Display name taken from the external identity.
	pub display_name: Option<String>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Compare-and-set token; stores bump it on every successful write.
	pub version: u64,
}
impl Account {
	/// Builds a fresh, active account with a newly generated identifier.
	pub fn new(
		username: Username,
		password_hash: impl Into<String>,
		role: Role,
		now: OffsetDateTime,
	) -> Self {
		Self {
			id: AccountId::generate(),
			username,
			password_hash: password_hash.into(),
			role,
			status: AccountStatus::Active,
			failed_attempt_count: 0,
			blocked_until: None,
			last_successful_login: None,
			external_identity_id: None,
			external_identity_email: None,
			external_identity_verified: false,
			display_name: None,
			created_at: now,
			version: 0,
		}
	}

	/// Returns `true` if the account is blocked and the block has not yet run out at `now`.
	pub fn is_blocked_at(&self, now: OffsetDateTime) -> bool {
		self.active_block(now).is_some()
	}

	/// End of the block still in force at `now`, if any.
	pub fn active_block(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
		self.blocked_until.filter(|until| self.status == AccountStatus::Blocked && *until > now)
	}

	/// Puts the account back into a fresh throttle window.
	pub fn clear_throttle(&mut self) {
		self.status = AccountStatus::Active;
		self.failed_attempt_count = 0;
		self.blocked_until = None;
	}

	/// Blocks the account until `until`; the attempt counter is left as is.
	pub fn block_until(&mut self, until: OffsetDateTime) {
		self.status = AccountStatus::Blocked;
		self.blocked_until = Some(until);
	}
}
impl Debug for Account {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Account")
			.field("id", &self.id)
			.field("username", &self.username)
			.field("password_hash", &"<redacted>")
			.field("role", &self.role)
			.field("status", &self.status)
			.field("failed_attempt_count", &self.failed_attempt_count)
			.field("blocked_until", &self.blocked_until)
			.field("last_successful_login", &self.last_successful_login)
			.field("external_identity_id", &self.external_identity_id)
			.field("external_identity_email", &self.external_identity_email)
			.field("external_identity_verified", &self.external_identity_verified)
			.field("display_name", &self.display_name)
			.field("created_at", &self.created_at)
			.field("version", &self.version)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn account() -> Account {
		let username = Username::new("alice").expect("Username fixture should be valid.");
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		Account::new(username, "$argon2id$fixture", Role::User, now)
	}

	#[test]
	fn block_state_depends_on_the_instant() {
		let mut account = account();
		let until = macros::datetime!(2025-01-01 00:30 UTC);

		account.failed_attempt_count = 8;
		account.block_until(until);

		assert_eq!(account.failed_attempt_count, 8);
		assert!(account.is_blocked_at(macros::datetime!(2025-01-01 00:29 UTC)));
		assert!(!account.is_blocked_at(until));

		account.clear_throttle();

		assert_eq!(account.status, AccountStatus::Active);
		assert_eq!(account.failed_attempt_count, 0);
		assert_eq!(account.blocked_until, None);
	}

	#[test]
	fn debug_output_redacts_password_hash() {
		let rendered = format!("{:?}", account());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("$argon2id$fixture"));
	}
}
