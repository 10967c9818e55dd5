//! Storage contracts and built-in store implementations for account codes and accounts.
//!
//! Both contracts expose the atomic primitives the core relies on instead of a bare
//! read-then-write API: [`CodeStore::claim_code`] sets `consumed_by` only if it is still empty,
//! and [`AccountStore::compare_and_swap_account`] writes only if the stored `version` still
//! matches what the caller read.

pub mod file;
pub mod memory;

mod ledger;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountCode, AccountId, CodePair, Role, Username},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for issued account codes.
pub trait CodeStore
where
	Self: Send + Sync,
{
	/// Inserts a code unless the same pair already exists.
	fn insert_code(&self, code: AccountCode) -> StoreFuture<'_, InsertOutcome>;

	/// Atomically marks the pair as consumed by `username` if nobody consumed it yet.
	fn claim_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, ClaimOutcome>;

	/// Clears the consumption mark, but only if it still names `username`.
	///
	/// Returns `true` when the mark was cleared.
	fn release_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
	) -> StoreFuture<'a, bool>;

	/// Lists codes matching the filter, newest first.
	fn list_codes<'a>(&'a self, filter: &'a CodeFilter) -> StoreFuture<'a, Vec<AccountCode>>;
}

/// Persistence contract for accounts.
pub trait AccountStore
where
	Self: Send + Sync,
{
	/// Inserts a new account unless its username (or identifier) is already present.
	fn insert_account(&self, account: Account) -> StoreFuture<'_, InsertOutcome>;

	/// Fetches an account by identifier.
	fn fetch_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>>;

	/// Fetches an account by exact, case-sensitive username.
	fn fetch_account_by_username<'a>(
		&'a self,
		username: &'a str,
	) -> StoreFuture<'a, Option<Account>>;

	/// Fetches the account whose stored external subject equals `external_id`, falling back to
	/// the account whose stored external email equals `email`.
	fn fetch_account_by_external<'a>(
		&'a self,
		external_id: Option<&'a str>,
		email: Option<&'a str>,
	) -> StoreFuture<'a, Option<Account>>;

	/// Replaces the account if its stored version equals `expected_version`.
	///
	/// On success the stored copy carries `expected_version + 1`.
	fn compare_and_swap_account(
		&self,
		expected_version: u64,
		replacement: Account,
	) -> StoreFuture<'_, CompareAndSwapOutcome>;

	/// Lists every account, newest first.
	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>>;
}

/// Result of an insert-if-absent call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
	/// The record was stored.
	Inserted,
	/// A record with the same unique key already exists; nothing was written.
	Duplicate,
}

/// Result of [`CodeStore::claim_code`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimOutcome {
	/// The pair was unclaimed and now belongs to the caller; carries the updated record.
	Claimed(AccountCode),
	/// Someone consumed the pair first.
	AlreadyClaimed,
	/// No record matched the pair.
	Missing,
}

/// Result of [`AccountStore::compare_and_swap_account`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The version matched and the record was replaced.
	Updated,
	/// The record exists but its version moved since the caller read it.
	VersionMismatch,
	/// The replacement renames the account to a username another account holds.
	UsernameTaken,
	/// No record matched the account identifier.
	Missing,
}

/// Filter applied by [`CodeStore::list_codes`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFilter {
	/// Only codes issued by this actor.
	pub issued_by: Option<String>,
	/// Only codes granting this role.
	pub role: Option<Role>,
	/// `Some(true)` keeps unconsumed codes, `Some(false)` consumed ones.
	pub available: Option<bool>,
}
impl CodeFilter {
	/// Filter that keeps only unconsumed codes.
	pub fn available() -> Self {
		Self { available: Some(true), ..Default::default() }
	}

	/// Restricts the filter to one issuing actor.
	pub fn with_issued_by(mut self, issued_by: impl Into<String>) -> Self {
		self.issued_by = Some(issued_by.into());

		self
	}

	/// Restricts the filter to one role.
	pub fn with_role(mut self, role: Role) -> Self {
		self.role = Some(role);

		self
	}

	/// Returns `true` if `code` passes every configured constraint.
	pub fn matches(&self, code: &AccountCode) -> bool {
		self.issued_by.as_deref().is_none_or(|by| code.issued_by.as_deref() == Some(by))
			&& self.role.is_none_or(|role| code.intended_role == role)
			&& self.available.is_none_or(|available| code.is_available() == available)
	}
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
