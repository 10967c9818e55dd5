//! Credential store: account records, lookups, and compare-and-set writes.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, Role, Username},
	store::{AccountStore, CompareAndSwapOutcome, InsertOutcome},
};

/// Upper bound on read-modify-write attempts in [`CredentialStore::update`].
pub const MAX_CAS_RETRIES: usize = 16;

/// Account persistence with optimistic concurrency on [`Account::version`].
#[derive(Clone)]
pub struct CredentialStore {
	store: Arc<dyn AccountStore>,
}
impl CredentialStore {
	/// Wraps an account store.
	pub fn new(store: Arc<dyn AccountStore>) -> Self {
		Self { store }
	}

	/// Creates an active account with a clean throttle window.
	///
	/// Fails with [`Error::UsernameTaken`] on an exact username match.
	pub async fn create_account(
		&self,
		username: Username,
		password_hash: String,
		role: Role,
		now: OffsetDateTime,
	) -> Result<Account> {
		let account = Account::new(username, password_hash, role, now);

		match self.store.insert_account(account.clone()).await? {
			InsertOutcome::Inserted => Ok(account),
			InsertOutcome::Duplicate =>
				Err(Error::UsernameTaken { username: account.username.into() }),
		}
	}

	/// Exact, case-sensitive lookup.
	pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
		Ok(self.store.fetch_account_by_username(username).await?)
	}

	/// Lookup by identifier.
	pub async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
		Ok(self.store.fetch_account(id).await?)
	}

	/// Lookup by linked external subject, falling back to linked email.
	pub async fn find_by_external(
		&self,
		external_id: Option<&str>,
		email: Option<&str>,
	) -> Result<Option<Account>> {
		if external_id.is_none() && email.is_none() {
			return Ok(None);
		}

		Ok(self.store.fetch_account_by_external(external_id, email).await?)
	}

	/// Every account, newest first.
	pub async fn list(&self) -> Result<Vec<Account>> {
		Ok(self.store.list_accounts().await?)
	}

	/// Writes `account` if nobody changed the record since it was read.
	///
	/// Returns the stored copy, whose version is one past the one read.
	pub async fn save(&self, account: &Account) -> Result<Account> {
		let expected = account.version;

		match self.store.compare_and_swap_account(expected, account.clone()).await? {
			CompareAndSwapOutcome::Updated => {
				let mut stored = account.clone();

				stored.version = expected + 1;

				Ok(stored)
			},
			CompareAndSwapOutcome::VersionMismatch => Err(Error::ConcurrentUpdate),
			CompareAndSwapOutcome::UsernameTaken =>
				Err(Error::UsernameTaken { username: account.username.to_string() }),
			CompareAndSwapOutcome::Missing => Err(Error::AccountNotFound),
		}
	}

	/// Reads the freshest record, applies `mutate`, and saves it, retrying on version races.
	///
	/// An `Err` from `mutate` aborts without writing. Gives up with [`Error::ConcurrentUpdate`]
	/// after [`MAX_CAS_RETRIES`] lost races.
	pub async fn update<T>(
		&self,
		id: &AccountId,
		mut mutate: impl FnMut(&mut Account) -> Result<T>,
	) -> Result<(Account, T)> {
		for _ in 0..MAX_CAS_RETRIES {
			let mut account = self.find_by_id(id).await?.ok_or(Error::AccountNotFound)?;
			let value = mutate(&mut account)?;

			match self.save(&account).await {
				Ok(stored) => return Ok((stored, value)),
				Err(Error::ConcurrentUpdate) => continue,
				Err(e) => return Err(e),
			}
		}

		Err(Error::ConcurrentUpdate)
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialStore(..)")
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn credentials() -> CredentialStore {
		CredentialStore::new(Arc::new(MemoryStore::default()))
	}

	fn username(value: &str) -> Username {
		Username::new(value).expect("Username fixture should be valid.")
	}

	#[tokio::test]
	async fn usernames_are_unique_and_case_sensitive() {
		let credentials = credentials();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let alice = credentials
			.create_account(username("alice"), "hash".into(), Role::User, now)
			.await
			.expect("Creating a fresh account should succeed.");

		assert_eq!(alice.failed_attempt_count, 0);
		assert!(matches!(
			credentials.create_account(username("alice"), "hash".into(), Role::User, now).await,
			Err(Error::UsernameTaken { .. })
		));

		credentials
			.create_account(username("Alice"), "hash".into(), Role::User, now)
			.await
			.expect("Usernames differing in case are distinct.");

		assert!(credentials.find_by_username("ALICE").await.expect("Lookup should run.").is_none());
		assert_eq!(
			credentials.find_by_id(&alice.id).await.expect("Lookup should run."),
			Some(alice)
		);
	}

	#[tokio::test]
	async fn stale_save_is_rejected() {
		let credentials = credentials();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let account = credentials
			.create_account(username("alice"), "hash".into(), Role::User, now)
			.await
			.expect("Creating a fresh account should succeed.");
		let mut first = account.clone();
		let mut second = account;

		first.failed_attempt_count = 1;
		second.failed_attempt_count = 5;

		let stored = credentials.save(&first).await.expect("First writer should win.");

		assert_eq!(stored.version, 1);
		assert!(matches!(credentials.save(&second).await, Err(Error::ConcurrentUpdate)));
	}

	#[tokio::test]
	async fn update_applies_to_the_freshest_record() {
		let credentials = credentials();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let account = credentials
			.create_account(username("alice"), "hash".into(), Role::User, now)
			.await
			.expect("Creating a fresh account should succeed.");
		let mut stale = account.clone();

		stale.display_name = Some("Alice".into());
		credentials.save(&stale).await.expect("Save should succeed.");

		let (updated, previous) = credentials
			.update(&account.id, |a| {
				let previous = a.failed_attempt_count;

				a.failed_attempt_count += 1;

				Ok(previous)
			})
			.await
			.expect("Update should succeed.");

		assert_eq!(previous, 0);
		assert_eq!(updated.failed_attempt_count, 1);
		assert_eq!(updated.display_name.as_deref(), Some("Alice"));
		assert_eq!(updated.version, 2);

		let aborted = credentials
			.update(&account.id, |_| -> Result<()> {
				Err(Error::Forbidden { reason: "nope".into() })
			})
			.await;

		assert!(matches!(aborted, Err(Error::Forbidden { .. })));
		assert_eq!(
			credentials
				.find_by_id(&account.id)
				.await
				.expect("Lookup should run.")
				.expect("Account should exist.")
				.version,
			2
		);
	}

	#[tokio::test]
	async fn renames_respect_uniqueness() {
		let credentials = credentials();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		credentials
			.create_account(username("bob"), "hash".into(), Role::User, now)
			.await
			.expect("Creating a fresh account should succeed.");

		let mut alice = credentials
			.create_account(username("alice"), "hash".into(), Role::User, now)
			.await
			.expect("Creating a fresh account should succeed.");

		alice.username = username("bob");

		assert!(matches!(credentials.save(&alice).await, Err(Error::UsernameTaken { .. })));

		alice.username = username("carol");

		credentials.save(&alice).await.expect("Rename to a free username should succeed.");

		assert!(credentials.find_by_username("alice").await.expect("Lookup should run.").is_none());
		assert!(credentials.find_by_username("carol").await.expect("Lookup should run.").is_some());
	}
}
