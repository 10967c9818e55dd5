//! Thread-safe in-memory store for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountCode, AccountId, CodePair, Username},
	store::{
		AccountStore, ClaimOutcome, CodeFilter, CodeStore, CompareAndSwapOutcome, InsertOutcome,
		StoreFuture, ledger::Ledger,
	},
};

type StoreMap = Arc<RwLock<Ledger>>;

/// Storage backend that keeps codes and accounts in-process.
///
/// Every mutation runs under one write lock, so claims and compare-and-set writes are atomic
/// with respect to each other.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl CodeStore for MemoryStore {
	fn insert_code(&self, code: AccountCode) -> StoreFuture<'_, InsertOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().insert_code(code)) })
	}

	fn claim_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, ClaimOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().claim_code(pair, username, instant)) })
	}

	fn release_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
	) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().release_code(pair, username)) })
	}

	fn list_codes<'a>(&'a self, filter: &'a CodeFilter) -> StoreFuture<'a, Vec<AccountCode>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().list_codes(filter)) })
	}
}
impl AccountStore for MemoryStore {
	fn insert_account(&self, account: Account) -> StoreFuture<'_, InsertOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().insert_account(account)) })
	}

	fn fetch_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().account(id)) })
	}

	fn fetch_account_by_username<'a>(
		&'a self,
		username: &'a str,
	) -> StoreFuture<'a, Option<Account>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().account_by_username(username)) })
	}

	fn fetch_account_by_external<'a>(
		&'a self,
		external_id: Option<&'a str>,
		email: Option<&'a str>,
	) -> StoreFuture<'a, Option<Account>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().account_by_external(external_id, email)) })
	}

	fn compare_and_swap_account(
		&self,
		expected_version: u64,
		replacement: Account,
	) -> StoreFuture<'_, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(
			async move { Ok(map.write().compare_and_swap_account(expected_version, replacement)) },
		)
	}

	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().list_accounts()) })
	}
}
