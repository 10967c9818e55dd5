//! Synchronous record keeping shared by the in-memory and file-backed stores.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountCode, AccountId, CodePair, Username},
	store::{ClaimOutcome, CodeFilter, CompareAndSwapOutcome, InsertOutcome},
};

/// Serializable form of a [`Ledger`]; indexes are rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
	pub codes: Vec<AccountCode>,
	pub accounts: Vec<Account>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Ledger {
	codes: HashMap<CodePair, AccountCode>,
	accounts: HashMap<AccountId, Account>,
	usernames: HashMap<Username, AccountId>,
}
impl Ledger {
	pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
		let mut ledger = Self::default();

		for code in snapshot.codes {
			ledger.codes.insert(code.pair.clone(), code);
		}
		for account in snapshot.accounts {
			ledger.usernames.insert(account.username.clone(), account.id.clone());
			ledger.accounts.insert(account.id.clone(), account);
		}

		ledger
	}

	pub(crate) fn snapshot(&self) -> Snapshot {
		let mut codes: Vec<_> = self.codes.values().cloned().collect();
		let mut accounts: Vec<_> = self.accounts.values().cloned().collect();

		sort_codes(&mut codes);
		sort_accounts(&mut accounts);

		Snapshot { codes, accounts }
	}

	pub(crate) fn insert_code(&mut self, code: AccountCode) -> InsertOutcome {
		if self.codes.contains_key(&code.pair) {
			return InsertOutcome::Duplicate;
		}

		self.codes.insert(code.pair.clone(), code);

		InsertOutcome::Inserted
	}

	pub(crate) fn claim_code(
		&mut self,
		pair: &CodePair,
		username: &Username,
		instant: OffsetDateTime,
	) -> ClaimOutcome {
		match self.codes.get_mut(pair) {
			Some(code) if code.is_available() => {
				code.consumed_by = Some(username.clone());
				code.consumed_at = Some(instant);

				ClaimOutcome::Claimed(code.clone())
			},
			Some(_) => ClaimOutcome::AlreadyClaimed,
			None => ClaimOutcome::Missing,
		}
	}

	pub(crate) fn release_code(&mut self, pair: &CodePair, username: &Username) -> bool {
		match self.codes.get_mut(pair) {
			Some(code) if code.consumed_by.as_ref() == Some(username) => {
				code.consumed_by = None;
				code.consumed_at = None;

				true
			},
			_ => false,
		}
	}

	pub(crate) fn list_codes(&self, filter: &CodeFilter) -> Vec<AccountCode> {
		let mut codes =
			self.codes.values().filter(|c| filter.matches(c)).cloned().collect::<Vec<_>>();

		sort_codes(&mut codes);

		codes
	}

	pub(crate) fn insert_account(&mut self, account: Account) -> InsertOutcome {
		if self.usernames.contains_key(&account.username) || self.accounts.contains_key(&account.id)
		{
			return InsertOutcome::Duplicate;
		}

		self.usernames.insert(account.username.clone(), account.id.clone());
		self.accounts.insert(account.id.clone(), account);

		InsertOutcome::Inserted
	}

	pub(crate) fn account(&self, id: &AccountId) -> Option<Account> {
		self.accounts.get(id).cloned()
	}

	pub(crate) fn account_by_username(&self, username: &str) -> Option<Account> {
		self.usernames.get(username).and_then(|id| self.account(id))
	}

	pub(crate) fn account_by_external(
		&self,
		external_id: Option<&str>,
		email: Option<&str>,
	) -> Option<Account> {
		let by_id = external_id.and_then(|wanted| {
			self.accounts.values().find(|a| a.external_identity_id.as_deref() == Some(wanted))
		});
		let by_email = || {
			email.and_then(|wanted| {
				self.accounts
					.values()
					.find(|a| a.external_identity_email.as_deref() == Some(wanted))
			})
		};

		by_id.or_else(by_email).cloned()
	}

	pub(crate) fn compare_and_swap_account(
		&mut self,
		expected_version: u64,
		mut replacement: Account,
	) -> CompareAndSwapOutcome {
		let Some(current) = self.accounts.get(&replacement.id) else {
			return CompareAndSwapOutcome::Missing;
		};

		if current.version != expected_version {
			return CompareAndSwapOutcome::VersionMismatch;
		}

		let previous_username = current.username.clone();

		if previous_username != replacement.username {
			if self.usernames.contains_key(&replacement.username) {
				return CompareAndSwapOutcome::UsernameTaken;
			}

			self.usernames.remove(&previous_username);
			self.usernames.insert(replacement.username.clone(), replacement.id.clone());
		}

		replacement.version = expected_version + 1;

		self.accounts.insert(replacement.id.clone(), replacement);

		CompareAndSwapOutcome::Updated
	}

	pub(crate) fn list_accounts(&self) -> Vec<Account> {
		let mut accounts: Vec<_> = self.accounts.values().cloned().collect();

		sort_accounts(&mut accounts);

		accounts
	}
}

fn sort_codes(codes: &mut [AccountCode]) {
	codes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.pair.cmp(&b.pair)));
}

fn sort_accounts(accounts: &mut [Account]) {
	accounts
		.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.username.cmp(&b.username)));
}
