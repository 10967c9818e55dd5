//! Simple file-backed store for lightweight single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Account, AccountCode, AccountId, CodePair, Username},
	store::{
		AccountStore, ClaimOutcome, CodeFilter, CodeStore, CompareAndSwapOutcome, InsertOutcome,
		StoreError, StoreFuture,
		ledger::{Ledger, Snapshot},
	},
};

/// Persists codes and accounts to a JSON file after each mutation.
///
/// A mutation is applied to a scratch copy, written to `<path>.tmp`, synced, and renamed over
/// the snapshot before it becomes visible; a failed write leaves both disk and memory untouched.
///
/// File I/O (including `fsync`) is blocking and happens while the write lock is held, so every
/// mutation stalls the calling executor thread and serializes with all other store calls.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Ledger>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(Ledger::from_snapshot(snapshot))) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(Snapshot::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, ledger: &Ledger) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&ledger.snapshot()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Runs `op` against a scratch copy and commits it only when `changed` returns `true` and
	/// the snapshot was written.
	fn mutate<T>(
		&self,
		op: impl FnOnce(&mut Ledger) -> T,
		changed: impl FnOnce(&T) -> bool,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut scratch = guard.clone();
		let outcome = op(&mut scratch);

		if changed(&outcome) {
			self.persist(&scratch)?;

			*guard = scratch;
		}

		Ok(outcome)
	}
}
impl CodeStore for FileStore {
	fn insert_code(&self, code: AccountCode) -> StoreFuture<'_, InsertOutcome> {
		Box::pin(async move {
			self.mutate(|l| l.insert_code(code), |o| matches!(o, InsertOutcome::Inserted))
		})
	}

	fn claim_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, ClaimOutcome> {
		Box::pin(async move {
			self.mutate(
				|l| l.claim_code(pair, username, instant),
				|o| matches!(o, ClaimOutcome::Claimed(_)),
			)
		})
	}

	fn release_code<'a>(
		&'a self,
		pair: &'a CodePair,
		username: &'a Username,
	) -> StoreFuture<'a, bool> {
		Box::pin(
			async move { self.mutate(|l| l.release_code(pair, username), |released| *released) },
		)
	}

	fn list_codes<'a>(&'a self, filter: &'a CodeFilter) -> StoreFuture<'a, Vec<AccountCode>> {
		Box::pin(async move { Ok(self.inner.read().list_codes(filter)) })
	}
}
impl AccountStore for FileStore {
	fn insert_account(&self, account: Account) -> StoreFuture<'_, InsertOutcome> {
		Box::pin(async move {
			self.mutate(|l| l.insert_account(account), |o| matches!(o, InsertOutcome::Inserted))
		})
	}

	fn fetch_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.inner.read().account(id)) })
	}

	fn fetch_account_by_username<'a>(
		&'a self,
		username: &'a str,
	) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.inner.read().account_by_username(username)) })
	}

	fn fetch_account_by_external<'a>(
		&'a self,
		external_id: Option<&'a str>,
		email: Option<&'a str>,
	) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.inner.read().account_by_external(external_id, email)) })
	}

	fn compare_and_swap_account(
		&self,
		expected_version: u64,
		replacement: Account,
	) -> StoreFuture<'_, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.mutate(
				|l| l.compare_and_swap_account(expected_version, replacement),
				|o| matches!(o, CompareAndSwapOutcome::Updated),
			)
		})
	}

	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.inner.read().list_accounts()) })
	}
}
