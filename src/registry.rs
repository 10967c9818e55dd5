//! Code registry: issues account code pairs and redeems each of them exactly once.
//!
//! Redemption never reads-then-writes; it delegates to [`CodeStore::claim_code`], so two
//! registrants racing for the same pair cannot both win.

// self
use crate::{
	_prelude::*,
	auth::{AccountCode, CodePair, Role, Username},
	obs::{self, OperationKind},
	store::{ClaimOutcome, CodeFilter, CodeStore, InsertOutcome},
};

/// Role granted by a successful redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
	/// Role carried by the redeemed pair.
	pub role: Role,
}

/// Per-role counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
	/// Codes granting [`Role::Admin`].
	pub admin: usize,
	/// Codes granting [`Role::User`].
	pub user: usize,
}
impl RoleCounts {
	fn bump(&mut self, role: Role) {
		match role {
			Role::Admin => self.admin += 1,
			Role::User => self.user += 1,
		}
	}
}

/// Aggregate view over every issued code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
	/// Every issued pair.
	pub total: usize,
	/// Pairs nobody redeemed yet.
	pub available: usize,
	/// Issued pairs per intended role.
	pub by_role: RoleCounts,
	/// Redeemed pairs per intended role.
	pub active_by_role: RoleCounts,
}

/// One entry of a batch issuance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSeed {
	/// First half of the pair.
	pub code_a: String,
	/// Second half of the pair.
	pub code_b: String,
	/// Role the pair grants.
	#[serde(default)]
	pub role: Role,
	/// Issuing actor.
	#[serde(default)]
	pub issued_by: Option<String>,
}
impl CodeSeed {
	/// Creates a seed without an issuing actor.
	pub fn new(code_a: impl Into<String>, code_b: impl Into<String>, role: Role) -> Self {
		Self { code_a: code_a.into(), code_b: code_b.into(), role, issued_by: None }
	}

	/// Records the issuing actor.
	pub fn with_issued_by(mut self, issued_by: impl Into<String>) -> Self {
		self.issued_by = Some(issued_by.into());

		self
	}
}

/// Result of [`CodeRegistry::seed_codes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
	/// Pairs written by this call.
	pub created: usize,
	/// Pairs that already existed and were left untouched.
	pub skipped: usize,
}

/// Issues, redeems and reports on account codes.
#[derive(Clone)]
pub struct CodeRegistry {
	store: Arc<dyn CodeStore>,
}
impl CodeRegistry {
	/// Wraps a code store.
	pub fn new(store: Arc<dyn CodeStore>) -> Self {
		Self { store }
	}

	/// Stores a new, unconsumed pair.
	///
	/// Fails with [`Error::DuplicateCode`] when the pair was issued before.
	pub async fn issue_code(
		&self,
		code_a: impl Into<String>,
		code_b: impl Into<String>,
		role: Role,
		issued_by: Option<&str>,
		now: OffsetDateTime,
	) -> Result<AccountCode> {
		let pair = CodePair::new(code_a, code_b)?;
		let code = AccountCode::new(pair, role, issued_by.map(Into::into), now);

		match self.store.insert_code(code.clone()).await? {
			InsertOutcome::Inserted => Ok(code),
			InsertOutcome::Duplicate => {
				let e = Error::DuplicateCode;

				obs::log_failure(OperationKind::IssueCode, issued_by.unwrap_or("-"), now, &e);

				Err(e)
			},
		}
	}

	/// Issues every seed, skipping pairs that already exist.
	///
	/// Safe to call repeatedly with the same input.
	pub async fn seed_codes(
		&self,
		seeds: impl IntoIterator<Item = CodeSeed>,
		now: OffsetDateTime,
	) -> Result<SeedReport> {
		let mut report = SeedReport::default();

		for seed in seeds {
			match self
				.issue_code(seed.code_a, seed.code_b, seed.role, seed.issued_by.as_deref(), now)
				.await
			{
				Ok(_) => report.created += 1,
				Err(Error::DuplicateCode) => report.skipped += 1,
				Err(e) => return Err(e),
			}
		}

		Ok(report)
	}

	/// Atomically consumes the pair on behalf of `username`.
	pub async fn redeem_code(
		&self,
		code_a: impl Into<String>,
		code_b: impl Into<String>,
		username: &Username,
		now: OffsetDateTime,
	) -> Result<Redemption> {
		let pair = CodePair::new(code_a, code_b)?;
		let result = match self.store.claim_code(&pair, username, now).await? {
			ClaimOutcome::Claimed(code) => Ok(Redemption { role: code.intended_role }),
			ClaimOutcome::AlreadyClaimed => Err(Error::CodeAlreadyUsed),
			ClaimOutcome::Missing => Err(Error::CodeNotFound),
		};

		if let Err(e) = &result {
			obs::log_failure(OperationKind::RedeemCode, username, now, e);
		}

		result
	}

	/// Undoes a redemption by `username`; a pair consumed by someone else stays consumed.
	pub async fn release_code(&self, pair: &CodePair, username: &Username) -> Result<bool> {
		Ok(self.store.release_code(pair, username).await?)
	}

	/// Unconsumed pairs, newest first, optionally narrowed by issuer and role.
	pub async fn list_available(
		&self,
		issued_by: Option<&str>,
		role: Option<Role>,
	) -> Result<Vec<AccountCode>> {
		let mut filter = CodeFilter::available();

		if let Some(issued_by) = issued_by {
			filter = filter.with_issued_by(issued_by);
		}
		if let Some(role) = role {
			filter = filter.with_role(role);
		}

		Ok(self.store.list_codes(&filter).await?)
	}

	/// Every pair, newest first.
	pub async fn list_all(&self) -> Result<Vec<AccountCode>> {
		Ok(self.store.list_codes(&CodeFilter::default()).await?)
	}

	/// Counts issued, available and redeemed pairs.
	pub async fn stats(&self) -> Result<CodeStats> {
		let codes = self.list_all().await?;
		let mut stats = CodeStats { total: codes.len(), ..Default::default() };

		for code in &codes {
			stats.by_role.bump(code.intended_role);

			if code.is_available() {
				stats.available += 1;
			} else {
				stats.active_by_role.bump(code.intended_role);
			}
		}

		Ok(stats)
	}
}
impl Debug for CodeRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CodeRegistry(..)")
	}
}
