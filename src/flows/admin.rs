//! Administrator operations: code issuance and reporting, account listing, blocking.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountCode, AccountId, AccountStatus, Role, Username},
	flows::{Gatekeeper, common},
	obs::OperationKind,
	registry::{CodeSeed, CodeStats, SeedReport},
	session::SessionToken,
	throttle,
};

/// Input for [`Gatekeeper::issue_code`].
#[derive(Clone, Serialize, Deserialize)]
pub struct IssueCodeRequest {
	/// First half of the pair.
	pub code_a: String,
	/// Second half of the pair.
	pub code_b: String,
	/// Role the pair grants.
	#[serde(default)]
	pub role: Role,
}
impl IssueCodeRequest {
	/// Bundles a pair and its role.
	pub fn new(code_a: impl Into<String>, code_b: impl Into<String>, role: Role) -> Self {
		Self { code_a: code_a.into(), code_b: code_b.into(), role }
	}
}
impl Debug for IssueCodeRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssueCodeRequest")
			.field("code_a", &"<redacted>")
			.field("code_b", &"<redacted>")
			.field("role", &self.role)
			.finish()
	}
}

/// Narrowing options for [`Gatekeeper::list_available_codes`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableCodesFilter {
	/// Only codes issued by this actor.
	pub issued_by: Option<String>,
	/// Only codes granting this role.
	pub role: Option<Role>,
}

/// Account row shown to administrators; carries no credential material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
	/// Account identifier.
	pub id: AccountId,
	/// Username.
	pub username: Username,
	/// Linked external email.
	pub external_identity_email: Option<String>,
	/// Role.
	pub role: Role,
	/// Stored status.
	pub status: AccountStatus,
	/// End of the current block.
	pub blocked_until: Option<OffsetDateTime>,
	/// Instant of the most recent accepted login.
	pub last_successful_login: Option<OffsetDateTime>,
}
impl From<&Account> for AccountSummary {
	fn from(account: &Account) -> Self {
		Self {
			id: account.id.clone(),
			username: account.username.clone(),
			external_identity_email: account.external_identity_email.clone(),
			role: account.role,
			status: account.status,
			blocked_until: account.blocked_until,
			last_successful_login: account.last_successful_login,
		}
	}
}

impl Gatekeeper {
	/// Issues one pair on behalf of the administrator holding `token`.
	pub async fn issue_code(
		&self,
		token: &SessionToken,
		request: IssueCodeRequest,
		now: OffsetDateTime,
	) -> Result<AccountCode> {
		common::observe(OperationKind::IssueCode, "issue_code", "-", now, async move {
			let admin = self.authorize_admin(token, now).await?;
			let issued_by = admin.account.username.as_str();

			self.registry
				.issue_code(request.code_a, request.code_b, request.role, Some(issued_by), now)
				.await
		})
		.await
	}

	/// Issues a batch of pairs, skipping those that already exist.
	///
	/// Meant for start-up provisioning, so it takes no token.
	pub async fn seed_codes(
		&self,
		seeds: impl IntoIterator<Item = CodeSeed>,
		now: OffsetDateTime,
	) -> Result<SeedReport> {
		common::observe(OperationKind::SeedCodes, "seed_codes", "-", now, async move {
			self.registry.seed_codes(seeds, now).await
		})
		.await
	}

	/// Every pair, newest first.
	pub async fn list_codes(
		&self,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<Vec<AccountCode>> {
		common::observe(OperationKind::AdminRead, "list_codes", "-", now, async move {
			self.authorize_admin(token, now).await?;
			self.registry.list_all().await
		})
		.await
	}

	/// Unconsumed pairs, newest first.
	pub async fn list_available_codes(
		&self,
		token: &SessionToken,
		filter: AvailableCodesFilter,
		now: OffsetDateTime,
	) -> Result<Vec<AccountCode>> {
		common::observe(OperationKind::AdminRead, "list_available_codes", "-", now, async move {
			self.authorize_admin(token, now).await?;
			self.registry.list_available(filter.issued_by.as_deref(), filter.role).await
		})
		.await
	}

	/// Issued, available and redeemed counts.
	pub async fn code_stats(&self, token: &SessionToken, now: OffsetDateTime) -> Result<CodeStats> {
		common::observe(OperationKind::AdminRead, "code_stats", "-", now, async move {
			self.authorize_admin(token, now).await?;
			self.registry.stats().await
		})
		.await
	}

	/// Every account, newest first.
	pub async fn list_accounts(
		&self,
		token: &SessionToken,
		now: OffsetDateTime,
	) -> Result<Vec<AccountSummary>> {
		common::observe(OperationKind::AdminRead, "list_accounts", "-", now, async move {
			self.authorize_admin(token, now).await?;

			Ok(self.credentials.list().await?.iter().map(AccountSummary::from).collect())
		})
		.await
	}

	/// Blocks (for `minutes`, default 30) or unblocks an account, resetting its attempt counter.
	pub async fn admin_set_blocked(
		&self,
		token: &SessionToken,
		account_id: &AccountId,
		blocked: bool,
		minutes: Option<i64>,
		now: OffsetDateTime,
	) -> Result<Account> {
		let stage = "admin_set_blocked";

		common::observe(OperationKind::SetBlocked, stage, account_id, now, async move {
			self.authorize_admin(token, now).await?;

			let duration = throttle::block_minutes(minutes)?;
			let (account, _) = self
				.credentials
				.update(account_id, |account| {
					self.throttle.set_blocked(account, blocked, duration, now)?;

					Ok(())
				})
				.await?;

			Ok(account)
		})
		.await
	}
}
