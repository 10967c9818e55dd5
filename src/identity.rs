//! External identity linking: verify a third-party assertion, then bind it to an account that
//! already exists.
//!
//! Nothing in this module creates accounts. An assertion that matches no stored link is
//! reported as "not linked" and the caller is expected to register with account codes first.

#[cfg(feature = "reqwest")] pub mod tokeninfo;
#[cfg(feature = "reqwest")] pub use tokeninfo::TokenInfoVerifier;

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId},
	credentials::CredentialStore,
};

/// Boxed future returned by [`IdentityVerifier::verify_external_assertion`].
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Result<ExternalIdentity>> + 'a + Send>>;

/// Verified claims extracted from an external assertion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
	/// Provider subject identifier.
	pub id: Option<String>,
	/// Email asserted by the provider.
	pub email: Option<String>,
	/// Whether the provider vouches for the email.
	pub email_verified: bool,
	/// Display name asserted by the provider.
	pub display_name: Option<String>,
}
impl ExternalIdentity {
	/// Identity with a subject identifier only.
	pub fn with_id(id: impl Into<String>) -> Self {
		Self { id: Some(id.into()), ..Default::default() }
	}

	/// Adds a verified (or unverified) email.
	pub fn email(mut self, email: impl Into<String>, verified: bool) -> Self {
		self.email = Some(email.into());
		self.email_verified = verified;

		self
	}

	/// Adds a display name.
	pub fn display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Returns `true` when the identity carries something to match on.
	pub fn is_addressable(&self) -> bool {
		self.id.is_some() || self.email.is_some()
	}
}

/// Verifies an opaque external assertion.
///
/// Implementations map every verification failure (expiry, signature, audience, issuer) to
/// [`Error::AssertionInvalid`], and unreachable or failing providers to
/// [`Error::ServiceUnavailable`] or [`Error::Transport`]. A single failure is final; nothing
/// retries.
pub trait IdentityVerifier
where
	Self: Send + Sync,
{
	/// Verifies `assertion` as of `now`.
	fn verify_external_assertion<'a>(
		&'a self,
		assertion: &'a str,
		now: OffsetDateTime,
	) -> VerifyFuture<'a>;
}

/// Resolves and links external identities against the credential store.
#[derive(Clone, Debug)]
pub struct IdentityLinker {
	credentials: CredentialStore,
}
impl IdentityLinker {
	/// Wraps a credential store.
	pub fn new(credentials: CredentialStore) -> Self {
		Self { credentials }
	}

	/// Finds the account whose stored link matches the identity's subject, then its email.
	///
	/// Never creates an account.
	pub async fn resolve_local_account(
		&self,
		identity: &ExternalIdentity,
	) -> Result<Option<Account>> {
		self.credentials.find_by_external(identity.id.as_deref(), identity.email.as_deref()).await
	}

	/// Fills the account's empty link fields from `identity`; values already present are kept.
	///
	/// Fails with [`Error::IdentityAlreadyLinked`] if another account holds a subject or email
	/// that this call would write.
	pub async fn link_to_account(
		&self,
		account_id: &AccountId,
		identity: &ExternalIdentity,
	) -> Result<Account> {
		if !identity.is_addressable() {
			return Err(Error::AssertionInvalid { reason: "missing subject and email".into() });
		}

		let current =
			self.credentials.find_by_id(account_id).await?.ok_or(Error::AccountNotFound)?;

		self.ensure_unclaimed(&current, identity).await?;

		let (account, _) = self
			.credentials
			.update(account_id, |account| {
				fill_link_fields(account, identity);

				Ok(())
			})
			.await?;

		Ok(account)
	}

	/// Same as [`IdentityLinker::link_to_account`], but skips the write when nothing would
	/// change.
	pub async fn fill_missing(
		&self,
		account: Account,
		identity: &ExternalIdentity,
	) -> Result<Account> {
		let mut preview = account.clone();

		if !fill_link_fields(&mut preview, identity) {
			return Ok(account);
		}

		self.link_to_account(&account.id, identity).await
	}

	// Only fields the merge would fill are checked; held values never change.
	async fn ensure_unclaimed(&self, account: &Account, identity: &ExternalIdentity) -> Result<()> {
		let by_id = match identity.id.as_deref() {
			Some(id) if account.external_identity_id.is_none() =>
				self.credentials.find_by_external(Some(id), None).await?,
			_ => None,
		};
		let by_email = match identity.email.as_deref() {
			Some(email) if account.external_identity_email.is_none() =>
				self.credentials.find_by_external(None, Some(email)).await?,
			_ => None,
		};

		if by_id.into_iter().chain(by_email).any(|other| other.id != account.id) {
			return Err(Error::IdentityAlreadyLinked);
		}

		Ok(())
	}
}

/// First-write-wins merge; returns `true` if any field changed.
fn fill_link_fields(account: &mut Account, identity: &ExternalIdentity) -> bool {
	let mut changed = false;

	if account.external_identity_id.is_none() && identity.id.is_some() {
		account.external_identity_id = identity.id.clone();
		changed = true;
	}
	if account.external_identity_email.is_none() && identity.email.is_some() {
		account.external_identity_email = identity.email.clone();
		changed = true;
	}
	if !account.external_identity_verified && identity.email_verified {
		account.external_identity_verified = true;
		changed = true;
	}
	if account.display_name.is_none() && identity.display_name.is_some() {
		account.display_name = identity.display_name.clone();
		changed = true;
	}

	changed
}
