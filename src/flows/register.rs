//! Code-gated registration.
//!
//! Order matters: the username pre-check runs first so an obviously taken name never burns a
//! code, the code is then claimed atomically, and only afterwards is the password hashed and the
//! account written. If the write loses a username race, the claim is released so the pair can
//! be used again. A failed release is logged; the caller still sees the creation error.

// self
use crate::{
	_prelude::*,
	auth::{Account, CodePair, Username},
	flows::{Gatekeeper, common},
	obs::{self, OperationKind},
};

/// Registration input.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
	/// Desired username.
	pub username: String,
	/// Plaintext password.
	pub password: String,
	/// First half of the account code pair.
	pub code_a: String,
	/// Second half of the account code pair.
	pub code_b: String,
}
impl RegistrationRequest {
	/// Bundles the four required fields.
	pub fn new(
		username: impl Into<String>,
		password: impl Into<String>,
		code_a: impl Into<String>,
		code_b: impl Into<String>,
	) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
			code_a: code_a.into(),
			code_b: code_b.into(),
		}
	}
}
impl Debug for RegistrationRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistrationRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("code_a", &"<redacted>")
			.field("code_b", &"<redacted>")
			.finish()
	}
}

impl Gatekeeper {
	/// Creates an account by redeeming an unused code pair; the pair decides the role.
	pub async fn register(
		&self,
		request: RegistrationRequest,
		now: OffsetDateTime,
	) -> Result<Account> {
		let subject = request.username.clone();

		common::observe(OperationKind::Register, "register", &subject, now, async move {
			let username = common::require("username", &request.username)?;

			common::check_password(&request.password)?;
			common::require("code_a", &request.code_a)?;
			common::require("code_b", &request.code_b)?;

			let username = Username::new(username)?;
			let pair = CodePair::new(request.code_a.as_str(), request.code_b.as_str())?;

			if self.credentials.find_by_username(&username).await?.is_some() {
				return Err(Error::UsernameTaken { username: username.into() });
			}

			let redemption =
				self.registry.redeem_code(&pair.code_a, &pair.code_b, &username, now).await?;
			let created = match self.passwords.hash(&request.password) {
				Ok(hash) => {
					let role = redemption.role;

					self.credentials.create_account(username.clone(), hash, role, now).await
				},
				Err(e) => Err(e.into()),
			};

			if created.is_err() {
				let released = self.registry.release_code(&pair, &username).await;

				if let Err(e) = released {
					obs::log_failure(OperationKind::RedeemCode, username.as_str(), now, &e);
				}
			}

			created
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::{build_test_gatekeeper, test_config},
		auth::{AccountCode, AccountStatus, HashError, PasswordScheme, Role},
		error::ValidationError,
		store::{
			ClaimOutcome, CodeFilter, CodeStore, InsertOutcome, MemoryStore, StoreError,
			StoreFuture,
		},
	};

	struct BrokenHasher;
	impl PasswordScheme for BrokenHasher {
		fn hash(&self, _plaintext: &str) -> Result<String, HashError> {
			Err(HashError::Hash { message: "hasher offline".into() })
		}

		fn verify(&self, _plaintext: &str, _hash: &str) -> Result<bool, HashError> {
			Ok(false)
		}
	}

	/// Delegates to a memory store but refuses every release.
	struct UnreleasableCodes(Arc<MemoryStore>);
	impl CodeStore for UnreleasableCodes {
		fn insert_code(&self, code: AccountCode) -> StoreFuture<'_, InsertOutcome> {
			self.0.insert_code(code)
		}

		fn claim_code<'a>(
			&'a self,
			pair: &'a CodePair,
			username: &'a Username,
			instant: OffsetDateTime,
		) -> StoreFuture<'a, ClaimOutcome> {
			self.0.claim_code(pair, username, instant)
		}

		fn release_code<'a>(
			&'a self,
			_pair: &'a CodePair,
			_username: &'a Username,
		) -> StoreFuture<'a, bool> {
			Box::pin(async { Err(StoreError::Backend { message: "release refused".into() }) })
		}

		fn list_codes<'a>(&'a self, filter: &'a CodeFilter) -> StoreFuture<'a, Vec<AccountCode>> {
			self.0.list_codes(filter)
		}
	}

	fn broken_gatekeeper(codes: Arc<dyn CodeStore>, store: Arc<MemoryStore>) -> Gatekeeper {
		Gatekeeper::new(test_config(), codes, store, Arc::new(BrokenHasher))
			.expect("Test configuration should be valid.")
	}

	#[tokio::test]
	async fn registration_takes_role_from_code() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		gatekeeper
			.registry()
			.issue_code("AAA111", "BBB222", Role::Admin, Some("root"), now)
			.await
			.expect("Issuing a fresh pair should succeed.");

		let account = gatekeeper
			.register(RegistrationRequest::new("root2", "secret1", "AAA111", "BBB222"), now)
			.await
			.expect("Registration with a fresh pair should succeed.");

		assert_eq!(account.role, Role::Admin);
		assert_eq!(account.status, AccountStatus::Active);
		assert_ne!(account.password_hash, "secret1");
	}

	#[tokio::test]
	async fn missing_fields_and_short_passwords_are_rejected_first() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(matches!(
			gatekeeper.register(RegistrationRequest::new("", "secret1", "a", "b"), now).await,
			Err(Error::Validation(ValidationError::MissingField { field: "username" }))
		));
		assert!(matches!(
			gatekeeper.register(RegistrationRequest::new("alice", "123", "a", "b"), now).await,
			Err(Error::Validation(ValidationError::PasswordTooShort { .. }))
		));
		assert!(matches!(
			gatekeeper.register(RegistrationRequest::new("alice", "secret1", "a", ""), now).await,
			Err(Error::Validation(ValidationError::MissingField { field: "code_b" }))
		));
		assert!(matches!(
			gatekeeper.register(RegistrationRequest::new("al ice", "secret1", "a", "b"), now).await,
			Err(Error::Validation(ValidationError::Identifier(_)))
		));
	}

	#[tokio::test]
	async fn taken_username_does_not_burn_the_code() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let registry = gatekeeper.registry();

		registry
			.issue_code("a1", "b1", Role::User, None, now)
			.await
			.expect("Issuing a fresh pair should succeed.");
		registry
			.issue_code("a2", "b2", Role::User, None, now)
			.await
			.expect("Issuing a fresh pair should succeed.");
		gatekeeper
			.register(RegistrationRequest::new("alice", "secret1", "a1", "b1"), now)
			.await
			.expect("First registration should succeed.");

		assert!(matches!(
			gatekeeper
				.register(RegistrationRequest::new("alice", "secret1", "a2", "b2"), now)
				.await,
			Err(Error::UsernameTaken { .. })
		));

		let available = registry.list_available(None, None).await.expect("Listing should run.");

		assert_eq!(available.len(), 1);
		assert_eq!(available[0].pair.code_a, "a2");
	}

	#[tokio::test]
	async fn failed_creation_returns_the_code() {
		let store = Arc::new(MemoryStore::default());
		let gatekeeper = broken_gatekeeper(store.clone(), store);
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		gatekeeper
			.registry()
			.issue_code("a1", "b1", Role::User, None, now)
			.await
			.expect("Issuing a fresh pair should succeed.");

		let request = RegistrationRequest::new("alice", "secret1", "a1", "b1");

		assert!(matches!(gatekeeper.register(request, now).await, Err(Error::Hashing(_))));

		let available =
			gatekeeper.registry().list_available(None, None).await.expect("Listing should run.");

		assert_eq!(available.len(), 1);
	}

	#[tokio::test]
	async fn failed_release_keeps_the_creation_error() {
		let store = Arc::new(MemoryStore::default());
		let codes = Arc::new(UnreleasableCodes(store.clone()));
		let gatekeeper = broken_gatekeeper(codes, store);
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		gatekeeper
			.registry()
			.issue_code("a1", "b1", Role::User, None, now)
			.await
			.expect("Issuing a fresh pair should succeed.");

		let request = RegistrationRequest::new("alice", "secret1", "a1", "b1");

		assert!(matches!(gatekeeper.register(request, now).await, Err(Error::Hashing(_))));
		assert!(gatekeeper.credentials().list().await.expect("Listing should run.").is_empty());
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let request = RegistrationRequest::new("alice", "hunter22", "AAA111", "BBB222");
		let rendered = format!("{request:?}");

		assert!(rendered.contains("alice"));
		assert!(!rendered.contains("hunter22"));
		assert!(!rendered.contains("AAA111"));
	}
}
