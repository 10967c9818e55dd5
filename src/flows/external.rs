//! Login with, and linking of, external identities.
//!
//! External login is link-only: an assertion that matches no stored link is refused with
//! [`Error::IdentityNotLinked`]; the account must be registered with codes and linked first.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::{Gatekeeper, LoginSuccess, Profile, common},
	identity::{ExternalIdentity, IdentityVerifier},
	obs::OperationKind,
	session::{SessionKind, SessionToken},
};

impl Gatekeeper {
	/// Signs in the account linked to the asserted identity, filling link fields it lacks.
	pub async fn external_login(
		&self,
		assertion: &str,
		now: OffsetDateTime,
	) -> Result<LoginSuccess> {
		common::observe(OperationKind::ExternalLogin, "external_login", "-", now, async move {
			let identity = self.verify_assertion(assertion, now).await?;
			let account = self
				.linker
				.resolve_local_account(&identity)
				.await?
				.ok_or(Error::IdentityNotLinked)?;

			if let Some(blocked_until) = account.active_block(now) {
				return Err(Error::AccountBlocked { blocked_until });
			}

			let account = self.linker.fill_missing(account, &identity).await?;
			let token = self.sessions.issue(&account, SessionKind::Interactive, now)?;

			Ok(LoginSuccess { token, account })
		})
		.await
	}

	/// Links the asserted identity to the account holding `token`.
	pub async fn link_identity(
		&self,
		token: &SessionToken,
		assertion: &str,
		now: OffsetDateTime,
	) -> Result<Profile> {
		common::observe(OperationKind::LinkIdentity, "link_identity", "-", now, async move {
			let context = self.authenticate(token, now).await?;
			let identity = self.verify_assertion(assertion, now).await?;
			let account = self.linker.link_to_account(&context.account.id, &identity).await?;

			Ok(Profile::from(&account))
		})
		.await
	}

	async fn verify_assertion(
		&self,
		assertion: &str,
		now: OffsetDateTime,
	) -> Result<ExternalIdentity> {
		common::require("assertion", assertion)?;

		let verifier = self.verifier.as_ref().ok_or(ConfigError::IdentityNotConfigured)?;

		IdentityVerifier::verify_external_assertion(verifier.as_ref(), assertion, now).await
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::{
			build_test_gatekeeper, build_test_gatekeeper_with, register_fixture, test_config,
		},
		auth::Role,
		config::IdentityConfig,
		identity::VerifyFuture,
	};

	/// Accepts `ok:<sub>:<email>` and rejects everything else.
	struct StubVerifier;
	impl IdentityVerifier for StubVerifier {
		fn verify_external_assertion<'a>(
			&'a self,
			assertion: &'a str,
			_now: OffsetDateTime,
		) -> VerifyFuture<'a> {
			Box::pin(async move {
				match assertion.split(':').collect::<Vec<_>>().as_slice() {
					["ok", sub, email] => Ok(ExternalIdentity::with_id(*sub)
						.email(*email, true)
						.display_name("Stub")),
					_ => Err(Error::AssertionInvalid { reason: "stub rejected".into() }),
				}
			})
		}
	}

	fn gatekeeper() -> Gatekeeper {
		build_test_gatekeeper_with(test_config(), Some(Arc::new(StubVerifier))).0
	}

	#[tokio::test]
	async fn unlinked_identities_cannot_sign_in() {
		let gatekeeper = gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);

		assert!(matches!(
			gatekeeper.external_login("ok:g-1:alice@example.com", now).await,
			Err(Error::IdentityNotLinked)
		));
		assert!(matches!(
			gatekeeper.external_login("forged", now).await,
			Err(Error::AssertionInvalid { .. })
		));
		assert!(
			gatekeeper.credentials().list().await.expect("Listing should run.").is_empty(),
			"External login must never create accounts."
		);
	}

	#[tokio::test]
	async fn linked_identities_sign_in() {
		let gatekeeper = gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);
		let account = register_fixture(&gatekeeper, "alice", "secret1", Role::User, now).await;
		let token =
			gatekeeper.login("alice", "secret1", now).await.expect("Login should succeed.").token;
		let profile = gatekeeper
			.link_identity(&token, "ok:g-1:alice@example.com", now)
			.await
			.expect("Linking should succeed.");

		assert_eq!(profile.external_identity_id.as_deref(), Some("g-1"));
		assert!(profile.external_identity_verified);

		let success = gatekeeper
			.external_login("ok:g-1:alice@example.com", now)
			.await
			.expect("Linked identity should sign in.");

		assert_eq!(success.account.id, account.id);
		assert!(gatekeeper.authenticate(&success.token, now).await.is_ok());
	}

	#[tokio::test]
	async fn missing_verifier_is_a_configuration_error() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);

		assert!(matches!(
			gatekeeper.external_login("ok:g-1:a@b.c", now).await,
			Err(Error::Config(ConfigError::IdentityNotConfigured))
		));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn identity_section_wires_a_verifier() {
		let config = test_config().with_identity(IdentityConfig::google("client-123"));

		let rendered = format!("{:?}", build_test_gatekeeper_with(config, None).0);

		assert!(rendered.contains("identity_verifier_set: true"));
	}
}
