//! Self-service profile reads and updates.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, AccountStatus, Role, Username},
	flows::{Gatekeeper, common},
	obs::OperationKind,
	session::SessionToken,
};

/// Account view returned to its owner; the password hash never leaves the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	/// Account identifier.
	pub id: AccountId,
	/// Username.
	pub username: Username,
	/// Role.
	pub role: Role,
	/// Stored status.
	pub status: AccountStatus,
	/// Display name.
	pub display_name: Option<String>,
	/// Linked external subject.
	pub external_identity_id: Option<String>,
	/// Linked external email.
	pub external_identity_email: Option<String>,
	/// Whether the provider vouched for the linked email.
	pub external_identity_verified: bool,
	/// Instant of the most recent accepted login.
	pub last_successful_login: Option<OffsetDateTime>,
	/// End of the current block.
	pub blocked_until: Option<OffsetDateTime>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl From<&Account> for Profile {
	fn from(account: &Account) -> Self {
		Self {
			id: account.id.clone(),
			username: account.username.clone(),
			role: account.role,
			status: account.status,
			display_name: account.display_name.clone(),
			external_identity_id: account.external_identity_id.clone(),
			external_identity_email: account.external_identity_email.clone(),
			external_identity_verified: account.external_identity_verified,
			last_successful_login: account.last_successful_login,
			blocked_until: account.blocked_until,
			created_at: account.created_at,
		}
	}
}

/// Fields an account owner may change; `None` (or an empty string) leaves a field as is.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
	/// New username.
	#[serde(default)]
	pub username: Option<String>,
	/// New plaintext password.
	#[serde(default)]
	pub password: Option<String>,
}
impl ProfileUpdate {
	/// Requests a rename.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Requests a password change.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());

		self
	}
}
impl Debug for ProfileUpdate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProfileUpdate")
			.field("username", &self.username)
			.field("password_set", &self.password.is_some())
			.finish()
	}
}

impl Gatekeeper {
	/// Profile of the account holding `token`.
	pub async fn profile(&self, token: &SessionToken, now: OffsetDateTime) -> Result<Profile> {
		common::observe(OperationKind::Profile, "profile", "-", now, async move {
			let context = self.authenticate(token, now).await?;

			Ok(Profile::from(&context.account))
		})
		.await
	}

	/// Renames the account and/or replaces its password.
	///
	/// Usernames stay unique ([`Error::UsernameTaken`]); passwords follow the registration rules.
	pub async fn update_profile(
		&self,
		token: &SessionToken,
		update: ProfileUpdate,
		now: OffsetDateTime,
	) -> Result<Profile> {
		common::observe(OperationKind::Profile, "update_profile", "-", now, async move {
			let context = self.authenticate(token, now).await?;
			let username = match update.username.as_deref().filter(|u| !u.is_empty()) {
				Some(raw) => Some(Username::new(raw)?),
				None => None,
			};
			let password_hash = match update.password.as_deref().filter(|p| !p.is_empty()) {
				Some(raw) => Some(self.passwords.hash(common::check_password(raw)?)?),
				None => None,
			};
			let (account, _) = self
				.credentials
				.update(&context.account.id, |account| {
					if let Some(username) = &username {
						account.username = username.clone();
					}
					if let Some(hash) = &password_hash {
						account.password_hash = hash.clone();
					}

					Ok(())
				})
				.await?;

			Ok(Profile::from(&account))
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
		_preludet::{build_test_gatekeeper, register_fixture},
		error::ValidationError,
	};

	#[tokio::test]
	async fn profile_reflects_the_live_record() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);
		let account = register_fixture(&gatekeeper, "alice", "secret1", Role::User, now).await;
		let token =
			gatekeeper.login("alice", "secret1", now).await.expect("Login should succeed.").token;
		let profile = gatekeeper.profile(&token, now).await.expect("Profile should load.");

		assert_eq!(profile.id, account.id);
		assert_eq!(profile.last_successful_login, Some(now));

		let rendered = serde_json::to_string(&profile).expect("Profile should serialize.");

		assert!(!rendered.contains("argon2"));
	}

	#[tokio::test]
	async fn rename_and_password_change_take_effect() {
		let (gatekeeper, _) = build_test_gatekeeper();
		let now = macros::datetime!(2025-01-01 12:00 UTC);

		register_fixture(&gatekeeper, "alice", "secret1", Role::User, now).await;
		register_fixture(&gatekeeper, "bob", "secret2", Role::User, now).await;

		let token =
			gatekeeper.login("alice", "secret1", now).await.expect("Login should succeed.").token;

		assert!(matches!(
			gatekeeper.update_profile(&token, ProfileUpdate::default().username("bob"), now).await,
			Err(Error::UsernameTaken { .. })
		));
		assert!(matches!(
			gatekeeper.update_profile(&token, ProfileUpdate::default().password("123"), now).await,
			Err(Error::Validation(ValidationError::PasswordTooShort { .. }))
		));

		let update = ProfileUpdate::default().username("alicia").password("newpass1");
		let profile = gatekeeper
			.update_profile(&token, update, now)
			.await
			.expect("Valid update should succeed.");

		assert_eq!(profile.username.as_str(), "alicia");
		assert!(matches!(
			gatekeeper.login("alice", "secret1", now).await,
			Err(Error::AccountNotFound)
		));
		assert!(matches!(
			gatekeeper.login("alicia", "secret1", now).await,
			Err(Error::InvalidCredentials { attempts_so_far: 1 })
		));
		gatekeeper.login("alicia", "newpass1", now).await.expect("New credentials should log in.");
	}
}
