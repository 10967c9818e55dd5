//! Code-gated account provisioning: registration redeems one-time account code pairs, logins run
//! through a self-healing throttle, sessions ride HMAC-signed bearer tokens, and external
//! identities link to (but never create) local accounts.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod flows;
pub mod identity;
pub mod obs;
pub mod registry;
pub mod session;
pub mod store;
pub mod throttle;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// crates.io
	use argon2::Params;
	// self
	use crate::{
		auth::{Argon2Scheme, PasswordScheme, Role},
		config::{GatekeeperConfig, SessionConfig},
		flows::Gatekeeper,
		identity::IdentityVerifier,
		store::MemoryStore,
	};

	/// Signing secret shared by test fixtures; long enough to pass config validation.
	pub const TEST_SIGNING_SECRET: &str = "test-signing-secret-with-at-least-32-bytes";

	/// Argon2 scheme with the cheapest parameters the algorithm accepts so tests stay fast.
	pub fn fast_password_scheme() -> Argon2Scheme {
		let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
			.expect("Minimum Argon2 parameters should be accepted.");

		Argon2Scheme::with_params(params)
	}

	/// Configuration used by tests: default throttle policy and a fixed signing secret.
	pub fn test_config() -> GatekeeperConfig {
		GatekeeperConfig::new(SessionConfig::new(TEST_SIGNING_SECRET))
	}

	/// Constructs a [`Gatekeeper`] backed by one in-memory store and the fast password scheme.
	pub fn build_test_gatekeeper() -> (Gatekeeper, Arc<MemoryStore>) {
		build_test_gatekeeper_with(test_config(), None)
	}

	/// Same as [`build_test_gatekeeper`] with an explicit config and optional identity verifier.
	pub fn build_test_gatekeeper_with(
		config: GatekeeperConfig,
		verifier: Option<Arc<dyn IdentityVerifier>>,
	) -> (Gatekeeper, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let scheme: Arc<dyn PasswordScheme> = Arc::new(fast_password_scheme());
		let mut gatekeeper =
			Gatekeeper::new(config, store.clone(), store.clone(), scheme)
				.expect("Test configuration should be valid.");

		if let Some(verifier) = verifier {
			gatekeeper = gatekeeper.with_identity_verifier(verifier);
		}

		(gatekeeper, store)
	}

	/// Seeds one code pair and registers `username` with it.
	pub async fn register_fixture(
		gatekeeper: &Gatekeeper,
		username: &str,
		password: &str,
		role: Role,
		now: OffsetDateTime,
	) -> crate::auth::Account {
		let code_a = format!("{username}-a");
		let code_b = format!("{username}-b");

		gatekeeper
			.registry()
			.issue_code(&code_a, &code_b, role, Some("fixture"), now)
			.await
			.expect("Fixture code pair should be issued.");

		gatekeeper
			.register(
				crate::flows::RegistrationRequest::new(username, password, code_a, code_b),
				now,
			)
			.await
			.expect("Fixture registration should succeed.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use time;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
