//! End-to-end operations powered by the gatekeeper facade.

pub mod admin;
pub mod common;
pub mod external;
pub mod login;
pub mod profile;
pub mod register;

pub use admin::*;
pub use common::*;
pub use login::*;
pub use profile::*;
pub use register::*;

// self
use crate::{
	_prelude::*,
	auth::PasswordScheme,
	config::GatekeeperConfig,
	credentials::CredentialStore,
	identity::{IdentityLinker, IdentityVerifier},
	registry::CodeRegistry,
	session::SessionIssuer,
	store::{AccountStore, CodeStore},
	throttle::ThrottlePolicy,
};

/// Wires the code registry, credential store, throttle, session issuer and identity linking
/// together.
///
/// Each public method corresponds to one transport endpoint. Methods take the request instant
/// explicitly so callers (and tests) control time; production callers pass
/// `OffsetDateTime::now_utc()`.
#[derive(Clone)]
pub struct Gatekeeper {
	registry: CodeRegistry,
	credentials: CredentialStore,
	throttle: ThrottlePolicy,
	sessions: SessionIssuer,
	passwords: Arc<dyn PasswordScheme>,
	linker: IdentityLinker,
	verifier: Option<Arc<dyn IdentityVerifier>>,
	/// Shared counters for password login outcomes.
	pub login_metrics: Arc<LoginMetrics>,
	login_guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}
impl Gatekeeper {
	/// Validates `config` and builds the facade over the given stores.
	///
	/// With the `reqwest` feature and an `identity` section, a [`TokenInfoVerifier`] is set up
	/// automatically; otherwise external login stays disabled until
	/// [`Gatekeeper::with_identity_verifier`] is called.
	///
	/// [`TokenInfoVerifier`]: crate::identity::TokenInfoVerifier
	pub fn new(
		config: GatekeeperConfig,
		codes: Arc<dyn CodeStore>,
		accounts: Arc<dyn AccountStore>,
		passwords: Arc<dyn PasswordScheme>,
	) -> Result<Self> {
		config.validate()?;

		let credentials = CredentialStore::new(accounts);
		#[cfg(feature = "reqwest")]
		let verifier = match &config.identity {
			Some(identity) => Some(Arc::new(crate::identity::TokenInfoVerifier::new(identity)?)
				as Arc<dyn IdentityVerifier>),
			None => None,
		};
		#[cfg(not(feature = "reqwest"))]
		let verifier = None;

		Ok(Self {
			registry: CodeRegistry::new(codes),
			linker: IdentityLinker::new(credentials.clone()),
			credentials,
			throttle: config.throttle,
			sessions: SessionIssuer::new(&config.session)?,
			passwords,
			verifier,
			login_metrics: Default::default(),
			login_guards: Default::default(),
		})
	}

	/// Sets or replaces the external identity verifier.
	pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
		self.verifier = Some(verifier);

		self
	}

	/// Code registry backing registration.
	pub fn registry(&self) -> &CodeRegistry {
		&self.registry
	}

	/// Credential store backing every account operation.
	pub fn credentials(&self) -> &CredentialStore {
		&self.credentials
	}

	/// Session issuer minting login tokens.
	pub fn sessions(&self) -> &SessionIssuer {
		&self.sessions
	}

	/// Active throttle policy.
	pub fn throttle(&self) -> &ThrottlePolicy {
		&self.throttle
	}

	/// Identity linker used by external login and linking.
	pub fn linker(&self) -> &IdentityLinker {
		&self.linker
	}
}
impl Debug for Gatekeeper {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gatekeeper")
			.field("throttle", &self.throttle)
			.field("sessions", &self.sessions)
			.field("identity_verifier_set", &self.verifier.is_some())
			.finish()
	}
}
