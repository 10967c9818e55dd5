//! Explicit configuration for the gatekeeper and its components.
//!
//! Nothing here reads the process environment. Build a [`GatekeeperConfig`] in code or load it
//! from JSON with [`GatekeeperConfig::from_json_str`] / [`GatekeeperConfig::from_path`]; durations
//! are expressed in whole seconds in that format.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::ConfigError,
	session::MIN_SECRET_LEN,
	throttle::ThrottlePolicy,
};

/// Default lifetime of interactive session tokens.
pub const DEFAULT_INTERACTIVE_TTL: Duration = Duration::hours(1);
/// Default lifetime of service session tokens.
pub const DEFAULT_SERVICE_TTL: Duration = Duration::days(7);
/// Longest lifetime accepted for either token kind.
pub const MAX_SESSION_TTL: Duration = Duration::days(366);
/// Default bound on one call to the external identity provider.
pub const DEFAULT_IDENTITY_TIMEOUT: Duration = Duration::seconds(5);
/// Google's public token introspection endpoint.
pub const GOOGLE_TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";
/// Issuers Google signs ID tokens with.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatekeeperConfig {
	/// Login throttle parameters.
	#[serde(default)]
	pub throttle: ThrottlePolicy,
	/// Session signing parameters.
	pub session: SessionConfig,
	/// External identity provider; `None` disables external login and linking.
	#[serde(default)]
	pub identity: Option<IdentityConfig>,
}
impl GatekeeperConfig {
	/// Default throttle, no external identity.
	pub fn new(session: SessionConfig) -> Self {
		Self { throttle: ThrottlePolicy::default(), session, identity: None }
	}

	/// Overrides the throttle policy.
	pub fn with_throttle(mut self, throttle: ThrottlePolicy) -> Self {
		self.throttle = throttle;

		self
	}

	/// Enables the external identity provider.
	pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
		self.identity = Some(identity);

		self
	}

	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self =
			serde_path_to_error::deserialize(de).map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses and validates a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path)?;

		Self::from_json_str(&raw)
	}

	/// Validates every section.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.throttle.validate()?;
		self.session.validate()?;

		if let Some(identity) = &self.identity {
			identity.validate()?;
		}

		Ok(())
	}
}

/// Session signing parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
	/// HMAC-SHA256 key; at least [`MIN_SECRET_LEN`] bytes.
	pub signing_secret: Secret,
	/// Lifetime of interactive tokens.
	#[serde(default = "default_interactive_ttl", with = "duration_secs")]
	pub interactive_ttl: Duration,
	/// Lifetime of service tokens.
	#[serde(default = "default_service_ttl", with = "duration_secs")]
	pub service_ttl: Duration,
}
impl SessionConfig {
	/// Default lifetimes with the given key.
	pub fn new(signing_secret: impl Into<Secret>) -> Self {
		Self {
			signing_secret: signing_secret.into(),
			interactive_ttl: DEFAULT_INTERACTIVE_TTL,
			service_ttl: DEFAULT_SERVICE_TTL,
		}
	}

	/// Overrides the interactive lifetime.
	pub fn with_interactive_ttl(mut self, ttl: Duration) -> Self {
		self.interactive_ttl = ttl;

		self
	}

	/// Overrides the service lifetime.
	pub fn with_service_ttl(mut self, ttl: Duration) -> Self {
		self.service_ttl = ttl;

		self
	}

	/// Checks key length and lifetimes.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.signing_secret.len() < MIN_SECRET_LEN {
			return Err(ConfigError::WeakSigningSecret { min: MIN_SECRET_LEN });
		}
		for (kind, ttl) in [("interactive", self.interactive_ttl), ("service", self.service_ttl)] {
			if !ttl.is_positive() {
				return Err(ConfigError::NonPositiveLifetime { kind });
			}
			if ttl > MAX_SESSION_TTL {
				return Err(ConfigError::LifetimeTooLong { kind, max: MAX_SESSION_TTL });
			}
		}

		Ok(())
	}
}

/// External identity provider parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
	/// Client identifier the assertion must be addressed to (`aud`).
	pub audience: String,
	/// Token introspection endpoint; `None` means [`GOOGLE_TOKENINFO_ENDPOINT`].
	#[serde(default)]
	pub endpoint: Option<Url>,
	/// Accepted `iss` values.
	#[serde(default = "default_issuers")]
	pub allowed_issuers: Vec<String>,
	/// Bound on a single provider call.
	#[serde(default = "default_identity_timeout", with = "duration_secs")]
	pub timeout: Duration,
}
impl IdentityConfig {
	/// Google defaults for the given client identifier.
	pub fn google(audience: impl Into<String>) -> Self {
		Self {
			audience: audience.into(),
			endpoint: None,
			allowed_issuers: default_issuers(),
			timeout: DEFAULT_IDENTITY_TIMEOUT,
		}
	}

	/// Points verification at another endpoint (tests, proxies).
	pub fn with_endpoint(mut self, endpoint: Url) -> Self {
		self.endpoint = Some(endpoint);

		self
	}

	/// Overrides the per-call timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Resolves the endpoint, falling back to Google's.
	pub fn endpoint(&self) -> Result<Url, ConfigError> {
		match &self.endpoint {
			Some(endpoint) => Ok(endpoint.clone()),
			None => Ok(Url::parse(GOOGLE_TOKENINFO_ENDPOINT)?),
		}
	}

	/// Checks that an audience is present and a timeout is set.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.audience.trim().is_empty() {
			return Err(ConfigError::MissingAudience);
		}
		if !self.timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(())
	}
}

fn default_interactive_ttl() -> Duration {
	DEFAULT_INTERACTIVE_TTL
}

fn default_service_ttl() -> Duration {
	DEFAULT_SERVICE_TTL
}

fn default_identity_timeout() -> Duration {
	DEFAULT_IDENTITY_TIMEOUT
}

fn default_issuers() -> Vec<String> {
	GOOGLE_ISSUERS.iter().map(|s| (*s).to_owned()).collect()
}

/// Serde adapter storing a [`Duration`] as whole seconds.
pub(crate) mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}
