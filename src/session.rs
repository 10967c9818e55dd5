//! Session issuer: mints and verifies HMAC-signed bearer tokens.
//!
//! Claims are a snapshot taken at issue time. A verified token proves who the bearer was, not
//! what state the account is in now; callers that care about blocks or role changes re-resolve
//! the account (see `Gatekeeper::authenticate`).

mod codec;

pub use codec::CodecError;

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, Role, Secret, Username},
	config::SessionConfig,
	error::ConfigError,
};

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Token flavor; decides the lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
	/// Short-lived token minted by password or external login.
	#[default]
	Interactive,
	/// Long-lived token for automation.
	Service,
}
impl SessionKind {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionKind::Interactive => "interactive",
			SessionKind::Service => "service",
		}
	}
}
impl Display for SessionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Signed token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Account identifier.
	pub sub: AccountId,
	/// Username at issue time.
	pub username: Username,
	/// Role at issue time.
	pub role: Role,
	/// Token flavor.
	pub kind: SessionKind,
	/// Issue instant, Unix seconds.
	pub iat: i64,
	/// Expiry instant, Unix seconds; the token is invalid from this second on.
	pub exp: i64,
}
impl Claims {
	/// Expiry as an instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp).map_err(|_| Error::TokenInvalid)
	}
}

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Secret);
impl SessionToken {
	/// Wraps a presented bearer string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Secret::new(value))
	}

	/// Returns the encoded token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}
}
impl From<&str> for SessionToken {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for SessionToken {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for SessionToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SessionToken(<redacted>)")
	}
}

/// Mints and verifies session tokens with one signing key.
#[derive(Clone)]
pub struct SessionIssuer {
	key: Secret,
	interactive_ttl: Duration,
	service_ttl: Duration,
}
impl SessionIssuer {
	/// Builds an issuer after checking key strength and lifetimes.
	pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self {
			key: config.signing_secret.clone(),
			interactive_ttl: config.interactive_ttl,
			service_ttl: config.service_ttl,
		})
	}

	/// Lifetime applied to tokens of `kind`.
	pub fn ttl(&self, kind: SessionKind) -> Duration {
		match kind {
			SessionKind::Interactive => self.interactive_ttl,
			SessionKind::Service => self.service_ttl,
		}
	}

	/// Mints a token for `account`.
	pub fn issue(
		&self,
		account: &Account,
		kind: SessionKind,
		now: OffsetDateTime,
	) -> Result<SessionToken> {
		let iat = now.unix_timestamp();
		let claims = Claims {
			sub: account.id.clone(),
			username: account.username.clone(),
			role: account.role,
			kind,
			iat,
			exp: iat.checked_add(self.ttl(kind).whole_seconds()).ok_or_else(|| {
				Error::TokenSigning { message: "token expiry is out of range".into() }
			})?,
		};

		self.encode(&claims)
	}

	/// Signs arbitrary claims with the issuer key.
	pub fn encode(&self, claims: &Claims) -> Result<SessionToken> {
		codec::encode(self.key.expose().as_bytes(), claims)
			.map(SessionToken::new)
			.map_err(|e| Error::TokenSigning { message: e.to_string() })
	}

	/// Checks structure, signature and expiry, returning the signed claims.
	pub fn verify(&self, token: &SessionToken, now: OffsetDateTime) -> Result<Claims> {
		let claims: Claims = codec::decode(self.key.expose().as_bytes(), token.expose())
			.map_err(|_| Error::TokenInvalid)?;

		if now.unix_timestamp() >= claims.exp {
			return Err(Error::TokenExpired);
		}

		Ok(claims)
	}
}
impl Debug for SessionIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionIssuer")
			.field("key", &self.key)
			.field("interactive_ttl", &self.interactive_ttl)
			.field("service_ttl", &self.service_ttl)
			.finish()
	}
}
