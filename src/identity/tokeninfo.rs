//! Verifier backed by a Google-style `tokeninfo` endpoint.
//!
//! The endpoint is called once per assertion with `?id_token=<assertion>`. A `4xx` answer means
//! the provider rejected the token; a `5xx` answer, a network error, or a timeout means the
//! provider is unavailable. Successful answers are still checked locally for audience, issuer
//! and expiry.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::IdentityConfig,
	error::{ConfigError, TransportError},
	identity::{ExternalIdentity, IdentityVerifier, VerifyFuture},
};

/// Fields of a tokeninfo answer; Google renders numbers and booleans as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
	aud: String,
	iss: String,
	exp: Value,
	#[serde(default)]
	sub: Option<String>,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	email_verified: Option<Value>,
	#[serde(default)]
	name: Option<String>,
}

/// [`IdentityVerifier`] calling a tokeninfo endpoint over reqwest.
#[derive(Clone)]
pub struct TokenInfoVerifier {
	client: ReqwestClient,
	endpoint: Url,
	audience: String,
	allowed_issuers: Vec<String>,
}
impl TokenInfoVerifier {
	/// Builds a verifier with its own client bounded by the configured timeout.
	pub fn new(config: &IdentityConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		let client = ReqwestClient::builder().timeout(config.timeout.unsigned_abs()).build()?;

		Self::with_client(config, client)
	}

	/// Reuses a caller-provided client; its timeout settings apply as is.
	pub fn with_client(
		config: &IdentityConfig,
		client: ReqwestClient,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self {
			client,
			endpoint: config.endpoint()?,
			audience: config.audience.clone(),
			allowed_issuers: config.allowed_issuers.clone(),
		})
	}

	async fn fetch(&self, assertion: &str) -> Result<TokenInfo> {
		let response = self
			.client
			.get(self.endpoint.clone())
			.query(&[("id_token", assertion)])
			.send()
			.await
			.map_err(TransportError::from)?;
		let status = response.status();

		if status.is_server_error() {
			return Err(Error::ServiceUnavailable);
		}
		if !status.is_success() {
			return Err(invalid(format!("provider answered {}", status.as_u16())));
		}

		let body = response.bytes().await.map_err(TransportError::from)?;
		let de = &mut serde_json::Deserializer::from_slice(&body);

		serde_path_to_error::deserialize(de)
			.map_err(|e| invalid(format!("unexpected tokeninfo field `{}`", e.path())))
	}

	fn check(&self, info: TokenInfo, now: OffsetDateTime) -> Result<ExternalIdentity> {
		if info.aud != self.audience {
			return Err(invalid("audience mismatch"));
		}
		if !self.allowed_issuers.iter().any(|iss| iss == &info.iss) {
			return Err(invalid("issuer mismatch"));
		}

		let exp = as_i64(&info.exp).ok_or_else(|| invalid("unreadable expiry"))?;

		if now.unix_timestamp() >= exp {
			return Err(invalid("expired"));
		}

		let identity = ExternalIdentity {
			id: info.sub.filter(|s| !s.is_empty()),
			email: info.email.filter(|s| !s.is_empty()),
			email_verified: info.email_verified.as_ref().is_some_and(as_bool),
			display_name: info.name.filter(|s| !s.is_empty()),
		};

		if !identity.is_addressable() {
			return Err(invalid("missing subject and email"));
		}

		Ok(identity)
	}
}
impl IdentityVerifier for TokenInfoVerifier {
	fn verify_external_assertion<'a>(
		&'a self,
		assertion: &'a str,
		now: OffsetDateTime,
	) -> VerifyFuture<'a> {
		Box::pin(async move {
			if assertion.trim().is_empty() {
				return Err(invalid("empty assertion"));
			}

			let info = self.fetch(assertion).await?;

			self.check(info, now)
		})
	}
}
impl Debug for TokenInfoVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenInfoVerifier")
			.field("endpoint", &self.endpoint.as_str())
			.field("audience", &self.audience)
			.field("allowed_issuers", &self.allowed_issuers)
			.finish()
	}
}

fn invalid(reason: impl Into<String>) -> Error {
	Error::AssertionInvalid { reason: reason.into() }
}

fn as_i64(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::String(s) => s.parse().ok(),
		_ => None,
	}
}

fn as_bool(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::String(s) => s == "true",
		_ => false,
	}
}
