//! Crate-level error types shared by the registry, credential store, throttle, sessions, and
//! identity linking.

// self
use crate::{
	_prelude::*,
	auth::{CodePairError, HashError, IdentifierError},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or malformed input, rejected before storage is touched.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure while talking to the external identity provider.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Password hashing backend failure.
	#[error(transparent)]
	Hashing(#[from] HashError),

	/// No account matches the username or identifier.
	#[error("Account not found.")]
	AccountNotFound,
	/// No issued code matches the presented pair.
	#[error("Account code pair not found.")]
	CodeNotFound,
	/// Username is already registered.
	#[error("Username `{username}` is already taken.")]
	UsernameTaken {
		/// Conflicting username.
		username: String,
	},
	/// Code pair was already issued.
	#[error("Account code pair already exists.")]
	DuplicateCode,
	/// Code pair was already redeemed.
	#[error("Account code pair has already been used.")]
	CodeAlreadyUsed,
	/// External identity is bound to a different account.
	#[error("External identity is already linked to another account.")]
	IdentityAlreadyLinked,
	/// Another writer updated the record between read and write.
	#[error("Account was modified concurrently; retry the operation.")]
	ConcurrentUpdate,

	/// Wrong password for an existing account.
	#[error("Invalid credentials ({attempts_so_far} failed attempt(s) in the current window).")]
	InvalidCredentials {
		/// Failed attempts counted so far, including this one.
		attempts_so_far: u32,
	},
	/// Session token is malformed or carries a bad signature.
	#[error("Session token is invalid.")]
	TokenInvalid,
	/// Session token is past its expiry.
	#[error("Session token has expired.")]
	TokenExpired,
	/// External identity assertion failed verification.
	#[error("External identity assertion is invalid: {reason}.")]
	AssertionInvalid {
		/// Verifier-supplied reason string.
		reason: String,
	},
	/// External identity is valid but no local account is linked to it.
	#[error("External identity is not linked to any account; register first.")]
	IdentityNotLinked,

	/// Account is blocked until the carried instant.
	#[error("Account is blocked until {blocked_until}.")]
	AccountBlocked {
		/// End of the block; callers derive retry hints from it.
		blocked_until: OffsetDateTime,
	},
	/// Caller lacks the role or status the operation requires.
	#[error("Forbidden: {reason}.")]
	Forbidden {
		/// Reason string.
		reason: String,
	},
	/// External identity provider could not be reached in time.
	#[error("External identity provider is unavailable.")]
	ServiceUnavailable,
	/// Session token could not be encoded or signed.
	#[error("Session token could not be signed: {message}.")]
	TokenSigning {
		/// Encoder-supplied detail.
		message: String,
	},
}
impl Error {
	/// Classifies the error for transport adapters.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Validation(_) => ErrorKind::Validation,
			Error::AccountNotFound | Error::CodeNotFound => ErrorKind::NotFound,
			Error::UsernameTaken { .. }
			| Error::DuplicateCode
			| Error::CodeAlreadyUsed
			| Error::IdentityAlreadyLinked
			| Error::ConcurrentUpdate => ErrorKind::Conflict,
			Error::InvalidCredentials { .. }
			| Error::TokenInvalid
			| Error::TokenExpired
			| Error::AssertionInvalid { .. }
			| Error::IdentityNotLinked => ErrorKind::Auth,
			Error::AccountBlocked { .. } => ErrorKind::Blocked,
			Error::Forbidden { .. } => ErrorKind::Forbidden,
			Error::Storage(_)
			| Error::Config(_)
			| Error::Transport(_)
			| Error::Hashing(_)
			| Error::ServiceUnavailable
			| Error::TokenSigning { .. } => ErrorKind::Dependency,
		}
	}

	/// HTTP status a transport adapter should answer with.
	pub fn http_status(&self) -> u16 {
		match self {
			Error::ServiceUnavailable | Error::Transport(_) => 503,
			_ => self.kind().http_status(),
		}
	}

	/// Message safe to hand back to callers; dependency failures are reduced to a generic line.
	pub fn public_message(&self) -> String {
		match self.kind() {
			ErrorKind::Dependency => "Internal server error.".into(),
			_ => self.to_string(),
		}
	}
}

/// Coarse error families used for status mapping and log levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Missing or malformed input.
	Validation,
	/// Unknown username, account, or code.
	NotFound,
	/// Duplicate username, consumed code, or lost compare-and-set race.
	Conflict,
	/// Bad credentials, bad or expired tokens, invalid external assertions.
	Auth,
	/// Account is blocked.
	Blocked,
	/// Authenticated but not permitted.
	Forbidden,
	/// Storage, hashing, configuration, or external provider failure.
	Dependency,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Validation => "validation",
			ErrorKind::NotFound => "not_found",
			ErrorKind::Conflict => "conflict",
			ErrorKind::Auth => "auth",
			ErrorKind::Blocked => "blocked",
			ErrorKind::Forbidden => "forbidden",
			ErrorKind::Dependency => "dependency",
		}
	}

	/// Default HTTP status for the family.
	pub const fn http_status(self) -> u16 {
		match self {
			ErrorKind::Validation => 400,
			ErrorKind::Auth => 401,
			ErrorKind::Blocked | ErrorKind::Forbidden => 403,
			ErrorKind::NotFound => 404,
			ErrorKind::Conflict => 409,
			ErrorKind::Dependency => 500,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Input validation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// A required field was absent or empty.
	#[error("Field `{field}` is required.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// Username or account identifier is malformed.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
	/// Code pair is malformed.
	#[error(transparent)]
	CodePair(#[from] CodePairError),
	/// Password is shorter than the minimum length.
	#[error("Password must be at least {min} characters long.")]
	PasswordTooShort {
		/// Minimum length in characters.
		min: usize,
	},
	/// Administrative block duration is not positive.
	#[error("Block duration must be a positive number of minutes.")]
	InvalidBlockDuration,
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		ValidationError::from(e).into()
	}
}
impl From<CodePairError> for Error {
	fn from(e: CodePairError) -> Self {
		ValidationError::from(e).into()
	}
}

/// Configuration failures raised while building components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Session signing secret is too short to be safe for HMAC-SHA256.
	#[error("Session signing secret must be at least {min} bytes.")]
	WeakSigningSecret {
		/// Minimum length in bytes.
		min: usize,
	},
	/// A token lifetime is zero or negative.
	#[error("Session lifetime for `{kind}` tokens must be positive.")]
	NonPositiveLifetime {
		/// Session kind label.
		kind: &'static str,
	},
	/// A token lifetime exceeds the accepted maximum.
	#[error("Session lifetime for `{kind}` tokens must not exceed {max}.")]
	LifetimeTooLong {
		/// Session kind label.
		kind: &'static str,
		/// Largest accepted lifetime.
		max: Duration,
	},
	/// Throttle threshold must allow at least one attempt.
	#[error("Throttle attempt threshold must be at least 1.")]
	ZeroAttemptThreshold,
	/// Throttle block duration is zero or negative.
	#[error("Throttle block duration must be positive.")]
	NonPositiveBlockDuration,
	/// Throttle block duration exceeds the accepted maximum.
	#[error("Throttle block duration must not exceed {max}.")]
	BlockDurationTooLong {
		/// Largest accepted block.
		max: Duration,
	},
	/// Identity provider audience is empty.
	#[error("External identity audience cannot be empty.")]
	MissingAudience,
	/// Identity provider timeout is zero or negative.
	#[error("External identity timeout must be positive.")]
	NonPositiveTimeout,
	/// Identity provider endpoint is not a valid URL.
	#[error("External identity endpoint is not a valid URL.")]
	InvalidEndpoint(#[from] url::ParseError),
	/// External identity verification was requested but never configured.
	#[error("External identity verification is not configured.")]
	IdentityNotConfigured,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration could not be parsed.")]
	Parse {
		/// Structured parsing failure pointing at the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Configuration file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO) while calling the identity provider.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call did not complete within the configured timeout.
	#[error("Identity provider did not answer in time.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
