//! One-way adaptive password hashing.

// crates.io
use argon2::{
	Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
	password_hash::{Error as PhcError, SaltString},
};
// self
use crate::_prelude::*;

const SALT_BYTES: usize = 16;

/// Failures raised by a [`PasswordScheme`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum HashError {
	/// The hasher could not produce a hash.
	#[error("Password hashing failed: {message}.")]
	Hash {
		/// Backend-supplied detail.
		message: String,
	},
	/// A stored hash could not be parsed.
	#[error("Stored password hash is malformed: {message}.")]
	MalformedHash {
		/// Backend-supplied detail.
		message: String,
	},
}

/// Hash + verify contract used by registration, login, and profile updates.
pub trait PasswordScheme
where
	Self: Send + Sync,
{
	/// Produces a self-describing hash (salt and parameters embedded) for `plaintext`.
	fn hash(&self, plaintext: &str) -> Result<String, HashError>;

	/// Returns `Ok(false)` on mismatch; `Err` only when `hash` cannot be interpreted.
	fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError>;
}

/// Argon2id scheme emitting PHC strings.
///
/// Hashing and verification are synchronous and CPU-bound; they run on the calling task.
/// Runtimes that cannot afford that should wrap the scheme and dispatch to a blocking pool.
#[derive(Clone, Debug, Default)]
pub struct Argon2Scheme {
	params: Params,
}
impl Argon2Scheme {
	/// Uses explicit cost parameters instead of the crate defaults.
	pub fn with_params(params: Params) -> Self {
		Self { params }
	}

	fn hasher(&self) -> Argon2<'static> {
		Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
	}
}
impl PasswordScheme for Argon2Scheme {
	fn hash(&self, plaintext: &str) -> Result<String, HashError> {
		let salt_bytes: [u8; SALT_BYTES] = rand::random();
		let salt = SaltString::encode_b64(&salt_bytes)
			.map_err(|e| HashError::Hash { message: e.to_string() })?;
		let hash = self
			.hasher()
			.hash_password(plaintext.as_bytes(), &salt)
			.map_err(|e| HashError::Hash { message: e.to_string() })?;

		Ok(hash.to_string())
	}

	fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError> {
		let parsed = PasswordHash::new(hash)
			.map_err(|e| HashError::MalformedHash { message: e.to_string() })?;

		match self.hasher().verify_password(plaintext.as_bytes(), &parsed) {
			Ok(()) => Ok(true),
			Err(PhcError::Password) => Ok(false),
			Err(e) => Err(HashError::Hash { message: e.to_string() }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::fast_password_scheme;

	#[test]
	fn hash_and_verify_round_trip() {
		let scheme = fast_password_scheme();
		let hash = scheme.hash("correct horse").expect("Hashing should succeed.");

		assert!(hash.starts_with("$argon2id$"));
		assert!(scheme.verify("correct horse", &hash).expect("Verification should run."));
		assert!(!scheme.verify("wrong horse", &hash).expect("Verification should run."));
	}

	#[test]
	fn hashes_are_salted() {
		let scheme = fast_password_scheme();
		let first = scheme.hash("same").expect("Hashing should succeed.");
		let second = scheme.hash("same").expect("Hashing should succeed.");

		assert_ne!(first, second);
	}

	#[test]
	fn malformed_hash_is_an_error_not_a_mismatch() {
		let scheme = fast_password_scheme();

		assert!(matches!(
			scheme.verify("anything", "not-a-phc-string"),
			Err(HashError::MalformedHash { .. })
		));
	}
}
