//! Strongly typed identifiers for accounts and usernames.
//!
//! Usernames are matched exactly and case-sensitively. Validation rejects malformed input
//! instead of rewriting it, so `"Alice"` and `"alice"` are two different accounts.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $max)?;

				Ok(Self(view.to_owned()))
			}

			/// Borrows the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $max)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Maximum username length in bytes.
pub const USERNAME_MAX_LEN: usize = 64;

const ACCOUNT_ID_MAX_LEN: usize = 64;
const ACCOUNT_ID_BYTES: usize = 12;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// Kind of identifier (account, username).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (account, username).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (account, username).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! { AccountId, "Opaque, store-assigned account identifier.", "Account", ACCOUNT_ID_MAX_LEN }
def_id! { Username, "Unique, case-sensitive account login name.", "Username", USERNAME_MAX_LEN }

impl AccountId {
	/// Generates a fresh random identifier (24 lowercase hex characters).
	pub fn generate() -> Self {
		let bytes: [u8; ACCOUNT_ID_BYTES] = rand::random();
		let mut buf = String::with_capacity(ACCOUNT_ID_BYTES * 2);

		for byte in bytes {
			buf.push_str(&format!("{byte:02x}"));
		}

		Self(buf)
	}
}

fn validate_view(kind: &'static str, view: &str, max: usize) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn usernames_are_validated_but_never_normalized() {
		assert!(Username::new(" alice").is_err(), "Leading whitespace must be rejected.");
		assert!(Username::new("alice ").is_err(), "Trailing whitespace must be rejected.");
		assert!(Username::new("").is_err());

		let upper = Username::new("Alice").expect("Mixed-case username should be valid.");
		let lower = Username::new("alice").expect("Lowercase username should be valid.");

		assert_eq!(upper.as_str(), "Alice");
		assert_ne!(upper, lower);
	}

	#[test]
	fn username_length_limit_is_enforced() {
		let exact = "a".repeat(USERNAME_MAX_LEN);

		Username::new(&exact).expect("Exact length should succeed.");

		assert_eq!(
			Username::new("a".repeat(USERNAME_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { kind: "Username", max: USERNAME_MAX_LEN })
		);
	}

	#[test]
	fn generated_account_ids_are_hex_and_distinct() {
		let first = AccountId::generate();
		let second = AccountId::generate();

		assert_eq!(first.len(), ACCOUNT_ID_BYTES * 2);
		assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
		assert_ne!(first, second);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let username: Username =
			serde_json::from_str("\"alice\"").expect("Username should deserialize successfully.");

		assert_eq!(username.as_ref(), "alice");
		assert!(serde_json::from_str::<Username>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<Username, u8> = HashMap::from_iter([(
			Username::new("alice").expect("Username used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("alice"), Some(&7));
	}
}
