//! Account code pairs and their consumption state.

// self
use crate::{
	_prelude::*,
	auth::{Role, Username},
};

/// Maximum length of either half of a code pair.
pub const CODE_MAX_LEN: usize = 128;

/// Error returned when a code pair is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum CodePairError {
	/// One half of the pair was empty.
	#[error("Account code `{part}` cannot be empty.")]
	Empty {
		/// Which half failed (`code_a` or `code_b`).
		part: &'static str,
	},
	/// One half of the pair exceeded [`CODE_MAX_LEN`].
	#[error("Account code `{part}` exceeds {max} characters.")]
	TooLong {
		/// Which half failed (`code_a` or `code_b`).
		part: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

/// Two-part shared secret; the pair as a whole is the lookup key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CodePair {
	/// First half.
	pub code_a: String,
	/// Second half.
	pub code_b: String,
}
impl CodePair {
	/// Validates and wraps both halves. Codes are compared verbatim.
	pub fn new(
		code_a: impl Into<String>,
		code_b: impl Into<String>,
	) -> Result<Self, CodePairError> {
		let code_a = code_a.into();
		let code_b = code_b.into();

		validate_part("code_a", &code_a)?;
		validate_part("code_b", &code_b)?;

		Ok(Self { code_a, code_b })
	}
}
impl Debug for CodePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// Either half alone is a credential fragment; keep logs to a short prefix.
		write!(f, "CodePair({}…/{}…)", prefix(&self.code_a), prefix(&self.code_b))
	}
}

/// An issued account code and its one-time consumption record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCode {
	/// The code pair.
	pub pair: CodePair,
	/// Role granted to the account that redeems the pair.
	pub intended_role: Role,
	/// Actor that issued the pair.
	pub issued_by: Option<String>,
	/// Username that redeemed the pair.
	pub consumed_by: Option<Username>,
	/// Instant the pair was redeemed.
	pub consumed_at: Option<OffsetDateTime>,
	/// Issue instant.
	pub created_at: OffsetDateTime,
}
impl AccountCode {
	/// Creates an unconsumed code.
	pub fn new(
		pair: CodePair,
		intended_role: Role,
		issued_by: Option<String>,
		now: OffsetDateTime,
	) -> Self {
		Self {
			pair,
			intended_role,
			issued_by,
			consumed_by: None,
			consumed_at: None,
			created_at: now,
		}
	}

	/// Returns `true` while nobody has redeemed the pair.
	pub fn is_available(&self) -> bool {
		self.consumed_by.is_none()
	}
}

fn validate_part(part: &'static str, value: &str) -> Result<(), CodePairError> {
	if value.is_empty() {
		return Err(CodePairError::Empty { part });
	}
	if value.len() > CODE_MAX_LEN {
		return Err(CodePairError::TooLong { part, max: CODE_MAX_LEN });
	}

	Ok(())
}

fn prefix(value: &str) -> &str {
	let end = value.char_indices().nth(3).map(|(idx, _)| idx).unwrap_or(value.len());

	&value[..end]
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn code_pairs_reject_empty_halves() {
		assert_eq!(CodePair::new("", "BBB222"), Err(CodePairError::Empty { part: "code_a" }));
		assert_eq!(CodePair::new("AAA111", ""), Err(CodePairError::Empty { part: "code_b" }));
		assert!(CodePair::new("AAA111", "x".repeat(CODE_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn debug_output_truncates_codes() {
		let pair = CodePair::new("AAA111", "BBB222").expect("Code pair fixture should be valid.");

		assert_eq!(format!("{pair:?}"), "CodePair(AAA…/BBB…)");
	}
}
