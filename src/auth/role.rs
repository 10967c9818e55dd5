//! Account roles and lifecycle status.

// self
use crate::_prelude::*;

/// Role granted to an account; fixed at registration from the redeemed code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Operator allowed to issue codes and block accounts.
	Admin,
	/// Regular account.
	#[default]
	User,
}
impl Role {
	/// Every role, in a stable order.
	pub const ALL: [Role; 2] = [Role::Admin, Role::User];

	/// Returns a stable label suitable for claims, logs, and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::User => "user",
		}
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Role {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Role::Admin),
			"user" => Ok(Role::User),
			other => Err(UnknownRole(other.to_owned())),
		}
	}
}

/// Error returned when parsing an unrecognized role label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown role `{0}`.")]
pub struct UnknownRole(pub String);

/// Lifecycle status of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
	/// Account may log in.
	#[default]
	Active,
	/// Account is temporarily blocked; see `Account::blocked_until`.
	Blocked,
	/// Account is parked by an operator.
	Inactive,
}
impl AccountStatus {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AccountStatus::Active => "active",
			AccountStatus::Blocked => "blocked",
			AccountStatus::Inactive => "inactive",
		}
	}
}
impl Display for AccountStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
