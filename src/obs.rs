//! Optional observability helpers for gatekeeper operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `code_gate.op` with the `op` (operation) and
//!   `stage` (call site) fields, plus failure events from [`log_failure`].
//! - Enable `metrics` to increment the `code_gate_operation_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the gatekeeper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Code-gated registration.
	Register,
	/// Password login.
	Login,
	/// Single code issuance.
	IssueCode,
	/// Batch code issuance.
	SeedCodes,
	/// Code redemption during registration.
	RedeemCode,
	/// Admin listings and statistics.
	AdminRead,
	/// Admin block or unblock.
	SetBlocked,
	/// Profile read or update.
	Profile,
	/// Login with an external identity assertion.
	ExternalLogin,
	/// Linking an external identity to a signed-in account.
	LinkIdentity,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Register => "register",
			OperationKind::Login => "login",
			OperationKind::IssueCode => "issue_code",
			OperationKind::SeedCodes => "seed_codes",
			OperationKind::RedeemCode => "redeem_code",
			OperationKind::AdminRead => "admin_read",
			OperationKind::SetBlocked => "set_blocked",
			OperationKind::Profile => "profile",
			OperationKind::ExternalLogin => "external_login",
			OperationKind::LinkIdentity => "link_identity",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a gatekeeper operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
