//! Shared helpers for gatekeeper operations (input checks, guards, instrumentation).

// self
use crate::{
	_prelude::*,
	error::ValidationError,
	flows::Gatekeeper,
	obs::{self, OpSpan, OperationKind, Outcome},
};

/// Minimum password length in characters.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Rejects empty required fields.
pub(crate) fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
	if value.is_empty() {
		return Err(ValidationError::MissingField { field }.into());
	}

	Ok(value)
}

/// Rejects passwords shorter than [`PASSWORD_MIN_LEN`] characters.
pub(crate) fn check_password(password: &str) -> Result<&str> {
	require("password", password)?;

	if password.chars().count() < PASSWORD_MIN_LEN {
		return Err(ValidationError::PasswordTooShort { min: PASSWORD_MIN_LEN }.into());
	}

	Ok(password)
}

/// Returns (and creates on demand) the login guard for a username.
pub(crate) fn login_guard(gatekeeper: &Gatekeeper, username: &str) -> Arc<AsyncMutex<()>> {
	let mut guards = gatekeeper.login_guards.lock();

	guards.entry(username.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Runs `fut` inside an operation span, recording attempt/outcome and logging failures.
pub(crate) async fn observe<T, Fut>(
	kind: OperationKind,
	stage: &'static str,
	subject: &str,
	now: OffsetDateTime,
	fut: Fut,
) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	obs::record_outcome(kind, Outcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_outcome(kind, Outcome::Success),
		Err(e) => {
			obs::record_outcome(kind, Outcome::Failure);
			obs::log_failure(kind, subject, now, e);
		},
	}

	result
}
