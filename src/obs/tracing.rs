// self
use crate::{_prelude::*, obs::OperationKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by gatekeeper operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("code_gate.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Emits a failure event carrying the operation, subject, instant and error family.
///
/// Dependency failures log at `error`; blocks and conflicts at `warn`; everything else, being an
/// expected rejection, at `debug`.
pub fn log_failure(kind: OperationKind, subject: &str, now: OffsetDateTime, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		use crate::error::ErrorKind;

		let family = error.kind();

		match family {
			ErrorKind::Dependency => tracing::error!(
				op = kind.as_str(),
				subject,
				at = %now,
				kind = family.as_str(),
				error = %error,
				"Operation failed."
			),
			ErrorKind::Blocked | ErrorKind::Conflict => tracing::warn!(
				op = kind.as_str(),
				subject,
				at = %now,
				kind = family.as_str(),
				error = %error,
				"Operation rejected."
			),
			_ => tracing::debug!(
				op = kind.as_str(),
				subject,
				at = %now,
				kind = family.as_str(),
				error = %error,
				"Operation rejected."
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, subject, now, error);
	}
}
