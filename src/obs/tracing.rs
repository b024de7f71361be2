// self
use crate::{
	_prelude::*,
	auth::AppKey,
	cache::RemovalCause,
	obs::FlowKind,
	provider::ProviderError,
	registry::AppCategory,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by login flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("dingtalk_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

/// Logs a registration that lost to an earlier category.
pub(crate) fn registry_key_shadowed(app_key: &AppKey, kept: AppCategory, ignored: AppCategory) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		app_key = app_key.as_str(),
		kept = kept.as_str(),
		ignored = ignored.as_str(),
		"application key registered twice; keeping the first registration"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (app_key, kept, ignored);
	}
}

/// Logs a token cache removal. Evictions of live entries log at warn level.
pub(crate) fn cache_removal(app_key: &AppKey, cause: RemovalCause) {
	#[cfg(feature = "tracing")]
	match cause {
		RemovalCause::Evicted => tracing::warn!(
			app_key = app_key.as_str(),
			cause = cause.as_str(),
			"live access token evicted from the cache"
		),
		_ => tracing::debug!(
			app_key = app_key.as_str(),
			cause = cause.as_str(),
			"access token removed from the cache"
		),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (app_key, cause);
	}
}

/// Logs a failed remote call with the provider's verbatim code and message.
pub(crate) fn provider_call_failed(error: &ProviderError) {
	#[cfg(feature = "tracing")]
	tracing::error!(
		operation = error.operation.path(),
		kind = error.kind.as_str(),
		code = error.code,
		message = error.message.as_str(),
		"provider call failed"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Logs the classified outcome of a failed authentication attempt.
pub(crate) fn authentication_failed(kind: Option<FlowKind>, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::info!(
		flow = kind.map(FlowKind::as_str),
		error = %error,
		"authentication attempt failed"
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}
