//! Optional observability helpers for login flows and the token cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `dingtalk_broker.flow` with the `flow` and
//!   `stage` fields, plus debug/warn events for cache removals and registry collisions.
//! - Enable `metrics` to increment `dingtalk_broker_flow_total` (labeled by `flow` + `outcome`)
//!   and `dingtalk_broker_token_cache_total` (labeled by `event`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Login flows driven by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
	/// Internal-app authorization code login.
	CodeLogin,
	/// Scan-code (temporary code) login.
	TmpCodeLogin,
	/// Mini-program auth-code login.
	MiniAppLogin,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::CodeLogin => "code_login",
			FlowKind::TmpCodeLogin => "tmp_code_login",
			FlowKind::MiniAppLogin => "mini_app_login",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token cache events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// A live token was served from the cache.
	Hit,
	/// No live token was cached for the key.
	Miss,
	/// A remote token fetch started.
	Load,
	/// A remote token fetch failed.
	LoadFailure,
	/// A live entry was evicted to respect the capacity bound.
	Eviction,
}
impl CacheEvent {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Miss => "miss",
			CacheEvent::Load => "load",
			CacheEvent::LoadFailure => "load_failure",
			CacheEvent::Eviction => "eviction",
		}
	}
}
