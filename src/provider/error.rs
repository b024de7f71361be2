//! Provider failure payload shared by every remote operation.

// self
use crate::{_prelude::*, provider::ProviderOperation};

/// How a provider call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
	/// The provider answered with a non-zero `errcode`.
	Rejected,
	/// Network, TLS, or HTTP-level failure before a provider answer was read.
	Transport,
	/// The call exceeded its deadline.
	Timeout,
	/// The provider answered with a body that could not be decoded.
	Decode,
}
impl ProviderErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Rejected => "rejected",
			Self::Transport => "transport",
			Self::Timeout => "timeout",
			Self::Decode => "decode",
		}
	}
}

/// Failure of one remote provider call.
///
/// The value is `Clone` because a single failed token fetch is handed to every caller
/// waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Provider call `{operation}` {}: {message}.", outcome(.kind, .code))]
pub struct ProviderError {
	/// Operation that failed.
	pub operation: ProviderOperation,
	/// Failure class.
	pub kind: ProviderErrorKind,
	/// Provider `errcode`, verbatim, when the provider answered.
	pub code: Option<i64>,
	/// Provider `errmsg` verbatim, or a transport description.
	pub message: String,
}
impl ProviderError {
	/// Provider answered with a non-success code.
	pub fn rejected(operation: ProviderOperation, code: i64, message: impl Into<String>) -> Self {
		Self {
			operation,
			kind: ProviderErrorKind::Rejected,
			code: Some(code),
			message: message.into(),
		}
	}

	/// Transport failure before any provider answer.
	pub fn transport(operation: ProviderOperation, message: impl Into<String>) -> Self {
		Self { operation, kind: ProviderErrorKind::Transport, code: None, message: message.into() }
	}

	/// Call exceeded its deadline.
	pub fn timeout(operation: ProviderOperation, after: StdDuration) -> Self {
		Self {
			operation,
			kind: ProviderErrorKind::Timeout,
			code: None,
			message: format!("no answer within {} ms", after.as_millis()),
		}
	}

	/// Provider answer could not be decoded.
	pub fn decode(operation: ProviderOperation, message: impl Into<String>) -> Self {
		Self { operation, kind: ProviderErrorKind::Decode, code: None, message: message.into() }
	}
}

fn outcome(kind: &ProviderErrorKind, code: &Option<i64>) -> String {
	match code {
		Some(code) => format!("was rejected with errcode {code}"),
		None => format!("failed ({})", kind.as_str()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn display_keeps_provider_code_and_message_verbatim() {
		let err = ProviderError::rejected(ProviderOperation::FetchFullProfile, 40001, "invalid userid");

		assert_eq!(
			err.to_string(),
			"Provider call `user/get` was rejected with errcode 40001: invalid userid."
		);

		let err = ProviderError::transport(ProviderOperation::FetchAccessToken, "connection reset");

		assert_eq!(err.to_string(), "Provider call `gettoken` failed (transport): connection reset.");

		let err = ProviderError::timeout(ProviderOperation::FetchAccessToken, StdDuration::from_millis(20));

		assert_eq!(err.to_string(), "Provider call `gettoken` failed (timeout): no answer within 20 ms.");
	}
}
