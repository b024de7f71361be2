//! Abstract remote-call surface of the identity provider.
//!
//! [`ProviderClient`] names the five remote operations the login flows depend on.
//! Implementations own the wire format (see [`crate::http`] for the reqwest-backed
//! one) and report failures as [`ProviderError`], carrying the provider's own error
//! code and message verbatim. Flows only ever distinguish success from failure.

pub mod error;
pub mod model;

pub use error::*;
pub use model::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AppKey, AppSecret, UnionId, UserId},
};

/// Boxed future returned by every [`ProviderClient`] operation.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Remote operations offered by the provider.
///
/// Implementations should bound their own I/O, but callers in this crate also wrap
/// every call in a deadline, so a hung call always resolves to
/// [`ProviderErrorKind::Timeout`].
pub trait ProviderClient
where
	Self: Send + Sync,
{
	/// Mints an access token for the application credential pair.
	fn fetch_access_token<'a>(
		&'a self,
		app_key: &'a AppKey,
		app_secret: &'a AppSecret,
	) -> ProviderFuture<'a, TokenGrant>;

	/// Exchanges an internal-app authorization code for the caller's basic identity.
	fn exchange_code_for_identity<'a>(
		&'a self,
		code: &'a str,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, BasicIdentity>;

	/// Exchanges a one-time scan code for the caller's union identity.
	///
	/// This operation signs with the raw application credentials instead of a cached
	/// access token.
	fn exchange_tmp_code_for_union_identity<'a>(
		&'a self,
		tmp_code: &'a str,
		app_key: &'a AppKey,
		app_secret: &'a AppSecret,
	) -> ProviderFuture<'a, UnionIdentity>;

	/// Resolves the organization user id that belongs to a union id.
	fn resolve_user_id_by_union_id<'a>(
		&'a self,
		union_id: &'a UnionId,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, UserIdLookup>;

	/// Fetches the full user profile (contact data, departments, roles, flags).
	fn fetch_full_profile<'a>(
		&'a self,
		user_id: &'a UserId,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, FullProfile>;
}

/// Remote operations, used to label errors, spans, and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOperation {
	/// `gettoken`.
	FetchAccessToken,
	/// `user/getuserinfo`.
	ExchangeCodeForIdentity,
	/// `sns/getuserinfo_bycode`.
	ExchangeTmpCodeForUnionIdentity,
	/// `user/getUseridByUnionid`.
	ResolveUserIdByUnionId,
	/// `user/get`.
	FetchFullProfile,
}
impl ProviderOperation {
	/// Returns the provider API path (relative to the API base URL).
	pub const fn path(self) -> &'static str {
		match self {
			Self::FetchAccessToken => "gettoken",
			Self::ExchangeCodeForIdentity => "user/getuserinfo",
			Self::ExchangeTmpCodeForUnionIdentity => "sns/getuserinfo_bycode",
			Self::ResolveUserIdByUnionId => "user/getUseridByUnionid",
			Self::FetchFullProfile => "user/get",
		}
	}
}
impl Display for ProviderOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.path())
	}
}

/// Runs a provider call under `deadline`, mapping expiry onto a timeout error.
pub(crate) async fn with_deadline<T, F>(
	operation: ProviderOperation,
	deadline: StdDuration,
	call: F,
) -> Result<T, ProviderError>
where
	F: Future<Output = Result<T, ProviderError>>,
{
	match tokio::time::timeout(deadline, call).await {
		Ok(result) => result,
		Err(_) => Err(ProviderError::timeout(operation, deadline)),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn deadline_maps_to_timeout() {
		let err = with_deadline(
			ProviderOperation::FetchFullProfile,
			StdDuration::from_millis(10),
			async {
				tokio::time::sleep(StdDuration::from_secs(5)).await;

				Ok::<_, ProviderError>(())
			},
		)
		.await
		.expect_err("Slow calls must hit the deadline.");

		assert_eq!(err.kind, ProviderErrorKind::Timeout);
		assert_eq!(err.operation, ProviderOperation::FetchFullProfile);
	}

	#[tokio::test]
	async fn deadline_passes_results_through() {
		let value = with_deadline(
			ProviderOperation::FetchAccessToken,
			StdDuration::from_secs(1),
			async { Ok::<_, ProviderError>(7) },
		)
		.await
		.expect("Fast calls should succeed.");

		assert_eq!(value, 7);
	}

	#[test]
	fn operations_label_with_api_paths() {
		assert_eq!(ProviderOperation::ResolveUserIdByUnionId.to_string(), "user/getUseridByUnionid");
		assert_eq!(ProviderOperation::FetchAccessToken.path(), "gettoken");
	}
}
