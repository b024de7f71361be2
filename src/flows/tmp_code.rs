//! Scan-code (temporary code) login.

// self
use crate::{
	_prelude::*,
	auth::{UnionId, UserId},
	flows::{self, FlowResolver},
	obs::FlowKind,
	principal::{NormalizedPrincipal, PrincipalBuilder},
	provider::ProviderOperation,
	request::TmpCodeLogin,
};

impl FlowResolver {
	/// Exchanges a one-time scan code for a union identity, resolves it to an
	/// organization user, then fetches and maps the full profile.
	///
	/// The scan-code exchange signs with the raw application credentials; the other two
	/// calls use the cached access token.
	pub async fn tmp_code_login(&self, login: &TmpCodeLogin) -> Result<NormalizedPrincipal> {
		flows::observe(FlowKind::TmpCodeLogin, "tmp_code_login", async move {
			let app_secret = self.secret(&login.app_key)?;
			let token = self.cache.get_token(&login.app_key, app_secret).await?;
			let union = self
				.call(
					ProviderOperation::ExchangeTmpCodeForUnionIdentity,
					self.provider.exchange_tmp_code_for_union_identity(
						&login.tmp_code,
						&login.app_key,
						app_secret,
					),
				)
				.await
				.map_err(Error::InvalidCode)?;
			let union_id = flows::required(union.union_id.clone(), "unionid", |v| UnionId::new(v))?;
			let lookup = self
				.call(
					ProviderOperation::ResolveUserIdByUnionId,
					self.provider.resolve_user_id_by_union_id(&union_id, &token),
				)
				.await
				.map_err(Error::IdentityResolutionFailed)?;
			let user_id = flows::required(lookup.user_id, "userid", |v| UserId::new(v))?;
			let profile = self
				.call(
					ProviderOperation::FetchFullProfile,
					self.provider.fetch_full_profile(&user_id, &token),
				)
				.await
				.map_err(Error::ProfileFetchFailed)?;

			Ok(PrincipalBuilder::new()
				.with_user_id(user_id)
				.with_union_identity(union)
				.with_profile(profile)
				.build()?)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		provider::{ProviderError, UnionIdentity, UserIdLookup},
	};

	fn login() -> TmpCodeLogin {
		TmpCodeLogin { app_key: app_key("scan"), tmp_code: "tmp-1".into(), token: None, host: None }
	}

	#[tokio::test]
	async fn combines_union_identity_and_profile() {
		let provider = Arc::new(ScriptedProvider::default());
		let resolver = resolver(&provider, &[("scan", "s4")]);
		let principal = resolver.tmp_code_login(&login()).await.expect("Scan login should succeed.");

		assert_eq!(principal.user_id.as_str(), "u1");
		assert_eq!(principal.union_id.as_deref(), Some("union-1"));
		assert_eq!(principal.open_id.as_deref(), Some("open-1"));
		assert_eq!(principal.display_name.as_deref(), Some("Alice"));
		// The scan-code exchange uses raw credentials, never the cached token.
		assert_eq!(
			provider.seen(ProviderOperation::ExchangeTmpCodeForUnionIdentity),
			vec!["tmp-1:scan:s4"]
		);
		assert_eq!(provider.seen(ProviderOperation::ResolveUserIdByUnionId), vec!["union-1:tok1"]);
	}

	#[tokio::test]
	async fn failed_exchange_short_circuits() {
		let provider = Arc::new(ScriptedProvider::default().with_union_identity(Err(
			ProviderError::rejected(
				ProviderOperation::ExchangeTmpCodeForUnionIdentity,
				40078,
				"tmp code expired",
			),
		)));
		let resolver = resolver(&provider, &[("scan", "s4")]);
		let err = resolver.tmp_code_login(&login()).await.expect_err("Rejected codes must fail.");

		assert!(matches!(err, Error::InvalidCode(_)));
		assert_eq!(provider.calls(ProviderOperation::ResolveUserIdByUnionId), 0);
		assert_eq!(provider.calls(ProviderOperation::FetchFullProfile), 0);
	}

	#[tokio::test]
	async fn unresolvable_union_id_is_classified() {
		let provider = Arc::new(ScriptedProvider::default().with_user_id_lookup(Err(
			ProviderError::rejected(ProviderOperation::ResolveUserIdByUnionId, 60121, "user not found"),
		)));
		let resolver = resolver(&provider, &[("scan", "s4")]);
		let err = resolver.tmp_code_login(&login()).await.expect_err("Lookup failures must fail.");

		assert!(matches!(err, Error::IdentityResolutionFailed(ref e) if e.code == Some(60121)));
		assert_eq!(provider.calls(ProviderOperation::FetchFullProfile), 0);
	}

	#[tokio::test]
	async fn missing_ids_are_mapping_errors() {
		let provider = Arc::new(
			ScriptedProvider::default().with_union_identity(Ok(UnionIdentity::default())),
		);
		let scan = resolver(&provider, &[("scan", "s4")]);
		let err = scan.tmp_code_login(&login()).await.expect_err("Missing union ids must fail.");

		assert!(matches!(
			err,
			Error::Mapping(crate::principal::MappingError::MissingField { field: "unionid" })
		));
		assert_eq!(provider.calls(ProviderOperation::ResolveUserIdByUnionId), 0);

		let provider = Arc::new(
			ScriptedProvider::default().with_user_id_lookup(Ok(UserIdLookup::default())),
		);
		let scan = resolver(&provider, &[("scan", "s4")]);
		let err = scan.tmp_code_login(&login()).await.expect_err("Missing user ids must fail.");

		assert!(matches!(
			err,
			Error::Mapping(crate::principal::MappingError::MissingField { field: "userid" })
		));
		assert_eq!(provider.calls(ProviderOperation::FetchFullProfile), 0);
	}
}
