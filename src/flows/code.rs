//! Internal-app authorization code login.

// self
use crate::{
	_prelude::*,
	auth::UserId,
	flows::{self, FlowResolver},
	obs::FlowKind,
	principal::{NormalizedPrincipal, PrincipalBuilder},
	provider::ProviderOperation,
	request::CodeLogin,
};

impl FlowResolver {
	/// Exchanges an internal-app code for the caller's identity, then fetches the full
	/// profile and maps it.
	///
	/// The identity exchange failing yields [`Error::InvalidCode`]; the profile fetch
	/// failing yields [`Error::ProfileFetchFailed`].
	pub async fn code_login(&self, login: &CodeLogin) -> Result<NormalizedPrincipal> {
		flows::observe(FlowKind::CodeLogin, "code_login", async move {
			let app_secret = self.secret(&login.app_key)?;
			let token = self.cache.get_token(&login.app_key, app_secret).await?;
			let identity = self
				.call(
					ProviderOperation::ExchangeCodeForIdentity,
					self.provider.exchange_code_for_identity(&login.code, &token),
				)
				.await
				.map_err(Error::InvalidCode)?;
			let user_id = flows::required(identity.user_id, "userid", |v| UserId::new(v))?;
			let profile = self
				.call(
					ProviderOperation::FetchFullProfile,
					self.provider.fetch_full_profile(&user_id, &token),
				)
				.await
				.map_err(Error::ProfileFetchFailed)?;

			Ok(PrincipalBuilder::new().with_user_id(user_id).with_profile(profile).build()?)
		})
		.await
	}
}
