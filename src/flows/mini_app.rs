//! Mini-program auth-code login.

// self
use crate::{
	_prelude::*,
	flows::{self, DeferredLogin, FlowResolver},
	obs::FlowKind,
	request::MiniAppLogin,
};

impl FlowResolver {
	/// Attaches an access token to the mini-program login.
	///
	/// No profile is fetched here; the principal repository resolves the auth code.
	pub async fn mini_app_login(&self, login: &MiniAppLogin) -> Result<DeferredLogin> {
		flows::observe(FlowKind::MiniAppLogin, "mini_app_login", async move {
			let app_secret = self.secret(&login.app_key)?;
			let access_token = self.cache.get_token(&login.app_key, app_secret).await?;

			Ok(DeferredLogin {
				app_key: login.app_key.clone(),
				auth_code: login.auth_code.clone(),
				access_token,
			})
		})
		.await
	}
}
