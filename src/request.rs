//! Inbound login requests.
//!
//! [`LoginForm`] is the loose shape an HTTP layer parses from a form or JSON body;
//! [`LoginRequest`] is the validated sum type the coordinator dispatches on. When a
//! form carries several codes, `code` wins over `loginTmpCode`, which wins over
//! `authCode`.

// self
use crate::{_prelude::*, auth::AppKey, obs::FlowKind};

/// Loosely typed login input as received from the HTTP layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginForm {
	/// Application key.
	pub key: Option<String>,
	/// Internal-app authorization code.
	pub code: Option<String>,
	/// One-time scan code.
	pub login_tmp_code: Option<String>,
	/// Mini-program auth code.
	pub auth_code: Option<String>,
	/// Existing local session token to bind, if any.
	pub token: Option<String>,
	/// Opaque origin metadata, passed through untouched.
	pub host: Option<String>,
}
impl LoginForm {
	/// Starts a form for the provided application key.
	pub fn new(key: impl Into<String>) -> Self {
		Self { key: Some(key.into()), ..Default::default() }
	}

	/// Sets the internal-app authorization code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(code.into());

		self
	}

	/// Sets the one-time scan code.
	pub fn with_login_tmp_code(mut self, code: impl Into<String>) -> Self {
		self.login_tmp_code = Some(code.into());

		self
	}

	/// Sets the mini-program auth code.
	pub fn with_auth_code(mut self, code: impl Into<String>) -> Self {
		self.auth_code = Some(code.into());

		self
	}

	/// Sets the binding session token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Sets the origin metadata.
	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = Some(host.into());

		self
	}
}

/// Internal-app free login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLogin {
	/// Application key.
	pub app_key: AppKey,
	/// Authorization code.
	pub code: String,
	/// Origin metadata.
	pub host: Option<String>,
}

/// Scan-code login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TmpCodeLogin {
	/// Application key.
	pub app_key: AppKey,
	/// One-time scan code.
	pub tmp_code: String,
	/// Binding session token.
	pub token: Option<String>,
	/// Origin metadata.
	pub host: Option<String>,
}

/// Mini-program auth-code login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiniAppLogin {
	/// Application key.
	pub app_key: AppKey,
	/// Mini-program auth code.
	pub auth_code: String,
	/// Binding session token.
	pub token: Option<String>,
	/// Origin metadata.
	pub host: Option<String>,
}

/// Validated login request, one variant per flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginRequest {
	/// Internal-app authorization code.
	Code(CodeLogin),
	/// One-time scan code.
	TmpCode(TmpCodeLogin),
	/// Mini-program auth code.
	MiniApp(MiniAppLogin),
}
impl LoginRequest {
	/// Flow that serves this request.
	pub fn kind(&self) -> FlowKind {
		match self {
			Self::Code(_) => FlowKind::CodeLogin,
			Self::TmpCode(_) => FlowKind::TmpCodeLogin,
			Self::MiniApp(_) => FlowKind::MiniAppLogin,
		}
	}

	/// Application key the request was issued for.
	pub fn app_key(&self) -> &AppKey {
		match self {
			Self::Code(login) => &login.app_key,
			Self::TmpCode(login) => &login.app_key,
			Self::MiniApp(login) => &login.app_key,
		}
	}

	/// Origin metadata.
	pub fn host(&self) -> Option<&str> {
		match self {
			Self::Code(login) => login.host.as_deref(),
			Self::TmpCode(login) => login.host.as_deref(),
			Self::MiniApp(login) => login.host.as_deref(),
		}
	}
}
impl TryFrom<LoginForm> for LoginRequest {
	type Error = Error;

	fn try_from(form: LoginForm) -> Result<Self> {
		let LoginForm { key, code, login_tmp_code, auth_code, token, host } = form;
		let key = present(key).ok_or_else(|| Error::missing_field("key"))?;
		let app_key = AppKey::new(key).map_err(|e| Error::invalid_field("key", e))?;

		if let Some(code) = present(code) {
			return Ok(Self::Code(CodeLogin { app_key, code, host }));
		}
		if let Some(tmp_code) = present(login_tmp_code) {
			return Ok(Self::TmpCode(TmpCodeLogin { app_key, tmp_code, token, host }));
		}
		if let Some(auth_code) = present(auth_code) {
			return Ok(Self::MiniApp(MiniAppLogin { app_key, auth_code, token, host }));
		}

		Err(Error::RequestValidation {
			field: "code",
			reason: "one of `code`, `loginTmpCode`, or `authCode` is required".into(),
		})
	}
}
impl From<LoginRequest> for LoginForm {
	fn from(request: LoginRequest) -> Self {
		match request {
			LoginRequest::Code(CodeLogin { app_key, code, host }) =>
				Self { key: Some(app_key.into()), code: Some(code), host, ..Default::default() },
			LoginRequest::TmpCode(TmpCodeLogin { app_key, tmp_code, token, host }) => Self {
				key: Some(app_key.into()),
				login_tmp_code: Some(tmp_code),
				token,
				host,
				..Default::default()
			},
			LoginRequest::MiniApp(MiniAppLogin { app_key, auth_code, token, host }) => Self {
				key: Some(app_key.into()),
				auth_code: Some(auth_code),
				token,
				host,
				..Default::default()
			},
		}
	}
}

fn present(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn permanent_code_takes_precedence() {
		let form = LoginForm::new("app1").with_login_tmp_code("tmp").with_code("abc123");
		let request = LoginRequest::try_from(form).expect("Form should validate.");

		assert_eq!(request.kind(), FlowKind::CodeLogin);
		assert!(matches!(request, LoginRequest::Code(CodeLogin { ref code, .. }) if code == "abc123"));

		let form = LoginForm::new("app1").with_auth_code("ma").with_login_tmp_code("tmp");

		assert_eq!(
			LoginRequest::try_from(form).expect("Form should validate.").kind(),
			FlowKind::TmpCodeLogin
		);
	}

	#[test]
	fn blank_codes_do_not_select_a_flow() {
		let form = LoginForm::new("app1").with_code("  ").with_auth_code("ma").with_token("sess");
		let request = LoginRequest::try_from(form).expect("Form should validate.");

		assert!(matches!(
			request,
			LoginRequest::MiniApp(MiniAppLogin { ref auth_code, token: Some(ref token), .. })
				if auth_code == "ma" && token == "sess"
		));
	}

	#[test]
	fn missing_key_or_code_is_a_validation_error() {
		let no_key = LoginForm { code: Some("abc".into()), ..Default::default() };

		assert!(matches!(
			LoginRequest::try_from(no_key),
			Err(Error::RequestValidation { field: "key", .. })
		));
		assert!(matches!(
			LoginRequest::try_from(LoginForm::new("app 1").with_code("abc")),
			Err(Error::RequestValidation { field: "key", .. })
		));
		assert!(matches!(
			LoginRequest::try_from(LoginForm::new("app1")),
			Err(Error::RequestValidation { field: "code", .. })
		));
	}

	#[test]
	fn binds_camel_case_fields_and_keeps_host() {
		let form: LoginForm =
			serde_json::from_str(r#"{ "key": "app1", "loginTmpCode": "tmp", "host": "10.0.0.7" }"#)
				.expect("Form fixture should deserialize.");
		let request = LoginRequest::try_from(form.clone()).expect("Form should validate.");

		assert_eq!(request.host(), Some("10.0.0.7"));
		assert_eq!(request.app_key().as_str(), "app1");
		assert_eq!(LoginForm::from(request), form);
	}
}
