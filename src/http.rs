//! DingTalk open API transport.
//!
//! Every response carries the `{errcode, errmsg}` envelope. [`decode_response`] turns a
//! non-zero `errcode` into a [`ProviderErrorKind::Rejected`](crate::provider::ProviderErrorKind)
//! error with the code and message verbatim, and reports malformed payloads with the JSON
//! path that failed. [`ReqwestProviderClient`] (feature `reqwest`) implements
//! [`ProviderClient`](crate::provider::ProviderClient) on top of it. Redirects are never
//! followed.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::AppSecret,
	config::LoginConfig,
	error::ConfigError,
	provider::{ProviderError, ProviderOperation},
};
#[cfg(feature = "reqwest")]
use crate::{
	auth::{AccessToken, AppKey, UnionId, UserId},
	config::TimeoutConfig,
	provider::{
		BasicIdentity, FullProfile, ProviderClient, ProviderFuture, TokenGrant, UnionIdentity,
		UserIdLookup,
	},
};

/// Base URL of the provider's open API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoints {
	base: Url,
}
impl ProviderEndpoints {
	/// Public DingTalk open API.
	pub const DINGTALK: &'static str = "https://oapi.dingtalk.com/";

	/// Wraps `base`, appending the trailing slash relative paths need.
	pub fn new(mut base: Url) -> Self {
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		Self { base }
	}

	/// Parses a base URL.
	pub fn parse(base: &str) -> Result<Self, ConfigError> {
		Ok(Self::new(Url::parse(base)?))
	}

	/// Uses `config.api_base_url`, falling back to the public API.
	pub fn from_config(config: &LoginConfig) -> Result<Self, ConfigError> {
		Self::parse(config.api_base_url.as_deref().unwrap_or(Self::DINGTALK))
	}

	/// Base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Absolute URL of `operation`.
	pub fn url(&self, operation: ProviderOperation) -> Result<Url, url::ParseError> {
		self.base.join(operation.path())
	}
}

#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	errcode: i64,
	#[serde(default)]
	errmsg: String,
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct TokenBody {
	#[serde(default)]
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct SnsBody {
	user_info: UnionIdentity,
}

/// Decodes a provider response body, honoring the `{errcode, errmsg}` envelope.
pub fn decode_response<T>(operation: ProviderOperation, body: &[u8]) -> Result<T, ProviderError>
where
	T: DeserializeOwned,
{
	let envelope: Envelope = serde_json::from_slice(body)
		.map_err(|e| ProviderError::decode(operation, e.to_string()))?;

	if envelope.errcode != 0 {
		return Err(ProviderError::rejected(operation, envelope.errcode, envelope.errmsg));
	}

	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|e| ProviderError::decode(operation, format!("{} at `{}`", e.inner(), e.path())))
}

/// Signs a scan-code exchange: base64 of HMAC-SHA256 over the millisecond timestamp,
/// keyed by the application secret.
pub fn sign_timestamp(
	app_secret: &AppSecret,
	timestamp_millis: i128,
) -> Result<String, ProviderError> {
	let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.expose().as_bytes()).map_err(|e| {
		ProviderError::transport(ProviderOperation::ExchangeTmpCodeForUnionIdentity, e.to_string())
	})?;

	mac.update(timestamp_millis.to_string().as_bytes());

	Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(feature = "reqwest")]
fn token_grant(body: TokenBody) -> Result<TokenGrant, ProviderError> {
	if body.access_token.trim().is_empty() {
		return Err(ProviderError::decode(
			ProviderOperation::FetchAccessToken,
			"response lacks `access_token`",
		));
	}

	let grant = TokenGrant::new(body.access_token);

	Ok(match body.expires_in {
		Some(secs) if secs > 0 => grant.with_expires_in(Duration::seconds(secs)),
		_ => grant,
	})
}

/// [`ProviderClient`] backed by reqwest.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestProviderClient {
	client: ReqwestClient,
	endpoints: ProviderEndpoints,
	timeout: StdDuration,
}
#[cfg(feature = "reqwest")]
impl ReqwestProviderClient {
	/// Client for the public API with the default call timeout.
	pub fn new() -> Result<Self, ConfigError> {
		Self::with_endpoints(
			ProviderEndpoints::parse(ProviderEndpoints::DINGTALK)?,
			TimeoutConfig::default().call(),
		)
	}

	/// Client for `config.api_base_url` bounded by `config.timeouts`.
	pub fn from_config(config: &LoginConfig) -> Result<Self, ConfigError> {
		Self::with_endpoints(ProviderEndpoints::from_config(config)?, config.timeouts.call())
	}

	/// Client for `endpoints` whose every request is bounded by `timeout`.
	pub fn with_endpoints(
		endpoints: ProviderEndpoints,
		timeout: StdDuration,
	) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self { client, endpoints, timeout })
	}

	/// Reuses a caller-provided client. Configure it to not follow redirects.
	///
	/// `timeout` bounds every request regardless of the client's own settings.
	pub fn with_client(
		client: ReqwestClient,
		endpoints: ProviderEndpoints,
		timeout: StdDuration,
	) -> Self {
		Self { client, endpoints, timeout }
	}

	/// Endpoints this client talks to.
	pub fn endpoints(&self) -> &ProviderEndpoints {
		&self.endpoints
	}

	async fn get<T>(
		&self,
		operation: ProviderOperation,
		query: &[(&str, &str)],
	) -> Result<T, ProviderError>
	where
		T: DeserializeOwned,
	{
		let url = self.url(operation)?;

		self.send(operation, self.client.get(url).query(query)).await
	}

	async fn send<T>(
		&self,
		operation: ProviderOperation,
		request: reqwest::RequestBuilder,
	) -> Result<T, ProviderError>
	where
		T: DeserializeOwned,
	{
		let response = request
			.timeout(self.timeout)
			.send()
			.await
			.map_err(|e| self.map_reqwest_error(operation, e))?;
		let status = response.status();
		let body = response.bytes().await.map_err(|e| self.map_reqwest_error(operation, e))?;

		match decode_response(operation, &body) {
			Err(e) if !status.is_success() && e.code.is_none() =>
				Err(ProviderError::transport(operation, format!("unexpected HTTP status {status}"))),
			result => result,
		}
	}

	fn url(&self, operation: ProviderOperation) -> Result<Url, ProviderError> {
		self.endpoints.url(operation).map_err(|e| ProviderError::transport(operation, e.to_string()))
	}

	fn map_reqwest_error(&self, operation: ProviderOperation, error: ReqwestError) -> ProviderError {
		if error.is_timeout() {
			ProviderError::timeout(operation, self.timeout)
		} else {
			ProviderError::transport(operation, error.to_string())
		}
	}
}
#[cfg(feature = "reqwest")]
impl ProviderClient for ReqwestProviderClient {
	fn fetch_access_token<'a>(
		&'a self,
		app_key: &'a AppKey,
		app_secret: &'a AppSecret,
	) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(async move {
			let body: TokenBody = self
				.get(
					ProviderOperation::FetchAccessToken,
					&[("appkey", app_key.as_str()), ("appsecret", app_secret.expose())],
				)
				.await?;

			token_grant(body)
		})
	}

	fn exchange_code_for_identity<'a>(
		&'a self,
		code: &'a str,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, BasicIdentity> {
		Box::pin(async move {
			self.get(
				ProviderOperation::ExchangeCodeForIdentity,
				&[("access_token", token.expose()), ("code", code)],
			)
			.await
		})
	}

	fn exchange_tmp_code_for_union_identity<'a>(
		&'a self,
		tmp_code: &'a str,
		app_key: &'a AppKey,
		app_secret: &'a AppSecret,
	) -> ProviderFuture<'a, UnionIdentity> {
		Box::pin(async move {
			const OP: ProviderOperation = ProviderOperation::ExchangeTmpCodeForUnionIdentity;

			let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
			let timestamp = millis.to_string();
			let signature = sign_timestamp(app_secret, millis)?;
			let url = self.url(OP)?;
			let request = self
				.client
				.post(url)
				.query(&[
					("accessKey", app_key.as_str()),
					("timestamp", timestamp.as_str()),
					("signature", signature.as_str()),
				])
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.body(serde_json::json!({ "tmp_auth_code": tmp_code }).to_string());
			let body: SnsBody = self.send(OP, request).await?;

			Ok(body.user_info)
		})
	}

	fn resolve_user_id_by_union_id<'a>(
		&'a self,
		union_id: &'a UnionId,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, UserIdLookup> {
		Box::pin(async move {
			self.get(
				ProviderOperation::ResolveUserIdByUnionId,
				&[("access_token", token.expose()), ("unionid", union_id.as_str())],
			)
			.await
		})
	}

	fn fetch_full_profile<'a>(
		&'a self,
		user_id: &'a UserId,
		token: &'a AccessToken,
	) -> ProviderFuture<'a, FullProfile> {
		Box::pin(async move {
			self.get(
				ProviderOperation::FetchFullProfile,
				&[("access_token", token.expose()), ("userid", user_id.as_str())],
			)
			.await
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::{BasicIdentity, ProviderErrorKind};

	#[test]
	fn nonzero_errcode_is_rejected_verbatim() {
		let err = decode_response::<BasicIdentity>(
			ProviderOperation::ExchangeCodeForIdentity,
			r#"{ "errcode": 40078, "errmsg": "不存在的临时授权码" }"#.as_bytes(),
		)
		.expect_err("Non-zero errcode must fail.");

		assert_eq!(err.kind, ProviderErrorKind::Rejected);
		assert_eq!(err.code, Some(40078));
		assert_eq!(err.message, "不存在的临时授权码");
	}

	#[test]
	fn malformed_payload_reports_the_json_path() {
		let err = decode_response::<BasicIdentity>(
			ProviderOperation::ExchangeCodeForIdentity,
			br#"{ "errcode": 0, "errmsg": "ok", "userid": 42 }"#,
		)
		.expect_err("Mistyped fields must fail.");

		assert_eq!(err.kind, ProviderErrorKind::Decode);
		assert!(err.message.contains("userid"), "Path should be reported: {}", err.message);

		let err =
			decode_response::<BasicIdentity>(ProviderOperation::ExchangeCodeForIdentity, b"<html>")
				.expect_err("Non-JSON bodies must fail.");

		assert_eq!(err.kind, ProviderErrorKind::Decode);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn token_bodies_require_a_token() {
		let body: TokenBody = decode_response(
			ProviderOperation::FetchAccessToken,
			br#"{ "errcode": 0, "errmsg": "ok", "access_token": "tok1", "expires_in": 7200 }"#,
		)
		.expect("Token fixture should decode.");
		let grant = token_grant(body).expect("Token should be accepted.");

		assert_eq!(grant.access_token.expose(), "tok1");
		assert_eq!(grant.expires_in, Some(Duration::hours(2)));

		let empty = TokenBody { access_token: " ".into(), expires_in: None };

		assert_eq!(
			token_grant(empty).expect_err("Blank tokens must fail.").kind,
			ProviderErrorKind::Decode
		);
	}

	#[test]
	fn signature_is_base64_hmac_sha256() {
		let a = sign_timestamp(&AppSecret::new("s4"), 1_546_084_445_901)
			.expect("Signing should succeed.");
		let b = sign_timestamp(&AppSecret::new("s4"), 1_546_084_445_901)
			.expect("Signing should succeed.");
		let c = sign_timestamp(&AppSecret::new("s4"), 1_546_084_445_902)
			.expect("Signing should succeed.");

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(a, "ejDB2LId+PhDPWo/JcirzfSlJ1KhtUcdIW41Ia9Up0M=");
	}

	#[test]
	fn endpoints_join_operation_paths() {
		let endpoints =
			ProviderEndpoints::parse("http://127.0.0.1:9000/proxy").expect("Base should parse.");

		assert_eq!(
			endpoints.url(ProviderOperation::FetchFullProfile).map(String::from).ok().as_deref(),
			Some("http://127.0.0.1:9000/proxy/user/get")
		);
		assert!(matches!(
			ProviderEndpoints::parse("not a url"),
			Err(ConfigError::InvalidEndpoint { .. })
		));
	}
}
