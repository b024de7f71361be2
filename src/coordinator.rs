//! Authentication coordinator: the single entry point of a login attempt.
//!
//! [`AuthenticationCoordinator::authenticate`] validates the inbound form, resolves the
//! flow, hands the result to the [`PrincipalRepository`], and notifies every
//! [`AuthenticationListener`] exactly once, in registration order, before returning.
//! Failures are returned unchanged after the listeners have observed them.

// self
use crate::{
	_prelude::*,
	auth::AppKey,
	config::LoginConfig,
	error::ConfigError,
	flows::{FlowResolver, Resolution},
	obs::{self, FlowKind},
	principal::NormalizedPrincipal,
	provider::ProviderClient,
	request::{LoginForm, LoginRequest},
};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by [`PrincipalRepository`] lookups.
pub type RepositoryFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AuthenticationInfo, RepositoryError>> + 'a + Send>>;

/// Failure reported by the principal repository.
#[derive(Debug, ThisError)]
pub enum RepositoryError {
	/// The repository refused the subject (unknown, locked, or unbound user).
	#[error("Principal `{principal}` was rejected: {reason}.")]
	Rejected {
		/// Identifier of the rejected subject.
		principal: String,
		/// Repository-provided reason.
		reason: String,
	},
	/// The repository itself failed.
	#[error("Principal repository is unavailable.")]
	Unavailable {
		/// Underlying backend failure.
		#[source]
		source: BoxError,
	},
}
impl RepositoryError {
	/// Builds a rejection for `principal`.
	pub fn rejected(principal: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Rejected { principal: principal.into(), reason: reason.into() }
	}

	/// Wraps a backend failure.
	pub fn unavailable(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Unavailable { source: Box::new(src) }
	}
}

/// Everything the repository needs to produce [`AuthenticationInfo`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationSubject {
	/// Flow that produced the subject.
	pub realm: FlowKind,
	/// Application the login was issued for.
	pub app_key: AppKey,
	/// Principal or deferred mini-program login.
	pub resolution: Resolution,
	/// Binding session token, passed through untouched.
	pub token: Option<String>,
	/// Origin metadata, passed through untouched.
	pub host: Option<String>,
}
impl AuthenticationSubject {
	fn new(request: LoginRequest, resolution: Resolution) -> Self {
		let realm = request.kind();
		let (app_key, token, host) = match request {
			LoginRequest::Code(login) => (login.app_key, None, login.host),
			LoginRequest::TmpCode(login) => (login.app_key, login.token, login.host),
			LoginRequest::MiniApp(login) => (login.app_key, login.token, login.host),
		};

		Self { realm, app_key, resolution, token, host }
	}

	/// Returns the normalized principal when the flow produced one.
	pub fn principal(&self) -> Option<&NormalizedPrincipal> {
		self.resolution.principal()
	}
}

/// Successful authentication result produced by the repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationInfo {
	/// Flow that authenticated the subject.
	pub realm: FlowKind,
	/// Local identifier of the authenticated account.
	pub principal_id: String,
	/// Normalized provider principal, when the flow produced one.
	pub principal: Option<NormalizedPrincipal>,
	/// Repository-defined attributes (roles, tenant, session hints).
	pub attributes: BTreeMap<String, serde_json::Value>,
}
impl AuthenticationInfo {
	/// Creates an info record for `principal_id`.
	pub fn new(realm: FlowKind, principal_id: impl Into<String>) -> Self {
		Self { realm, principal_id: principal_id.into(), principal: None, attributes: BTreeMap::new() }
	}

	/// Attaches the normalized principal.
	pub fn with_principal(mut self, principal: NormalizedPrincipal) -> Self {
		self.principal = Some(principal);

		self
	}

	/// Adds one repository-defined attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.attributes.insert(key.into(), value);

		self
	}
}

/// Host-provided lookup from an authenticated subject to a local account.
pub trait PrincipalRepository
where
	Self: Send + Sync,
{
	/// Produces the authentication info for `subject`, or rejects it.
	fn get_authentication_info<'a>(
		&'a self,
		subject: &'a AuthenticationSubject,
	) -> RepositoryFuture<'a>;
}

/// Observer of authentication outcomes.
///
/// Exactly one of the two callbacks fires per attempt. `realm` is `None` on failure when
/// the form was rejected before a flow could be chosen.
pub trait AuthenticationListener
where
	Self: Send + Sync,
{
	/// Called after a successful attempt.
	fn on_success(&self, realm: FlowKind, info: &AuthenticationInfo);

	/// Called after a failed attempt, with the original form.
	fn on_failure(&self, realm: Option<FlowKind>, form: &LoginForm, error: &Error);
}

/// Orchestrates registry lookup, token acquisition, flow resolution, and repository
/// delegation for each login attempt.
#[derive(Clone)]
pub struct AuthenticationCoordinator {
	resolver: FlowResolver,
	repository: Arc<dyn PrincipalRepository>,
	listeners: Vec<Arc<dyn AuthenticationListener>>,
}
impl AuthenticationCoordinator {
	/// Creates a coordinator over an explicitly constructed resolver.
	pub fn new(resolver: FlowResolver, repository: Arc<dyn PrincipalRepository>) -> Self {
		Self { resolver, repository, listeners: Vec::new() }
	}

	/// Starts a builder that assembles the registry, cache, and resolver from `config`.
	pub fn builder(
		config: LoginConfig,
		repository: Arc<dyn PrincipalRepository>,
	) -> CoordinatorBuilder {
		CoordinatorBuilder { config, repository, provider: None, listeners: Vec::new() }
	}

	/// Appends a listener; listeners fire in the order they were added.
	pub fn with_listener(mut self, listener: Arc<dyn AuthenticationListener>) -> Self {
		self.listeners.push(listener);

		self
	}

	/// Flow resolver used by this coordinator.
	pub fn resolver(&self) -> &FlowResolver {
		&self.resolver
	}

	/// Runs one authentication attempt.
	pub async fn authenticate(&self, form: LoginForm) -> Result<AuthenticationInfo> {
		let request = match LoginRequest::try_from(form.clone()) {
			Ok(request) => request,
			Err(e) => return Err(self.fail(None, &form, e)),
		};
		let realm = request.kind();

		match self.attempt(request).await {
			Ok(info) => {
				for listener in &self.listeners {
					listener.on_success(realm, &info);
				}

				Ok(info)
			},
			Err(e) => Err(self.fail(Some(realm), &form, e)),
		}
	}

	async fn attempt(&self, request: LoginRequest) -> Result<AuthenticationInfo> {
		let resolution = self.resolver.resolve(&request).await?;
		let subject = AuthenticationSubject::new(request, resolution);

		Ok(self.repository.get_authentication_info(&subject).await?)
	}

	fn fail(&self, realm: Option<FlowKind>, form: &LoginForm, error: Error) -> Error {
		obs::authentication_failed(realm, &error);

		for listener in &self.listeners {
			listener.on_failure(realm, form, &error);
		}

		error
	}
}
impl Debug for AuthenticationCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticationCoordinator")
			.field("resolver", &self.resolver)
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

/// Assembles an [`AuthenticationCoordinator`] from configuration.
pub struct CoordinatorBuilder {
	config: LoginConfig,
	repository: Arc<dyn PrincipalRepository>,
	provider: Option<Arc<dyn ProviderClient>>,
	listeners: Vec<Arc<dyn AuthenticationListener>>,
}
impl CoordinatorBuilder {
	/// Uses `provider` instead of the default HTTP client.
	pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
		self.provider = Some(provider);

		self
	}

	/// Appends a listener.
	pub fn with_listener(mut self, listener: Arc<dyn AuthenticationListener>) -> Self {
		self.listeners.push(listener);

		self
	}

	/// Validates the configuration and builds the coordinator.
	///
	/// Fails with [`ConfigError::Disabled`] when the subsystem is switched off and with
	/// [`ConfigError::NoApplications`] when no credential is configured.
	pub fn build(self) -> Result<AuthenticationCoordinator, ConfigError> {
		let Self { config, repository, provider, listeners } = self;

		if !config.enabled {
			return Err(ConfigError::Disabled);
		}
		if config.credentials().is_empty() {
			return Err(ConfigError::NoApplications);
		}

		let provider = match provider {
			Some(provider) => provider,
			None => default_provider(&config)?,
		};
		let resolver = FlowResolver::from_config(&config, provider)?;

		Ok(AuthenticationCoordinator { resolver, repository, listeners })
	}
}
impl Debug for CoordinatorBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CoordinatorBuilder")
			.field("config", &self.config)
			.field("provider_set", &self.provider.is_some())
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_provider(config: &LoginConfig) -> Result<Arc<dyn ProviderClient>, ConfigError> {
	Ok(Arc::new(crate::http::ReqwestProviderClient::from_config(config)?))
}
#[cfg(not(feature = "reqwest"))]
fn default_provider(_: &LoginConfig) -> Result<Arc<dyn ProviderClient>, ConfigError> {
	Err(ConfigError::MissingProvider)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		config::{CorpAppConfig, MiniAppConfig},
		provider::{BasicIdentity, FullProfile, ProviderError, ProviderOperation},
	};

	#[derive(Debug, Default)]
	struct RecordingListener {
		name: &'static str,
		events: Arc<Mutex<Vec<String>>>,
	}
	impl AuthenticationListener for RecordingListener {
		fn on_success(&self, realm: FlowKind, info: &AuthenticationInfo) {
			self.events.lock().push(format!("{}:success:{realm}:{}", self.name, info.principal_id));
		}

		fn on_failure(&self, realm: Option<FlowKind>, form: &LoginForm, error: &Error) {
			let realm = realm.map(FlowKind::as_str).unwrap_or("none");
			let kind = match error {
				Error::RequestValidation { .. } => "validation",
				Error::UnknownApplication { .. } => "unknown_application",
				Error::ProfileFetchFailed(_) => "profile",
				Error::Repository(_) => "repository",
				_ => "other",
			};

			self.events.lock().push(format!(
				"{}:failure:{realm}:{kind}:{}",
				self.name,
				form.key.as_deref().unwrap_or("-")
			));
		}
	}

	/// Accepts every subject, rejecting user `blocked`.
	#[derive(Debug, Default)]
	struct EchoRepository {
		subjects: Mutex<Vec<AuthenticationSubject>>,
	}
	impl PrincipalRepository for EchoRepository {
		fn get_authentication_info<'a>(
			&'a self,
			subject: &'a AuthenticationSubject,
		) -> RepositoryFuture<'a> {
			Box::pin(async move {
				self.subjects.lock().push(subject.clone());

				match &subject.resolution {
					Resolution::Principal(principal) if principal.user_id.as_str() == "blocked" =>
						Err(RepositoryError::rejected("blocked", "account locked")),
					Resolution::Principal(principal) =>
						Ok(AuthenticationInfo::new(subject.realm, principal.user_id.as_str())
							.with_principal(principal.clone())),
					Resolution::Deferred(login) =>
						Ok(AuthenticationInfo::new(subject.realm, format!("ma:{}", login.auth_code))),
				}
			})
		}
	}

	struct Harness {
		provider: Arc<ScriptedProvider>,
		repository: Arc<EchoRepository>,
		events: Arc<Mutex<Vec<String>>>,
		coordinator: AuthenticationCoordinator,
	}

	fn harness(provider: ScriptedProvider) -> Harness {
		let provider = Arc::new(provider);
		let repository = Arc::new(EchoRepository::default());
		let events = Arc::new(Mutex::new(Vec::new()));
		let coordinator = AuthenticationCoordinator::new(
			resolver(&provider, &[("app1", "s1")]),
			repository.clone(),
		)
		.with_listener(Arc::new(RecordingListener { name: "first", events: events.clone() }))
		.with_listener(Arc::new(RecordingListener { name: "second", events: events.clone() }));

		Harness { provider, repository, events, coordinator }
	}

	#[tokio::test]
	async fn code_login_reaches_repository_and_listeners_in_order() {
		let h = harness(ScriptedProvider::default());
		let info = h
			.coordinator
			.authenticate(LoginForm::new("app1").with_code("abc123").with_host("10.0.0.7"))
			.await
			.expect("Code login should authenticate.");
		let principal = info.principal.as_ref().expect("Code login should carry a principal.");

		assert_eq!(info.realm, FlowKind::CodeLogin);
		assert_eq!(principal.user_id.as_str(), "u1");
		assert_eq!(principal.display_name.as_deref(), Some("Alice"));
		assert_eq!(principal.department_ids, vec![10, 20]);
		assert!(principal.is_admin);
		assert_eq!(
			*h.events.lock(),
			vec!["first:success:code_login:u1", "second:success:code_login:u1"]
		);
		assert_eq!(h.repository.subjects.lock()[0].host.as_deref(), Some("10.0.0.7"));
	}

	#[tokio::test]
	async fn validation_failures_notify_without_a_realm() {
		let h = harness(ScriptedProvider::default());
		let err = h
			.coordinator
			.authenticate(LoginForm::new("app1"))
			.await
			.expect_err("Forms without a code must fail.");

		assert!(matches!(err, Error::RequestValidation { field: "code", .. }));
		assert_eq!(
			*h.events.lock(),
			vec!["first:failure:none:validation:app1", "second:failure:none:validation:app1"]
		);
		assert_eq!(h.provider.total_calls(), 0);
	}

	#[tokio::test]
	async fn unknown_application_fails_before_remote_calls() {
		let h = harness(ScriptedProvider::default());
		let err = h
			.coordinator
			.authenticate(LoginForm::new("ghost").with_code("abc123"))
			.await
			.expect_err("Unknown applications must fail.");

		assert!(matches!(err, Error::UnknownApplication { .. }));
		assert_eq!(h.provider.total_calls(), 0);
		assert_eq!(h.events.lock().len(), 2);
		assert!(h.repository.subjects.lock().is_empty());
	}

	#[tokio::test]
	async fn profile_failure_is_returned_unchanged_once() {
		let h = harness(ScriptedProvider::default().with_profile(Err(ProviderError::rejected(
			ProviderOperation::FetchFullProfile,
			40001,
			"invalid userid",
		))));
		let err = h
			.coordinator
			.authenticate(LoginForm::new("app1").with_code("abc123"))
			.await
			.expect_err("Profile failures must fail.");

		assert!(matches!(err, Error::ProfileFetchFailed(ref e) if e.code == Some(40001)));
		assert_eq!(
			*h.events.lock(),
			vec![
				"first:failure:code_login:profile:app1",
				"second:failure:code_login:profile:app1"
			]
		);
	}

	#[tokio::test]
	async fn repository_rejection_propagates() {
		let blocked = ScriptedProvider::default()
			.with_identity(Ok(BasicIdentity { user_id: Some("blocked".into()), ..Default::default() }))
			.with_profile(Ok(FullProfile { user_id: Some("blocked".into()), ..alice_profile() }));
		let h = harness(blocked);
		let err = h
			.coordinator
			.authenticate(LoginForm::new("app1").with_code("abc123"))
			.await
			.expect_err("Rejected principals must fail.");

		assert!(matches!(err, Error::Repository(RepositoryError::Rejected { .. })));
		assert_eq!(h.events.lock()[0], "first:failure:code_login:repository:app1");
	}

	#[tokio::test]
	async fn mini_app_login_passes_token_and_binding_through() {
		let h = harness(ScriptedProvider::default());
		let info = h
			.coordinator
			.authenticate(LoginForm::new("app1").with_auth_code("ma-1").with_token("session"))
			.await
			.expect("Mini-app login should authenticate.");
		let subjects = h.repository.subjects.lock();
		let subject = &subjects[0];

		assert_eq!(info.principal_id, "ma:ma-1");
		assert_eq!(subject.realm, FlowKind::MiniAppLogin);
		assert_eq!(subject.token.as_deref(), Some("session"));
		assert!(subject.principal().is_none());
		assert!(matches!(
			&subject.resolution,
			Resolution::Deferred(login) if login.access_token.expose() == "tok1"
		));
	}

	#[test]
	fn builder_rejects_disabled_or_empty_configuration() {
		let repository: Arc<dyn PrincipalRepository> = Arc::new(EchoRepository::default());
		let provider: Arc<dyn ProviderClient> = Arc::new(ScriptedProvider::default());
		let disabled = LoginConfig {
			corp_apps: vec![CorpAppConfig {
				app_key: "app1".into(),
				app_secret: "s1".into(),
				agent_id: None,
			}],
			..Default::default()
		};

		assert!(matches!(
			AuthenticationCoordinator::builder(disabled, repository.clone())
				.with_provider(provider.clone())
				.build(),
			Err(ConfigError::Disabled)
		));

		let empty = LoginConfig { enabled: true, ..Default::default() };

		assert!(matches!(
			AuthenticationCoordinator::builder(empty, repository.clone())
				.with_provider(provider.clone())
				.build(),
			Err(ConfigError::NoApplications)
		));

		let config = LoginConfig {
			enabled: true,
			apps: vec![MiniAppConfig { app_id: "mini".into(), app_secret: "s2".into() }],
			..Default::default()
		};
		let coordinator = AuthenticationCoordinator::builder(config, repository)
			.with_provider(provider)
			.build()
			.expect("Enabled configuration should build.");

		assert!(coordinator.resolver().registry().has_key("mini"));
	}
}
