//! Login flow resolution.
//!
//! [`FlowResolver`] turns a validated [`LoginRequest`] into a [`Resolution`] by running
//! the provider call sequence of its flow. Steps run strictly in order, each one fed by
//! the previous step's output, and the first failure aborts the flow with a single
//! classified [`Error`]. Every remote call is bounded by the configured call timeout.

mod code;
mod mini_app;
mod tmp_code;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AppKey, AppSecret, IdentifierError},
	cache::TokenCache,
	config::{LoginConfig, TimeoutConfig},
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	principal::{MappingError, NormalizedPrincipal},
	provider::{self, ProviderClient, ProviderError, ProviderOperation},
	registry::CredentialRegistry,
	request::LoginRequest,
};

/// Outcome of a successful flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
	/// The flow produced a normalized principal.
	Principal(NormalizedPrincipal),
	/// The flow defers identity resolution to the principal repository.
	Deferred(DeferredLogin),
}
impl Resolution {
	/// Returns the principal when the flow produced one.
	pub fn principal(&self) -> Option<&NormalizedPrincipal> {
		match self {
			Self::Principal(principal) => Some(principal),
			Self::Deferred(_) => None,
		}
	}
}

/// Mini-program login enriched with an access token, left for the repository to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredLogin {
	/// Application key of the mini-program.
	pub app_key: AppKey,
	/// Mini-program auth code, untouched.
	pub auth_code: String,
	/// Access token for the application credential pair.
	pub access_token: AccessToken,
}

/// Runs the provider call sequence of each login flow.
#[derive(Clone)]
pub struct FlowResolver {
	registry: CredentialRegistry,
	cache: Arc<TokenCache>,
	provider: Arc<dyn ProviderClient>,
	call_timeout: StdDuration,
}
impl FlowResolver {
	/// Creates a resolver over explicitly constructed collaborators.
	pub fn new(
		registry: CredentialRegistry,
		cache: Arc<TokenCache>,
		provider: Arc<dyn ProviderClient>,
	) -> Self {
		Self { registry, cache, provider, call_timeout: TimeoutConfig::default().call() }
	}

	/// Creates a resolver, registry, and token cache from `config`.
	pub fn from_config(
		config: &LoginConfig,
		provider: Arc<dyn ProviderClient>,
	) -> Result<Self, ConfigError> {
		let registry = CredentialRegistry::from_config(config)?;
		let cache = Arc::new(TokenCache::from_config(provider.clone(), config));

		Ok(Self::new(registry, cache, provider).with_call_timeout(config.timeouts.call()))
	}

	/// Overrides the deadline applied to each identity call.
	pub fn with_call_timeout(mut self, timeout: StdDuration) -> Self {
		self.call_timeout = timeout;

		self
	}

	/// Credential registry consulted by every flow.
	pub fn registry(&self) -> &CredentialRegistry {
		&self.registry
	}

	/// Token cache shared by every flow.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Dispatches `request` to its flow.
	pub async fn resolve(&self, request: &LoginRequest) -> Result<Resolution> {
		match request {
			LoginRequest::Code(login) => self.code_login(login).await.map(Resolution::Principal),
			LoginRequest::TmpCode(login) =>
				self.tmp_code_login(login).await.map(Resolution::Principal),
			LoginRequest::MiniApp(login) =>
				self.mini_app_login(login).await.map(Resolution::Deferred),
		}
	}

	fn secret(&self, app_key: &AppKey) -> Result<&AppSecret> {
		self.registry.resolve_secret(app_key)
	}

	async fn call<T, F>(&self, operation: ProviderOperation, call: F) -> Result<T, ProviderError>
	where
		F: Future<Output = Result<T, ProviderError>>,
	{
		provider::with_deadline(operation, self.call_timeout, call).await.inspect_err(|e| {
			obs::provider_call_failed(e);
		})
	}
}
impl Debug for FlowResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FlowResolver")
			.field("registry_len", &self.registry.len())
			.field("cache", &self.cache)
			.field("call_timeout", &self.call_timeout)
			.finish()
	}
}

async fn observe<T, F>(kind: FlowKind, stage: &'static str, flow: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(flow).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}

/// Extracts a mandatory identifier from a successful provider response.
fn required<T>(
	value: Option<String>,
	field: &'static str,
	parse: impl FnOnce(&str) -> Result<T, IdentifierError>,
) -> Result<T, MappingError> {
	let value = value
		.filter(|v| !v.trim().is_empty())
		.ok_or(MappingError::MissingField { field })?;

	parse(&value).map_err(|source| MappingError::InvalidIdentifier { field, source })
}
