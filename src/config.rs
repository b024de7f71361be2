//! Deserializable configuration surface for the login subsystem.
//!
//! Loading and binding (files, environment, service frameworks) belong to the host
//! application; this module only declares the shape it must produce. Field names are
//! snake_case so the structs bind cleanly from TOML or JSON.

// self
use crate::{_prelude::*, registry::AppCategory};

/// Root configuration for provider login federation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
	/// Master switch; the coordinator refuses to build while this is `false`.
	pub enabled: bool,
	/// Organization (corp) identifier, when the deployment is bound to one organization.
	pub corp_id: Option<String>,
	/// Internally developed organization apps (mini programs and H5 apps).
	pub corp_apps: Vec<CorpAppConfig>,
	/// Third-party personal mini-apps.
	pub apps: Vec<MiniAppConfig>,
	/// Third-party organization suites.
	pub suites: Vec<SuiteConfig>,
	/// Mobile-access apps used for scan-code login.
	pub logins: Vec<ScanLoginConfig>,
	/// Provider API base URL; the public DingTalk open API when unset.
	pub api_base_url: Option<String>,
	/// Access-token cache tuning.
	pub cache: CacheConfig,
	/// Remote call bounds.
	pub timeouts: TimeoutConfig,
}
impl LoginConfig {
	/// Flattens every configured credential into registration order.
	///
	/// Categories are emitted as internal apps, personal mini-apps, suites, then
	/// scan-login apps; entries keep their declaration order inside a category.
	pub fn credentials(&self) -> Vec<(AppCategory, &str, &str)> {
		let corp = self
			.corp_apps
			.iter()
			.map(|app| (AppCategory::InternalApp, app.app_key.as_str(), app.app_secret.as_str()));
		let mini = self.apps.iter().map(|app| {
			(AppCategory::PersonalMiniApp, app.app_id.as_str(), app.app_secret.as_str())
		});
		let suites = self.suites.iter().map(|suite| {
			(AppCategory::ThirdPartySuite, suite.app_id.as_str(), suite.suite_secret.as_str())
		});
		let logins = self.logins.iter().map(|login| {
			(AppCategory::ScanLoginApp, login.app_id.as_str(), login.app_secret.as_str())
		});

		corp.chain(mini).chain(suites).chain(logins).collect()
	}
}

/// Internally developed organization app.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpAppConfig {
	/// Application key.
	pub app_key: String,
	/// Application secret.
	pub app_secret: String,
	/// Agent identifier assigned by the organization console.
	#[serde(default)]
	pub agent_id: Option<String>,
}

/// Third-party personal mini-app.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniAppConfig {
	/// Mini-app identifier.
	pub app_id: String,
	/// Mini-app secret.
	pub app_secret: String,
}

/// Third-party organization suite.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
	/// Suite application identifier.
	pub app_id: String,
	/// Suite key, when it differs from the application identifier.
	#[serde(default)]
	pub suite_key: Option<String>,
	/// Suite secret.
	pub suite_secret: String,
}

/// Mobile-access app used for scan-code login.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLoginConfig {
	/// Scan-login application identifier.
	pub app_id: String,
	/// Scan-login application secret.
	pub app_secret: String,
}

/// Access-token cache tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Seconds a fetched token stays reusable; kept below the provider's 7200 s lifetime.
	pub ttl_secs: u64,
	/// Maximum number of credential pairs kept before least-recently-used eviction.
	pub max_capacity: usize,
}
impl CacheConfig {
	/// Longest reuse window; the provider's own token lifetime.
	pub const MAX_TTL: Duration = Duration::seconds(7_200);

	const DEFAULT_MAX_CAPACITY: usize = 10;
	const DEFAULT_TTL_SECS: u64 = 6_000;

	/// Cache lifetime as a [`Duration`], clamped to [`Self::MAX_TTL`].
	pub fn ttl(&self) -> Duration {
		Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX)).min(Self::MAX_TTL)
	}
}
impl Default for CacheConfig {
	fn default() -> Self {
		Self { ttl_secs: Self::DEFAULT_TTL_SECS, max_capacity: Self::DEFAULT_MAX_CAPACITY }
	}
}

/// Upper bounds applied to every remote provider call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
	/// Seconds a single provider call may take before it counts as failed.
	pub call_secs: u64,
}
impl TimeoutConfig {
	const DEFAULT_CALL_SECS: u64 = 10;

	/// Per-call bound as a [`StdDuration`].
	pub fn call(&self) -> StdDuration {
		StdDuration::from_secs(self.call_secs.max(1))
	}
}
impl Default for TimeoutConfig {
	fn default() -> Self {
		Self { call_secs: Self::DEFAULT_CALL_SECS }
	}
}
