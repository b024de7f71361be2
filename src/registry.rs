//! Application credential registry mapping public keys to private secrets.
//!
//! The registry is assembled once through [`RegistryBuilder`] and is immutable
//! afterwards, so lookups need no locking. Registration is first-write-wins: a key
//! declared under an earlier category keeps its secret, and later duplicates are
//! reported as [`RegistrationOutcome::Shadowed`] instead of silently overwriting it.

// self
use crate::{
	_prelude::*,
	auth::{AppKey, AppSecret},
	config::LoginConfig,
	error::ConfigError,
	obs,
};

/// Application categories the provider distinguishes, in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppCategory {
	/// Internally developed organization app (code login).
	InternalApp,
	/// Third-party personal mini-app.
	PersonalMiniApp,
	/// Third-party organization suite.
	ThirdPartySuite,
	/// Mobile-access app used for scan-code login.
	ScanLoginApp,
}
impl AppCategory {
	/// All categories in registration order.
	pub const ALL: [AppCategory; 4] =
		[Self::InternalApp, Self::PersonalMiniApp, Self::ThirdPartySuite, Self::ScanLoginApp];

	/// Returns a stable label suitable for logs and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InternalApp => "internal_app",
			Self::PersonalMiniApp => "personal_mini_app",
			Self::ThirdPartySuite => "third_party_suite",
			Self::ScanLoginApp => "scan_login_app",
		}
	}
}
impl Display for AppCategory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One configured application credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationCredential {
	/// Public application key.
	pub app_key: AppKey,
	/// Private application secret.
	pub app_secret: AppSecret,
	/// Category the credential was registered under.
	pub category: AppCategory,
}

/// Result of a single [`RegistryBuilder::register`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
	/// The key was new and is now registered.
	Inserted,
	/// The exact same credential was already registered; nothing changed.
	Unchanged,
	/// The key already belongs to an earlier registration, which is kept.
	Shadowed {
		/// Category of the registration that keeps the key.
		kept: AppCategory,
	},
}

/// Mutable assembly stage for a [`CredentialRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
	entries: HashMap<AppKey, ApplicationCredential>,
}
impl RegistryBuilder {
	/// Registers a credential unless its key is already taken.
	pub fn register(
		&mut self,
		app_key: AppKey,
		app_secret: AppSecret,
		category: AppCategory,
	) -> RegistrationOutcome {
		if let Some(existing) = self.entries.get(&app_key) {
			if existing.app_secret == app_secret && existing.category == category {
				return RegistrationOutcome::Unchanged;
			}

			obs::registry_key_shadowed(&app_key, existing.category, category);

			return RegistrationOutcome::Shadowed { kept: existing.category };
		}

		self.entries
			.insert(app_key.clone(), ApplicationCredential { app_key, app_secret, category });

		RegistrationOutcome::Inserted
	}

	/// Freezes the builder into an immutable registry.
	pub fn build(self) -> CredentialRegistry {
		CredentialRegistry { entries: Arc::new(self.entries) }
	}
}

/// Immutable, cheaply cloneable lookup table from application key to credential.
#[derive(Clone, Debug, Default)]
pub struct CredentialRegistry {
	entries: Arc<HashMap<AppKey, ApplicationCredential>>,
}
impl CredentialRegistry {
	/// Starts an empty registry builder.
	pub fn builder() -> RegistryBuilder {
		RegistryBuilder::default()
	}

	/// Builds a registry from every category in `config`, validating each entry.
	pub fn from_config(config: &LoginConfig) -> Result<Self, ConfigError> {
		let mut builder = Self::builder();

		for (category, key, secret) in config.credentials() {
			let app_key =
				AppKey::new(key).map_err(|source| ConfigError::InvalidAppKey { category, source })?;
			let app_secret = AppSecret::new(secret);

			if app_secret.is_blank() {
				return Err(ConfigError::BlankSecret { category, app_key: app_key.into() });
			}

			builder.register(app_key, app_secret, category);
		}

		Ok(builder.build())
	}

	/// Returns the secret registered for `key`.
	pub fn resolve_secret(&self, key: &str) -> Result<&AppSecret> {
		self.get(key)
			.map(|credential| &credential.app_secret)
			.ok_or_else(|| Error::UnknownApplication { app_key: key.to_owned() })
	}

	/// Returns the full credential registered for `key`, if any.
	pub fn get(&self, key: &str) -> Option<&ApplicationCredential> {
		self.entries.get(key)
	}

	/// Returns `true` if `key` is registered under any category.
	pub fn has_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Number of registered credentials.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over all credentials in unspecified order.
	pub fn iter(&self) -> impl Iterator<Item = &ApplicationCredential> {
		self.entries.values()
	}
}
