//! Crate-level error types shared across the registry, cache, flows, and coordinator.

// self
use crate::{
	_prelude::*,
	auth::IdentifierError,
	coordinator::RepositoryError,
	principal::MappingError,
	provider::ProviderError,
	registry::AppCategory,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classified authentication failure; exactly one is produced per failed attempt.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required request field (application key or login code) is missing or blank.
	#[error("Login request field `{field}` is invalid: {reason}.")]
	RequestValidation {
		/// Name of the offending inbound field.
		field: &'static str,
		/// Human-readable validation failure.
		reason: String,
	},
	/// The application key is not present in the credential registry.
	#[error("Application key `{app_key}` is not registered.")]
	UnknownApplication {
		/// Key supplied by the caller.
		app_key: String,
	},
	/// Access-token acquisition or another unclassified provider call failed.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// The provider refused the login code (expired, reused, or forged).
	#[error("Provider rejected the login code: {0}")]
	InvalidCode(#[source] ProviderError),
	/// The provider could not map a union identifier onto an organization user.
	#[error("Provider could not resolve the user identity: {0}")]
	IdentityResolutionFailed(#[source] ProviderError),
	/// The provider refused to return the user's profile.
	#[error("Provider refused the user profile: {0}")]
	ProfileFetchFailed(#[source] ProviderError),
	/// A successful provider response lacked a field the flow requires.
	#[error(transparent)]
	Mapping(#[from] MappingError),
	/// The principal repository rejected the normalized principal.
	#[error(transparent)]
	Repository(#[from] RepositoryError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns the provider payload carried by any provider-originated variant.
	pub fn provider_error(&self) -> Option<&ProviderError> {
		match self {
			Self::Provider(e)
			| Self::InvalidCode(e)
			| Self::IdentityResolutionFailed(e)
			| Self::ProfileFetchFailed(e) => Some(e),
			_ => None,
		}
	}

	/// Returns `true` when the failure originated from a remote provider call.
	pub fn is_provider_failure(&self) -> bool {
		self.provider_error().is_some()
	}

	pub(crate) fn missing_field(field: &'static str) -> Self {
		Self::RequestValidation { field, reason: "value is missing or blank".into() }
	}

	pub(crate) fn invalid_field(field: &'static str, source: IdentifierError) -> Self {
		Self::RequestValidation { field, reason: source.to_string() }
	}
}

/// Configuration and validation failures raised while assembling the subsystem.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The configuration keeps the login subsystem switched off.
	#[error("Login federation is disabled by configuration.")]
	Disabled,
	/// No application credential was configured in any category.
	#[error("No application credentials are configured.")]
	NoApplications,
	/// A configured application key failed validation.
	#[error("Configured {category} application key is invalid.")]
	InvalidAppKey {
		/// Category the entry was declared under.
		category: AppCategory,
		/// Underlying validation failure.
		#[source]
		source: IdentifierError,
	},
	/// A configured application secret is blank.
	#[error("Configured {category} application `{app_key}` has a blank secret.")]
	BlankSecret {
		/// Category the entry was declared under.
		category: AppCategory,
		/// Offending application key.
		app_key: String,
	},
	/// The provider base URL or a derived endpoint cannot be parsed.
	#[error("Provider endpoint is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No provider client was supplied and the built-in HTTP client is compiled out.
	#[error("No provider client is configured.")]
	MissingProvider,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidEndpoint { source }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::ProviderOperation;

	#[test]
	fn provider_payload_is_reachable_from_every_flow_class() {
		let payload = ProviderError::rejected(ProviderOperation::FetchFullProfile, 40001, "bad");
		let classified = [
			Error::Provider(payload.clone()),
			Error::InvalidCode(payload.clone()),
			Error::IdentityResolutionFailed(payload.clone()),
			Error::ProfileFetchFailed(payload.clone()),
		];

		for err in &classified {
			assert_eq!(err.provider_error(), Some(&payload));
			assert!(err.is_provider_failure());
		}

		assert!(!Error::missing_field("key").is_provider_failure());
	}

	#[test]
	fn classified_provider_errors_expose_their_source() {
		let payload =
			ProviderError::rejected(ProviderOperation::ExchangeCodeForIdentity, 40078, "expired");
		let err = Error::InvalidCode(payload);
		let source = StdError::source(&err).expect("Classified errors should expose a source.");

		assert!(source.to_string().contains("40078"));
		assert!(err.to_string().starts_with("Provider rejected the login code"));
	}

	#[test]
	fn validation_errors_name_the_field() {
		let err = Error::missing_field("code");

		assert_eq!(err.to_string(), "Login request field `code` is invalid: value is missing or blank.");
	}
}
