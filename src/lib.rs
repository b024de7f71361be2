//! DingTalk login federation: a credential registry, a single-flight access-token cache,
//! and the code-exchange flows that turn opaque provider codes into one normalized
//! principal handed to your own session layer.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod principal;
pub mod provider;
pub mod registry;
pub mod request;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and an in-memory scripted provider for tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AccessToken, AppKey, AppSecret, UnionId, UserId},
		cache::TokenCache,
		flows::FlowResolver,
		provider::{
			BasicIdentity, FullProfile, ProviderClient, ProviderError, ProviderFuture,
			ProviderOperation, TokenGrant, UnionIdentity, UserIdLookup,
		},
		registry::{AppCategory, CredentialRegistry},
	};

	type Scripted<T> = Mutex<Option<Result<T, ProviderError>>>;

	/// Builds an application key, panicking on invalid fixtures.
	pub fn app_key(value: &str) -> AppKey {
		AppKey::new(value).expect("App key fixture should be valid.")
	}

	/// Builds a registry with every entry registered as an internal app.
	pub fn registry(entries: &[(&str, &str)]) -> CredentialRegistry {
		let mut builder = CredentialRegistry::builder();

		for (key, secret) in entries {
			builder.register(app_key(key), AppSecret::new(*secret), AppCategory::InternalApp);
		}

		builder.build()
	}

	/// Builds a flow resolver over `provider` and a fresh token cache.
	pub fn resolver(provider: &Arc<ScriptedProvider>, entries: &[(&str, &str)]) -> FlowResolver {
		let cache = Arc::new(TokenCache::new(provider.clone()));

		FlowResolver::new(registry(entries), cache, provider.clone())
	}

	/// Profile returned by [`ScriptedProvider`] unless scripted otherwise.
	pub fn alice_profile() -> FullProfile {
		FullProfile {
			user_id: Some("u1".into()),
			name: Some("Alice".into()),
			department: vec![10, 20],
			is_admin: Some(true),
			active: Some(true),
			..Default::default()
		}
	}

	/// In-memory [`ProviderClient`] with scripted answers and per-operation call counters.
	///
	/// Unscripted operations succeed: tokens are minted as `tok1`, `tok2`, ... in fetch
	/// order, the identity steps resolve to user `u1` (union `union-1`, open `open-1`), and
	/// the profile is [`alice_profile`].
	#[derive(Debug, Default)]
	pub struct ScriptedProvider {
		token_latency: Option<StdDuration>,
		identity_latency: Option<StdDuration>,
		token_lifetime: Option<Duration>,
		token_failure: Mutex<Option<ProviderError>>,
		identity: Scripted<BasicIdentity>,
		union_identity: Scripted<UnionIdentity>,
		user_id_lookup: Scripted<UserIdLookup>,
		profile: Scripted<FullProfile>,
		calls: Mutex<HashMap<ProviderOperation, usize>>,
		seen: Mutex<Vec<(ProviderOperation, String)>>,
	}
	impl ScriptedProvider {
		/// Delays every token fetch.
		pub fn with_token_latency(mut self, latency: StdDuration) -> Self {
			self.token_latency = Some(latency);

			self
		}

		/// Delays every code exchange.
		pub fn with_identity_latency(mut self, latency: StdDuration) -> Self {
			self.identity_latency = Some(latency);

			self
		}

		/// Reports `lifetime` as the provider-side token lifetime.
		pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
			self.token_lifetime = Some(lifetime);

			self
		}

		/// Fails every token fetch with `error` until cleared.
		pub fn with_token_failure(self, error: ProviderError) -> Self {
			*self.token_failure.lock() = Some(error);

			self
		}

		/// Lets token fetches succeed again.
		pub fn clear_token_failure(&self) {
			*self.token_failure.lock() = None;
		}

		/// Scripts the code exchange.
		pub fn with_identity(self, answer: Result<BasicIdentity, ProviderError>) -> Self {
			*self.identity.lock() = Some(answer);

			self
		}

		/// Scripts the scan-code exchange.
		pub fn with_union_identity(self, answer: Result<UnionIdentity, ProviderError>) -> Self {
			*self.union_identity.lock() = Some(answer);

			self
		}

		/// Scripts the union id lookup.
		pub fn with_user_id_lookup(self, answer: Result<UserIdLookup, ProviderError>) -> Self {
			*self.user_id_lookup.lock() = Some(answer);

			self
		}

		/// Scripts the profile fetch.
		pub fn with_profile(self, answer: Result<FullProfile, ProviderError>) -> Self {
			*self.profile.lock() = Some(answer);

			self
		}

		/// Number of calls made to `operation`.
		pub fn calls(&self, operation: ProviderOperation) -> usize {
			self.calls.lock().get(&operation).copied().unwrap_or(0)
		}

		/// Number of calls made to any operation.
		pub fn total_calls(&self) -> usize {
			self.calls.lock().values().sum()
		}

		/// Arguments seen by `operation`, joined with `:` per call.
		pub fn seen(&self, operation: ProviderOperation) -> Vec<String> {
			self.seen
				.lock()
				.iter()
				.filter(|(op, _)| *op == operation)
				.map(|(_, args)| args.clone())
				.collect()
		}

		fn record(&self, operation: ProviderOperation, args: String) -> usize {
			self.seen.lock().push((operation, args));

			let mut calls = self.calls.lock();
			let count = calls.entry(operation).or_default();

			*count += 1;

			*count
		}

		fn scripted<T: Clone>(slot: &Scripted<T>, fallback: impl FnOnce() -> T) -> Result<T, ProviderError> {
			slot.lock().clone().unwrap_or_else(|| Ok(fallback()))
		}
	}
	impl ProviderClient for ScriptedProvider {
		fn fetch_access_token<'a>(
			&'a self,
			app_key: &'a AppKey,
			_app_secret: &'a AppSecret,
		) -> ProviderFuture<'a, TokenGrant> {
			Box::pin(async move {
				let count =
					self.record(ProviderOperation::FetchAccessToken, app_key.as_str().to_owned());

				if let Some(latency) = self.token_latency {
					tokio::time::sleep(latency).await;
				}

				let failure = self.token_failure.lock().clone();

				if let Some(failure) = failure {
					return Err(failure);
				}

				let grant = TokenGrant::new(format!("tok{count}"));

				Ok(match self.token_lifetime {
					Some(lifetime) => grant.with_expires_in(lifetime),
					None => grant,
				})
			})
		}

		fn exchange_code_for_identity<'a>(
			&'a self,
			code: &'a str,
			token: &'a AccessToken,
		) -> ProviderFuture<'a, BasicIdentity> {
			Box::pin(async move {
				self.record(
					ProviderOperation::ExchangeCodeForIdentity,
					format!("{code}:{}", token.expose()),
				);

				if let Some(latency) = self.identity_latency {
					tokio::time::sleep(latency).await;
				}

				Self::scripted(&self.identity, || BasicIdentity {
					user_id: Some("u1".into()),
					..Default::default()
				})
			})
		}

		fn exchange_tmp_code_for_union_identity<'a>(
			&'a self,
			tmp_code: &'a str,
			app_key: &'a AppKey,
			app_secret: &'a AppSecret,
		) -> ProviderFuture<'a, UnionIdentity> {
			Box::pin(async move {
				self.record(
					ProviderOperation::ExchangeTmpCodeForUnionIdentity,
					format!("{tmp_code}:{app_key}:{}", app_secret.expose()),
				);

				Self::scripted(&self.union_identity, || UnionIdentity {
					union_id: Some("union-1".into()),
					open_id: Some("open-1".into()),
					nickname: Some("Ally".into()),
				})
			})
		}

		fn resolve_user_id_by_union_id<'a>(
			&'a self,
			union_id: &'a UnionId,
			token: &'a AccessToken,
		) -> ProviderFuture<'a, UserIdLookup> {
			Box::pin(async move {
				self.record(
					ProviderOperation::ResolveUserIdByUnionId,
					format!("{union_id}:{}", token.expose()),
				);

				Self::scripted(&self.user_id_lookup, || UserIdLookup {
					user_id: Some("u1".into()),
					contact_type: Some(0),
				})
			})
		}

		fn fetch_full_profile<'a>(
			&'a self,
			user_id: &'a UserId,
			token: &'a AccessToken,
		) -> ProviderFuture<'a, FullProfile> {
			Box::pin(async move {
				self.record(
					ProviderOperation::FetchFullProfile,
					format!("{user_id}:{}", token.expose()),
				);

				Self::scripted(&self.profile, alice_profile)
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use crate::{
	cache::TokenCache,
	coordinator::{AuthenticationCoordinator, AuthenticationInfo, AuthenticationSubject},
	error::{ConfigError, Error, Result},
	flows::{FlowResolver, Resolution},
	principal::NormalizedPrincipal,
	request::{LoginForm, LoginRequest},
};
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
