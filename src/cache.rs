//! Bounded, expiring access-token cache with single-flight loading.
//!
//! [`TokenCache::get_token`] serves a live token when one is cached for the
//! `(app_key, app_secret)` pair and otherwise loads one from the provider. Entries live
//! in a [`moka`] cache: concurrent misses on one [`CacheKey`] share a single remote fetch
//! and every waiter observes its success or failure. Failures are never cached, so the
//! next call retries.
//!
//! Entries expire after a fixed TTL (or earlier, when the provider reports a shorter
//! lifetime) and the cache holds at most `max_capacity` keys, evicting the least
//! recently used entry beyond that. Every removal is logged with its [`RemovalCause`].

mod stats;

pub use stats::CacheStats;

// std
use std::time::Instant;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use moka::{
	Expiry, future::Cache, notification::RemovalCause as EntryRemoval, policy::EvictionPolicy,
};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AppKey, AppSecret},
	config::{CacheConfig, LoginConfig, TimeoutConfig},
	obs::{self, CacheEvent},
	provider::{self, ProviderClient, ProviderError, ProviderOperation},
};

/// Deterministic cache key for one application credential pair.
///
/// The secret is folded into a SHA-256 fingerprint so keys can be logged or compared
/// without holding the secret itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
	/// Application key component.
	pub app_key: AppKey,
	/// Base64 (no padding) SHA-256 digest of the key/secret pair.
	pub fingerprint: String,
}
impl CacheKey {
	/// Builds the key for the provided credential pair.
	pub fn new(app_key: &AppKey, app_secret: &AppSecret) -> Self {
		let mut hasher = Sha256::new();

		hasher.update(app_key.as_bytes());
		hasher.update([0]);
		hasher.update(app_secret.expose().as_bytes());

		Self { app_key: app_key.clone(), fingerprint: STANDARD_NO_PAD.encode(hasher.finalize()) }
	}
}

/// Immutable cached token; replaced wholesale, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
	/// Token value.
	pub token: AccessToken,
	/// Instant the token was obtained.
	pub obtained_at: OffsetDateTime,
	/// Reuse window starting at `obtained_at`.
	pub expires_after: Duration,
}
impl CachedToken {
	/// Instant after which the token must not be served; `None` when it lies past the
	/// representable range.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.obtained_at.checked_add(self.expires_after)
	}

	/// Returns `true` while the token may still be served at `instant`.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at().is_none_or(|expires_at| instant < expires_at)
	}
}

/// Why an entry left the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalCause {
	/// The entry outlived its TTL.
	Expired,
	/// The entry was live but the capacity bound forced it out.
	Evicted,
	/// A newer token replaced the entry.
	Replaced,
	/// The entry was dropped on request.
	Invalidated,
}
impl RemovalCause {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Expired => "expired",
			Self::Evicted => "evicted",
			Self::Replaced => "replaced",
			Self::Invalidated => "invalidated",
		}
	}
}
impl From<EntryRemoval> for RemovalCause {
	fn from(cause: EntryRemoval) -> Self {
		match cause {
			EntryRemoval::Expired => Self::Expired,
			EntryRemoval::Explicit => Self::Invalidated,
			EntryRemoval::Replaced => Self::Replaced,
			EntryRemoval::Size => Self::Evicted,
		}
	}
}

/// Per-entry expiry taken from [`CachedToken::expires_after`].
struct TokenExpiry;
impl Expiry<CacheKey, CachedToken> for TokenExpiry {
	fn expire_after_create(
		&self,
		_: &CacheKey,
		token: &CachedToken,
		_: Instant,
	) -> Option<StdDuration> {
		Some(token.expires_after.unsigned_abs())
	}

	fn expire_after_update(
		&self,
		_: &CacheKey,
		token: &CachedToken,
		_: Instant,
		_: Option<StdDuration>,
	) -> Option<StdDuration> {
		Some(token.expires_after.unsigned_abs())
	}
}

/// Process-local access-token cache shared by every login flow.
pub struct TokenCache {
	provider: Arc<dyn ProviderClient>,
	entries: Cache<CacheKey, CachedToken>,
	ttl: Duration,
	max_capacity: u64,
	call_timeout: StdDuration,
	stats: Arc<CacheStats>,
}
impl TokenCache {
	/// Creates a cache with the default TTL, capacity, and call timeout.
	pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
		let config = CacheConfig::default();
		let stats = Arc::new(CacheStats::default());
		let max_capacity = u64::try_from(config.max_capacity).unwrap_or(u64::MAX);

		Self {
			provider,
			entries: build_entries(max_capacity, &stats),
			ttl: config.ttl(),
			max_capacity,
			call_timeout: TimeoutConfig::default().call(),
			stats,
		}
	}

	/// Creates a cache tuned by the `cache` and `timeouts` sections of `config`.
	pub fn from_config(provider: Arc<dyn ProviderClient>, config: &LoginConfig) -> Self {
		Self::new(provider)
			.with_ttl(config.cache.ttl())
			.with_max_capacity(config.cache.max_capacity)
			.with_call_timeout(config.timeouts.call())
	}

	/// Overrides the reuse window of fetched tokens, clamped to
	/// [`CacheConfig::MAX_TTL`].
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl.clamp(Duration::ZERO, CacheConfig::MAX_TTL);

		self
	}

	/// Overrides the number of credential pairs kept (at least one).
	///
	/// Rebuilds the underlying store, so call it before the first lookup.
	pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
		self.max_capacity = u64::try_from(max_capacity.max(1)).unwrap_or(u64::MAX);
		self.entries = build_entries(self.max_capacity, &self.stats);

		self
	}

	/// Overrides the deadline applied to each remote token fetch.
	pub fn with_call_timeout(mut self, timeout: StdDuration) -> Self {
		self.call_timeout = timeout;

		self
	}

	/// Returns a live token for the credential pair, loading one on a miss.
	pub async fn get_token(&self, app_key: &AppKey, app_secret: &AppSecret) -> Result<AccessToken> {
		let key = CacheKey::new(app_key, app_secret);

		if let Some(cached) = self.entries.get(&key).await {
			self.record(CacheEvent::Hit);

			return Ok(cached.token);
		}

		self.record(CacheEvent::Miss);

		self.entries
			.try_get_with(key, self.load(app_key, app_secret))
			.await
			.map(|cached| cached.token)
			.map_err(|shared| Error::Provider(ProviderError::clone(&shared)))
	}

	/// Drops the cached token for the credential pair, if any.
	pub async fn invalidate(&self, app_key: &AppKey, app_secret: &AppSecret) -> bool {
		let key = CacheKey::new(app_key, app_secret);

		self.entries.remove(&key).await.is_some()
	}

	/// Returns the cached entry for the credential pair without touching recency.
	pub fn peek(&self, app_key: &AppKey, app_secret: &AppSecret) -> Option<CachedToken> {
		let key = CacheKey::new(app_key, app_secret);

		self.entries.iter().find(|(candidate, _)| **candidate == key).map(|(_, cached)| cached)
	}

	/// Approximate number of cached entries; exact after
	/// [`run_pending_tasks`](Self::run_pending_tasks).
	pub fn len(&self) -> usize {
		usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Applies pending recency updates, expirations, and evictions.
	pub async fn run_pending_tasks(&self) {
		self.entries.run_pending_tasks().await;
	}

	/// Hit, miss, load, and eviction counters.
	pub fn stats(&self) -> &CacheStats {
		&self.stats
	}

	/// Performs the single remote fetch behind a miss.
	async fn load(
		&self,
		app_key: &AppKey,
		app_secret: &AppSecret,
	) -> Result<CachedToken, ProviderError> {
		self.record(CacheEvent::Load);

		let grant = provider::with_deadline(
			ProviderOperation::FetchAccessToken,
			self.call_timeout,
			self.provider.fetch_access_token(app_key, app_secret),
		)
		.await
		.inspect_err(|e| {
			self.record(CacheEvent::LoadFailure);
			obs::provider_call_failed(e);
		})?;
		let expires_after = match grant.expires_in {
			Some(reported) if reported < self.ttl => reported.max(Duration::ZERO),
			_ => self.ttl,
		};

		Ok(CachedToken {
			token: grant.access_token,
			obtained_at: OffsetDateTime::now_utc(),
			expires_after,
		})
	}

	fn record(&self, event: CacheEvent) {
		record(&self.stats, event);
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("ttl", &self.ttl)
			.field("max_capacity", &self.max_capacity)
			.field("call_timeout", &self.call_timeout)
			.field("stats", &self.stats)
			.finish()
	}
}

fn build_entries(max_capacity: u64, stats: &Arc<CacheStats>) -> Cache<CacheKey, CachedToken> {
	let stats = stats.clone();

	Cache::builder()
		.max_capacity(max_capacity)
		.eviction_policy(EvictionPolicy::lru())
		.expire_after(TokenExpiry)
		.eviction_listener(move |key: Arc<CacheKey>, _: CachedToken, cause: EntryRemoval| {
			let cause = RemovalCause::from(cause);

			if cause == RemovalCause::Evicted {
				record(&stats, CacheEvent::Eviction);
			}

			obs::cache_removal(&key.app_key, cause);
		})
		.build()
}

fn record(stats: &CacheStats, event: CacheEvent) {
	stats.record(event);
	obs::record_cache_event(event);
}
