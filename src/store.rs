//! Storage contracts and built-in cache backends for relay state.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Future type returned by every [`CacheStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by relay cache backends.
///
/// Writes replace the keyed entry wholesale; there is no partial update. Expired entries are
/// evicted lazily when observed by [`CacheStore::get`], never by a background sweeper.
pub trait CacheStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the entry stored under `key`.
	fn put<'a>(&'a self, key: &'a str, entry: CacheEntry) -> StoreFuture<'a, ()>;

	/// Fetches the entry stored under `key`, discarding it when its TTL has lapsed.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<CacheEntry>>;
}

/// A cached JSON payload together with its storage instant and optional lifetime.
///
/// Entries without a TTL never expire at the store level; their staleness, if any, is judged
/// by the payload itself (the access token carries its own expiry instant).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
	/// Stored JSON payload.
	pub value: serde_json::Value,
	/// Instant the entry was written.
	pub stored_at: OffsetDateTime,
	/// Lifetime after which [`CacheStore::get`] treats the entry as absent.
	pub ttl: Option<Duration>,
}
impl CacheEntry {
	/// Stamps a new entry with the current UTC instant.
	pub fn new(value: serde_json::Value, ttl: Option<Duration>) -> Self {
		Self { value, stored_at: OffsetDateTime::now_utc(), ttl }
	}

	/// Returns the expiry instant, if the entry carries a TTL.
	///
	/// A TTL too large for the timestamp to absorb behaves like no TTL at all.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.ttl.and_then(|ttl| self.stored_at.checked_add(ttl))
	}

	/// Returns `true` if the entry's TTL has lapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.expires_at(), Some(expires_at) if instant >= expires_at)
	}

	/// Convenience helper that checks expiry against the current UTC instant.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}

/// Error type produced by [`CacheStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
