//! Thread-safe in-memory [`CacheStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CacheEntry, CacheStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Thread-safe cache backend that keeps entries in-process.
///
/// This is the default backend when no snapshot path is configured; cached state does not
/// survive a process restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn put_now(map: StoreMap, key: String, entry: CacheEntry) -> Result<(), StoreError> {
		map.write().insert(key, entry);

		Ok(())
	}

	fn get_now(map: StoreMap, key: String) -> Option<CacheEntry> {
		let now = OffsetDateTime::now_utc();

		{
			let guard = map.read();

			match guard.get(&key) {
				Some(entry) if !entry.is_expired_at(now) => return Some(entry.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		// Expired on observation; drop the entry so it is never served again.
		map.write().remove(&key);

		None
	}
}
impl CacheStore for MemoryStore {
	fn put<'a>(&'a self, key: &'a str, entry: CacheEntry) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::put_now(map, key, entry) })
	}

	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<CacheEntry>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}
}
