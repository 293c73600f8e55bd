// std
use std::{
	env, fs,
	path::PathBuf,
	process,
	sync::Arc,
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use mizu_relay::store::{CacheEntry, CacheStore, FileStore, MemoryStore};

fn temp_snapshot_path(label: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("Clock should be past the epoch.")
		.subsec_nanos();

	env::temp_dir().join(format!("mizu-relay-{label}-{}-{nanos}.json", process::id()))
}

#[tokio::test]
async fn entries_round_trip_through_the_trait_object() {
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());
	let entry = CacheEntry::new(json!({ "kind": "token" }), None);

	store.put("mizu:token", entry.clone()).await.expect("Putting an entry should succeed.");

	let fetched = store
		.get("mizu:token")
		.await
		.expect("Getting an entry should succeed.")
		.expect("The stored entry should be present.");

	assert_eq!(fetched, entry);
	assert_eq!(store.get("mizu:absent").await.expect("Absent lookups should succeed."), None);
}

#[tokio::test]
async fn astronomical_ttls_behave_as_unexpiring() {
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());
	let entry = CacheEntry::new(json!({ "kind": "pinned" }), Some(Duration::seconds(i64::MAX)));

	store.put("mizu:pinned", entry.clone()).await.expect("Putting an entry should succeed.");

	let fetched = store
		.get("mizu:pinned")
		.await
		.expect("Getting an entry should succeed.")
		.expect("An entry whose expiry is unrepresentable should never lapse.");

	assert_eq!(fetched, entry);
}

#[tokio::test]
async fn puts_replace_the_entry_wholesale() {
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());

	store
		.put("mizu:tracks", CacheEntry::new(json!({ "generation": 1 }), None))
		.await
		.expect("The first put should succeed.");
	store
		.put("mizu:tracks", CacheEntry::new(json!({ "generation": 2 }), Some(Duration::hours(1))))
		.await
		.expect("The second put should succeed.");

	let fetched = store
		.get("mizu:tracks")
		.await
		.expect("Getting an entry should succeed.")
		.expect("The replaced entry should be present.");

	assert_eq!(fetched.value, json!({ "generation": 2 }));
	assert_eq!(fetched.ttl, Some(Duration::hours(1)));
}

#[tokio::test]
async fn lapsed_entries_vanish_on_read() {
	let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::default());
	let lapsed = CacheEntry {
		value: json!([]),
		stored_at: OffsetDateTime::now_utc() - Duration::hours(2),
		ttl: Some(Duration::hours(1)),
	};

	store.put("mizu:tracks", lapsed).await.expect("Putting a lapsed entry should succeed.");

	assert_eq!(store.get("mizu:tracks").await.expect("Lookups should succeed."), None);
}

#[tokio::test]
async fn file_snapshots_survive_a_reopen() {
	let path = temp_snapshot_path("reopen");
	let entry = CacheEntry::new(json!({ "kind": "token" }), Some(Duration::hours(1)));

	{
		let store = FileStore::open(&path).expect("Opening a fresh snapshot should succeed.");

		store.put("mizu:token", entry.clone()).await.expect("Putting an entry should succeed.");
	}

	let store = FileStore::open(&path).expect("Reopening the snapshot should succeed.");
	let fetched = store
		.get("mizu:token")
		.await
		.expect("Getting an entry should succeed.")
		.expect("The entry should survive a reopen.");

	assert_eq!(fetched, entry);

	fs::remove_file(&path).ok();
}

#[tokio::test]
async fn file_snapshots_drop_lapsed_entries_on_read() {
	let path = temp_snapshot_path("lapsed");
	let lapsed = CacheEntry {
		value: json!({ "kind": "tracks" }),
		stored_at: OffsetDateTime::now_utc() - Duration::hours(2),
		ttl: Some(Duration::hours(1)),
	};

	{
		let store = FileStore::open(&path).expect("Opening a fresh snapshot should succeed.");

		store.put("mizu:tracks", lapsed).await.expect("Putting a lapsed entry should succeed.");
	}

	let store = FileStore::open(&path).expect("Reopening the snapshot should succeed.");

	assert_eq!(store.get("mizu:tracks").await.expect("Lookups should succeed."), None);
	// A later reopen must not resurrect the entry either.
	drop(store);

	let store = FileStore::open(&path).expect("A third open should succeed.");

	assert_eq!(store.get("mizu:tracks").await.expect("Lookups should succeed."), None);

	fs::remove_file(&path).ok();
}
