// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use mizu_relay::{
	config::ProxyConfig,
	error::{Error, UpstreamError},
	flows::{Relay, TRACKS_CACHE_KEY},
	store::{CacheEntry, CacheStore, MemoryStore},
	upstream::schema::Track,
};

const CLIENT_ID: &str = "mizu-client";
const CLIENT_SECRET: &str = "mizu-secret";
const PROFILE: &str = "https://soundcloud.com/mizu-radio";
const CURATOR_ID: u64 = 52_603_176;

fn build_config(server: &MockServer, curator: (&str, &str)) -> ProxyConfig {
	let vars = [
		("SC_CLIENT_ID", CLIENT_ID.to_owned()),
		("SC_CLIENT_SECRET", CLIENT_SECRET.to_owned()),
		(curator.0, curator.1.to_owned()),
		("MIZU_API_BASE", server.base_url()),
	];

	ProxyConfig::from_lookup(|name| {
		vars.iter().find(|(key, _)| *key == name).map(|(_, value)| value.clone())
	})
	.expect("Test configuration should parse.")
}

fn build_relay(server: &MockServer, curator: (&str, &str)) -> (Relay, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CacheStore> = store_backend.clone();
	let relay = Relay::new(store, &build_config(server, curator))
		.expect("Relay should build against the mock server.");

	(relay, store_backend)
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"catalog-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await
}

#[tokio::test]
async fn listing_resolves_projects_and_caches() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_relay(&server, ("MIZU_CURATOR_URL", PROFILE));
	let token = mock_token(&server).await;
	let resolve = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/resolve")
				.query_param("url", PROFILE)
				.header("authorization", "OAuth catalog-token");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!({ "id": CURATOR_ID, "kind": "user" }).to_string());
		})
		.await;
	let tracks = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("/users/{CURATOR_ID}/tracks"))
				.header("authorization", "OAuth catalog-token");
			then.status(200).header("content-type", "application/json").body(
				json!([
					{
						"id": 1,
						"title": "Night Drive",
						"artwork_url": "https://img.example/1.jpg",
						"stream_url": format!("{}/tracks/1", server.base_url()),
						"playback_count": 9_000,
						"genre": "ambient",
					},
					{
						"id": 2,
						"title": "Dawn",
						"stream_url": format!("{}/tracks/2", server.base_url()),
					},
				])
				.to_string(),
			);
		})
		.await;
	let listed = relay.list_tracks().await.expect("Track listing should succeed.");

	assert_eq!(listed, vec![
		Track {
			id: 1,
			title: "Night Drive".into(),
			artwork_url: Some("https://img.example/1.jpg".into()),
			stream_url: format!("{}/tracks/1", server.base_url()),
		},
		Track {
			id: 2,
			title: "Dawn".into(),
			artwork_url: None,
			stream_url: format!("{}/tracks/2", server.base_url()),
		},
	]);

	token.assert_async().await;
	resolve.assert_async().await;
	tracks.assert_async().await;

	let cached = store
		.get(TRACKS_CACHE_KEY)
		.await
		.expect("Track cache lookup should succeed.")
		.expect("The listing should be cached.");

	assert_eq!(cached.ttl, Some(Duration::hours(1)));
	assert_eq!(
		serde_json::from_value::<Vec<Track>>(cached.value)
			.expect("Cached listing should decode."),
		listed,
	);
}

#[tokio::test]
async fn second_listing_is_served_from_cache() {
	let server = MockServer::start_async().await;
	let (relay, _store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));
	let token = mock_token(&server).await;
	let tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!([{ "id": 7, "title": "Loop", "stream_url": "s" }]).to_string());
		})
		.await;
	let first = relay.list_tracks().await.expect("First listing should succeed.");
	let second = relay.list_tracks().await.expect("Second listing should succeed.");

	assert_eq!(first, second);

	token.assert_calls_async(1).await;
	tracks.assert_calls_async(1).await;
}

#[tokio::test]
async fn configured_ttl_flows_into_the_cache_entry() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));
	let relay = relay.with_tracks_ttl(Duration::minutes(5));
	let _token = mock_token(&server).await;
	let _tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!([{ "id": 7, "title": "Loop", "stream_url": "s" }]).to_string());
		})
		.await;
	let _listed = relay.list_tracks().await.expect("Listing should succeed.");
	let cached = store
		.get(TRACKS_CACHE_KEY)
		.await
		.expect("Track cache lookup should succeed.")
		.expect("The listing should be cached.");

	assert_eq!(cached.ttl, Some(Duration::minutes(5)));
}

#[tokio::test]
async fn cached_listing_needs_no_upstream_at_all() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_relay(&server, ("MIZU_CURATOR_URL", PROFILE));
	let seeded =
		vec![Track { id: 9, title: "Seeded".into(), artwork_url: None, stream_url: "s".into() }];
	let value = serde_json::to_value(&seeded).expect("Seed listing should serialize.");

	store
		.put(TRACKS_CACHE_KEY, CacheEntry::new(value, Some(Duration::hours(1))))
		.await
		.expect("Seeding the track cache should succeed.");

	// No mocks are registered: any upstream call would fail the listing.
	let listed = relay.list_tracks().await.expect("Cached listing should succeed.");

	assert_eq!(listed, seeded);
}

#[tokio::test]
async fn undecodable_cached_listing_is_refetched_and_overwritten() {
	let server = MockServer::start_async().await;
	let (relay, store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));

	store
		.put(TRACKS_CACHE_KEY, CacheEntry::new(json!("garbage"), Some(Duration::hours(1))))
		.await
		.expect("Seeding the track cache should succeed.");

	let _token = mock_token(&server).await;
	let tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!([{ "id": 7, "title": "Loop", "stream_url": "s" }]).to_string());
		})
		.await;
	let listed = relay.list_tracks().await.expect("A garbage cache entry should act as a miss.");

	assert_eq!(listed.len(), 1);

	tracks.assert_async().await;

	let cached = store
		.get(TRACKS_CACHE_KEY)
		.await
		.expect("Track cache lookup should succeed.")
		.expect("The refetched listing should be cached.");

	assert_eq!(
		serde_json::from_value::<Vec<Track>>(cached.value)
			.expect("The overwritten listing should decode."),
		listed,
	);
}

#[tokio::test]
async fn numeric_curator_skips_resolution() {
	let server = MockServer::start_async().await;
	let (relay, _store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));
	let _token = mock_token(&server).await;
	let tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!([{ "id": 7, "title": "Loop", "stream_url": "s" }]).to_string());
		})
		.await;
	let listed = relay.list_tracks().await.expect("Listing by numeric curator should succeed.");

	assert_eq!(listed.len(), 1);

	tracks.assert_async().await;
}

#[tokio::test]
async fn unresolvable_curator_maps_to_not_found() {
	let server = MockServer::start_async().await;
	let (relay, _store) = build_relay(&server, ("MIZU_CURATOR_URL", PROFILE));
	let _token = mock_token(&server).await;
	let _resolve = server
		.mock_async(|when, then| {
			when.method(GET).path("/resolve");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!({ "kind": "unknown" }).to_string());
		})
		.await;
	let error = relay.list_tracks().await.expect_err("An id-less resolve body should fail.");

	assert!(matches!(error, Error::Upstream(UpstreamError::CuratorNotFound)));
	assert_eq!(error.status_code(), 404);
}

#[tokio::test]
async fn shape_drift_is_reported_not_served() {
	let server = MockServer::start_async().await;
	let (relay, _store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));
	let _token = mock_token(&server).await;
	let _tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(200)
				.header("content-type", "application/json")
				.body(json!({ "collection": [] }).to_string());
		})
		.await;
	let error = relay.list_tracks().await.expect_err("An object body should fail the listing.");

	assert!(matches!(
		error,
		Error::Upstream(UpstreamError::Format { endpoint: "track listing", .. }),
	));
	assert_eq!(error.status_code(), 500);
}

#[tokio::test]
async fn upstream_refusal_propagates_its_status() {
	let server = MockServer::start_async().await;
	let (relay, _store) = build_relay(&server, ("MIZU_CURATOR_ID", "77"));
	let _token = mock_token(&server).await;
	let _tracks = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/77/tracks");
			then.status(403)
				.header("content-type", "application/json")
				.body(json!({ "error": "forbidden" }).to_string());
		})
		.await;
	let error = relay.list_tracks().await.expect_err("A refused listing should fail.");

	assert!(matches!(error, Error::Upstream(UpstreamError::Status { status: 403 })));
	assert_eq!(error.status_code(), 403);
}
