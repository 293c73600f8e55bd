//! Public HTTP surface: the track listing, the audio relay, and a liveness check.

// crates.io
use axum::{
	Json, Router,
	body::Body,
	extract::{Query, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	error::StreamError,
	flows::Relay,
	store::{CacheEntry, StoreError},
	upstream::schema::Track,
};

const HEALTH_CACHE_KEY: &str = "mizu:healthz";

/// Builds the relay router with all public routes attached.
pub fn router(relay: Relay) -> Router {
	Router::new()
		.route("/tracks", get(tracks))
		.route("/stream", get(stream))
		.route("/healthz", get(healthz))
		.with_state(Arc::new(relay))
}

/// Serves the relay on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, relay: Relay) -> std::io::Result<()> {
	if let Ok(addr) = listener.local_addr() {
		tracing::info!(%addr, "Listening.");
	}

	axum::serve(listener, router(relay)).await
}

/// Query parameters accepted by the stream route.
#[derive(Debug, Deserialize)]
struct StreamQuery {
	#[serde(rename = "trackUrl")]
	track_url: Option<String>,
}

async fn tracks(State(relay): State<Arc<Relay>>) -> Result<Json<Vec<Track>>, ApiError> {
	let tracks = relay.list_tracks().await?;

	Ok(Json(tracks))
}

async fn stream(
	State(relay): State<Arc<Relay>>,
	Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
	let Some(raw) = query.track_url.filter(|url| !url.is_empty()) else {
		return Err(ApiError::missing_track_url());
	};
	let track_url =
		Url::parse(&raw).map_err(|_| Error::from(StreamError::UntrustedTrackUrl))?;
	let audio = relay.open_stream(&track_url).await?;
	let mut response =
		([(header::CONTENT_TYPE, "audio/mpeg")], Body::from_stream(audio.stream)).into_response();

	if let Some(length) = audio.content_length {
		// Advertise the full length so players can seek; the body itself stays chunked
		// from upstream.
		response.headers_mut().insert(header::CONTENT_LENGTH, header::HeaderValue::from(length));
	}

	Ok(response)
}

async fn healthz(State(relay): State<Arc<Relay>>) -> Result<Json<serde_json::Value>, ApiError> {
	let canary = json!({ "status": "ok" });

	relay
		.store
		.put(HEALTH_CACHE_KEY, CacheEntry::new(canary.clone(), Some(Duration::seconds(60))))
		.await
		.map_err(Error::from)?;

	let read_back = relay
		.store
		.get(HEALTH_CACHE_KEY)
		.await
		.map_err(Error::from)?
		.is_some_and(|entry| entry.value == canary);

	if !read_back {
		return Err(Error::from(StoreError::Backend {
			message: "Health check read back a missing or different value".into(),
		})
		.into());
	}

	Ok(Json(canary))
}

/// Error envelope rendered as the JSON `{"error": …}` body.
#[derive(Debug)]
struct ApiError {
	status: StatusCode,
	message: String,
}
impl ApiError {
	fn missing_track_url() -> Self {
		Self { status: StatusCode::BAD_REQUEST, message: "Missing track URL".into() }
	}
}
impl From<Error> for ApiError {
	fn from(error: Error) -> Self {
		let status = StatusCode::from_u16(error.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		Self { status, message: error.to_string() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		tracing::warn!(status = %self.status, error = %self.message, "Request failed.");

		(self.status, Json(json!({ "error": self.message }))).into_response()
	}
}
