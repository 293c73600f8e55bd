//! Shared HTTP transport for token exchanges, catalog calls, and media relays.
//!
//! One [`Connector`] is built at startup and cloned into every flow. Token exchanges go
//! through [`Connector::instrumented`], an [`AsyncHttpClient`] adapter that records the
//! upstream status and Retry-After hint in a [`ResponseMetadataSlot`] so refresh failures
//! can be classified after `oauth2` resolves.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Per-request timeout applied to token, resolve, and catalog calls.
///
/// Media fetches deliberately carry no total timeout; a long track outlives any sane value
/// and the connect timeout on the client already bounds dead upstreams.
const API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// The relay creates a fresh slot for each token request and reads the captured metadata
/// immediately after `oauth2` resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone)]
pub struct Connector(pub ReqwestClient);
impl Connector {
	/// Builds the shared client with the relay's connect timeout.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Starts an upstream API request carrying the standard per-request timeout.
	pub fn api_get(&self, url: Url) -> reqwest::RequestBuilder {
		self.0.get(url).timeout(API_TIMEOUT)
	}

	/// Starts a media fetch; no total timeout so long tracks are never severed mid-play.
	pub fn media_get(&self, url: Url) -> reqwest::RequestBuilder {
		self.0.get(url)
	}

	/// Builds an instrumented token-exchange handle that captures response metadata.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot, API_TIMEOUT)
	}
}
impl AsRef<ReqwestClient> for Connector {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for Connector {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
	timeout: std::time::Duration,
}

/// Handle handed to `oauth2` for the duration of one token exchange.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(
		client: ReqwestClient,
		slot: ResponseMetadataSlot,
		timeout: std::time::Duration,
	) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot, timeout }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			// The protocol-request conversion leaves reqwest's per-request timeout unset.
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(client.timeout);

			let response = client.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
