//! High-level relay flows: token acquisition, catalog listing, and stream relay.

mod catalog;
mod stream;
mod token;

pub use stream::AudioStream;

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::{Credentials, CuratorRef, ProxyConfig},
	error::ConfigError,
	http::Connector,
	store::CacheStore,
	upstream::UpstreamDescriptor,
};

/// Cache key holding the serialized access token.
///
/// The entry carries no TTL; staleness is judged by the token's own expiry so the record
/// stays available as the last-known-good fallback after a failed refresh.
pub const TOKEN_CACHE_KEY: &str = "mizu:token";
/// Cache key holding the projected track list.
pub const TRACKS_CACHE_KEY: &str = "mizu:tracks";

/// Coordinates every upstream interaction behind the relay's HTTP surface.
///
/// The relay owns the HTTP connector, cache backend, upstream descriptor, and credentials
/// so individual flows can focus on their own sequencing. One instance is constructed per
/// process and handed to request handlers explicitly; there is no global token state.
#[derive(Clone)]
pub struct Relay {
	/// HTTP connector used for every outbound request.
	pub connector: Connector,
	/// Cache backend persisting the token and the track list.
	pub store: Arc<dyn CacheStore>,
	/// Upstream endpoint map.
	pub upstream: UpstreamDescriptor,
	/// Client credentials, when both halves were configured.
	pub credentials: Option<Credentials>,
	/// Curated account locator.
	pub curator: CuratorRef,
	tracks_ttl: Duration,
	refresh_margin: Duration,
	token_slot: Arc<RwLock<Option<AccessToken>>>,
	resolved_curator: Arc<RwLock<Option<u64>>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl Relay {
	/// Creates a relay with its own connector for the provided configuration.
	pub fn new(store: Arc<dyn CacheStore>, config: &ProxyConfig) -> Result<Self> {
		let connector = Connector::new()?;

		Self::with_connector(store, config, connector)
	}

	/// Creates a relay that reuses a caller-provided connector.
	pub fn with_connector(
		store: Arc<dyn CacheStore>,
		config: &ProxyConfig,
		connector: Connector,
	) -> Result<Self> {
		let upstream = UpstreamDescriptor::new(config.api_base.clone())?;

		Ok(Self {
			connector,
			store,
			upstream,
			credentials: config.credentials.clone(),
			curator: config.curator.clone(),
			tracks_ttl: config.tracks_ttl,
			refresh_margin: Duration::ZERO,
			token_slot: Default::default(),
			resolved_curator: Default::default(),
			refresh_guard: Default::default(),
		})
	}

	/// Overrides the track-list cache lifetime.
	pub fn with_tracks_ttl(mut self, ttl: Duration) -> Self {
		self.tracks_ttl = ttl;

		self
	}

	/// Keeps `margin` of token lifetime in hand, refreshing that much before expiry.
	///
	/// The default margin is zero: any token whose expiry lies in the future is reused
	/// as-is and triggers no upstream traffic.
	pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
		self.refresh_margin = margin;

		self
	}

	pub(crate) fn require_credentials(&self) -> Result<&Credentials, ConfigError> {
		self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)
	}
}
impl Debug for Relay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("upstream", &self.upstream)
			.field("curator", &self.curator)
			.field("credentials_set", &self.credentials.is_some())
			.finish()
	}
}

/// Formats the authorization header value for upstream API calls.
///
/// The upstream expects the legacy `OAuth` scheme, not `Bearer`.
pub(crate) fn oauth_header(token: &AccessToken) -> String {
	format!("OAuth {}", token.secret.expose())
}
