//! Process configuration assembled from the environment.

// std
use std::{net::SocketAddr, path::PathBuf};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

const ENV_CLIENT_ID: &str = "SC_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "SC_CLIENT_SECRET";
const ENV_CURATOR_URL: &str = "MIZU_CURATOR_URL";
const ENV_CURATOR_ID: &str = "MIZU_CURATOR_ID";
const ENV_API_BASE: &str = "MIZU_API_BASE";
const ENV_BIND_ADDR: &str = "MIZU_BIND_ADDR";
const ENV_CACHE_PATH: &str = "MIZU_CACHE_PATH";
const ENV_TRACKS_TTL_SECS: &str = "MIZU_TRACKS_TTL_SECS";
const DEFAULT_API_BASE: &str = "https://api.soundcloud.com";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8464";
const DEFAULT_TRACKS_TTL: Duration = Duration::hours(1);
// Upper bound on the configurable track-list TTL; keeps every stored expiry representable.
const MAX_TRACKS_TTL: Duration = Duration::days(365);

/// Upstream client credentials supplied through the environment.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// OAuth client identifier; also signs resolved stream URLs.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
}

/// Locator for the curated account whose tracks the relay serves.
#[derive(Clone, Debug)]
pub enum CuratorRef {
	/// Public profile URL, resolved to a numeric account id upstream once per process.
	ProfileUrl(Url),
	/// Numeric account id; the resolve round-trip is skipped entirely.
	UserId(u64),
}

/// Fully parsed relay configuration.
///
/// Absent credentials are tolerated here so the service can boot and report a configuration
/// error per request instead of crash-looping; every other malformed value fails startup.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
	/// Client credentials, when both halves are present.
	pub credentials: Option<Credentials>,
	/// Curated account locator.
	pub curator: CuratorRef,
	/// Upstream API base URL.
	pub api_base: Url,
	/// Socket address the HTTP surface binds to.
	pub bind_addr: SocketAddr,
	/// Snapshot path for the file-backed cache; in-memory when absent.
	pub cache_path: Option<PathBuf>,
	/// Lifetime of the cached track list.
	pub tracks_ttl: Duration,
}
impl ProxyConfig {
	/// Assembles the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Assembles the configuration from an arbitrary variable lookup.
	///
	/// Tests inject lookups directly instead of mutating the process environment.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let credentials = match (lookup(ENV_CLIENT_ID), lookup(ENV_CLIENT_SECRET)) {
			(Some(client_id), Some(secret)) =>
				Some(Credentials { client_id, client_secret: Secret::new(secret) }),
			_ => None,
		};
		let curator = match (lookup(ENV_CURATOR_URL), lookup(ENV_CURATOR_ID)) {
			(Some(_), Some(_)) => return Err(ConfigError::CuratorConflict),
			(None, None) => return Err(ConfigError::MissingCurator),
			(Some(raw), None) => {
				let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidVar {
					name: ENV_CURATOR_URL,
					message: e.to_string(),
				})?;

				CuratorRef::ProfileUrl(url)
			},
			(None, Some(raw)) => {
				let id = raw.parse::<u64>().map_err(|e| ConfigError::InvalidVar {
					name: ENV_CURATOR_ID,
					message: e.to_string(),
				})?;

				CuratorRef::UserId(id)
			},
		};
		let api_base = lookup(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.into());
		let api_base = Url::parse(&api_base)
			.map_err(|e| ConfigError::InvalidVar { name: ENV_API_BASE, message: e.to_string() })?;
		let bind_addr = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
		let bind_addr = bind_addr
			.parse::<SocketAddr>()
			.map_err(|e| ConfigError::InvalidVar { name: ENV_BIND_ADDR, message: e.to_string() })?;
		let cache_path = lookup(ENV_CACHE_PATH).map(PathBuf::from);
		let tracks_ttl = match lookup(ENV_TRACKS_TTL_SECS) {
			Some(raw) => {
				let secs = raw
					.parse::<i64>()
					.ok()
					.filter(|secs| (1..=MAX_TRACKS_TTL.whole_seconds()).contains(secs))
					.ok_or_else(|| ConfigError::InvalidVar {
						name: ENV_TRACKS_TTL_SECS,
						message: format!(
							"`{raw}` is not between 1 and {} seconds",
							MAX_TRACKS_TTL.whole_seconds(),
						),
					})?;

				Duration::seconds(secs)
			},
			None => DEFAULT_TRACKS_TTL,
		};

		Ok(Self { credentials, curator, api_base, bind_addr, cache_path, tracks_ttl })
	}
}
