//! Upstream API descriptor shared by all flows.

pub mod schema;

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable endpoint map for the upstream API, derived from one base URL.
///
/// Every flow derives its request URLs from here, so pointing `MIZU_API_BASE` at a mock
/// server redirects the whole relay without touching flow code.
#[derive(Clone, Debug)]
pub struct UpstreamDescriptor {
	api_base: Url,
	token: Url,
}
impl UpstreamDescriptor {
	/// Builds a descriptor for the provided API origin.
	pub fn new(api_base: Url) -> Result<Self, ConfigError> {
		let token = Self::join(&api_base, "oauth2/token")?;

		Ok(Self { api_base, token })
	}

	/// Token endpoint receiving the form-encoded client-credentials grant.
	pub fn token_endpoint(&self) -> &Url {
		&self.token
	}

	/// Resolve endpoint translating a public profile URL into an account record.
	pub fn resolve_endpoint(&self, profile: &Url) -> Result<Url, ConfigError> {
		let mut url = Self::join(&self.api_base, "resolve")?;

		url.query_pairs_mut().append_pair("url", profile.as_str());

		Ok(url)
	}

	/// Track listing endpoint for the provided account id.
	pub fn user_tracks_endpoint(&self, user_id: u64) -> Result<Url, ConfigError> {
		Self::join(&self.api_base, &format!("users/{user_id}/tracks"))
	}

	/// Returns `true` if `url` lives on the configured API origin.
	///
	/// Caller-supplied track URLs must pass this check before any request is issued, so the
	/// relay cannot be used as an open proxy against arbitrary hosts.
	pub fn trusts(&self, url: &Url) -> bool {
		url.scheme() == self.api_base.scheme()
			&& url.host_str() == self.api_base.host_str()
			&& url.port_or_known_default() == self.api_base.port_or_known_default()
	}

	fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
		base.join(path).map_err(|e| ConfigError::InvalidDescriptor { source: e })
	}
}
