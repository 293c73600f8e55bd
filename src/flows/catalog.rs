//! Curated track listing: cache-first lookup, curator resolution, defensive projection.

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::CuratorRef,
	error::UpstreamError,
	flows::{self, Relay, TRACKS_CACHE_KEY},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CacheEntry, StoreError},
	upstream::schema::{self, ResolvedAccount, Track},
};

impl Relay {
	/// Lists the curated account's tracks in the public projection.
	pub async fn list_tracks(&self) -> Result<Vec<Track>> {
		const KIND: FlowKind = FlowKind::Catalog;

		let span = FlowSpan::new(KIND, "list_tracks");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.list_tracks_inner()).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn list_tracks_inner(&self) -> Result<Vec<Track>> {
		// A warm cache answers before any token work happens.
		if let Some(entry) = self.store.get(TRACKS_CACHE_KEY).await? {
			match serde_json::from_value::<Vec<Track>>(entry.value) {
				Ok(tracks) => return Ok(tracks),
				Err(e) =>
					tracing::warn!(error = %e, "Discarding an undecodable cached track list."),
			}
		}

		let token = self.access_token().await?;
		let user_id = self.curator_id(&token).await?;
		let endpoint = self.upstream.user_tracks_endpoint(user_id)?;
		let response = self
			.connector
			.api_get(endpoint)
			.header(AUTHORIZATION, flows::oauth_header(&token))
			.send()
			.await
			.map_err(UpstreamError::from)?;
		let status = response.status();

		if !status.is_success() {
			return Err(UpstreamError::Status { status: status.as_u16() }.into());
		}

		let bytes = response.bytes().await.map_err(UpstreamError::from)?;
		let tracks: Vec<Track> = schema::decode("track listing", &bytes)?;
		let value = serde_json::to_value(&tracks)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.store.put(TRACKS_CACHE_KEY, CacheEntry::new(value, Some(self.tracks_ttl))).await?;

		Ok(tracks)
	}

	/// Resolves the curated account id, memoizing the answer for the process lifetime.
	async fn curator_id(&self, token: &AccessToken) -> Result<u64> {
		if let Some(id) = *self.resolved_curator.read() {
			return Ok(id);
		}

		let id = match &self.curator {
			CuratorRef::UserId(id) => *id,
			CuratorRef::ProfileUrl(profile) => {
				let endpoint = self.upstream.resolve_endpoint(profile)?;
				let response = self
					.connector
					.api_get(endpoint)
					.header(AUTHORIZATION, flows::oauth_header(token))
					.send()
					.await
					.map_err(UpstreamError::from)?;
				// The resolve endpoint reports failure through a body without `id`, not
				// through the status code.
				let bytes = response.bytes().await.map_err(UpstreamError::from)?;
				let account: ResolvedAccount = schema::decode("resolve", &bytes)?;

				account.id.ok_or(UpstreamError::CuratorNotFound)?
			},
		};

		*self.resolved_curator.write() = Some(id);

		Ok(id)
	}
}
