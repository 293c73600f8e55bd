//! Access-token flow: cached reuse, single-flight refresh, stale degradation.
//!
//! Lookup order is the in-process slot, then the cache backend, then one upstream exchange
//! behind a single-flight guard. A failed exchange degrades to the last previously issued
//! token when one exists anywhere, surfacing only a warning; the canonical unobtainable
//! error is reserved for a failure with nothing to fall back on.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, HttpClientError, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::Credentials,
	error::AuthError,
	flows::{Relay, TOKEN_CACHE_KEY},
	http::{ResponseMetadata, ResponseMetadataSlot},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CacheEntry, StoreError},
};

/// Classification of one failed exchange, logged before the flow degrades or gives up.
struct RefreshFailure {
	status: Option<u16>,
	retry_after: Option<Duration>,
	message: String,
}
impl RefreshFailure {
	fn invalid(meta: Option<ResponseMetadata>, cause: AuthError) -> Self {
		Self {
			status: meta.as_ref().and_then(|meta| meta.status),
			retry_after: meta.as_ref().and_then(|meta| meta.retry_after),
			message: cause.to_string(),
		}
	}
}

impl Relay {
	/// Returns a usable access token, touching the network only when required.
	pub async fn access_token(&self) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::Token;

		let span = FlowSpan::new(KIND, "access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.access_token_inner()).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn access_token_inner(&self) -> Result<AccessToken> {
		let now = OffsetDateTime::now_utc();

		if let Some(token) = self.fresh_from_slot(now) {
			return Ok(token);
		}
		if let Some(token) = self.fresh_from_store(now).await? {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Losers of the guard race piggy-back on the winner's refresh.
		if let Some(token) = self.fresh_from_slot(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let credentials = self.require_credentials()?;

		match self.exchange(credentials).await {
			Ok(token) => {
				self.remember(&token).await?;

				Ok(token)
			},
			Err(failure) => self.degrade_to_stale(failure).await,
		}
	}

	fn fresh_from_slot(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.token_slot
			.read()
			.as_ref()
			.filter(|token| token.is_fresh_at(now, self.refresh_margin))
			.cloned()
	}

	async fn fresh_from_store(&self, now: OffsetDateTime) -> Result<Option<AccessToken>> {
		let Some(entry) = self.store.get(TOKEN_CACHE_KEY).await? else {
			return Ok(None);
		};
		let token = match serde_json::from_value::<AccessToken>(entry.value) {
			Ok(token) => token,
			Err(e) => {
				tracing::warn!(error = %e, "Discarding an undecodable cached token.");

				return Ok(None);
			},
		};

		if !token.is_fresh_at(now, self.refresh_margin) {
			return Ok(None);
		}

		// Promote so later lookups skip the store entirely.
		*self.token_slot.write() = Some(token.clone());

		Ok(Some(token))
	}

	async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, RefreshFailure> {
		let token_url = TokenUrl::from_url(self.upstream.token_endpoint().clone());
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			// Secrets travel in the form body; the upstream rejects HTTP Basic.
			.set_auth_type(AuthType::RequestBody);
		let slot = ResponseMetadataSlot::default();
		let handle = self.connector.instrumented(slot.clone());
		let response = match oauth_client.exchange_client_credentials().request_async(&handle).await
		{
			Ok(response) => response,
			Err(e) => return Err(classify_exchange_error(slot.take(), e)),
		};
		let meta = slot.take();
		let Some(expires_in) = response.expires_in() else {
			return Err(RefreshFailure::invalid(meta, AuthError::MissingExpiresIn));
		};
		let issued_at = OffsetDateTime::now_utc();
		// The lifetime must be positive and leave `issued_at + lifetime` representable.
		let lifetime = match i64::try_from(expires_in.as_secs()) {
			Ok(secs) if secs > 0 && issued_at.checked_add(Duration::seconds(secs)).is_some() =>
				Duration::seconds(secs),
			_ => return Err(RefreshFailure::invalid(meta, AuthError::ExpiresInOutOfRange)),
		};

		Ok(AccessToken::issue(response.access_token().secret().to_owned(), issued_at, lifetime))
	}

	async fn remember(&self, token: &AccessToken) -> Result<()> {
		*self.token_slot.write() = Some(token.clone());

		let value = serde_json::to_value(token)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		// No TTL: the record must remain readable as the last-known-good fallback.
		self.store.put(TOKEN_CACHE_KEY, CacheEntry::new(value, None)).await?;

		Ok(())
	}

	async fn degrade_to_stale(&self, failure: RefreshFailure) -> Result<AccessToken> {
		if let Some(stale) = self.last_known_token().await {
			tracing::warn!(
				status = ?failure.status,
				retry_after = ?failure.retry_after,
				"{} Serving the last-known-good token instead.",
				failure.message,
			);

			return Ok(stale);
		}

		tracing::warn!(
			status = ?failure.status,
			retry_after = ?failure.retry_after,
			"{} No previously issued token is available.",
			failure.message,
		);

		Err(AuthError::Unobtainable { status: failure.status }.into())
	}

	async fn last_known_token(&self) -> Option<AccessToken> {
		if let Some(token) = self.token_slot.read().clone() {
			return Some(token);
		}

		match self.store.get(TOKEN_CACHE_KEY).await {
			Ok(Some(entry)) => serde_json::from_value(entry.value).ok(),
			Ok(None) => None,
			Err(e) => {
				tracing::warn!(error = %e, "Cache lookup failed while degrading to a stale token.");

				None
			},
		}
	}
}

fn classify_exchange_error(
	meta: Option<ResponseMetadata>,
	error: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> RefreshFailure {
	let status = meta.as_ref().and_then(|meta| meta.status);
	let retry_after = meta.as_ref().and_then(|meta| meta.retry_after);
	let message = match error {
		RequestTokenError::ServerResponse(response) => match response.error_description() {
			Some(description) => format!("Token endpoint returned an OAuth error: {description}."),
			None => format!(
				"Token endpoint returned an OAuth error: {}.",
				response.error().as_ref(),
			),
		},
		RequestTokenError::Request(source) => format!("Token endpoint request failed: {source}."),
		RequestTokenError::Parse(source, _body) =>
			format!("Token endpoint returned malformed JSON: {source}."),
		RequestTokenError::Other(message) =>
			format!("Token endpoint returned an unexpected response: {message}."),
	};

	RefreshFailure { status, retry_after, message }
}
