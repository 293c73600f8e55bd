//! Stream relay: origin gate, metadata fetch, progressive selection, signed-URL pipe.

// std
use std::io;
// crates.io
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	error::{StreamError, UpstreamError},
	flows::{self, Relay},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	upstream::schema::{self, ResolvedStream, TrackMetadata},
};

/// Relayed audio stream handed to the HTTP surface.
///
/// Chunks are pulled from the media host only as the consumer polls, so downstream
/// backpressure and disconnects propagate upstream without buffering the payload.
pub struct AudioStream {
	/// Total byte length advertised by the media host, when known.
	pub content_length: Option<u64>,
	/// Chunked MPEG-audio body.
	pub stream: BoxStream<'static, io::Result<Bytes>>,
}
impl Debug for AudioStream {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AudioStream")
			.field("content_length", &self.content_length)
			.finish_non_exhaustive()
	}
}

impl Relay {
	/// Opens the progressive audio stream behind an upstream track metadata URL.
	pub async fn open_stream(&self, track_url: &Url) -> Result<AudioStream> {
		const KIND: FlowKind = FlowKind::Stream;

		let span = FlowSpan::new(KIND, "open_stream");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.open_stream_inner(track_url)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn open_stream_inner(&self, track_url: &Url) -> Result<AudioStream> {
		if !self.upstream.trusts(track_url) {
			return Err(StreamError::UntrustedTrackUrl.into());
		}

		let token = self.access_token().await?;
		// The signing step needs the raw client id even when the token came from cache.
		let credentials = self.require_credentials()?;
		let response = self
			.connector
			.api_get(track_url.clone())
			.header(AUTHORIZATION, flows::oauth_header(&token))
			.send()
			.await
			.map_err(UpstreamError::from)?;
		let status = response.status();

		if !status.is_success() {
			return Err(UpstreamError::Status { status: status.as_u16() }.into());
		}

		let bytes = response.bytes().await.map_err(UpstreamError::from)?;
		let metadata: TrackMetadata = schema::decode("track metadata", &bytes)?;
		let transcoding =
			metadata.progressive_transcoding().ok_or(StreamError::NoProgressiveTranscoding)?;
		let mut resolve_url = Url::parse(&transcoding.url).map_err(|_| StreamError::Resolution)?;

		// The transcoding endpoint authenticates with the bare client id; the OAuth token
		// is deliberately not sent.
		resolve_url.query_pairs_mut().append_pair("client_id", &credentials.client_id);

		let response =
			self.connector.api_get(resolve_url).send().await.map_err(UpstreamError::from)?;
		let bytes = response.bytes().await.map_err(UpstreamError::from)?;
		let resolved: ResolvedStream = schema::decode("stream resolution", &bytes)?;
		let media_url = resolved
			.url
			.filter(|url| !url.is_empty())
			.and_then(|url| Url::parse(&url).ok())
			.ok_or(StreamError::Resolution)?;
		// The signed URL embeds its own authorization; no headers are attached.
		let response =
			self.connector.media_get(media_url).send().await.map_err(UpstreamError::from)?;
		let status = response.status();

		if !status.is_success() {
			return Err(StreamError::Unavailable { status: status.as_u16() }.into());
		}

		let content_length = response.content_length();
		let stream = response.bytes_stream().map_err(io::Error::other).boxed();

		Ok(AudioStream { content_length, stream })
	}
}
