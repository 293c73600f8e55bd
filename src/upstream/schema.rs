//! Typed upstream response records and defensive decoding.
//!
//! Every upstream body passes through [`decode`], so a shape drift surfaces as a structured
//! [`UpstreamError::Format`] carrying the failing JSON path instead of a panic deep inside a
//! handler. The record types double as projections: whatever they do not name is dropped.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::UpstreamError};

const PROGRESSIVE_PROTOCOL: &str = "progressive";

/// Decodes an upstream JSON body into `T`, attaching the failing path on mismatch.
pub fn decode<T>(endpoint: &'static str, bytes: &[u8]) -> Result<T, UpstreamError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| UpstreamError::Format { endpoint, source: e })
}

/// Account record returned by the resolve endpoint; only the id is consumed.
#[derive(Debug, Deserialize)]
pub struct ResolvedAccount {
	/// Numeric account id, absent when the profile did not resolve.
	pub id: Option<u64>,
}

/// One track in the shape served to the browser.
///
/// Deserializing an upstream catalog entry through this type IS the projection: the four
/// fields below survive, everything else the upstream attaches is discarded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
	/// Upstream track id.
	pub id: u64,
	/// Display title.
	pub title: String,
	/// Artwork URL, when the upload carries one.
	pub artwork_url: Option<String>,
	/// Upstream metadata URL the stream endpoint accepts as `trackUrl`.
	pub stream_url: String,
}

/// Track metadata fetched from a `trackUrl`; only the transcoding list is consumed.
#[derive(Debug, Deserialize)]
pub struct TrackMetadata {
	/// Media container, absent on tracks without published encodings.
	pub media: Option<Media>,
}
impl TrackMetadata {
	/// First transcoding whose protocol is plain progressive; segmented protocols are skipped.
	pub fn progressive_transcoding(&self) -> Option<&Transcoding> {
		self.media
			.as_ref()?
			.transcodings
			.iter()
			.find(|transcoding| transcoding.format.protocol == PROGRESSIVE_PROTOCOL)
	}
}

/// Published encodings of one track.
#[derive(Debug, Deserialize)]
pub struct Media {
	/// Available transcodings, possibly empty.
	#[serde(default)]
	pub transcodings: Vec<Transcoding>,
}

/// One published encoding of a track.
#[derive(Debug, Deserialize)]
pub struct Transcoding {
	/// Resolution endpoint that exchanges the client id for a signed media URL.
	pub url: String,
	/// Encoding format descriptor.
	pub format: TranscodingFormat,
}

/// Format descriptor attached to a transcoding.
#[derive(Debug, Deserialize)]
pub struct TranscodingFormat {
	/// Delivery protocol, `progressive` for plain HTTP audio.
	pub protocol: String,
}

/// Signed-URL envelope returned by the transcoding resolution endpoint.
#[derive(Debug, Deserialize)]
pub struct ResolvedStream {
	/// Pre-signed media URL, absent when resolution failed upstream.
	pub url: Option<String>,
}
