//! Access-token records and the secret wrapper that keeps credentials out of logs.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping credential material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Immutable record describing one issued client-credentials token.
///
/// The expiry instant is computed once, at issue time; freshness checks afterwards are pure
/// clock comparisons and never re-derive the lifetime.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: Secret,
	/// Issue instant recorded when the token endpoint responded.
	pub issued_at: OffsetDateTime,
	/// Expiry instant, `issued_at` plus the granted lifetime.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Stamps a freshly granted token with its issue instant and lifetime.
	pub fn issue(secret: impl Into<String>, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self { secret: Secret::new(secret), issued_at, expires_at: issued_at + lifetime }
	}

	/// Returns `true` if the token is still usable at `instant`, keeping `margin` of remaining
	/// lifetime in hand.
	///
	/// With a zero margin any token whose expiry lies in the future is fresh, so repeated
	/// lookups within the lifetime trigger no upstream traffic at all.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		// A margin the expiry instant cannot absorb leaves no usable lifetime at all.
		self.expires_at.checked_sub(margin).is_some_and(|deadline| instant < deadline)
	}

	/// Convenience helper that checks freshness against the current UTC instant.
	pub fn is_fresh(&self, margin: Duration) -> bool {
		self.is_fresh_at(OffsetDateTime::now_utc(), margin)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
