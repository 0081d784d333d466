//! Transport primitives for the request pipeline.
//!
//! [`ReqwestHttpClient`] wraps the reqwest connection pool. Unless a caller supplies its
//! own client, every [`ApiClient`](crate::client::ApiClient) shares the process-wide pool
//! returned by [`ReqwestHttpClient::shared`], built lazily on first use and kept until the
//! process exits.

// std
use std::{ops::Deref, sync::OnceLock};
// crates.io
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::{OffsetDateTime, format_description::well_known::Rfc2822};
// self
use crate::{_prelude::*, error::ConfigError};

static SHARED_CLIENT: OnceLock<ReqwestHttpClient> = OnceLock::new();

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
	const POOL_MAX_IDLE_PER_HOST: usize = 10;

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a dedicated pool with the crate's connection defaults.
	pub fn dedicated() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(Self::CONNECT_TIMEOUT)
			.pool_max_idle_per_host(Self::POOL_MAX_IDLE_PER_HOST)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Returns the process-wide pool, constructing it on first use.
	///
	/// Falls back to reqwest's default client if the tuned builder fails.
	pub fn shared() -> Self {
		SHARED_CLIENT.get_or_init(|| Self::dedicated().unwrap_or_default()).clone()
	}

	pub(crate) async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
		self.0.execute(request).await.map_err(|e| Error::Transport(e.into()))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Parses `Retry-After` as delta-seconds or an RFC 2822 date in the future.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Duration::try_from(delta).ok();
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_seconds_and_dates() {
		let mut headers = HeaderMap::new();

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None, "Past dates carry no hint.");

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn shared_pool_is_constructed_once() {
		let first = ReqwestHttpClient::shared();
		let second = ReqwestHttpClient::shared();

		assert!(SHARED_CLIENT.get().is_some());
		assert_eq!(format!("{first:?}"), format!("{second:?}"));
	}
}
