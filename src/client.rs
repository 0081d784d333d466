//! The shared request pipeline.
//!
//! [`ApiClient`] owns everything one upstream API needs: the base address, two
//! credentials, the success policy, a [`RateLimiter`], lifetime counters, and an optional
//! [`SendHook`]. Provider crates call the typed operations (`get_json`, `get_xml`,
//! `download`, ...) and never touch the transport directly.
//!
//! Every operation follows the same path: assemble the address, build the descriptor and
//! inject credentials, run the hook, wait for the throttle window, send, apply the status
//! policy, decode. All of it races against the caller's [`CancellationToken`].

pub mod builder;
pub mod config;
pub mod metrics;

pub use builder::*;
pub use config::*;
pub use metrics::*;

// crates.io
use reqwest::{
	Response,
	header::{ACCEPT, HeaderValue, USER_AGENT},
};
use tokio::io::AsyncWrite;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	decode::{self, RawBody, XmlDocument},
	error::{ConfigError, StatusError},
	hook::SendHook,
	http::{self, ReqwestHttpClient},
	obs::{self, RequestOutcome, RequestSpan},
	query::{self, QueryParams},
	rate_limit::{RateLimitSnapshot, RateLimiter},
	request::{ContentKind, RequestBody, RequestDescriptor},
};

/// Client core shared by concurrent callers of one upstream API.
pub struct ApiClient {
	http_client: ReqwestHttpClient,
	base_address: Url,
	user_agent: Option<HeaderValue>,
	api_key: RwLock<Credential>,
	auth_token: RwLock<Credential>,
	ensure_success: AtomicBool,
	rate_limiter: RateLimiter,
	metrics: Arc<RequestMetrics>,
	send_hook: Arc<dyn SendHook>,
}
impl ApiClient {
	/// Starts a builder for `base_address`.
	pub fn builder(base_address: impl Into<String>) -> ApiClientBuilder {
		ApiClientBuilder::new(base_address)
	}

	/// Builds a client from declarative settings.
	pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
		ApiClientBuilder::try_from(config)?.build()
	}

	/// Base address every path is joined onto.
	pub fn base_address(&self) -> &Url {
		&self.base_address
	}

	/// Snapshot of the general-purpose API key.
	pub fn api_key(&self) -> Credential {
		self.api_key.read().clone()
	}

	/// Snapshot of the bearer or session token.
	pub fn auth_token(&self) -> Credential {
		self.auth_token.read().clone()
	}

	/// Replaces the API key value; applies to requests assembled afterwards.
	pub fn set_api_key_value(&self, value: impl Into<String>) {
		self.api_key.write().set_value(value);
	}

	/// Replaces the auth token value; applies to requests assembled afterwards.
	pub fn set_auth_token_value(&self, value: impl Into<String>) {
		self.auth_token.write().set_value(value);
	}

	/// Whether non-success statuses fail instead of yielding "no value".
	pub fn ensure_success(&self) -> bool {
		self.ensure_success.load(Ordering::SeqCst)
	}

	/// Switches the success policy.
	pub fn set_ensure_success(&self, enabled: bool) {
		self.ensure_success.store(enabled, Ordering::SeqCst);
	}

	/// Changes the per-window limit; `<= 0` means unlimited.
	pub fn set_max_requests_per_window(&self, max: i64) {
		self.rate_limiter.set_max_per_window(max);
	}

	/// Toggles waiting for the window; switching it off zeroes the window count.
	pub fn set_auto_wait(&self, enabled: bool) {
		self.rate_limiter.set_auto_wait(enabled);
	}

	/// The client's throttle.
	pub fn rate_limiter(&self) -> &RateLimiter {
		&self.rate_limiter
	}

	/// Requests that reached the upstream API over the client's lifetime.
	pub fn request_count(&self) -> u64 {
		self.metrics.sent()
	}

	/// Requests counted in the current throttle window.
	pub fn window_request_count(&self) -> u64 {
		self.rate_limiter.requests_in_window()
	}

	/// Whether the current window's budget is exhausted.
	pub fn is_at_limit(&self) -> bool {
		self.rate_limiter.is_at_limit()
	}

	/// Read-only view of the throttle state.
	pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
		self.rate_limiter.snapshot()
	}

	/// Shared lifetime counters.
	pub fn metrics(&self) -> Arc<RequestMetrics> {
		self.metrics.clone()
	}

	/// Joins the base address and `path`, then appends the query string.
	///
	/// Parameter keys are sorted. A usable query-placed API key is appended once unless
	/// `params` already carries its key.
	pub fn build_address(&self, path: &str, params: Option<&QueryParams>) -> Result<Url> {
		let api_key = self.api_key.read();
		let key_pair = api_key
			.query_pair()
			.map(|(k, v)| format!("{}={}", query::encode_component(k), query::encode_component(v)));
		let query = match params {
			None => key_pair,
			Some(params) => {
				let mut query = params.to_query_string();

				if let Some(pair) = key_pair.filter(|_| !params.contains_key(api_key.key())) {
					if !query.is_empty() {
						query.push('&');
					}

					query.push_str(&pair);
				}

				Some(query).filter(|q| !q.is_empty())
			},
		};
		let mut address = format!(
			"{}/{}",
			self.base_address.as_str().trim_end_matches('/'),
			path.trim().trim_start_matches('/')
		);

		if let Some(query) = query {
			address.push('?');
			address.push_str(&query);
		}

		Url::parse(&address)
			.map_err(|source| ConfigError::InvalidAddress { address, source }.into())
	}

	/// Creates a descriptor with the `Accept` and `User-Agent` headers and both credentials.
	pub fn build_request(
		&self,
		url: Url,
		method: Method,
		content_kind: ContentKind,
	) -> Result<RequestDescriptor> {
		let mut request = RequestDescriptor::new(method, url, content_kind);

		if let Some(accept) = content_kind.accept() {
			request.headers.insert(ACCEPT, HeaderValue::from_static(accept));
		}
		if let Some(user_agent) = &self.user_agent {
			request.headers.insert(USER_AGENT, user_agent.clone());
		}

		self.api_key.read().try_inject(&mut request)?;
		self.auth_token.read().try_inject(&mut request)?;

		Ok(request)
	}

	/// GETs `path` and decodes the body as lenient JSON.
	pub async fn get_json<T>(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		let request = self.prepare(path, params, Method::GET, ContentKind::Json)?;

		self.observe(ContentKind::Json, "get_json", cancel, Option::is_none, self.typed_json(request, cancel))
			.await
	}

	/// POSTs `body` as JSON to `path` and decodes the answer as lenient JSON.
	pub async fn post_json<B, T>(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		body: &B,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let request = self
			.prepare(path, params, Method::POST, ContentKind::Json)?
			.with_body(RequestBody::json(body)?);

		self.observe(ContentKind::Json, "post_json", cancel, Option::is_none, self.typed_json(request, cancel))
			.await
	}

	/// GETs `path` and decodes the body as the XML document `T`.
	pub async fn get_xml<T>(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: XmlDocument,
	{
		let request = self.prepare(path, params, Method::GET, ContentKind::Xml)?;

		self.observe(ContentKind::Xml, "get_xml", cancel, Option::is_none, self.typed_xml(request, cancel))
			.await
	}

	/// GETs `path` and hands the body back unread.
	pub async fn get_raw(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		cancel: &CancellationToken,
	) -> Result<Option<RawBody>> {
		let request = self.prepare(path, params, Method::GET, ContentKind::Raw)?;

		self.observe(ContentKind::Raw, "get_raw", cancel, Option::is_none, self.typed_raw(request, cancel))
			.await
	}

	/// GETs `path` and streams the body into `sink`, returning the bytes written.
	///
	/// Unlike the typed operations, "no content" and every non-success status fail
	/// regardless of the success policy.
	pub async fn download<W>(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		sink: &mut W,
		cancel: &CancellationToken,
	) -> Result<u64>
	where
		W: ?Sized + AsyncWrite + Unpin,
	{
		let request = self.prepare(path, params, Method::GET, ContentKind::Raw)?;

		self.observe(ContentKind::Raw, "download", cancel, |_| false, self.stream_into(request, sink, cancel))
			.await
	}

	/// Sends a prepared descriptor and decodes the body as lenient JSON.
	pub async fn fetch_json<T>(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		self.observe(request.content_kind, "fetch_json", cancel, Option::is_none, self.typed_json(request, cancel))
			.await
	}

	/// Sends a prepared descriptor and decodes the body as the XML document `T`.
	pub async fn fetch_xml<T>(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: XmlDocument,
	{
		self.observe(request.content_kind, "fetch_xml", cancel, Option::is_none, self.typed_xml(request, cancel))
			.await
	}

	/// Sends a prepared descriptor and hands the body back unread.
	pub async fn fetch_raw(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<RawBody>> {
		self.observe(request.content_kind, "fetch_raw", cancel, Option::is_none, self.typed_raw(request, cancel))
			.await
	}

	/// Sends a prepared descriptor and streams the body into `sink`.
	pub async fn fetch_into<W>(
		&self,
		request: RequestDescriptor,
		sink: &mut W,
		cancel: &CancellationToken,
	) -> Result<u64>
	where
		W: ?Sized + AsyncWrite + Unpin,
	{
		self.observe(request.content_kind, "fetch_into", cancel, |_| false, self.stream_into(request, sink, cancel))
			.await
	}

	/// Runs the hook, waits for the throttle, and sends `request`.
	///
	/// Counters move only once a response arrived. The status is not inspected.
	pub async fn send(
		&self,
		mut request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Response> {
		self.send_hook.before_send(&mut request);
		self.rate_limiter.wait_for_slot(cancel).await?;

		let response = with_cancel(cancel, self.http_client.execute(request.into_reqwest())).await?;

		self.metrics.record_sent();
		self.rate_limiter.record_request();

		Ok(response)
	}

	fn prepare(
		&self,
		path: &str,
		params: Option<&QueryParams>,
		method: Method,
		content_kind: ContentKind,
	) -> Result<RequestDescriptor> {
		let url = self.build_address(path, params)?;

		self.build_request(url, method, content_kind)
	}

	async fn observe<T, Fut>(
		&self,
		kind: ContentKind,
		stage: &'static str,
		cancel: &CancellationToken,
		is_absent: fn(&T) -> bool,
		operation: Fut,
	) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		let span = RequestSpan::new(kind, stage);

		obs::record_request_outcome(kind, RequestOutcome::Attempt);

		let result = span.instrument(with_cancel(cancel, operation)).await;
		let outcome = RequestOutcome::of(&result, is_absent);

		self.metrics.record(outcome);
		obs::record_request_outcome(kind, outcome);

		result
	}

	async fn typed_json<T>(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		match self.typed_response(request, cancel).await? {
			Some(response) => decode::json(response).await.map(Some),
			None => Ok(None),
		}
	}

	async fn typed_xml<T>(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<T>>
	where
		T: XmlDocument,
	{
		match self.typed_response(request, cancel).await? {
			Some(response) => decode::xml(response).await.map(Some),
			None => Ok(None),
		}
	}

	async fn typed_raw(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<RawBody>> {
		Ok(self.typed_response(request, cancel).await?.map(decode::raw))
	}

	async fn stream_into<W>(
		&self,
		request: RequestDescriptor,
		sink: &mut W,
		cancel: &CancellationToken,
	) -> Result<u64>
	where
		W: ?Sized + AsyncWrite + Unpin,
	{
		let response = self.send(request, cancel).await?;
		let status = response.status();

		if status == StatusCode::NO_CONTENT {
			return Err(Error::EmptyDownload { url: response.url().to_string() });
		}
		if !status.is_success() {
			return Err(status_error(response).await);
		}

		decode::copy_to(response, sink).await
	}

	/// Sends `request` and applies the success policy.
	///
	/// `None` means "no value": either the upstream answered `204 No Content` or it
	/// answered a non-success status while the policy is tolerant.
	async fn typed_response(
		&self,
		request: RequestDescriptor,
		cancel: &CancellationToken,
	) -> Result<Option<Response>> {
		let response = self.send(request, cancel).await?;
		let status = response.status();

		if status.is_success() {
			return Ok((status != StatusCode::NO_CONTENT).then_some(response));
		}
		if self.ensure_success() {
			return Err(status_error(response).await);
		}

		Ok(None)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_address", &self.base_address.as_str())
			.field("api_key", &*self.api_key.read())
			.field("auth_token", &*self.auth_token.read())
			.field("ensure_success", &self.ensure_success())
			.field("rate_limiter", &self.rate_limiter.snapshot())
			.finish()
	}
}

async fn with_cancel<T, Fut>(cancel: &CancellationToken, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Cancelled),
		result = fut => result,
	}
}

async fn status_error(mut response: Response) -> Error {
	let retry_after = http::parse_retry_after(response.headers());
	let error = StatusError::new(response.status(), response.url()).with_retry_after(retry_after);
	let mut head = Vec::new();

	// The body is only a diagnostic; stop at the preview bound and leave the rest unread.
	while head.len() < StatusError::BODY_PREVIEW_BYTES {
		match response.chunk().await {
			Ok(Some(chunk)) => head.extend_from_slice(&chunk),
			Ok(None) | Err(_) => break,
		}
	}

	head.truncate(StatusError::BODY_PREVIEW_BYTES);

	error.with_body_preview(&String::from_utf8_lossy(&head)).into()
}
