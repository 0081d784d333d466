//! Fluent construction and validation of [`ApiClient`] values.

// crates.io
use reqwest::header::{HeaderValue, USER_AGENT};
// self
use crate::{
	_prelude::*,
	auth::{Credential, Placement},
	client::{ApiClient, ClientConfig, RequestMetrics},
	error::ConfigError,
	hook::{NoopSendHook, SendHook},
	http::ReqwestHttpClient,
	rate_limit::RateLimiter,
};

/// Builder for [`ApiClient`] values.
pub struct ApiClientBuilder {
	base_address: String,
	http_client: Option<ReqwestHttpClient>,
	user_agent: Option<String>,
	api_key: Credential,
	auth_token: Credential,
	max_requests_per_window: i64,
	auto_wait: bool,
	ensure_success: bool,
	send_hook: Arc<dyn SendHook>,
}
impl ApiClientBuilder {
	/// Creates a builder for the provided base address.
	pub fn new(base_address: impl Into<String>) -> Self {
		Self {
			base_address: base_address.into(),
			http_client: None,
			user_agent: None,
			api_key: Credential::unset("", Placement::Manual),
			auth_token: Credential::unset("", Placement::Manual),
			max_requests_per_window: 0,
			auto_wait: false,
			ensure_success: true,
			send_hook: Arc::new(NoopSendHook),
		}
	}

	/// Uses a caller-supplied transport instead of the process-wide pool.
	pub fn http_client(mut self, client: ReqwestHttpClient) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Sends `value` as the `User-Agent` header.
	pub fn user_agent(mut self, value: impl Into<String>) -> Self {
		self.user_agent = Some(value.into());

		self
	}

	/// Sets the general-purpose API key.
	pub fn api_key(mut self, credential: Credential) -> Self {
		self.api_key = credential;

		self
	}

	/// Sets the bearer or session token.
	pub fn auth_token(mut self, credential: Credential) -> Self {
		self.auth_token = credential;

		self
	}

	/// Limits requests per one-second window; `<= 0` means unlimited.
	pub fn max_requests_per_window(mut self, max: i64) -> Self {
		self.max_requests_per_window = max;

		self
	}

	/// Makes callers wait when the window budget is exhausted.
	pub fn auto_wait(mut self, enabled: bool) -> Self {
		self.auto_wait = enabled;

		self
	}

	/// Chooses between failing on non-success statuses and yielding "no value".
	pub fn ensure_success(mut self, enabled: bool) -> Self {
		self.ensure_success = enabled;

		self
	}

	/// Installs a hook that sees every request right before it is sent.
	pub fn send_hook(mut self, hook: impl SendHook + 'static) -> Self {
		self.send_hook = Arc::new(hook);

		self
	}

	/// Validates the settings and builds the client.
	pub fn build(self) -> Result<ApiClient, ConfigError> {
		let base_address = Url::parse(self.base_address.trim())
			.map_err(|source| ConfigError::InvalidBaseAddress { source })?;

		if !matches!(base_address.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedBaseAddress {
				address: base_address.to_string(),
				reason: "only http and https are allowed",
			});
		}
		if base_address.query().is_some() || base_address.fragment().is_some() {
			return Err(ConfigError::UnsupportedBaseAddress {
				address: base_address.to_string(),
				reason: "query strings and fragments are not allowed",
			});
		}

		let user_agent = self
			.user_agent
			.map(|value| {
				HeaderValue::from_str(value.trim())
					.map_err(|_| ConfigError::InvalidHeader { name: USER_AGENT.to_string() })
			})
			.transpose()?;

		Ok(ApiClient {
			http_client: self.http_client.unwrap_or_else(ReqwestHttpClient::shared),
			base_address,
			user_agent,
			api_key: RwLock::new(self.api_key),
			auth_token: RwLock::new(self.auth_token),
			ensure_success: AtomicBool::new(self.ensure_success),
			rate_limiter: RateLimiter::new(self.max_requests_per_window, self.auto_wait),
			metrics: Arc::new(RequestMetrics::default()),
			send_hook: self.send_hook,
		})
	}
}
impl Debug for ApiClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder")
			.field("base_address", &self.base_address)
			.field("user_agent", &self.user_agent)
			.field("api_key", &self.api_key)
			.field("auth_token", &self.auth_token)
			.field("max_requests_per_window", &self.max_requests_per_window)
			.field("auto_wait", &self.auto_wait)
			.field("ensure_success", &self.ensure_success)
			.finish()
	}
}
impl TryFrom<ClientConfig> for ApiClientBuilder {
	type Error = ConfigError;

	fn try_from(config: ClientConfig) -> Result<Self, Self::Error> {
		let mut builder = Self::new(config.base_address)
			.max_requests_per_window(config.max_requests_per_window)
			.auto_wait(config.auto_wait)
			.ensure_success(config.ensure_success);

		if let Some(user_agent) = config.user_agent {
			builder = builder.user_agent(user_agent);
		}
		if let Some(api_key) = config.api_key {
			builder = builder.api_key(api_key.into_credential()?);
		}
		if let Some(auth_token) = config.auth_token {
			builder = builder.auth_token(auth_token.into_credential()?);
		}

		Ok(builder)
	}
}
