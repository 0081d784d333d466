//! Declarative client configuration, typically loaded from a settings file.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Placement},
	error::ConfigError,
};

/// Serializable settings for one [`ApiClient`](crate::client::ApiClient).
///
/// Every field has a default, so a document only needs `base_address`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Absolute HTTP(S) address every request path is joined onto.
	pub base_address: String,
	/// Optional `User-Agent` value.
	pub user_agent: Option<String>,
	/// Requests allowed per one-second window; `<= 0` means unlimited.
	pub max_requests_per_window: i64,
	/// Whether callers wait when the window budget is exhausted.
	pub auto_wait: bool,
	/// Whether non-success statuses fail (`true`) or yield "no value" (`false`).
	pub ensure_success: bool,
	/// General-purpose API key.
	pub api_key: Option<CredentialConfig>,
	/// Bearer or session token.
	pub auth_token: Option<CredentialConfig>,
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_address: String::new(),
			user_agent: None,
			max_requests_per_window: 0,
			auto_wait: false,
			ensure_success: true,
			api_key: None,
			auth_token: None,
		}
	}
}

/// Credential settings; the value comes inline or from an environment variable.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
	/// Header name, auth scheme, or query key depending on the placement.
	pub key: String,
	/// Inline secret value. Takes precedence over `value_env`.
	pub value: Option<String>,
	/// Environment variable holding the secret value.
	pub value_env: Option<String>,
	/// Where the credential is attached.
	pub placement: Placement,
}
impl CredentialConfig {
	/// Resolves the configured value into a [`Credential`].
	///
	/// Without `value` or `value_env` the credential stays unset and is never injected.
	pub fn into_credential(self) -> Result<Credential, ConfigError> {
		let value = match (self.value, self.value_env) {
			(Some(value), _) => Some(value),
			(None, Some(name)) =>
				Some(std::env::var(&name).map_err(|_| ConfigError::MissingEnvVar { name })?),
			(None, None) => None,
		};

		Ok(match value {
			Some(value) => Credential::new(self.key, value, self.placement),
			None => Credential::unset(self.key, self.placement),
		})
	}
}
impl Debug for CredentialConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialConfig")
			.field("key", &self.key)
			.field("value_set", &self.value.is_some())
			.field("value_env", &self.value_env)
			.field("placement", &self.placement)
			.finish()
	}
}
