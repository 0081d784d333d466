//! Named secrets and the placement rules that attach them to requests.
//!
//! A client owns two independent credentials, a general API key and an auth token, and
//! tries both on every outgoing request. They must not share a placement + key pair.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, request::RequestDescriptor};

/// Where a credential is attached to an outgoing request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
	/// The caller injects the value by hand; the pipeline ignores it.
	#[default]
	Manual,
	/// A header named after the credential key.
	Header,
	/// The `Authorization` header, using the credential key as the scheme.
	HeaderAuthorization,
	/// A query parameter named after the credential key.
	QueryParameter,
}
impl Placement {
	/// Returns a stable label suitable for configuration files and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Placement::Manual => "manual",
			Placement::Header => "header",
			Placement::HeaderAuthorization => "header_authorization",
			Placement::QueryParameter => "query_parameter",
		}
	}
}
impl Display for Placement {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Placement {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");

		[Self::Manual, Self::Header, Self::HeaderAuthorization, Self::QueryParameter]
			.into_iter()
			.find(|p| p.as_str() == normalized || p.as_str().replace('_', "") == normalized)
			.ok_or_else(|| ConfigError::UnknownPlacement { value: s.to_owned() })
	}
}

/// One named secret plus its placement.
///
/// A credential built with [`Credential::new`] carries an explicit value and is
/// *required*: the pipeline injects it whenever the value is non-blank. One built with
/// [`Credential::unset`] is never required and therefore never usable: neither
/// [`Credential::try_inject`] nor address assembly picks it up, even after
/// [`Credential::set_value`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	key: String,
	value: Option<Secret>,
	placement: Placement,
	required: bool,
	usable: bool,
}
impl Credential {
	/// Creates a required credential with an explicit (possibly blank) value.
	pub fn new(key: impl Into<String>, value: impl Into<String>, placement: Placement) -> Self {
		let value = Secret::new(value);
		let usable = !value.is_blank();

		Self { key: key.into(), value: Some(value), placement, required: true, usable }
	}

	/// Creates a credential without a value.
	pub fn unset(key: impl Into<String>, placement: Placement) -> Self {
		Self { key: key.into(), value: None, placement, required: false, usable: false }
	}

	/// Header name, auth scheme, or query key depending on the placement.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Current value, if one was ever set.
	pub fn value(&self) -> Option<&Secret> {
		self.value.as_ref()
	}

	/// Configured placement.
	pub fn placement(&self) -> Placement {
		self.placement
	}

	/// Whether the credential was built with an explicit value.
	pub fn is_required(&self) -> bool {
		self.required
	}

	/// Whether the credential is required and its current value is non-blank.
	pub fn is_usable(&self) -> bool {
		self.usable
	}

	/// Whether [`Credential::try_inject`] would touch a request.
	pub fn can_inject(&self) -> bool {
		self.required && self.usable && self.placement != Placement::Manual
	}

	/// Replaces the value and recomputes usability.
	pub fn set_value(&mut self, value: impl Into<String>) {
		let value = Secret::new(value);

		self.usable = self.required && !value.is_blank();
		self.value = Some(value);
	}

	/// Key/value pair for address assembly when the credential lives in the query string.
	pub(crate) fn query_pair(&self) -> Option<(&str, &str)> {
		match (&self.value, self.placement) {
			(Some(value), Placement::QueryParameter) if self.usable =>
				Some((self.key.as_str(), value.expose())),
			_ => None,
		}
	}

	/// Attaches the credential to `request` according to its placement.
	///
	/// Returns whether the request was modified. Query placement never duplicates a key
	/// the address already carries.
	pub fn try_inject(&self, request: &mut RequestDescriptor) -> Result<bool, ConfigError> {
		if !self.can_inject() {
			return Ok(false);
		}

		let Some(value) = self.value.as_ref().map(Secret::expose) else {
			return Ok(false);
		};

		match self.placement {
			Placement::Manual => Ok(false),
			Placement::Header => {
				let name = HeaderName::from_bytes(self.key.as_bytes())
					.map_err(|_| ConfigError::InvalidHeader { name: self.key.clone() })?;

				request.headers.insert(name, self.sensitive_value(value)?);

				Ok(true)
			},
			Placement::HeaderAuthorization => {
				let credentials = format!("{} {}", self.key.trim(), value.trim());

				request.headers.insert(AUTHORIZATION, self.sensitive_value(&credentials)?);

				Ok(true)
			},
			Placement::QueryParameter => {
				if request.has_query_key(&self.key) {
					return Ok(false);
				}

				request.append_query_pair(&self.key, value);

				Ok(true)
			},
		}
	}

	fn sensitive_value(&self, value: &str) -> Result<HeaderValue, ConfigError> {
		let mut header = HeaderValue::from_str(value)
			.map_err(|_| ConfigError::InvalidHeader { name: self.key.clone() })?;

		header.set_sensitive(true);

		Ok(header)
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("key", &self.key)
			.field("placement", &self.placement)
			.field("required", &self.required)
			.field("usable", &self.usable)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::request::ContentKind;

	fn request() -> RequestDescriptor {
		RequestDescriptor::new(
			Method::GET,
			Url::parse("https://api.example.org/taxa?q=lynx").expect("Fixture URL should parse."),
			ContentKind::Json,
		)
	}

	#[test]
	fn manual_placement_never_mutates_requests() {
		for value in ["secret", "", "  "] {
			let credential = Credential::new("X-Api-Key", value, Placement::Manual);
			let mut req = request();

			assert!(!credential.try_inject(&mut req).expect("Manual injection cannot fail."));
			assert!(req.headers.is_empty());
			assert_eq!(req.url.query(), Some("q=lynx"));
		}
	}

	#[test]
	fn blank_values_disable_injection() {
		let mut credential = Credential::new("X-Api-Key", "secret", Placement::Header);

		assert!(credential.can_inject());

		credential.set_value("   ");

		assert!(credential.is_required());
		assert!(!credential.is_usable());
		assert!(!credential.can_inject());

		let mut req = request();

		assert!(!credential.try_inject(&mut req).expect("Blank credential is a no-op."));
		assert!(req.headers.is_empty());
	}

	#[test]
	fn unset_credentials_stay_unusable_after_set_value() {
		let mut credential = Credential::unset("token", Placement::QueryParameter);

		credential.set_value("abc");

		assert!(!credential.is_required());
		assert!(!credential.is_usable());
		assert!(!credential.can_inject());
		assert_eq!(credential.query_pair(), None);

		let mut req = request();

		assert!(!credential.try_inject(&mut req).expect("Unset credential is a no-op."));
		assert_eq!(req.url.query(), Some("q=lynx"));
	}

	#[test]
	fn header_placements_attach_sensitive_values() {
		let mut req = request();

		Credential::new("X-Api-Key", "k1", Placement::Header)
			.try_inject(&mut req)
			.expect("Header injection should succeed.");
		Credential::new("Bearer", "t1", Placement::HeaderAuthorization)
			.try_inject(&mut req)
			.expect("Authorization injection should succeed.");

		let api_key = req.headers.get("x-api-key").expect("Header credential should be set.");
		let auth = req.headers.get(AUTHORIZATION).expect("Authorization should be set.");

		assert_eq!(api_key.to_str().ok(), Some("k1"));
		assert!(api_key.is_sensitive());
		assert_eq!(auth.to_str().ok(), Some("Bearer t1"));
	}

	#[test]
	fn query_placement_appends_once() {
		let credential = Credential::new("token", "a b", Placement::QueryParameter);
		let mut req = request();

		assert!(credential.try_inject(&mut req).expect("Query injection should succeed."));
		assert!(!credential.try_inject(&mut req).expect("Second injection is a no-op."));
		assert_eq!(req.url.query(), Some("q=lynx&token=a%20b"));
	}

	#[test]
	fn invalid_header_names_are_config_errors() {
		let credential = Credential::new("bad header", "v", Placement::Header);
		let err = credential.try_inject(&mut request()).expect_err("Spaces are not valid.");

		assert!(matches!(err, ConfigError::InvalidHeader { name } if name == "bad header"));
	}

	#[test]
	fn placement_labels_parse_leniently() {
		assert_eq!("query_parameter".parse::<Placement>().ok(), Some(Placement::QueryParameter));
		assert_eq!("HeaderAuthorization".parse::<Placement>().ok(), Some(Placement::HeaderAuthorization));
		assert_eq!("header-authorization".parse::<Placement>().ok(), Some(Placement::HeaderAuthorization));
		assert!("cookie".parse::<Placement>().is_err());
	}

	#[test]
	fn debug_output_omits_the_value() {
		let rendered = format!("{:?}", Credential::new("X-Api-Key", "hunter2", Placement::Header));

		assert!(!rendered.contains("hunter2"));
	}
}
