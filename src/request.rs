//! Request descriptors handed from the assembler to the executor.
//!
//! A [`RequestDescriptor`] is built fresh per call, optionally adjusted by a
//! [`SendHook`](crate::hook::SendHook), and consumed by the executor. The declared
//! [`ContentKind`] selects both the `Accept` header and the decode strategy.

// crates.io
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError, query};

/// Declared wire format of a response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
	/// Body is handed back untouched.
	Raw,
	/// Structured JSON text.
	#[default]
	Json,
	/// Structured XML text.
	Xml,
}
impl ContentKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ContentKind::Raw => "raw",
			ContentKind::Json => "json",
			ContentKind::Xml => "xml",
		}
	}

	/// Media type announced in the `Accept` header; raw requests send none.
	pub const fn accept(self) -> Option<&'static str> {
		match self {
			ContentKind::Raw => None,
			ContentKind::Json => Some("application/json"),
			ContentKind::Xml => Some("application/xml"),
		}
	}
}
impl Display for ContentKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ContentKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"raw" => Ok(Self::Raw),
			"json" | "application/json" => Ok(Self::Json),
			"xml" | "application/xml" | "text/xml" => Ok(Self::Xml),
			_ => Err(ConfigError::UnknownContentKind { value: s.to_owned() }),
		}
	}
}

/// Optional request payload together with its media type.
#[derive(Clone, Debug)]
pub struct RequestBody {
	content_type: HeaderValue,
	bytes: Bytes,
}
impl RequestBody {
	/// Serializes `value` as a JSON payload.
	pub fn json<T>(value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(value).map_err(ConfigError::RequestBody)?;

		Ok(Self { content_type: HeaderValue::from_static("application/json"), bytes: bytes.into() })
	}

	/// Wraps an already rendered XML document.
	pub fn xml(document: impl Into<String>) -> Self {
		Self {
			content_type: HeaderValue::from_static("application/xml"),
			bytes: Bytes::from(document.into()),
		}
	}

	/// Wraps arbitrary bytes with a static media type.
	pub fn bytes(content_type: &'static str, bytes: impl Into<Bytes>) -> Self {
		Self { content_type: HeaderValue::from_static(content_type), bytes: bytes.into() }
	}

	/// Media type sent as `Content-Type`.
	pub fn content_type(&self) -> &HeaderValue {
		&self.content_type
	}

	/// Raw payload.
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}
}

/// Fully assembled request, immutable once handed to the executor.
#[derive(Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Absolute target address including the query string.
	pub url: Url,
	/// Declared response format.
	pub content_kind: ContentKind,
	/// Headers sent with the request.
	pub headers: HeaderMap,
	/// Optional payload.
	pub body: Option<RequestBody>,
}
impl RequestDescriptor {
	/// Creates a descriptor without headers or body.
	pub fn new(method: Method, url: Url, content_kind: ContentKind) -> Self {
		Self { method, url, content_kind, headers: HeaderMap::new(), body: None }
	}

	/// Attaches a payload.
	pub fn with_body(mut self, body: RequestBody) -> Self {
		self.body = Some(body);

		self
	}

	/// Whether the query string already carries `key`.
	pub fn has_query_key(&self, key: &str) -> bool {
		self.url.query_pairs().any(|(k, _)| k == key)
	}

	/// Appends `key=value` to the query string, percent-encoding both sides.
	pub fn append_query_pair(&mut self, key: &str, value: &str) {
		let pair = format!("{}={}", query::encode_component(key), query::encode_component(value));
		let joined = match self.url.query() {
			Some(existing) if !existing.is_empty() => format!("{existing}&{pair}"),
			_ => pair,
		};

		self.url.set_query(Some(&joined));
	}

	pub(crate) fn into_reqwest(self) -> reqwest::Request {
		let mut request = reqwest::Request::new(self.method, self.url);

		*request.headers_mut() = self.headers;

		if let Some(body) = self.body {
			request.headers_mut().entry(CONTENT_TYPE).or_insert(body.content_type);
			*request.body_mut() = Some(body.bytes.into());
		}

		request
	}
}
