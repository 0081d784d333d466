//! Pipeline-level error types shared by the assembler, executor, and decoders.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a non-success status while success is enforced.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Body did not match the declared shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// A download answered `204 No Content`.
	#[error("Download from {url} returned no content.")]
	EmptyDownload {
		/// Address that was requested.
		url: String,
	},
	/// The caller cancelled the operation.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns the upstream HTTP status carried by this error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(e) => Some(e.status),
			Self::Decode(DecodeError::Json { status, .. }) => Some(*status),
			Self::EmptyDownload { .. } => Some(StatusCode::NO_CONTENT.as_u16()),
			_ => None,
		}
	}

	/// Whether the error is the cancellation signal.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}
impl From<crate::id::IdentifierError> for Error {
	fn from(e: crate::id::IdentifierError) -> Self {
		ConfigError::from(e).into()
	}
}

/// Configuration and validation failures raised before a request leaves the process.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base address cannot be parsed.
	#[error("Base address is invalid.")]
	InvalidBaseAddress {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base address uses a scheme other than HTTP(S) or carries a query/fragment.
	#[error("Base address `{address}` is not supported: {reason}.")]
	UnsupportedBaseAddress {
		/// Offending address.
		address: String,
		/// Why it was rejected.
		reason: &'static str,
	},
	/// Composed request address cannot be parsed.
	#[error("Request address `{address}` is invalid.")]
	InvalidAddress {
		/// Address text that failed to parse.
		address: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header name or value contains characters HTTP does not allow.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name (or credential key) that failed validation.
		name: String,
	},
	/// Content kind label is not one of `raw`, `json`, `xml`.
	#[error("Content kind `{value}` is not supported.")]
	UnknownContentKind {
		/// Rejected label.
		value: String,
	},
	/// Credential placement label is not recognized.
	#[error("Credential placement `{value}` is not supported.")]
	UnknownPlacement {
		/// Rejected label.
		value: String,
	},
	/// Credential value was configured from an environment variable that is not set.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnvVar {
		/// Variable name.
		name: String,
	},
	/// Request payload could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Caller supplied a malformed identifier.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::id::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for the upstream API.
	#[error("Timed out while calling the upstream API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport or while writing a download sink.
	#[error("I/O error occurred while transferring the response body.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

/// Non-success HTTP status surfaced under the enforcing success policy.
#[derive(Debug, ThisError)]
#[error("Upstream returned HTTP {status} for {url}.")]
pub struct StatusError {
	/// HTTP status code.
	pub status: u16,
	/// Address that was requested.
	pub url: String,
	/// Leading part of the response body, when one was readable.
	pub body_preview: Option<String>,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl StatusError {
	const BODY_PREVIEW_LIMIT: usize = 256;
	/// Bytes worth reading to fill the preview; UTF-8 needs at most four per character.
	pub(crate) const BODY_PREVIEW_BYTES: usize = Self::BODY_PREVIEW_LIMIT * 4;

	pub(crate) fn new(status: StatusCode, url: &Url) -> Self {
		Self { status: status.as_u16(), url: url.to_string(), body_preview: None, retry_after: None }
	}

	pub(crate) fn with_body_preview(mut self, body: &str) -> Self {
		let trimmed = body.trim();

		if !trimmed.is_empty() {
			self.body_preview = Some(trimmed.chars().take(Self::BODY_PREVIEW_LIMIT).collect());
		}

		self
	}

	pub(crate) fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}

/// Body decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// JSON body could not be mapped onto the target shape.
	#[error("Response body is not valid JSON for the requested shape.")]
	Json {
		/// Structured parsing failure including the field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the decoded response.
		status: u16,
	},
	/// XML body could not be mapped onto the target shape.
	#[error("Response body is not valid XML for the requested shape.")]
	Xml {
		/// Underlying XML deserialization failure.
		#[source]
		source: quick_xml::DeError,
	},
	/// XML document root does not match the shape's declared element.
	#[error("Expected XML root element `{expected}`, found {found:?}.")]
	UnexpectedRoot {
		/// Root element declared by the target shape.
		expected: &'static str,
		/// Root element present in the document, if any.
		found: Option<String>,
	},
}
