//! Response decoding, one strategy per [`ContentKind`](crate::request::ContentKind).
//!
//! JSON bodies are decoded leniently (see [`lenient`]) with field paths attached to every
//! failure. XML bodies must start with the root element the target shape declares through
//! [`XmlDocument`]. Raw bodies are handed back as a [`RawBody`] the caller reads or copies.

mod lenient;

// crates.io
use bytes::Bytes;
use quick_xml::{Reader, events::Event};
use reqwest::{Response, header::HeaderMap};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
// self
use crate::{
	_prelude::*,
	error::{DecodeError, TransportError},
};
use lenient::Lenient;

/// Shapes decodable from an XML document with a fixed top-level element.
pub trait XmlDocument: DeserializeOwned {
	/// Local name of the expected root element.
	const ROOT: &'static str;
}

/// Response whose body is passed through untouched.
#[derive(Debug)]
pub struct RawBody(Response);
impl RawBody {
	pub(crate) fn new(response: Response) -> Self {
		Self(response)
	}

	/// HTTP status of the response.
	pub fn status(&self) -> StatusCode {
		self.0.status()
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		self.0.headers()
	}

	/// Final address after redirects.
	pub fn url(&self) -> &Url {
		self.0.url()
	}

	/// Reads the next chunk of the body, `None` once the stream is exhausted.
	pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
		self.0.chunk().await.map_err(transport)
	}

	/// Buffers the whole body.
	pub async fn bytes(self) -> Result<Bytes> {
		self.0.bytes().await.map_err(transport)
	}

	/// Buffers the whole body as text, honoring the declared charset.
	pub async fn text(self) -> Result<String> {
		self.0.text().await.map_err(transport)
	}

	/// Streams the body into `sink`, returning the number of bytes written.
	pub async fn copy_to<W>(self, sink: &mut W) -> Result<u64>
	where
		W: ?Sized + AsyncWrite + Unpin,
	{
		copy_to(self.0, sink).await
	}

	/// Returns the underlying reqwest response.
	pub fn into_inner(self) -> Response {
		self.0
	}
}

/// Buffers `response` and decodes it as lenient JSON.
pub async fn json<T>(response: Response) -> Result<T>
where
	T: DeserializeOwned,
{
	let status = response.status().as_u16();
	let body = response.bytes().await.map_err(transport)?;

	Ok(json_from_slice(&body, status)?)
}

/// Decodes a JSON document leniently.
///
/// Field names match case-insensitively, numbers and booleans may be quoted, and enum
/// variants match by name or ordinal. `status` is carried into the error for diagnostics.
pub fn json_from_slice<T>(body: &[u8], status: u16) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	let mut parser = serde_json::Deserializer::from_slice(body);
	let value: Value = serde_path_to_error::deserialize(&mut parser)
		.map_err(|source| DecodeError::Json { source, status })?;

	// Anything after the document, other than whitespace, is malformed.
	parser.end().map_err(|e| DecodeError::Json {
		source: serde_path_to_error::Error::new(serde_path_to_error::Track::new().path(), e),
		status,
	})?;

	serde_path_to_error::deserialize(Lenient(value))
		.map_err(|source| DecodeError::Json { source, status })
}

/// Buffers `response` as text and decodes it as an XML document.
pub async fn xml<T>(response: Response) -> Result<T>
where
	T: XmlDocument,
{
	let body = response.text().await.map_err(transport)?;

	Ok(xml_from_str(&body)?)
}

/// Decodes an XML document after checking its root element against [`XmlDocument::ROOT`].
pub fn xml_from_str<T>(document: &str) -> Result<T, DecodeError>
where
	T: XmlDocument,
{
	let found = root_element(document);

	if found.as_deref() != Some(T::ROOT) {
		return Err(DecodeError::UnexpectedRoot { expected: T::ROOT, found });
	}

	quick_xml::de::from_str(document).map_err(|source| DecodeError::Xml { source })
}

/// Wraps `response` without reading it.
pub fn raw(response: Response) -> RawBody {
	RawBody::new(response)
}

/// Streams the body of `response` into `sink` chunk by chunk and flushes it.
///
/// Returns the number of bytes written. Sink failures surface as
/// [`TransportError::Io`].
pub async fn copy_to<W>(mut response: Response, sink: &mut W) -> Result<u64>
where
	W: ?Sized + AsyncWrite + Unpin,
{
	let mut written = 0_u64;

	while let Some(chunk) = response.chunk().await.map_err(transport)? {
		sink.write_all(&chunk).await.map_err(TransportError::Io)?;

		written += chunk.len() as u64;
	}

	sink.flush().await.map_err(TransportError::Io)?;

	Ok(written)
}

fn root_element(document: &str) -> Option<String> {
	let mut reader = Reader::from_str(document);

	loop {
		match reader.read_event() {
			Ok(Event::Start(e) | Event::Empty(e)) =>
				return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned()),
			Ok(Event::Eof) | Err(_) => return None,
			Ok(_) => continue,
		}
	}
}

fn transport(e: ReqwestError) -> Error {
	Error::Transport(e.into())
}
