//! Last-chance adjustment of outgoing requests.
//!
//! Provider crates occasionally need a header or query pair the shared pipeline knows
//! nothing about (request signing, tracing IDs). A [`SendHook`] sees every assembled
//! [`RequestDescriptor`] right before it is throttled and sent.

// self
use crate::request::RequestDescriptor;

/// Hook invoked once per outgoing request, after credentials have been injected.
///
/// The default implementation does nothing. Implementors must be `Send + Sync` because
/// one client may serve many concurrent callers.
pub trait SendHook: Send + Sync {
	/// Mutates the request in place before it leaves the process.
	fn before_send(&self, _request: &mut RequestDescriptor) {}
}

/// Hook that leaves every request untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSendHook;
impl SendHook for NoopSendHook {}

impl<F> SendHook for F
where
	F: Fn(&mut RequestDescriptor) + Send + Sync,
{
	fn before_send(&self, request: &mut RequestDescriptor) {
		self(request)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;
	use crate::{_prelude::*, request::ContentKind};

	fn request() -> RequestDescriptor {
		RequestDescriptor::new(
			Method::GET,
			Url::parse("https://api.example.org/taxa").expect("Fixture URL should parse."),
			ContentKind::Json,
		)
	}

	#[test]
	fn closures_act_as_hooks() {
		let hook = |request: &mut RequestDescriptor| {
			request.headers.insert("x-trace", HeaderValue::from_static("abc"));
		};
		let mut req = request();

		hook.before_send(&mut req);

		assert_eq!(req.headers.get("x-trace").and_then(|v| v.to_str().ok()), Some("abc"));
	}

	#[test]
	fn noop_hook_leaves_requests_alone() {
		let mut req = request();

		NoopSendHook.before_send(&mut req);

		assert!(req.headers.is_empty());
	}
}
