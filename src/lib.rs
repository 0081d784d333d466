//! Shared request pipeline for taxonomy and species REST API wrappers: credential placement,
//! best-effort self-throttling, and JSON/XML/stream decoding behind one client core.
//!
//! Provider crates describe endpoints and record shapes; every network interaction goes
//! through [`client::ApiClient`], which assembles the address, injects credentials, waits on
//! the [`rate_limit::RateLimiter`], sends through a pooled reqwest transport, enforces the
//! success policy, and decodes the body according to the declared [`request::ContentKind`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod decode;
pub mod error;
pub mod hook;
pub mod http;
pub mod id;
pub mod obs;
pub mod query;
pub mod rate_limit;
pub mod request;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		str::FromStr,
		sync::{
			Arc,
			atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
		},
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method, StatusCode};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
