//! Credentials and where the pipeline attaches them to outgoing requests.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
