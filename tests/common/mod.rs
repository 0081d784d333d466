//! Shared fixtures for integration tests.

#![allow(dead_code)]

// crates.io
use httpmock::MockServer;
use serde::Deserialize;
// self
use taxon_rest::{
	client::{ApiClient, ApiClientBuilder},
	decode::XmlDocument,
};

/// Species record in the shape a provider crate would declare.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Species {
	pub key: u64,
	pub scientific_name: String,
	pub rank: Rank,
	pub extinct: bool,
}

#[derive(Debug, PartialEq, Deserialize)]
pub enum Rank {
	Genus,
	Species,
	Subspecies,
}

/// XML document with a fixed `<taxon>` root.
#[derive(Debug, PartialEq, Deserialize)]
pub struct Taxon {
	#[serde(rename = "@id")]
	pub id: u64,
	pub name: String,
}
impl XmlDocument for Taxon {
	const ROOT: &'static str = "taxon";
}

/// Builder pointed at the mock server's root.
pub fn builder(server: &MockServer) -> ApiClientBuilder {
	ApiClient::builder(server.base_url()).user_agent("taxon-rest-tests/0.1")
}

/// Client with default settings pointed at the mock server.
pub fn client(server: &MockServer) -> ApiClient {
	builder(server).build().expect("Test client should build.")
}
