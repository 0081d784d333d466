mod common;

// std
use std::{
	sync::Arc,
	time::{Duration, Instant},
};
// crates.io
use httpmock::prelude::*;
// self
use common::{Rank, Species};
use taxon_rest::{
	CancellationToken,
	reqwest,
	auth::{Credential, Placement},
	error::Error,
	query::QueryParams,
	request::{ContentKind, RequestDescriptor},
};

const SPECIES_BODY: &str =
	r#"{"key":5219426,"scientificName":"Lynx lynx","rank":"SPECIES","extinct":false}"#;

#[tokio::test]
async fn throttled_client_delays_the_third_call_until_the_window_rolls_over() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/5219426");
			then.status(200).header("content-type", "application/json").body(SPECIES_BODY);
		})
		.await;
	let client = common::builder(&server)
		.max_requests_per_window(2)
		.auto_wait(true)
		.build()
		.expect("Throttled client should build.");
	let cancel = CancellationToken::new();
	let started = Instant::now();

	for _ in 0..2 {
		client
			.get_json::<Species>("species/5219426", None, &cancel)
			.await
			.expect("Call inside the budget should succeed.");
	}

	assert!(client.is_at_limit());
	assert_eq!(client.window_request_count(), 2);

	client
		.get_json::<Species>("species/5219426", None, &cancel)
		.await
		.expect("Third call should succeed after waiting.");

	assert!(started.elapsed() >= Duration::from_millis(950), "Third call must wait for the window.");
	assert_eq!(client.request_count(), 3);

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_window_budget() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/5219426");
			then.status(200).header("content-type", "application/json").body(SPECIES_BODY);
		})
		.await;
	let client = Arc::new(
		common::builder(&server)
			.max_requests_per_window(2)
			.auto_wait(true)
			.build()
			.expect("Throttled client should build."),
	);
	let callers = (0..5)
		.map(|_| {
			let client = Arc::clone(&client);

			tokio::spawn(async move {
				client.get_json::<Species>("species/5219426", None, &CancellationToken::new()).await
			})
		})
		.collect::<Vec<_>>();

	for caller in callers {
		let species = caller
			.await
			.expect("Caller task should not panic.")
			.expect("Every throttled call should eventually succeed.")
			.expect("Body should be present.");

		assert_eq!(species.key, 5_219_426);
	}

	assert_eq!(client.request_count(), 5);
	assert_eq!(client.metrics().successes(), 5);

	tokio::time::sleep(Duration::from_millis(1_200)).await;

	assert_eq!(client.window_request_count(), 0, "The window must close once traffic stops.");
	assert!(!client.is_at_limit());
	assert!(!client.rate_limit_snapshot().window_active);

	mock.assert_calls_async(5).await;
}

#[tokio::test]
async fn query_credential_is_appended_to_bare_paths() {
	let server = MockServer::start_async().await;
	let client = common::builder(&server)
		.api_key(Credential::new("token", "abc123", Placement::QueryParameter))
		.build()
		.expect("Client should build.");
	let address = client.build_address("search", None).expect("Address should build.");

	assert_eq!(address.as_str(), format!("{}/search?token=abc123", server.base_url()));

	let params = QueryParams::new().push("q", "Puma concolor").push("limit", 5);
	let address = client.build_address("/search", Some(&params)).expect("Address should build.");

	assert_eq!(address.query(), Some("limit=5&q=Puma%20concolor&token=abc123"));

	let params = QueryParams::new().push("token", "override");
	let address = client.build_address("search", Some(&params)).expect("Address should build.");

	assert_eq!(address.query(), Some("token=override"), "The key must not be duplicated.");
}

#[tokio::test]
async fn tolerant_policy_turns_not_found_into_absent() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/0");
			then.status(404).body("not found");
		})
		.await;
	let client = common::builder(&server).ensure_success(false).build().expect("Client should build.");
	let result = client
		.get_json::<Species>("species/0", None, &CancellationToken::new())
		.await
		.expect("Tolerant policy must not fail on 404.");

	assert!(result.is_none());
	assert_eq!(client.metrics().absences(), 1);

	mock.assert_async().await;
}

#[tokio::test]
async fn strict_policy_surfaces_server_errors_with_status() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/1");
			then.status(500).body("  upstream exploded  ");
		})
		.await;
	let client = common::client(&server);
	let err = client
		.get_json::<Species>("species/1", None, &CancellationToken::new())
		.await
		.expect_err("Default policy must fail on 500.");

	assert_eq!(err.status(), Some(500));

	match err {
		Error::Status(status) => {
			assert_eq!(status.body_preview.as_deref(), Some("upstream exploded"));
			assert!(status.url.ends_with("/species/1"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(client.request_count(), 1, "Failed statuses still count as sent.");
	assert_eq!(client.metrics().failures(), 1);

	mock.assert_async().await;
}

#[tokio::test]
async fn status_errors_read_only_a_bounded_preview_of_large_bodies() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/dump");
			then.status(502).body("x".repeat(1024 * 1024));
		})
		.await;

	let err = common::client(&server)
		.get_json::<Species>("dump", None, &CancellationToken::new())
		.await
		.expect_err("502 must fail.");

	match err {
		Error::Status(status) => {
			assert_eq!(status.status, 502);
			assert_eq!(status.body_preview.map(|preview| preview.len()), Some(256));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn retry_after_is_carried_on_status_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/busy");
			then.status(503).header("retry-after", "7");
		})
		.await;

	let err = common::client(&server)
		.get_json::<Species>("busy", None, &CancellationToken::new())
		.await
		.expect_err("503 must fail.");

	assert!(matches!(err, Error::Status(ref s) if s.retry_after == Some(Duration::from_secs(7))));
}

#[tokio::test]
async fn credentials_and_headers_reach_the_wire() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/species/5219426")
				.header("accept", "application/json")
				.header("user-agent", "taxon-rest-tests/0.1")
				.header("x-api-key", "k-1")
				.header("authorization", "Bearer t-2");
			then.status(200).body(SPECIES_BODY);
		})
		.await;
	let client = common::builder(&server)
		.api_key(Credential::new("X-Api-Key", "k-1", Placement::Header))
		.auth_token(Credential::new("Bearer", "t-1", Placement::HeaderAuthorization))
		.build()
		.expect("Client should build.");

	client.set_auth_token_value("t-2");

	let species = client
		.get_json::<Species>("species/5219426", None, &CancellationToken::new())
		.await
		.expect("Request should succeed.")
		.expect("Body should be present.");

	assert_eq!(species.rank, Rank::Species);

	mock.assert_async().await;
}

#[tokio::test]
async fn send_hook_sees_every_request() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/5219426").header("x-request-source", "hook");
			then.status(200).body(SPECIES_BODY);
		})
		.await;
	let client = common::builder(&server)
		.send_hook(|request: &mut RequestDescriptor| {
			request.headers.insert("x-request-source", "hook".parse().expect("Static header value."));
		})
		.build()
		.expect("Client should build.");

	client
		.get_json::<Species>("species/5219426", None, &CancellationToken::new())
		.await
		.expect("Hooked request should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn post_json_sends_the_payload() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/species/match")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "name": "Lynx lynx", "strict": true }));
			then.status(200).body(SPECIES_BODY);
		})
		.await;
	let client = common::client(&server);
	let species = client
		.post_json::<_, Species>(
			"species/match",
			None,
			&serde_json::json!({ "name": "Lynx lynx", "strict": true }),
			&CancellationToken::new(),
		)
		.await?;

	assert_eq!(species.map(|s| s.key), Some(5_219_426));

	mock.assert_async().await;

	Ok(())
}

#[tokio::test]
async fn cancellation_aborts_in_flight_requests_without_counting() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(Duration::from_secs(5)).body(SPECIES_BODY);
		})
		.await;

	let client = common::client(&server);
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(100)).await;
		trigger.cancel();
	});

	let started = Instant::now();
	let err = client
		.get_json::<Species>("slow", None, &cancel)
		.await
		.expect_err("Cancelled request must fail.");

	assert!(err.is_cancelled());
	assert!(started.elapsed() < Duration::from_secs(4));
	assert_eq!(client.request_count(), 0);
	assert_eq!(client.metrics().cancellations(), 1);
}

#[tokio::test]
async fn cancelled_tokens_stop_requests_before_they_leave() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/species/5219426");
			then.status(200).body(SPECIES_BODY);
		})
		.await;
	let client = common::client(&server);
	let cancel = CancellationToken::new();

	cancel.cancel();

	let err = client
		.get_json::<Species>("species/5219426", None, &cancel)
		.await
		.expect_err("Pre-cancelled token must fail.");

	assert!(err.is_cancelled());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn cancellation_aborts_the_throttle_wait() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/species/5219426");
			then.status(200).body(SPECIES_BODY);
		})
		.await;

	let client = common::builder(&server)
		.max_requests_per_window(1)
		.auto_wait(true)
		.build()
		.expect("Client should build.");
	let cancel = CancellationToken::new();

	client
		.get_json::<Species>("species/5219426", None, &cancel)
		.await
		.expect("First call should succeed.");

	assert!(client.is_at_limit());

	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});

	let started = Instant::now();
	let err = client
		.get_json::<Species>("species/5219426", None, &cancel)
		.await
		.expect_err("Cancelled wait must fail.");

	assert!(err.is_cancelled());
	assert!(started.elapsed() < Duration::from_millis(450));
	assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn prepared_descriptors_go_through_the_same_pipeline() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/lists/42").query_param("token", "abc");
			then.status(204);
		})
		.await;
	let client = common::builder(&server)
		.api_key(Credential::new("token", "abc", Placement::QueryParameter))
		.build()
		.expect("Client should build.");
	let url = client.build_address("lists/42", None).expect("Address should build.");
	let request = client
		.build_request(url, reqwest::Method::DELETE, ContentKind::Json)
		.expect("Request should build.");

	assert_eq!(request.url.query(), Some("token=abc"), "Query credential is not duplicated.");

	let result = client
		.fetch_json::<serde_json::Value>(request, &CancellationToken::new())
		.await
		.expect("204 should not fail.");

	assert!(result.is_none());

	mock.assert_async().await;
}
