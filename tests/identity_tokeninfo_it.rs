#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use time::macros;
// self
use code_gate::{
	_preludet::*,
	auth::Role,
	config::IdentityConfig,
	flows::Gatekeeper,
	identity::{IdentityVerifier, TokenInfoVerifier},
};

const AUDIENCE: &str = "client-123.apps.example.com";
const NOW: OffsetDateTime = macros::datetime!(2025-03-01 09:00 UTC);

fn tokeninfo_body(sub: Option<&str>, email: &str, aud: &str, exp: OffsetDateTime) -> String {
	let sub = sub.map(|s| format!("\"sub\":\"{s}\",")).unwrap_or_default();

	format!(
		"{{{sub}\"aud\":\"{aud}\",\"iss\":\"https://accounts.google.com\",\"exp\":\"{}\",\
		 \"email\":\"{email}\",\"email_verified\":\"true\",\"name\":\"Alice Example\"}}",
		exp.unix_timestamp()
	)
}

fn build_gatekeeper(server: &MockServer) -> Gatekeeper {
	let endpoint =
		Url::parse(&server.url("/tokeninfo")).expect("Mock tokeninfo endpoint should parse.");
	let identity = IdentityConfig::google(AUDIENCE).with_endpoint(endpoint);

	build_test_gatekeeper_with(test_config().with_identity(identity), None).0
}

async fn mock_tokeninfo<'a>(
	server: &'a MockServer,
	assertion: &str,
	status: u16,
	body: String,
) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("id_token", assertion);
			then.status(status).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test]
async fn linked_google_identity_signs_in_and_fills_missing_subject() {
	let server = MockServer::start_async().await;
	let gatekeeper = build_gatekeeper(&server);
	let alice = register_fixture(&gatekeeper, "alice", "secret1", Role::User, NOW).await;
	let session = gatekeeper.login("alice", "secret1", NOW).await.expect("Login should succeed.");
	let link_mock = mock_tokeninfo(
		&server,
		"email-only",
		200,
		tokeninfo_body(None, "alice@example.com", AUDIENCE, NOW + Duration::hours(1)),
	)
	.await;
	let linked = gatekeeper
		.link_identity(&session.token, "email-only", NOW)
		.await
		.expect("Linking by email should succeed.");

	link_mock.assert_async().await;

	assert_eq!(linked.external_identity_email.as_deref(), Some("alice@example.com"));
	assert_eq!(linked.external_identity_id, None);

	let login_mock = mock_tokeninfo(
		&server,
		"with-subject",
		200,
		tokeninfo_body(Some("g-42"), "alice@example.com", AUDIENCE, NOW + Duration::hours(1)),
	)
	.await;
	let success = gatekeeper
		.external_login("with-subject", NOW)
		.await
		.expect("Linked identity should sign in.");

	login_mock.assert_async().await;

	assert_eq!(success.account.id, alice.id);
	assert_eq!(success.account.external_identity_id.as_deref(), Some("g-42"));
	assert_eq!(success.account.display_name.as_deref(), Some("Alice Example"));
}

#[tokio::test]
async fn unknown_identity_is_refused_without_creating_an_account() {
	let server = MockServer::start_async().await;
	let gatekeeper = build_gatekeeper(&server);

	mock_tokeninfo(
		&server,
		"stranger",
		200,
		tokeninfo_body(Some("g-7"), "stranger@example.com", AUDIENCE, NOW + Duration::hours(1)),
	)
	.await;

	assert!(matches!(
		gatekeeper.external_login("stranger", NOW).await,
		Err(Error::IdentityNotLinked)
	));
	assert!(gatekeeper.credentials().list().await.expect("Listing should succeed.").is_empty());
}

#[tokio::test]
async fn provider_answers_map_to_distinct_failures() {
	let server = MockServer::start_async().await;
	let gatekeeper = build_gatekeeper(&server);

	mock_tokeninfo(&server, "down", 503, String::from("{}")).await;
	mock_tokeninfo(&server, "rejected", 400, String::from("{\"error\":\"invalid_token\"}")).await;
	mock_tokeninfo(
		&server,
		"foreign",
		200,
		tokeninfo_body(Some("g-1"), "a@example.com", "someone-else", NOW + Duration::hours(1)),
	)
	.await;
	mock_tokeninfo(
		&server,
		"stale",
		200,
		tokeninfo_body(Some("g-1"), "a@example.com", AUDIENCE, NOW - Duration::seconds(1)),
	)
	.await;

	assert!(matches!(
		gatekeeper.external_login("down", NOW).await,
		Err(Error::ServiceUnavailable)
	));

	for assertion in ["rejected", "foreign", "stale"] {
		assert!(
			matches!(
				gatekeeper.external_login(assertion, NOW).await,
				Err(Error::AssertionInvalid { .. })
			),
			"`{assertion}` should be an invalid assertion."
		);
	}
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_failure() {
	let identity = IdentityConfig::google(AUDIENCE)
		.with_endpoint(Url::parse("http://127.0.0.1:9/tokeninfo").expect("URL should parse."))
		.with_timeout(Duration::seconds(1));
	let verifier = TokenInfoVerifier::new(&identity).expect("Verifier should build.");
	let err = verifier
		.verify_external_assertion("anything", NOW)
		.await
		.expect_err("Closed port should not verify.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(err.http_status(), 503);
}
