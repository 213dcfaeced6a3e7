#![cfg(feature = "reqwest")]

// std
use std::{
	collections::HashMap,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use idx_client::{
	_preludet::*,
	flow::{FlowObserver, StartOptions},
	remediation::RemediationKind,
	response::Response,
	token::Token,
	value::Value,
};

#[derive(Default)]
struct CountingObserver {
	responses: AtomicUsize,
	tokens: AtomicUsize,
	errors: AtomicUsize,
}
impl FlowObserver for CountingObserver {
	fn on_response(&self, _response: &Response) {
		self.responses.fetch_add(1, Ordering::SeqCst);
	}

	fn on_token(&self, _token: &Token) {
		self.tokens.fetch_add(1, Ordering::SeqCst);
	}

	fn on_error(&self, _error: &Error) {
		self.errors.fetch_add(1, Ordering::SeqCst);
	}
}

fn identify_body(server: &MockServer) -> String {
	json!({
		"stateHandle": "02state-1",
		"intent": "LOGIN",
		"remediation": {"type": "array", "value": [{
			"name": "identify",
			"method": "POST",
			"href": server.url("/idp/idx/identify"),
			"accepts": "application/ion+json; okta-version=1.0.0",
			"value": [
				{"name": "identifier", "label": "Username"},
				{"name": "stateHandle", "required": true, "value": "02state-1",
					"visible": false, "mutable": false},
			],
		}]},
	})
	.to_string()
}

fn challenge_body(server: &MockServer) -> String {
	json!({
		"stateHandle": "02state-2",
		"remediation": {"type": "array", "value": [{
			"name": "challenge-authenticator",
			"method": "POST",
			"href": server.url("/idp/idx/challenge/answer"),
			"accepts": "application/ion+json; okta-version=1.0.0",
			"relatesTo": ["$.currentAuthenticatorEnrollment"],
			"value": [
				{"name": "credentials", "type": "object", "form": {"value": [
					{"name": "passcode", "label": "Password", "secret": true},
				]}},
				{"name": "stateHandle", "required": true, "value": "02state-2",
					"visible": false, "mutable": false},
			],
		}]},
		"currentAuthenticatorEnrollment": {"type": "object", "value": {
			"type": "password",
			"key": "okta_password",
			"id": "aut-password",
			"displayName": "Password",
			"methods": [{"type": "password"}],
		}},
	})
	.to_string()
}

fn success_body(server: &MockServer) -> String {
	json!({
		"stateHandle": "02state-3",
		"successWithInteractionCode": {
			"name": "successWithInteractionCode",
			"method": "POST",
			"href": server.url("/oauth2/v1/token"),
			"accepts": "application/x-www-form-urlencoded",
			"value": [
				{"name": "grant_type", "required": true, "value": "interaction_code"},
				{"name": "interaction_code", "required": true, "value": "icode-123",
					"mutable": false},
				{"name": "client_id", "required": true, "value": "client-test"},
			],
		},
	})
	.to_string()
}

#[tokio::test]
async fn identify_to_token_walks_the_whole_flow() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);
	let observer = std::sync::Arc::new(CountingObserver::default());

	client.register_observer(observer.clone());

	let interact = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/interact");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"interaction_handle\":\"ih-123\"}");
		})
		.await;
	let introspect = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/idp/idx/introspect");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(identify_body(&server));
		})
		.await;
	let identify = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/idp/idx/identify");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(challenge_body(&server));
		})
		.await;
	let challenge = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/idp/idx/challenge/answer");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(success_body(&server));
		})
		.await;
	let token_endpoint = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"at-123\",\"token_type\":\"Bearer\",\"expires_in\":3600,\
				\"scope\":\"openid profile offline_access\",\"refresh_token\":\"rt-123\"}",
			);
		})
		.await;

	let first = client
		.start(StartOptions::default())
		.await
		.expect("Workflow start should yield the first response.");

	assert!(!first.is_success());

	let identify_step = first
		.remediation(&RemediationKind::Identify)
		.expect("First response should offer the identify remediation.");
	let second = client
		.proceed(
			identify_step,
			&HashMap::from_iter([(
				"identifier".to_string(),
				Value::from("user@example.com"),
			)]),
		)
		.await
		.expect("Identify submission should yield the challenge response.");
	let challenge_step = second
		.remediation(&RemediationKind::ChallengeAuthenticator)
		.expect("Second response should offer the challenge remediation.");
	let authenticator = second
		.related_authenticator(challenge_step)
		.expect("Challenge should relate to the password authenticator.");

	assert_eq!(authenticator.kind, "password");

	let third = client
		.proceed(
			challenge_step,
			&HashMap::from_iter([(
				"credentials".to_string(),
				Value::Map(HashMap::from_iter([(
					"passcode".to_string(),
					Value::from("secret"),
				)])),
			)]),
		)
		.await
		.expect("Challenge submission should yield the success response.");

	assert!(third.is_success());

	let token = client
		.exchange_code(&third)
		.await
		.expect("Code exchange should mint a token.");

	assert!(!token.access_token.expose().is_empty());
	assert_eq!(token.token_type, "Bearer");
	assert_eq!(
		token.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("rt-123"),
	);
	assert!(client.context().is_none(), "Exchange should consume the session context.");

	interact.assert_async().await;
	introspect.assert_async().await;
	identify.assert_async().await;
	challenge.assert_async().await;
	token_endpoint.assert_async().await;

	// Observers and per-call completions must report identical outcomes.
	assert_eq!(observer.responses.load(Ordering::SeqCst), 3);
	assert_eq!(observer.tokens.load(Ordering::SeqCst), 1);
	assert_eq!(observer.errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resume_refetches_the_current_state() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/interact");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"interaction_handle\":\"ih-resume\"}");
		})
		.await;

	let introspect = server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/idx/introspect");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(identify_body(&server));
		})
		.await;

	client.start(StartOptions::default()).await.expect("Workflow start should succeed.");

	let resumed = client.resume().await.expect("Resume should re-fetch the current state.");

	assert!(resumed.remediation(&RemediationKind::Identify).is_some());
	assert_eq!(introspect.hits_async().await, 2);
}

#[tokio::test]
async fn restored_contexts_resume_across_client_instances() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/interact");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"interaction_handle\":\"ih-persist\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/idx/introspect");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(identify_body(&server));
		})
		.await;

	client.start(StartOptions::default()).await.expect("Workflow start should succeed.");

	let serialized = serde_json::to_string(
		&client.context().expect("An active session should expose its context."),
	)
	.expect("Context should serialize for persistence.");
	let restored: idx_client::flow::Context =
		serde_json::from_str(&serialized).expect("Context should deserialize back.");
	let second = ReqwestTestClient::with_context(restored, test_reqwest_http_client());
	let resumed =
		second.resume().await.expect("A restored context should resume the workflow.");

	assert!(resumed.remediation(&RemediationKind::Identify).is_some());
}

#[tokio::test]
async fn start_surfaces_oauth_errors_from_interact() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/interact");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"Client authentication failed.\"}",
			);
		})
		.await;

	let err = client
		.start(StartOptions::default())
		.await
		.expect_err("Interact errors should fail the start call.");

	assert!(matches!(err, Error::Oauth { ref code, .. } if code == "invalid_client"));
	assert!(client.context().is_none(), "Failed starts must not leave a context behind.");
}

#[tokio::test]
async fn operations_without_a_session_are_invalid_client() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	let err = client.resume().await.expect_err("Resume without a session must fail.");

	assert!(matches!(err, Error::InvalidClient));

	let response = Response::from_slice(identify_body(&server).as_bytes())
		.expect("Identify fixture should decode.");
	let identify = response
		.remediation(&RemediationKind::Identify)
		.expect("Fixture should offer the identify remediation.");
	let err = client
		.proceed(identify, &HashMap::new())
		.await
		.expect_err("Proceed without a session must fail.");

	assert!(matches!(err, Error::InvalidClient));
}

#[tokio::test]
async fn exchange_requires_a_success_response() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/interact");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"interaction_handle\":\"ih-early\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/idx/introspect");
			then.status(200)
				.header("content-type", "application/ion+json; okta-version=1.0.0")
				.body(identify_body(&server));
		})
		.await;

	let first = client.start(StartOptions::default()).await.expect("Start should succeed.");
	let err = client
		.exchange_code(&first)
		.await
		.expect_err("Exchanging a non-success response must fail.");

	assert!(matches!(err, Error::SuccessResponseMissing));
}

#[tokio::test]
async fn server_error_bodies_surface_typed() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/interact");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"interaction_handle\":\"ih-err\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/idp/idx/introspect");
			then.status(401)
				.header("content-type", "application/json")
				.body(
					"{\"message\":\"The session has expired.\",\
					\"localizationKey\":\"idx.session.expired\",\"type\":\"string\"}",
				);
		})
		.await;

	let err = client
		.start(StartOptions::default())
		.await
		.expect_err("Expired sessions should surface the typed server error.");

	assert!(matches!(
		err,
		Error::Server { ref message, ref localization_key, .. }
			if message == "The session has expired."
				&& localization_key.as_deref() == Some("idx.session.expired")
	));
}
