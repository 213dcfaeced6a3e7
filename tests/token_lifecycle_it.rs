#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use idx_client::{
	_preludet::*,
	token::{RevokeTokenKind, Token, TokenSecret},
};

fn seed_token(server: &MockServer, refresh: Option<&str>) -> Token {
	Token {
		access_token: TokenSecret::new("at-original"),
		token_type: "Bearer".into(),
		expires_in: Duration::seconds(3600),
		scope: Some("openid profile offline_access".into()),
		refresh_token: refresh.map(TokenSecret::new),
		id_token: None,
		issued_at: OffsetDateTime::now_utc(),
		configuration: test_configuration(&server.base_url()),
	}
}

#[tokio::test]
async fn refresh_mints_a_new_token_and_keeps_the_original() {
	let server = MockServer::start_async().await;
	let token = seed_token(&server, Some("rt-original"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"at-rotated\",\"refresh_token\":\"rt-rotated\",\
				\"token_type\":\"Bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	let refreshed = token
		.refresh(&test_reqwest_http_client())
		.await
		.expect("Refresh should mint a new token.");

	mock.assert_async().await;

	assert_eq!(refreshed.access_token.expose(), "at-rotated");
	assert_eq!(
		refreshed.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("rt-rotated"),
	);
	assert_eq!(refreshed.expires_in, Duration::seconds(1800));
	// The original bundle is an immutable snapshot.
	assert_eq!(token.access_token.expose(), "at-original");
}

#[tokio::test]
async fn refresh_carries_the_prior_refresh_token_when_omitted() {
	let server = MockServer::start_async().await;
	let token = seed_token(&server, Some("rt-sticky"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"at-rotated\",\"token_type\":\"Bearer\",\"expires_in\":1800}",
			);
		})
		.await;

	let refreshed = token
		.refresh(&test_reqwest_http_client())
		.await
		.expect("Refresh without rotation should still succeed.");

	assert_eq!(
		refreshed.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("rt-sticky"),
	);
}

#[tokio::test]
async fn refresh_surfaces_oauth_errors() {
	let server = MockServer::start_async().await;
	let token = seed_token(&server, Some("rt-expired"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"The refresh token is expired.\"}",
			);
		})
		.await;

	let err = token
		.refresh(&test_reqwest_http_client())
		.await
		.expect_err("Expired refresh tokens should surface the OAuth error.");

	assert!(matches!(err, Error::Oauth { ref code, .. } if code == "invalid_grant"));
}

#[tokio::test]
async fn revoke_posts_the_selected_secret() {
	let server = MockServer::start_async().await;
	let token = seed_token(&server, Some("rt-revocable"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/revoke");
			then.status(200);
		})
		.await;

	token
		.revoke(&test_reqwest_http_client(), RevokeTokenKind::RefreshToken)
		.await
		.expect("Revocation should succeed with an empty reply body.");

	mock.assert_async().await;
}

#[tokio::test]
async fn revoke_without_refresh_token_never_reaches_the_server() {
	let server = MockServer::start_async().await;
	let token = seed_token(&server, None);
	let revoke = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/revoke");
			then.status(200);
		})
		.await;
	let err = token
		.revoke(&test_reqwest_http_client(), RevokeTokenKind::RefreshToken)
		.await
		.expect_err("Revoking an absent refresh token must fail locally.");

	assert!(matches!(err, Error::MissingRefreshToken));
	assert_eq!(revoke.hits_async().await, 0);
}

#[tokio::test]
async fn client_delegates_refresh_through_its_transport() {
	let server = MockServer::start_async().await;
	let configuration = test_configuration(&server.base_url());
	let client = build_reqwest_test_client(configuration);
	let token = seed_token(&server, Some("rt-client"));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v1/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"at-client\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;

	let refreshed =
		client.refresh(&token).await.expect("Client-side refresh should succeed.");

	assert_eq!(refreshed.access_token.expose(), "at-client");

	let revoke = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v1/revoke");
			then.status(200);
		})
		.await;

	client
		.revoke(&refreshed, RevokeTokenKind::AccessToken)
		.await
		.expect("Client-side revocation should succeed.");

	revoke.assert_async().await;
}
