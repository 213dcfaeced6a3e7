//! Demonstrates persisting a session context and resuming it from a second
//! client instance, the way a mobile app survives a process restart.
//!
//! Point the environment at your org before running:
//! `IDX_ISSUER`, `IDX_CLIENT_ID`, `IDX_REDIRECT_URI`.

// std
use std::env;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use idx_client::{
	config::Configuration,
	flow::{Context, IdxClient, StartOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let configuration = Configuration::builder()
		.issuer(Url::parse(&env::var("IDX_ISSUER")?)?)
		.client_id(env::var("IDX_CLIENT_ID")?)
		.scopes(["openid", "profile"])
		.redirect_uri(Url::parse(&env::var("IDX_REDIRECT_URI")?)?)
		.build()?;
	let client = IdxClient::new(configuration);

	client.start(StartOptions::default()).await?;

	// Persist the opaque context wherever the platform keeps secure state.
	let persisted = serde_json::to_string(
		&client.context().expect("An active session always exposes a context."),
	)?;

	drop(client);

	let restored: Context = serde_json::from_str(&persisted)?;
	let resumed_client =
		IdxClient::with_context(restored, idx_client::http::ReqwestHttpClient::default());
	let response = resumed_client.resume().await?;

	println!(
		"Resumed the workflow with {} remediation(s) still offered.",
		response.remediations().len(),
	);

	Ok(())
}
