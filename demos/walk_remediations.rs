//! Starts an Identity Engine flow and walks the offered remediations,
//! printing each form the way a login UI would render it.
//!
//! Point the environment at your org before running:
//! `IDX_ISSUER`, `IDX_CLIENT_ID`, `IDX_REDIRECT_URI`, `IDX_IDENTIFIER`.

// std
use std::{collections::HashMap, env};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use idx_client::{
	config::Configuration,
	flow::{IdxClient, StartOptions},
	remediation::RemediationKind,
	value::Value,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let configuration = Configuration::builder()
		.issuer(Url::parse(&env::var("IDX_ISSUER")?)?)
		.client_id(env::var("IDX_CLIENT_ID")?)
		.scopes(["openid", "profile", "offline_access"])
		.redirect_uri(Url::parse(&env::var("IDX_REDIRECT_URI")?)?)
		.build()?;
	let client = IdxClient::new(configuration);
	let response = client.start(StartOptions::default()).await?;

	for remediation in response.remediations() {
		println!("Remediation `{}` via {} {}.", remediation.kind, remediation.method, remediation.href);

		for field in remediation.form().fields() {
			if !field.is_visible() {
				continue;
			}

			println!(
				"  field `{}`{}{}",
				field.name(),
				field.label().map(|label| format!(" ({label})")).unwrap_or_default(),
				if field.is_required() { " [required]" } else { "" },
			);
		}
	}

	let Some(identify) = response.remediation(&RemediationKind::Identify) else {
		println!("This policy does not start with an identify step; nothing more to do.");

		return Ok(());
	};
	let identifier = env::var("IDX_IDENTIFIER")?;
	let next = client
		.proceed(
			identify,
			&HashMap::from_iter([("identifier".to_string(), Value::from(identifier))]),
		)
		.await?;

	println!("Server replied with {} follow-up remediation(s).", next.remediations().len());

	for message in next.messages() {
		println!("Server says: {}.", message.text);
	}

	Ok(())
}
