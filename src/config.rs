//! Client configuration: issuer, application credentials, and the endpoints
//! derived from them.
//!
//! The configuration is embedded in [`Context`](crate::flow::Context) and
//! [`Token`](crate::token::Token) so both can round-trip across process
//! boundaries and keep operating without the caller re-supplying it.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a configuration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ConfigurationError {
	/// Issuer URL is mandatory.
	#[error("Missing issuer URL.")]
	MissingIssuer,
	/// Client identifier is mandatory.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Redirect URI is mandatory for the interaction-code exchange.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
	/// Issuer must use HTTPS.
	#[error("The issuer URL must use HTTPS: {url}.")]
	InsecureIssuer {
		/// Issuer URL that failed validation.
		url: String,
	},
	/// Issuer URLs must be a valid base for endpoint derivation.
	#[error("The issuer URL cannot serve as a base: {url}.")]
	UnusableIssuer {
		/// Issuer URL that failed validation.
		url: String,
	},
	/// Scope entries cannot be empty or contain whitespace.
	#[error("Scope entry is invalid: {scope:?}.")]
	InvalidScope {
		/// The offending scope string.
		scope: String,
	},
	/// At least one scope must be requested.
	#[error("At least one scope must be requested.")]
	NoScopes,
}

/// Immutable client configuration consumed by every flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
	/// Issuer URL, either an org authorization server or a custom one.
	pub issuer: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Optional client secret for confidential clients.
	pub client_secret: Option<String>,
	/// Requested scopes, space-joined into requests.
	pub scopes: Vec<String>,
	/// Redirect URI registered for the application.
	pub redirect_uri: Url,
}
impl Configuration {
	/// Creates a new builder.
	pub fn builder() -> ConfigurationBuilder {
		ConfigurationBuilder::default()
	}

	/// Space-joined scope string for token-endpoint requests.
	pub fn scope(&self) -> String {
		self.scopes.join(" ")
	}

	/// Interaction-start endpoint under the issuer.
	pub fn interact_endpoint(&self) -> Url {
		self.oauth2_endpoint("interact")
	}

	/// Token endpoint under the issuer.
	pub fn token_endpoint(&self) -> Url {
		self.oauth2_endpoint("token")
	}

	/// Revocation endpoint under the issuer.
	pub fn revoke_endpoint(&self) -> Url {
		self.oauth2_endpoint("revoke")
	}

	/// IDX introspection endpoint at the issuer origin.
	pub fn introspect_endpoint(&self) -> Url {
		let mut url = self.issuer.clone();

		url.set_path("/idp/idx/introspect");
		url.set_query(None);

		url
	}

	// Org authorization servers expose `/oauth2/v1/<leaf>`; custom servers
	// (`/oauth2/<id>` issuers) expose `/v1/<leaf>` under the issuer path.
	fn oauth2_endpoint(&self, leaf: &str) -> Url {
		let base = self.issuer.path().trim_end_matches('/');
		let path = if base.contains("/oauth2/") {
			format!("{base}/v1/{leaf}")
		} else {
			format!("{base}/oauth2/v1/{leaf}")
		};
		let mut url = self.issuer.clone();

		url.set_path(&path);
		url.set_query(None);

		url
	}

	fn validate(&self) -> Result<(), ConfigurationError> {
		if self.issuer.scheme() != "https" {
			return Err(ConfigurationError::InsecureIssuer { url: self.issuer.to_string() });
		}
		if self.issuer.cannot_be_a_base() {
			return Err(ConfigurationError::UnusableIssuer { url: self.issuer.to_string() });
		}
		if self.client_id.is_empty() {
			return Err(ConfigurationError::MissingClientId);
		}
		if self.scopes.is_empty() {
			return Err(ConfigurationError::NoScopes);
		}

		for scope in &self.scopes {
			if scope.is_empty() || scope.chars().any(char::is_whitespace) {
				return Err(ConfigurationError::InvalidScope { scope: scope.clone() });
			}
		}

		Ok(())
	}
}

/// Builder for [`Configuration`] values.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
	issuer: Option<Url>,
	client_id: Option<String>,
	client_secret: Option<String>,
	scopes: Vec<String>,
	redirect_uri: Option<Url>,
}
impl ConfigurationBuilder {
	/// Sets the issuer URL.
	pub fn issuer(mut self, url: Url) -> Self {
		self.issuer = Some(url);

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the optional client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Adds one requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Adds multiple requested scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<Configuration, ConfigurationError> {
		let configuration = Configuration {
			issuer: self.issuer.ok_or(ConfigurationError::MissingIssuer)?,
			client_id: self.client_id.ok_or(ConfigurationError::MissingClientId)?,
			client_secret: self.client_secret,
			scopes: self.scopes,
			redirect_uri: self.redirect_uri.ok_or(ConfigurationError::MissingRedirectUri)?,
		};

		configuration.validate()?;

		Ok(configuration)
	}
}
