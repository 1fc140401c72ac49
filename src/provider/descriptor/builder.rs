// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint is required for the Authorization Code flow.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Resource API root is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// A built-in or configured URL failed to parse.
	#[error("Invalid endpoint URL: {url}.")]
	InvalidUrl {
		/// Raw URL that failed to parse.
		url: String,
	},
	/// Endpoints must use HTTPS unless they point at the loopback interface.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// Resource API root.
	pub api_base: Option<Url>,
}
impl ProviderDescriptorBuilder {
	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the resource API root.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets all endpoints at once.
	pub fn endpoints(self, endpoints: ProviderEndpoints) -> Self {
		self.authorization_endpoint(endpoints.authorization)
			.token_endpoint(endpoints.token)
			.api_base(endpoints.api_base)
	}

	/// Consumes the builder and validates the resulting descriptor.
	///
	/// The API root gains a trailing slash when missing so relative paths join beneath it.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let mut api_base = self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?;

		if !api_base.path().ends_with('/') {
			let path = format!("{}/", api_base.path());

			api_base.set_path(&path);
		}

		let descriptor =
			ProviderDescriptor { endpoints: ProviderEndpoints { authorization, token, api_base } };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api", &self.endpoints.api_base)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}
