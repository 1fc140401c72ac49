//! Provider descriptor data structures shared by the exchanger and the API client.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Production authorization endpoint.
pub const X_AUTHORIZE_URL: &str = "https://x.com/i/oauth2/authorize";
/// Production token endpoint.
pub const X_TOKEN_URL: &str = "https://api.x.com/2/oauth2/token";
/// Production resource API root.
pub const X_API_BASE_URL: &str = "https://api.x.com/2/";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the user's browser is sent to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Root of the resource API; relative request paths are joined onto it.
	pub api_base: Url,
}

/// Immutable, validated provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new, empty builder.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Descriptor for the production X endpoints.
	pub fn x() -> Result<Self, ProviderDescriptorError> {
		Self::builder()
			.authorization_endpoint(parse_fixed(X_AUTHORIZE_URL)?)
			.token_endpoint(parse_fixed(X_TOKEN_URL)?)
			.api_base(parse_fixed(X_API_BASE_URL)?)
			.build()
	}

	/// Resolves a resource path such as `users/me` against the API root.
	pub fn api_url(&self, path: &str) -> Result<Url, url::ParseError> {
		self.endpoints.api_base.join(path.trim_start_matches('/'))
	}
}

fn parse_fixed(raw: &'static str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|_| ProviderDescriptorError::InvalidUrl { url: raw.into() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn production_descriptor_resolves_api_paths() {
		let descriptor = ProviderDescriptor::x().expect("Production descriptor should validate.");

		assert_eq!(descriptor.endpoints.token.as_str(), X_TOKEN_URL);
		assert_eq!(
			descriptor.api_url("/users/me").expect("Path should join.").as_str(),
			"https://api.x.com/2/users/me"
		);
		assert_eq!(
			descriptor.api_url("tweets/search/recent").expect("Path should join.").as_str(),
			"https://api.x.com/2/tweets/search/recent"
		);
	}
}
