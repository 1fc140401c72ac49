//! MCP server for the X (Twitter) API backed by a self-refreshing OAuth 2.0 Authorization Code +
//! PKCE client: one-shot browser authorization, transparent token rotation, and durable
//! credential persistence in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod mcp;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
pub mod tools;
#[cfg(test)]
pub(crate) mod _preludet {
	//! Convenience re-exports and fixtures shared by unit tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ScopeSet, TokenSet},
		provider::{ProviderDescriptor, ProviderEndpoints},
	};

	/// Builds a descriptor whose endpoints all live on the provided (mock) base URL.
	///
	/// The authorize endpoint is `/i/oauth2/authorize`, the token endpoint `/2/oauth2/token`,
	/// and the resource API root `/2`, mirroring the production layout.
	pub fn test_descriptor(base: &str) -> ProviderDescriptor {
		let base = base.trim_end_matches('/');
		let endpoints = ProviderEndpoints {
			authorization: Url::parse(&format!("{base}/i/oauth2/authorize"))
				.expect("Failed to parse mock authorization endpoint."),
			token: Url::parse(&format!("{base}/2/oauth2/token"))
				.expect("Failed to parse mock token endpoint."),
			api_base: Url::parse(&format!("{base}/2/")).expect("Failed to parse mock API base."),
		};

		ProviderDescriptor::builder()
			.endpoints(endpoints)
			.build()
			.expect("Mock descriptor should pass validation.")
	}

	/// Builds a token set issued `age` ago that lives for `lifetime` (before the safety margin).
	pub fn test_token_set(
		access: &str,
		refresh: Option<&str>,
		age: Duration,
		lifetime: Duration,
	) -> TokenSet {
		let issued_at = OffsetDateTime::now_utc() - age;
		let mut builder = TokenSet::builder()
			.access_token(access)
			.issued_at(issued_at)
			.expires_in(lifetime)
			.scope(ScopeSet::new(["tweet.read", "offline.access"]).expect("Scope fixture."));

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Token set fixture should build.")
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Value as JsonValue, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// Consumed by the binaries only.
use color_eyre as _;
#[cfg(test)] use httpmock as _;
