//! MCP server exposing the X API on stdio.
//!
//! Tokens come from the credential file (written by `x-mcp-setup` and by every rotation) or,
//! failing that, from `X_OAUTH2_ACCESS_TOKEN`/`X_OAUTH2_REFRESH_TOKEN`. Logs go to stderr.

// std
use std::{process::ExitCode, sync::Arc};
// crates.io
use color_eyre::Result;
// self
use x_mcp_broker::{
	api::XApi,
	client::{AuthenticatedClient, ReqwestTransport},
	config::Settings,
	http::ReqwestHttpClient,
	mcp::McpServer,
	obs,
	store::{self, CredentialStore},
	tools::XTools,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
	color_eyre::install()?;
	obs::init_tracing()?;

	let settings = Settings::from_env()?;
	let store: Arc<dyn CredentialStore> = Arc::new(settings.credential_store());
	let tokens = match store::load_or_bootstrap(store.as_ref(), settings.bootstrap_tokens()?).await
	{
		Ok(tokens) => tokens,
		Err(e) => {
			tracing::error!(error = %e, "no X credentials available");
			eprintln!("Set X_OAUTH2_ACCESS_TOKEN, or run `X_CLIENT_ID=<id> x-mcp-setup` first.");

			return Ok(ExitCode::from(1));
		},
	};
	let has_refresh_token = tokens.refresh_token.is_some();
	let descriptor = settings.descriptor()?;
	let http_client = ReqwestHttpClient::new()?;
	let transport = Arc::new(ReqwestTransport::new(descriptor.clone(), http_client.clone()));
	let mut client = AuthenticatedClient::new(tokens, transport, store);

	if settings.client_id.is_some() {
		client = client.with_exchanger(Arc::new(settings.exchanger(&descriptor, http_client)?));
	} else {
		tracing::warn!("X_CLIENT_ID is not set; expired tokens cannot be refreshed");
	}
	if has_refresh_token {
		tracing::info!("automatic token refresh enabled");
	} else {
		tracing::warn!("no refresh token; re-run x-mcp-setup once the access token expires");
	}

	let api = Arc::new(XApi::new(Arc::new(client)));
	let server = McpServer::new(Arc::new(XTools::new(api)));

	tokio::select! {
		result = server.run_stdio() => result?,
		_ = tokio::signal::ctrl_c() => tracing::info!("interrupt received; shutting down"),
	}

	Ok(ExitCode::SUCCESS)
}
