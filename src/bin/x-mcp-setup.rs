//! One-shot browser authorization for the X MCP server.
//!
//! Binds `localhost:<X_CALLBACK_PORT>/callback`, sends the user to X, exchanges the returned
//! code, and stores the credentials where `x-mcp` picks them up.

// std
use std::process::ExitCode;
// crates.io
use color_eyre::Result;
// self
use x_mcp_broker::{
	auth::TokenSet,
	config::Settings,
	flows::{self, AuthorizationFlow},
	http::ReqwestHttpClient,
	obs,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
	color_eyre::install()?;
	obs::init_tracing()?;

	let settings = Settings::from_env()?;

	if settings.client_id.is_none() {
		print_registration_help(&settings)?;

		return Ok(ExitCode::from(1));
	}

	let descriptor = settings.descriptor()?;
	let options = settings.setup_options()?;
	let exchanger = settings.exchanger(&descriptor, ReqwestHttpClient::new()?)?;
	let store = settings.credential_store();

	println!("X OAuth 2.0 setup");
	println!("  Client ID:    {}", options.client_id);
	println!("  Redirect URI: {}", options.redirect_uri);
	println!("  Scopes:       {}", options.scope);
	println!();

	let outcome = match AuthorizationFlow::start(&descriptor, options).await {
		Ok(pending) => {
			println!("Listening on http://{}", pending.local_addr());

			if !pending.open_browser() {
				println!("Could not open a browser automatically.");
			}

			println!("Authorize here if the browser did not open:\n{}\n", pending.authorize_url());
			println!("Waiting for authorization...");

			pending.complete(&exchanger, &store).await
		},
		Err(e) => Err(e),
	};

	match outcome {
		Ok(tokens) => {
			print_summary(&tokens, &settings);

			Ok(ExitCode::SUCCESS)
		},
		Err(e) => {
			eprintln!("Setup failed: {e}");

			if matches!(e, x_mcp_broker::error::Error::InvalidClient { .. }) {
				eprintln!("Check X_CLIENT_ID; a client secret is not required for PKCE public clients.");
			}

			Ok(ExitCode::from(flows::exit_code(&e)))
		},
	}
}

fn print_summary(tokens: &TokenSet, settings: &Settings) {
	println!("\nAuthorization complete.\n");
	println!("Access token:  {}", tokens.access_token.expose());
	println!(
		"Refresh token: {}",
		tokens.refresh_token.as_ref().map(|t| t.expose()).unwrap_or("not provided")
	);
	println!("Expires at:    {}", tokens.expires_at);
	println!("Scopes:        {}", tokens.scope);
	println!("Saved to:      {}\n", settings.credentials_path.display());
	println!("Add these to the MCP server environment:");
	println!("  X_CLIENT_ID={}", settings.client_id.as_deref().unwrap_or_default());
	println!("  X_OAUTH2_ACCESS_TOKEN={}", tokens.access_token.expose());

	if let Some(refresh) = &tokens.refresh_token {
		println!("  X_OAUTH2_REFRESH_TOKEN={}", refresh.expose());
	}
}

fn print_registration_help(settings: &Settings) -> Result<()> {
	eprintln!("X_CLIENT_ID is not set.\n");
	eprintln!("To get a client id:");
	eprintln!("  1. Open https://developer.x.com/en/portal/projects-and-apps and select your app.");
	eprintln!("  2. Enable OAuth 2.0 under \"User authentication settings\".");
	eprintln!("  3. Set the callback URI to {}.", settings.redirect_uri()?);
	eprintln!("  4. Save and copy the client id.\n");
	eprintln!("Then run: X_CLIENT_ID=<client id> x-mcp-setup");

	Ok(())
}
