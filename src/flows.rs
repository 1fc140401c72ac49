//! Interactive authorization flow used by `x-mcp-setup`.

pub mod auth_code_pkce;
pub mod setup;

pub use auth_code_pkce::*;
pub use setup::*;
