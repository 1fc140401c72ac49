//! Authorization Code + PKCE building blocks: per-attempt session material and the loopback
//! redirect listener.

mod listener;
mod session;

pub use listener::*;
pub use session::*;
