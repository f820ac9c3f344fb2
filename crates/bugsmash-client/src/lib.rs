//! # bugsmash-client
//!
//! The application layer over the stores: session handling, input
//! validation and the command surface a UI binds to.  All state lives in
//! [`AppState`]; commands are free functions taking the state and, where a
//! write needs an author, an explicit [`Session`].

pub mod auth;
pub mod commands;
pub mod config;
pub mod state;

mod error;

pub use auth::{IdentityProvider, MemoryIdentityProvider, Session};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use state::AppState;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise logging for the process.  `RUST_LOG` overrides the default
/// filter; calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bugsmash_client=debug,bugsmash_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
