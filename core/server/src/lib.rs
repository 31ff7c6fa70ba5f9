//! HTTP boundary of resivault.
//!
//! Exposes the vault over HTTP on a local Unix socket. Vault access is
//! serialized behind one mutex; entry routes require a session token issued
//! by `POST /unlock`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{SessionToken, SessionTokens};
pub use config::ServerConfig;
pub use error::ApiError;
pub use server::build_router;
#[cfg(unix)]
pub use server::serve_unix;
pub use state::AppState;
