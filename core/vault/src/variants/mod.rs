//! Compiled-in secret and usage variants.
//!
//! Each module defines one variant's type tag, schema and behavior, plus a
//! `register` function that adds it to a [`Registry`](crate::Registry).

pub mod encryption_key;
pub mod password;
pub mod vault_access;
pub mod web_login;

pub use vault_access::VaultAccess;
pub use web_login::WebLogin;
