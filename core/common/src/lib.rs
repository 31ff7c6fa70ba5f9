//! Common utilities and types shared across resivault crates.
//!
//! This module provides the error taxonomy used by every layer of the vault,
//! plus the small identifier types that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::VaultId;
