//! Vault engine for resivault.
//!
//! This crate provides:
//! - The secret and usage variant model, with a registry of known variants
//! - Entries and their encrypted persistence ([`EntryRepository`])
//! - The [`Vault`] state machine: initialize, unlock, lock and entry access
//!
//! # Architecture
//! The vault sits between the boundary layers (HTTP server, CLI) and the
//! blob stores, handling all key management and encryption.

pub mod config;
pub mod entry;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod secret;
mod session;
pub mod tag;
pub mod usage;
pub mod variants;
pub mod vault;

pub use config::{CryptoSuite, VaultLayout, ROOT_ENTRY_ID};
pub use entry::{Entry, EntryEnvelope};
pub use registry::{Registry, SecretVariant, UsageVariant};
pub use repository::EntryRepository;
pub use schema::Schema;
pub use secret::{Secret, SecretEnvelope, SecretKind};
pub use tag::Tag;
pub use usage::{Usage, UsageEnvelope, UsageKind};
pub use vault::Vault;
