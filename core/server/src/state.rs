//! Shared server state.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::SessionTokens;
use resivault_vault::{Registry, Vault};

/// State shared by all handlers.
///
/// Lock order is `vault` then `sessions`.
pub struct AppState {
    /// The vault is not internally synchronized; one request at a time.
    pub vault: Mutex<Vault>,
    pub sessions: Mutex<SessionTokens>,
    /// Same registry the vault decodes with; read-only.
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(vault: Vault) -> Self {
        let registry = vault.registry().clone();
        Self {
            vault: Mutex::new(vault),
            sessions: Mutex::new(SessionTokens::new()),
            registry,
        }
    }
}
