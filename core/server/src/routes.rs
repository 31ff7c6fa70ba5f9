//! Route handlers.
//!
//! Public routes manage the vault lifecycle. Everything under `/entries`
//! sits behind [`require_session`](crate::auth::require_session).

use axum::extract::{Path, State};
use axum::http::header::{ACCEPT, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::session_cookie;
use crate::error::ApiError;
use crate::state::AppState;
use resivault_common::Error;
use resivault_vault::{Entry, Tag, Usage, UsageEnvelope};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Public routes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub initialized: bool,
    pub unlocked: bool,
    pub session_count: usize,
}

/// `GET /status`
pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let vault = state.vault.lock().await;
    let initialized = vault.is_initialized().await?;
    let unlocked = vault.is_unlocked();
    let session_count = state.sessions.lock().await.len();

    Ok(Json(StatusResponse {
        initialized,
        unlocked,
        session_count,
    }))
}

/// `GET /types`: registered secret and usage types with their schemas.
pub async fn types(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.registry.describe())
}

/// Body of `/initialize` and `/unlock`.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PasswordRequest {
    password: String,
}

/// `POST /initialize`
pub async fn initialize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .vault
        .lock()
        .await
        .initialize_new(&body.password)
        .await?;
    Ok(StatusCode::CREATED)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub token: String,
    pub loading_errors: BTreeMap<String, String>,
}

fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("application/json"))
}

/// `POST /unlock`: unlock, load all entries and issue a session token.
///
/// The token is always set as a cookie. Clients accepting JSON also get it
/// in the body together with per-entry loading errors.
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PasswordRequest>,
) -> ApiResult<Response> {
    let mut vault = state.vault.lock().await;
    vault.unlock(&body.password).await?;
    vault.load_entries().await?;
    let loading_errors = vault
        .loading_errors()
        .iter()
        .map(|(id, err)| (id.clone(), err.to_string()))
        .collect();

    let token = state.sessions.lock().await.issue();
    drop(vault);
    info!("Session token issued");

    let cookie = [(SET_COOKIE, session_cookie(&token))];
    if accepts_json(&headers) {
        Ok((
            cookie,
            Json(UnlockResponse {
                token,
                loading_errors,
            }),
        )
            .into_response())
    } else {
        Ok((StatusCode::NO_CONTENT, cookie).into_response())
    }
}

/// `POST /lock`: lock the vault and revoke every session token.
pub async fn lock(State(state): State<Arc<AppState>>) -> StatusCode {
    let mut vault = state.vault.lock().await;
    vault.lock();
    state.sessions.lock().await.revoke_all();
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Sensitive routes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: String,
    pub name: String,
    pub usage_type: &'static str,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct SecretSummary {
    #[serde(rename = "type")]
    pub type_tag: &'static str,
    pub label: String,
}

/// Entry as shown to clients: no ciphertext.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: String,
    pub name: String,
    pub tags: Vec<Tag>,
    pub auto_tags: Vec<Tag>,
    pub usage: UsageEnvelope,
    pub secrets: Vec<SecretSummary>,
}

impl From<&Entry> for EntryView {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id().to_string(),
            name: entry.name().to_string(),
            tags: entry.tags().to_vec(),
            auto_tags: entry.auto_tags(),
            usage: entry.usage().to_envelope(),
            secrets: entry
                .secrets()
                .iter()
                .map(|s| SecretSummary {
                    type_tag: s.type_tag(),
                    label: s.label().to_string(),
                })
                .collect(),
        }
    }
}

/// `GET /entries`
pub async fn list_entries(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<EntrySummary>>> {
    let vault = state.vault.lock().await;
    let summaries = vault
        .entries()?
        .map(|entry| EntrySummary {
            id: entry.id().to_string(),
            name: entry.name().to_string(),
            usage_type: entry.usage().type_tag(),
            tags: entry.all_tags(),
        })
        .collect();
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct NewEntryRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub usage: UsageEnvelope,
}

/// `POST /entries`: create an entry without secrets.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewEntryRequest>,
) -> ApiResult<Response> {
    let mut vault = state.vault.lock().await;

    let id = body
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(Entry::generate_id);
    if vault.get_entry(&id)?.is_some() {
        return Err(Error::AlreadyExists(format!("Entry {} already exists", id)).into());
    }

    let usage = Usage::from_envelope(body.usage, &state.registry)?;
    let entry = Entry::new(id, body.name, body.tags, usage, Vec::new());
    let view = EntryView::from(&entry);
    let id = vault.save_entry(entry).await?;

    info!(entry_id = %id, "Entry created");
    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/entries/{}", id))],
        Json(view),
    )
        .into_response())
}

/// `GET /entries/{id}`
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EntryView>> {
    let vault = state.vault.lock().await;
    let entry = vault
        .get_entry(&id)?
        .ok_or_else(|| Error::EntryNotFound(id.clone()))?;
    Ok(Json(EntryView::from(entry)))
}

/// `DELETE /entries/{id}`
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.vault.lock().await.delete_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AddSecretRequest {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub label: String,
    pub value: Value,
}

/// `POST /entries/{id}/secrets`
pub async fn add_secret(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AddSecretRequest>,
) -> ApiResult<StatusCode> {
    state
        .vault
        .lock()
        .await
        .add_secret(&id, &body.type_tag, &body.label, &body.value)
        .await?;
    Ok(StatusCode::CREATED)
}

/// `GET /entries/{id}/secrets/{label}`: the revealed value.
pub async fn reveal_secret(
    State(state): State<Arc<AppState>>,
    Path((id, label)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let vault = state.vault.lock().await;
    Ok(Json(vault.reveal_entry_secret(&id, &label)?))
}

/// `DELETE /entries/{id}/secrets/{label}`
pub async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Path((id, label)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.vault.lock().await.remove_secret(&id, &label).await?;
    Ok(StatusCode::NO_CONTENT)
}
