//! Public content surface: posts, experience, contact, preferences.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, body::Body, http::Request, middleware::Next};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::application::contact::{ContactService, ContactSubmission};
use crate::application::content::ContentService;
use crate::domain::types::{Language, Theme};
use crate::infra::store::{LocalStore, keys};

use super::error::ApiError;
use super::middleware::{client_key, log_responses, set_request_context};
use super::rate_limit::ClientRateLimiter;

#[derive(Clone)]
pub struct PublicState {
    pub content: Arc<ContentService>,
    pub contact: Arc<ContactService>,
    pub store: Arc<LocalStore>,
    pub rate_limiter: Arc<ClientRateLimiter>,
}

pub fn build_public_router(state: PublicState) -> Router {
    let rate_state = state.clone();

    Router::new()
        .route("/api/v1/posts", get(list_posts))
        .route("/api/v1/posts/{id}", get(get_post))
        .route("/api/v1/experience", get(list_experience))
        .route("/api/v1/contact", post(submit_contact))
        .route("/api/v1/prefs", get(get_prefs).put(put_prefs))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            client_rate_limit,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

pub async fn client_rate_limit(
    State(state): State<PublicState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(request.headers());
    let route = request.uri().path().to_string();
    if !state.rate_limiter.allow(&client, &route) {
        counter!("vetrina_rate_limited_total").increment(1);
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }
    next.run(request).await
}

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    pub lang: Option<String>,
}

pub(crate) fn resolve_language(query: &LanguageQuery) -> Result<Language, ApiError> {
    match query.lang.as_deref() {
        None => Ok(Language::default()),
        Some(raw) => Language::parse(raw).ok_or_else(|| {
            ApiError::bad_request(
                "unknown language",
                Some(format!("`{raw}` is not one of en, es")),
            )
        }),
    }
}

pub async fn list_posts(
    State(state): State<PublicState>,
    Query(query): Query<LanguageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let language = resolve_language(&query)?;
    let posts = state.content.posts(language).await;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<PublicState>,
    Path(id): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let language = resolve_language(&query)?;
    match state.content.post(&id, language).await {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::not_found("post not found")),
    }
}

pub async fn list_experience(
    State(state): State<PublicState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.experience()))
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

pub async fn submit_contact(
    State(state): State<PublicState>,
    Json(submission): Json<ContactSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.contact.submit(submission).await?;
    Ok(Json(ContactResponse {
        success: true,
        message: receipt.message,
    }))
}

#[derive(Debug, Serialize)]
pub struct PrefsResponse {
    pub theme: Theme,
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct PrefsUpdate {
    pub theme: Option<Theme>,
    pub language: Option<Language>,
}

pub async fn get_prefs(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(read_prefs(&state.store)))
}

pub async fn put_prefs(
    State(state): State<PublicState>,
    Json(update): Json<PrefsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(theme) = update.theme {
        state
            .store
            .set(keys::THEME, theme.as_str())
            .map_err(|_| ApiError::store_failure())?;
    }
    if let Some(language) = update.language {
        state
            .store
            .set(keys::LANGUAGE, language.as_str())
            .map_err(|_| ApiError::store_failure())?;
    }
    Ok(Json(read_prefs(&state.store)))
}

fn read_prefs(store: &LocalStore) -> PrefsResponse {
    let theme = store
        .get(keys::THEME)
        .and_then(|raw| Theme::parse(&raw))
        .unwrap_or_default();
    let language = store
        .get(keys::LANGUAGE)
        .and_then(|raw| Language::parse(&raw))
        .unwrap_or_default();
    PrefsResponse { theme, language }
}

pub async fn healthz(State(state): State<PublicState>) -> StatusCode {
    // The store is in-process; being able to read it at all is the probe.
    let _ = state.store.len();
    StatusCode::NO_CONTENT
}
