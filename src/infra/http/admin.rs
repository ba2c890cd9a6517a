//! Administrative surface: password-gated editing of the content overlay.
//!
//! Served on its own listener. Every route except `/admin/login` sits
//! behind the bearer-session middleware.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router, body::Body, http::Request, middleware::Next};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::auth::{AdminAuthService, SessionError};
use crate::application::contact::FieldViolation;
use crate::application::content::{ContentService, ExperienceDraft, PostDraft};
use crate::domain::entities::{ExperienceRecord, PostRecord};
use crate::domain::types::Language;
use crate::domain::{validate, video};

use super::error::ApiError;
use super::middleware::{client_key, log_responses, set_request_context};
use super::public::{LanguageQuery, resolve_language};

const MAX_TITLE_LEN: usize = 300;
const MAX_EXCERPT_LEN: usize = 1000;
const MAX_CONTENT_LEN: usize = 50_000;
const MAX_LABEL_LEN: usize = 100;
const MAX_URL_LEN: usize = 2000;

#[derive(Clone)]
pub struct AdminState {
    pub auth: Arc<AdminAuthService>,
    pub content: Arc<ContentService>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    let session_state = state.clone();

    let open = Router::new().route("/admin/login", post(login));
    let gated = Router::new()
        .route("/admin/logout", post(logout))
        .route("/admin/password", post(change_password))
        .route("/admin/posts", get(list_posts).post(create_post))
        .route(
            "/admin/posts/{id}",
            put(update_post).delete(delete_post),
        )
        .route(
            "/admin/experience",
            get(list_experience).post(create_experience),
        )
        .route(
            "/admin/experience/{id}",
            put(update_experience).delete(delete_experience),
        )
        .route("/admin/refresh", post(refresh_posts))
        .layer(axum_middleware::from_fn_with_state(
            session_state,
            require_session,
        ));

    open.merge(gated)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

pub async fn require_session(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match bearer_token(request.headers()) {
        Some(token) => match state.auth.authenticate(&token) {
            Ok(()) => next.run(request).await,
            Err(err) => ApiError::from(err).into_response(),
        },
        None => ApiError::from(SessionError::Missing).into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ").map(str::to_string)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client = client_key(&headers);
    let issued = state.auth.login(&client, &request.password)?;
    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

pub async fn logout(State(state): State<AdminState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.auth.revoke(&token);
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current: String,
    pub new: String,
}

pub async fn change_password(
    State(state): State<AdminState>,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.change_password(&request.current, &request.new)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_posts(
    State(state): State<AdminState>,
    Query(query): Query<LanguageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let language = resolve_language(&query)?;
    Ok(Json(state.content.editable_posts(language).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    #[serde(default)]
    pub language: Language,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    pub date: Option<String>,
    pub read_time: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

pub async fn create_post(
    State(state): State<AdminState>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    reject_invalid(validate_post_payload(&payload))?;
    let post = state.content.create_post(payload_to_draft(payload)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    reject_invalid(validate_post_payload(&payload))?;
    let draft = payload_to_draft(payload);
    // Updates replace the record wholesale with the editor's state.
    let record = PostRecord {
        id,
        language: draft.language,
        title: draft.title,
        excerpt: draft.excerpt,
        content: draft.content,
        date: draft.date.unwrap_or_default(),
        read_time: draft.read_time.unwrap_or_default(),
        image_url: draft.image_url.unwrap_or_default(),
        video_url: draft.video_url.filter(|value| !value.trim().is_empty()),
    };
    let post = state.content.update_post(record).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<StatusCode, ApiError> {
    let language = resolve_language(&query)?;
    state.content.delete_post(&id, language).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_experience(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.experience()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePayload {
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: String,
}

pub async fn create_experience(
    State(state): State<AdminState>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<impl IntoResponse, ApiError> {
    reject_invalid(validate_experience_payload(&payload))?;
    let entry = state.content.create_experience(payload_to_experience(payload))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_experience(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<impl IntoResponse, ApiError> {
    reject_invalid(validate_experience_payload(&payload))?;
    let draft = payload_to_experience(payload);
    let record = ExperienceRecord {
        id,
        role: draft.role,
        company: draft.company,
        period: draft.period,
        location: draft.location,
        description: draft.description,
        photo_url: draft.photo_url,
    };
    let entry = state.content.update_experience(record)?;
    Ok(Json(entry))
}

pub async fn delete_experience(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.content.delete_experience(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Force a spreadsheet re-pull past the fresh-window memo.
pub async fn refresh_posts(
    State(state): State<AdminState>,
    Query(query): Query<LanguageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let language = resolve_language(&query)?;
    Ok(Json(state.content.refresh(language).await))
}

fn payload_to_draft(payload: PostPayload) -> PostDraft {
    PostDraft {
        language: payload.language,
        title: payload.title,
        excerpt: payload.excerpt,
        content: payload.content,
        date: payload.date,
        read_time: payload.read_time,
        image_url: payload.image_url,
        video_url: payload.video_url,
    }
}

fn payload_to_experience(payload: ExperiencePayload) -> ExperienceDraft {
    ExperienceDraft {
        role: payload.role,
        company: payload.company,
        period: payload.period,
        location: payload.location,
        description: payload.description,
        photo_url: payload.photo_url,
    }
}

fn validate_post_payload(payload: &PostPayload) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    push(
        &mut violations,
        "title",
        validate::required_text(&payload.title, MAX_TITLE_LEN),
    );
    push(
        &mut violations,
        "excerpt",
        validate::optional_text(&payload.excerpt, MAX_EXCERPT_LEN),
    );
    push(
        &mut violations,
        "content",
        validate::optional_text(&payload.content, MAX_CONTENT_LEN),
    );
    for (field, value) in [("date", &payload.date), ("readTime", &payload.read_time)] {
        if let Some(value) = value {
            push(&mut violations, field, validate::optional_text(value, MAX_LABEL_LEN));
        }
    }
    if let Some(value) = &payload.image_url
        && !value.trim().is_empty()
    {
        let mut failures = validate::optional_text(value, MAX_URL_LEN);
        failures.extend(validate::http_url(value));
        push(&mut violations, "imageUrl", failures);
    }
    if let Some(value) = &payload.video_url
        && !value.trim().is_empty()
    {
        let mut failures = validate::optional_text(value, MAX_URL_LEN);
        if !video::is_video_url(value) {
            failures.push("must be a YouTube watch, share, or embed URL".to_string());
        }
        push(&mut violations, "videoUrl", failures);
    }
    violations
}

fn validate_experience_payload(payload: &ExperiencePayload) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    push(
        &mut violations,
        "role",
        validate::required_text(&payload.role, MAX_TITLE_LEN),
    );
    push(
        &mut violations,
        "company",
        validate::required_text(&payload.company, MAX_TITLE_LEN),
    );
    push(
        &mut violations,
        "period",
        validate::optional_text(&payload.period, MAX_LABEL_LEN),
    );
    push(
        &mut violations,
        "location",
        validate::optional_text(&payload.location, MAX_LABEL_LEN),
    );
    push(
        &mut violations,
        "description",
        validate::optional_text(&payload.description, MAX_EXCERPT_LEN),
    );
    if !payload.photo_url.trim().is_empty() {
        let mut failures = validate::optional_text(&payload.photo_url, MAX_URL_LEN);
        failures.extend(validate::http_url(&payload.photo_url));
        push(&mut violations, "photoUrl", failures);
    }
    violations
}

fn push(violations: &mut Vec<FieldViolation>, field: &'static str, messages: Vec<String>) {
    if !messages.is_empty() {
        violations.push(FieldViolation { field, messages });
    }
}

fn reject_invalid(violations: Vec<FieldViolation>) -> Result<(), ApiError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::invalid_input(violations))
    }
}
