use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tempfile::TempDir;
use tower::ServiceExt;

use vetrina::application::auth::{AdminAuthService, LoginRateLimiter};
use vetrina::application::contact::{ContactService, ContactSubmission};
use vetrina::application::content::{ContentService, PostDraft};
use vetrina::domain::entities::PostRecord;
use vetrina::domain::types::Language;
use vetrina::infra::http::admin::{
    self, AdminState, LoginRequest, PasswordChangeRequest, PostPayload,
};
use vetrina::infra::http::public::{self, LanguageQuery, PublicState, build_public_router};
use vetrina::infra::http::rate_limit::ClientRateLimiter;
use vetrina::infra::relay::{FormRelay, RelayAcceptance, RelayError};
use vetrina::infra::sheets::{SheetError, SheetSource};
use vetrina::infra::store::{LocalStore, keys};

struct StaticSheet {
    rows: Vec<Vec<String>>,
    fetches: AtomicUsize,
}

impl StaticSheet {
    fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SheetSource for StaticSheet {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.rows.clone())
    }
}

struct OfflineSheet;

#[async_trait]
impl SheetSource for OfflineSheet {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetError> {
        Err(SheetError::NotConfigured {
            reason: "offline stub",
        })
    }
}

struct AcceptingRelay;

#[async_trait]
impl FormRelay for AcceptingRelay {
    async fn submit(&self, _: &ContactSubmission) -> Result<RelayAcceptance, RelayError> {
        Ok(RelayAcceptance {
            success: true,
            message: Some("Form Submitted Successfully".to_string()),
        })
    }
}

struct RejectingRelay;

#[async_trait]
impl FormRelay for RejectingRelay {
    async fn submit(&self, _: &ContactSubmission) -> Result<RelayAcceptance, RelayError> {
        Ok(RelayAcceptance {
            success: false,
            message: Some("Invalid access key".to_string()),
        })
    }
}

struct DownRelay;

#[async_trait]
impl FormRelay for DownRelay {
    async fn submit(&self, _: &ContactSubmission) -> Result<RelayAcceptance, RelayError> {
        Err(RelayError::Decode("connection reset".to_string()))
    }
}

fn sheet_rows() -> Vec<Vec<String>> {
    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }
    vec![
        row(&[
            "ID", "Language", "Title", "Excerpt", "Content", "Date", "Read Time", "Image",
            "Video",
        ]),
        row(&[
            "20240101",
            "EN",
            "Shipping dashboards",
            "An excerpt",
            "Body text",
            "January 1, 2024",
            "4 min read",
            "https://example.com/a.jpg",
            "https://youtu.be/dQw4w9WgXcQ",
        ]),
        row(&["20240102", "EN", "", "", "", "", "", "", ""]),
        row(&["20240101", "SP", "Tableros de control"]),
    ]
}

fn temp_store() -> (TempDir, Arc<LocalStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalStore::open(dir.path().join("state.json")).expect("open store");
    (dir, Arc::new(store))
}

fn content_over(
    source: impl SheetSource + 'static,
    store: Arc<LocalStore>,
    fresh: Duration,
) -> Arc<ContentService> {
    Arc::new(ContentService::new(store, Arc::new(source), fresh))
}

fn public_state(
    content: Arc<ContentService>,
    relay: impl FormRelay + 'static,
    store: Arc<LocalStore>,
) -> PublicState {
    PublicState {
        content,
        contact: Arc::new(ContactService::new(Arc::new(relay))),
        store,
        rate_limiter: Arc::new(ClientRateLimiter::new(Duration::from_secs(60), 100)),
    }
}

fn admin_state(content: Arc<ContentService>, store: Arc<LocalStore>) -> AdminState {
    let limiter = LoginRateLimiter::new(5, Duration::from_secs(300));
    AdminState {
        auth: Arc::new(AdminAuthService::new(
            store,
            limiter,
            Duration::from_secs(3600),
        )),
        content,
    }
}

fn into_response<T: IntoResponse>(
    result: Result<T, vetrina::infra::http::error::ApiError>,
) -> Response {
    match result {
        Ok(value) => value.into_response(),
        Err(error) => error.into_response(),
    }
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_payload(title: &str) -> PostPayload {
    serde_json::from_value(serde_json::json!({
        "language": "en",
        "title": title,
        "excerpt": "",
        "content": "Body",
    }))
    .expect("payload")
}

#[tokio::test]
async fn sheet_rows_become_posts_with_placeholders() {
    let (_dir, store) = temp_store();
    let content = content_over(StaticSheet::new(sheet_rows()), store, Duration::ZERO);

    let posts = content.posts(Language::En).await;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Shipping dashboards");
    assert_eq!(posts[0].read_time, "4 min read");
    // The title-less row got a placeholder, not a hole.
    assert_eq!(posts[1].title, "Post 2");

    let spanish = content.posts(Language::Es).await;
    assert_eq!(spanish.len(), 1);
    assert_eq!(spanish[0].title, "Tableros de control");
}

#[tokio::test]
async fn language_toggle_refilters_the_cached_row_set() {
    let (_dir, store) = temp_store();

    // First service pulls the sheet once, populating the cache.
    let online = content_over(StaticSheet::new(sheet_rows()), store.clone(), Duration::ZERO);
    let _ = online.posts(Language::En).await;

    // Second service never reaches the sheet, yet serves both languages
    // from the cached set.
    let offline = content_over(OfflineSheet, store, Duration::ZERO);
    let english = offline.posts(Language::En).await;
    let spanish = offline.posts(Language::Es).await;
    assert_eq!(english.len(), 2);
    assert_eq!(spanish.len(), 1);
    assert_eq!(spanish[0].title, "Tableros de control");
}

#[tokio::test]
async fn fallback_prefers_local_edits_then_samples() {
    let (_dir, store) = temp_store();

    // Nothing cached, nothing local: samples keep the site rendering.
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let samples = content.posts(Language::En).await;
    assert!(!samples.is_empty());

    // A locally edited list takes precedence over the samples.
    let local = vec![PostRecord {
        id: "local-1".to_string(),
        language: Language::En,
        title: "Hand-written".to_string(),
        excerpt: String::new(),
        content: String::new(),
        date: "May 1, 2024".to_string(),
        read_time: "2 min read".to_string(),
        image_url: String::new(),
        video_url: None,
    }];
    store.set_json(keys::POSTS, &local).expect("seed local posts");

    let posts = content.posts(Language::En).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hand-written");
}

#[tokio::test]
async fn fresh_window_memo_short_circuits_repeat_fetches() {
    let (_dir, store) = temp_store();
    let sheet = Arc::new(StaticSheet::new(sheet_rows()));
    let content = Arc::new(ContentService::new(
        store,
        sheet.clone(),
        Duration::from_secs(60),
    ));

    let _ = content.posts(Language::En).await;
    let _ = content.posts(Language::En).await;
    assert_eq!(sheet.fetches.load(Ordering::Relaxed), 1);

    // A different language is its own memo slot.
    let _ = content.posts(Language::Es).await;
    assert_eq!(sheet.fetches.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn editor_crud_round_trips_through_the_overlay() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);

    let created = content
        .create_post(PostDraft {
            language: Language::En,
            title: "Fresh".to_string(),
            excerpt: String::new(),
            content: "Body".to_string(),
            date: None,
            read_time: None,
            image_url: None,
            video_url: Some("   ".to_string()),
        })
        .await
        .expect("create");
    assert_eq!(created.id.len(), 10);
    assert_eq!(created.read_time, "5 min read");
    assert!(created.video_url.is_none());

    // The overlay was seeded from the current view plus the new post.
    let overlay: Vec<PostRecord> = store.get_json(keys::POSTS).expect("overlay persisted");
    assert_eq!(overlay[0].id, created.id);

    let mut updated = created.clone();
    updated.title = "Fresher".to_string();
    let updated = content.update_post(updated).await.expect("update");
    assert_eq!(updated.title, "Fresher");

    content
        .delete_post(&created.id, Language::En)
        .await
        .expect("delete");
    let overlay: Vec<PostRecord> = store.get_json(keys::POSTS).expect("overlay persisted");
    assert!(overlay.iter().all(|post| post.id != created.id));

    let missing = content.delete_post("nope", Language::En).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn unknown_post_answers_404() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = public_state(content, AcceptingRelay, store);

    let response = into_response(
        public::get_post(
            State(state),
            Path("does-not-exist".to_string()),
            Query(LanguageQuery::default()),
        )
        .await,
    );
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_language_answers_400() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = public_state(content, AcceptingRelay, store);

    let response = into_response(
        public::list_posts(
            State(state),
            Query(LanguageQuery {
                lang: Some("fr".to_string()),
            }),
        )
        .await,
    );
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contact_validation_lists_every_failing_field() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = public_state(content, AcceptingRelay, store);

    let response = into_response(
        public::submit_contact(
            State(state),
            Json(ContactSubmission {
                name: String::new(),
                email: "not-an-email".to_string(),
                subject: String::new(),
                message: String::new(),
            }),
        )
        .await,
    );
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    let violations = body["error"]["violations"]
        .as_array()
        .expect("violations array");
    let fields: Vec<_> = violations
        .iter()
        .map(|violation| violation["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email", "message"]);
}

#[tokio::test]
async fn contact_relay_outcomes_map_to_statuses() {
    let submission = || ContactSubmission {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        subject: String::new(),
        message: "Hello there".to_string(),
    };

    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);

    let accepted = into_response(
        public::submit_contact(
            State(public_state(content.clone(), AcceptingRelay, store.clone())),
            Json(submission()),
        )
        .await,
    );
    assert_eq!(accepted.status(), StatusCode::OK);
    let body = body_json(accepted).await;
    assert_eq!(body["success"], serde_json::json!(true));

    let rejected = into_response(
        public::submit_contact(
            State(public_state(content.clone(), RejectingRelay, store.clone())),
            Json(submission()),
        )
        .await,
    );
    assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(rejected).await;
    assert_eq!(body["error"]["message"], serde_json::json!("Invalid access key"));

    let down = into_response(
        public::submit_contact(
            State(public_state(content, DownRelay, store)),
            Json(submission()),
        )
        .await,
    );
    assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn prefs_round_trip_through_the_store() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = public_state(content, AcceptingRelay, store.clone());

    let response = into_response(
        public::put_prefs(
            State(state.clone()),
            Json(
                serde_json::from_value(serde_json::json!({
                    "theme": "dark",
                    "language": "es",
                }))
                .expect("prefs update"),
            ),
        )
        .await,
    );
    assert_eq!(response.status(), StatusCode::OK);

    let response = into_response(public::get_prefs(State(state)).await);
    let body = body_json(response).await;
    assert_eq!(body["theme"], serde_json::json!("dark"));
    assert_eq!(body["language"], serde_json::json!("es"));

    // The flags are plain store keys, same as the rest of the state.
    assert_eq!(store.get(keys::THEME).as_deref(), Some("dark"));
}

#[tokio::test]
async fn bootstrap_password_gates_the_editor_until_changed() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = admin_state(content, store);

    let wrong = into_response(
        admin::login(
            State(state.clone()),
            HeaderMap::new(),
            Json(LoginRequest {
                password: "nope".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = into_response(
        admin::login(
            State(state.clone()),
            HeaderMap::new(),
            Json(LoginRequest {
                password: "admin123".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    let token = body["token"].as_str().expect("token").to_string();
    assert!(token.starts_with("as_"));
    state.auth.authenticate(&token).expect("session valid");

    // Weak replacement is refused with the reasons spelled out.
    let weak = into_response(
        admin::change_password(
            State(state.clone()),
            Json(PasswordChangeRequest {
                current: "admin123".to_string(),
                new: "short".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(weak.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let changed = into_response(
        admin::change_password(
            State(state.clone()),
            Json(PasswordChangeRequest {
                current: "admin123".to_string(),
                new: "Str0ng!pass".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(changed.status(), StatusCode::NO_CONTENT);

    // Once a credential is stored the bootstrap default stops working.
    let stale = into_response(
        admin::login(
            State(state.clone()),
            HeaderMap::new(),
            Json(LoginRequest {
                password: "admin123".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let fresh = into_response(
        admin::login(
            State(state),
            HeaderMap::new(),
            Json(LoginRequest {
                password: "Str0ng!pass".to_string(),
            }),
        )
        .await,
    );
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn hammered_logins_lock_out_with_retry_after() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let limiter = LoginRateLimiter::new(2, Duration::from_secs(300));
    let state = AdminState {
        auth: Arc::new(AdminAuthService::new(
            store,
            limiter,
            Duration::from_secs(3600),
        )),
        content,
    };

    let attempt = || {
        admin::login(
            State(state.clone()),
            HeaderMap::new(),
            Json(LoginRequest {
                password: "wrong".to_string(),
            }),
        )
    };

    assert_eq!(into_response(attempt().await).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(into_response(attempt().await).status(), StatusCode::UNAUTHORIZED);
    let locked = into_response(attempt().await);
    assert_eq!(locked.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(locked).await;
    assert!(body["error"]["hint"].as_str().expect("hint").contains("Retry after"));
}

#[tokio::test]
async fn admin_payload_validation_rejects_suspicious_input() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = admin_state(content, store);

    let mut payload = post_payload("Fine title");
    payload.content = "<script>alert(1)</script>".to_string();
    let response = into_response(admin::create_post(State(state.clone()), Json(payload)).await);
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let created = into_response(
        admin::create_post(State(state), Json(post_payload("Fine title"))).await,
    );
    assert_eq!(created.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn admin_routes_refuse_missing_or_garbage_tokens() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = admin_state(content, store);
    let router = admin::build_admin_router(state);

    let bare = Request::builder()
        .method("GET")
        .uri("/admin/posts")
        .body(Body::empty())
        .expect("request");
    let response = router.clone().oneshot(bare).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let garbage = Request::builder()
        .method("GET")
        .uri("/admin/posts")
        .header("authorization", "Bearer as_nope_nope")
        .body(Body::empty())
        .expect("request");
    let response = router.clone().oneshot(garbage).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_router_rate_limits_per_client() {
    let (_dir, store) = temp_store();
    let content = content_over(OfflineSheet, store.clone(), Duration::ZERO);
    let state = PublicState {
        content,
        contact: Arc::new(ContactService::new(Arc::new(AcceptingRelay))),
        store,
        rate_limiter: Arc::new(ClientRateLimiter::new(Duration::from_secs(60), 2)),
    };
    let router = build_public_router(state);

    let request = |client: &str| {
        Request::builder()
            .uri("/healthz")
            .header("x-forwarded-for", HeaderValue::from_str(client).unwrap())
            .body(Body::empty())
            .expect("request")
    };

    for _ in 0..2 {
        let response = router.clone().oneshot(request("203.0.113.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    let limited = router.clone().oneshot(request("203.0.113.9")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    // Another client is unaffected.
    let other = router.clone().oneshot(request("198.51.100.7")).await.unwrap();
    assert_eq!(other.status(), StatusCode::NO_CONTENT);
}
