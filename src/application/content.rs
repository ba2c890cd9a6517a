//! Content service: spreadsheet ingestion, the fallback chain, and the
//! locally persisted editor overlay.
//!
//! Reads walk a fixed chain: fresh memo → live spreadsheet → cached rows →
//! local edits → built-in samples. Writes never reach the spreadsheet (the
//! key is read-only); the editor mutates the local overlay only.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::samples;
use crate::domain::entities::{ExperienceRecord, PostRecord};
use crate::domain::types::Language;
use crate::infra::error::InfraError;
use crate::infra::sheets::{SheetError, SheetSource};
use crate::infra::store::{LocalStore, keys};
use crate::util::dates;
use crate::util::lock::mutex_lock;

pub const DEFAULT_IMAGE_URL: &str =
    "https://images.pexels.com/photos/270348/pexels-photo-270348.jpeg?auto=compress&cs=tinysrgb&w=800";

const SOURCE: &str = "application::content";
const MEMO_CAPACITY: usize = 4;
const POST_ID_DAILY_LIMIT: u32 = 99;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("post `{id}` not found")]
    PostNotFound { id: String },
    #[error("experience entry `{id}` not found")]
    ExperienceNotFound { id: String },
    #[error(transparent)]
    Store(#[from] InfraError),
}

/// Fields the editor supplies when creating a post; everything optional
/// falls back to the same defaults spreadsheet ingestion uses.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub language: Language,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub date: Option<String>,
    pub read_time: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExperienceDraft {
    pub role: String,
    pub company: String,
    pub period: String,
    pub location: String,
    pub description: String,
    pub photo_url: String,
}

struct MemoEntry {
    fetched_at: Instant,
    posts: Vec<PostRecord>,
}

pub struct ContentService {
    store: Arc<LocalStore>,
    source: Arc<dyn SheetSource>,
    fresh_window: Duration,
    memo: Mutex<LruCache<Language, MemoEntry>>,
}

impl ContentService {
    pub fn new(store: Arc<LocalStore>, source: Arc<dyn SheetSource>, fresh_window: Duration) -> Self {
        let capacity = NonZeroUsize::new(MEMO_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            source,
            fresh_window,
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Posts for a language, via memo → remote → cached → local → samples.
    pub async fn posts(&self, language: Language) -> Vec<PostRecord> {
        if let Some(posts) = self.memo_lookup(language) {
            return posts;
        }
        self.refresh(language).await
    }

    /// Bypass the memo and re-pull the spreadsheet.
    pub async fn refresh(&self, language: Language) -> Vec<PostRecord> {
        match self.source.fetch_rows().await {
            Ok(rows) => {
                let mapped = map_rows(&rows);
                if mapped.is_empty() {
                    debug!(
                        target = "vetrina::content",
                        "sheet returned no content rows"
                    );
                    return self.fallback(language);
                }
                // Cache the full mapped set so a later language toggle can
                // re-filter it offline.
                if let Err(err) = self.store.set_json(keys::CACHED_SHEET_POSTS, &mapped) {
                    warn!(
                        target = "vetrina::content",
                        error = %err,
                        "failed to cache sheet rows"
                    );
                }
                counter!("vetrina_content_fetch_ok_total").increment(1);
                let posts = filter_language(mapped, language);
                if posts.is_empty() {
                    return self.fallback(language);
                }
                self.memo_insert(language, posts.clone());
                posts
            }
            Err(SheetError::NotConfigured { reason }) => {
                debug!(
                    target = "vetrina::content",
                    reason, "sheet source not configured"
                );
                self.fallback(language)
            }
            Err(err) => {
                warn!(target = "vetrina::content", error = %err, "sheet fetch failed");
                self.fallback(language)
            }
        }
    }

    /// A single post from the same view `posts` serves.
    pub async fn post(&self, id: &str, language: Language) -> Option<PostRecord> {
        self.posts(language).await.into_iter().find(|post| post.id == id)
    }

    pub fn experience(&self) -> Vec<ExperienceRecord> {
        self.store
            .get_json::<Vec<ExperienceRecord>>(keys::EXPERIENCE)
            .unwrap_or_else(samples::sample_experience)
    }

    /// The list the editor starts from: the overlay when present, else a
    /// snapshot of the current public view.
    pub async fn editable_posts(&self, language: Language) -> Vec<PostRecord> {
        if let Some(local) = self.store.get_json::<Vec<PostRecord>>(keys::POSTS) {
            return local;
        }
        self.posts(language).await
    }

    pub async fn create_post(&self, draft: PostDraft) -> Result<PostRecord, ContentError> {
        let mut posts = self.editable_posts(draft.language).await;
        let today = OffsetDateTime::now_utc().date();
        let id = allocate_post_id(&posts, today);
        let record = PostRecord {
            id,
            language: draft.language,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            date: draft
                .date
                .unwrap_or_else(|| dates::long_date(draft.language, today)),
            read_time: draft
                .read_time
                .unwrap_or_else(|| default_read_time(draft.language).to_string()),
            image_url: draft
                .image_url
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            video_url: draft.video_url.filter(|value| !value.trim().is_empty()),
        };
        posts.insert(0, record.clone());
        self.store.set_json(keys::POSTS, &posts)?;
        self.memo_clear();
        Ok(record)
    }

    pub async fn update_post(&self, record: PostRecord) -> Result<PostRecord, ContentError> {
        let mut posts = self.editable_posts(record.language).await;
        let Some(slot) = posts.iter_mut().find(|post| post.id == record.id) else {
            return Err(ContentError::PostNotFound { id: record.id });
        };
        *slot = record.clone();
        self.store.set_json(keys::POSTS, &posts)?;
        self.memo_clear();
        Ok(record)
    }

    pub async fn delete_post(&self, id: &str, language: Language) -> Result<(), ContentError> {
        let mut posts = self.editable_posts(language).await;
        let before = posts.len();
        posts.retain(|post| post.id != id);
        if posts.len() == before {
            return Err(ContentError::PostNotFound { id: id.to_string() });
        }
        self.store.set_json(keys::POSTS, &posts)?;
        self.memo_clear();
        Ok(())
    }

    pub fn create_experience(
        &self,
        draft: ExperienceDraft,
    ) -> Result<ExperienceRecord, ContentError> {
        let mut entries = self.experience();
        let record = ExperienceRecord {
            id: OffsetDateTime::now_utc().unix_timestamp().to_string(),
            role: draft.role,
            company: draft.company,
            period: draft.period,
            location: draft.location,
            description: draft.description,
            photo_url: draft.photo_url,
        };
        entries.insert(0, record.clone());
        self.store.set_json(keys::EXPERIENCE, &entries)?;
        Ok(record)
    }

    pub fn update_experience(
        &self,
        record: ExperienceRecord,
    ) -> Result<ExperienceRecord, ContentError> {
        let mut entries = self.experience();
        let Some(slot) = entries.iter_mut().find(|entry| entry.id == record.id) else {
            return Err(ContentError::ExperienceNotFound { id: record.id });
        };
        *slot = record.clone();
        self.store.set_json(keys::EXPERIENCE, &entries)?;
        Ok(record)
    }

    pub fn delete_experience(&self, id: &str) -> Result<(), ContentError> {
        let mut entries = self.experience();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Err(ContentError::ExperienceNotFound { id: id.to_string() });
        }
        self.store.set_json(keys::EXPERIENCE, &entries)?;
        Ok(())
    }

    fn fallback(&self, language: Language) -> Vec<PostRecord> {
        if let Some(cached) = self
            .store
            .get_json::<Vec<PostRecord>>(keys::CACHED_SHEET_POSTS)
        {
            let posts = filter_language(cached, language);
            if !posts.is_empty() {
                counter!("vetrina_content_fallback_total", "tier" => "cached").increment(1);
                return posts;
            }
        }
        if let Some(local) = self.store.get_json::<Vec<PostRecord>>(keys::POSTS) {
            let posts = filter_language(local, language);
            if !posts.is_empty() {
                counter!("vetrina_content_fallback_total", "tier" => "local").increment(1);
                return posts;
            }
        }
        counter!("vetrina_content_fallback_total", "tier" => "sample").increment(1);
        samples::sample_posts(language)
    }

    fn memo_lookup(&self, language: Language) -> Option<Vec<PostRecord>> {
        if self.fresh_window.is_zero() {
            return None;
        }
        let mut memo = mutex_lock(&self.memo, SOURCE, "memo_lookup");
        let stale = match memo.get(&language) {
            Some(entry) => {
                if entry.fetched_at.elapsed() < self.fresh_window {
                    return Some(entry.posts.clone());
                }
                true
            }
            None => false,
        };
        if stale {
            memo.pop(&language);
        }
        None
    }

    fn memo_insert(&self, language: Language, posts: Vec<PostRecord>) {
        if self.fresh_window.is_zero() {
            return;
        }
        mutex_lock(&self.memo, SOURCE, "memo_insert").put(
            language,
            MemoEntry {
                fetched_at: Instant::now(),
                posts,
            },
        );
    }

    fn memo_clear(&self) {
        mutex_lock(&self.memo, SOURCE, "memo_clear").clear();
    }
}

/// Map raw sheet rows to records. The first row is the header; rows whose
/// language cell is not a known code are skipped.
pub fn map_rows(rows: &[Vec<String>]) -> Vec<PostRecord> {
    let today = OffsetDateTime::now_utc().date();
    let mut posts: Vec<PostRecord> = Vec::new();
    for row in rows.iter().skip(1) {
        let Some(language) = row
            .get(1)
            .and_then(|code| Language::from_sheet_code(code))
        else {
            continue;
        };
        let index = posts
            .iter()
            .filter(|post| post.language == language)
            .count()
            + 1;
        posts.push(map_row(row, language, index, today));
    }
    posts
}

fn map_row(
    row: &[String],
    language: Language,
    index: usize,
    today: time::Date,
) -> PostRecord {
    PostRecord {
        id: cell(row, 0).unwrap_or_else(|| format!("post-{index}")),
        language,
        title: cell(row, 2).unwrap_or_else(|| format!("Post {index}")),
        excerpt: cell(row, 3).unwrap_or_default(),
        content: cell(row, 4).unwrap_or_default(),
        date: cell(row, 5).unwrap_or_else(|| dates::long_date(language, today)),
        read_time: cell(row, 6).unwrap_or_else(|| default_read_time(language).to_string()),
        image_url: cell(row, 7).unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        video_url: cell(row, 8),
    }
}

fn cell(row: &[String], index: usize) -> Option<String> {
    row.get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn filter_language(posts: Vec<PostRecord>, language: Language) -> Vec<PostRecord> {
    posts
        .into_iter()
        .filter(|post| post.language == language)
        .collect()
}

fn default_read_time(language: Language) -> &'static str {
    match language {
        Language::En => "5 min read",
        Language::Es => "5 min de lectura",
    }
}

/// Editor post ids are `YYYYMMDDnn`: the current date plus a two-digit
/// sequence over existing same-day ids. A full day's worth of ids falls
/// back to a UUID.
fn allocate_post_id(existing: &[PostRecord], today: time::Date) -> String {
    let prefix = format!(
        "{:04}{:02}{:02}",
        today.year(),
        today.month() as u8,
        today.day()
    );
    let mut highest = 0u32;
    for post in existing {
        if let Some(rest) = post.id.strip_prefix(&prefix)
            && let Ok(sequence) = rest.parse::<u32>()
            && sequence > highest
        {
            highest = sequence;
        }
    }
    if highest >= POST_ID_DAILY_LIMIT {
        return Uuid::new_v4().simple().to_string();
    }
    format!("{prefix}{:02}", highest + 1)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn header() -> Vec<String> {
        row(&[
            "ID", "Language", "Title", "Excerpt", "Content", "Date", "Read Time", "Image",
            "Video",
        ])
    }

    #[test]
    fn rows_map_positionally_and_filter_unknown_languages() {
        let rows = vec![
            header(),
            row(&[
                "20240101",
                "EN",
                "First",
                "An excerpt",
                "Body",
                "January 1, 2024",
                "3 min read",
                "https://example.com/a.jpg",
                "https://youtu.be/dQw4w9WgXcQ",
            ]),
            row(&["20240102", "FR", "Ignored"]),
            row(&["20240103", "SP", "Primero"]),
        ];

        let posts = map_rows(&rows);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "First");
        assert_eq!(posts[0].language, Language::En);
        assert_eq!(
            posts[0].video_url.as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
        assert_eq!(posts[1].language, Language::Es);
    }

    #[test]
    fn missing_title_gets_a_placeholder_and_defaults_fill_in() {
        let rows = vec![
            header(),
            row(&["", "EN", "", "", "", "", "", "", ""]),
            row(&["", "EN"]),
        ];

        let posts = map_rows(&rows);
        assert_eq!(posts[0].title, "Post 1");
        assert_eq!(posts[0].id, "post-1");
        assert_eq!(posts[1].title, "Post 2");
        assert_eq!(posts[0].read_time, "5 min read");
        assert_eq!(posts[0].image_url, DEFAULT_IMAGE_URL);
        assert!(posts[0].video_url.is_none());
    }

    #[test]
    fn spanish_rows_get_spanish_defaults() {
        let rows = vec![header(), row(&["", "SP"])];
        let posts = map_rows(&rows);
        assert_eq!(posts[0].read_time, "5 min de lectura");
    }

    #[test]
    fn post_ids_extend_the_same_day_sequence() {
        let existing = vec![
            PostRecord {
                id: "2024061703".to_string(),
                language: Language::En,
                title: String::new(),
                excerpt: String::new(),
                content: String::new(),
                date: String::new(),
                read_time: String::new(),
                image_url: String::new(),
                video_url: None,
            },
            PostRecord {
                id: "older-post".to_string(),
                language: Language::En,
                title: String::new(),
                excerpt: String::new(),
                content: String::new(),
                date: String::new(),
                read_time: String::new(),
                image_url: String::new(),
                video_url: None,
            },
        ];
        assert_eq!(
            allocate_post_id(&existing, date!(2024 - 06 - 17)),
            "2024061704"
        );
        assert_eq!(allocate_post_id(&[], date!(2024 - 06 - 17)), "2024061701");
    }
}
