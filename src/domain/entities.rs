//! Domain entities mirrored from the local content store.

use serde::{Deserialize, Serialize};

use crate::domain::types::Language;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub language: Language,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// Display date label, e.g. `January 15, 2024`; not machine-parsed.
    pub date: String,
    pub read_time: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRecord {
    pub id: String,
    pub role: String,
    pub company: String,
    pub period: String,
    pub location: String,
    pub description: String,
    pub photo_url: String,
}
