//! vetrina: a small self-hosted content service for a personal portfolio
//! and blog. Posts are ingested from a spreadsheet-backed store with a
//! cached/local/sample fallback chain; an admin API edits the locally
//! persisted overlay; contact submissions are relayed to a form endpoint.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
