//! YouTube URL helpers for post video fields.
//!
//! The content store keeps raw URLs; these helpers normalize the three
//! common forms (`watch?v=`, `youtu.be/`, `embed/`) down to a video id.

use url::Url;

/// Extract the video id from a YouTube URL in any supported form.
pub fn video_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

pub fn is_video_url(raw: &str) -> bool {
    video_id(raw).is_some()
}

/// Canonical embed URL, when the input is recognizable.
pub fn embed_url(raw: &str) -> Option<String> {
    video_id(raw).map(|id| format!("https://www.youtube.com/embed/{id}"))
}

/// Highest-resolution thumbnail URL, when the input is recognizable.
pub fn thumbnail_url(raw: &str) -> Option<String> {
    video_id(raw).map(|id| format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"))
}
