//! Field validation shared by the contact and admin surfaces.
//!
//! Checks accumulate every failure for a value instead of stopping at the
//! first, so callers can surface a complete list per field.

use url::Url;

/// Patterns that are rejected wherever free text is accepted.
const SUSPICIOUS_SUBSTRINGS: &[(&str, &str)] = &[
    ("<script", "script tags are not allowed"),
    ("javascript:", "javascript protocols are not allowed"),
    ("vbscript:", "vbscript protocols are not allowed"),
    ("data:", "data URLs are not allowed"),
];

/// Failures for a required free-text value: presence, length ceiling, and
/// the suspicious-pattern sweep.
pub fn required_text(value: &str, max_len: usize) -> Vec<String> {
    if value.trim().is_empty() {
        return vec!["value is required".to_string()];
    }
    bounded_text(value, max_len)
}

/// Failures for an optional free-text value; an empty value passes.
pub fn optional_text(value: &str, max_len: usize) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    bounded_text(value, max_len)
}

fn bounded_text(value: &str, max_len: usize) -> Vec<String> {
    let mut failures = Vec::new();
    if value.chars().count() > max_len {
        failures.push(format!("value exceeds maximum length of {max_len} characters"));
    }
    failures.extend(suspicious(value));
    failures
}

/// The suspicious-pattern sweep on its own.
pub fn suspicious(value: &str) -> Vec<String> {
    let lower = value.to_ascii_lowercase();
    let mut failures = Vec::new();
    for (needle, message) in SUSPICIOUS_SUBSTRINGS {
        if lower.contains(needle) {
            failures.push((*message).to_string());
        }
    }
    if value.contains('\0') {
        failures.push("null bytes are not allowed".to_string());
    }
    if has_event_handler(&lower) {
        failures.push("event handlers are not allowed".to_string());
    }
    failures
}

// Matches `onload=`, `onerror =`, and the rest of the `on*=` family while
// leaving words like "config" or "monday" alone.
fn has_event_handler(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    for (start, _) in lower.match_indices("on") {
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }
        let rest = &bytes[start + 2..];
        let mut cursor = 0;
        while cursor < rest.len() && rest[cursor].is_ascii_alphabetic() {
            cursor += 1;
        }
        if cursor == 0 {
            continue;
        }
        while cursor < rest.len() && (rest[cursor] == b' ' || rest[cursor] == b'\t') {
            cursor += 1;
        }
        if rest.get(cursor) == Some(&b'=') {
            return true;
        }
    }
    false
}

/// Email shape: `local@domain.tld` with a restricted character set.
pub fn email(value: &str) -> Vec<String> {
    if is_email_shaped(value) {
        Vec::new()
    } else {
        vec!["invalid email format".to_string()]
    }
}

fn is_email_shaped(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let Some((name, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && name_ok && tld_ok
}

/// Absolute http(s) URL check.
pub fn http_url(value: &str) -> Vec<String> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Vec::new(),
        Ok(_) => vec!["only HTTP and HTTPS URLs are allowed".to_string()],
        Err(_) => vec!["invalid URL format".to_string()],
    }
}

/// Admin password strength rules.
pub fn password_strength(value: &str) -> Vec<String> {
    let mut failures = Vec::new();
    if value.chars().count() < 8 {
        failures.push("password must be at least 8 characters long".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        failures.push("password must contain at least one uppercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        failures.push("password must contain at least one lowercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        failures.push("password must contain at least one number".to_string());
    }
    if !value.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        failures.push("password must contain at least one special character".to_string());
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_empty_and_oversize() {
        assert_eq!(required_text("  ", 10), vec!["value is required"]);
        assert!(required_text("abcdefghijk", 10)[0].contains("maximum length"));
        assert!(required_text("hello", 10).is_empty());
    }

    #[test]
    fn suspicious_patterns_are_listed_individually() {
        let failures = suspicious("<script>javascript:alert(1)</script>");
        assert!(failures.iter().any(|f| f.contains("script tags")));
        assert!(failures.iter().any(|f| f.contains("javascript protocols")));
    }

    #[test]
    fn event_handlers_are_caught_but_plain_words_pass() {
        assert!(suspicious("monday onsite confirmation").is_empty());
        assert!(suspicious("<img onerror=alert(1)>").iter().any(|f| f.contains("event handlers")));
        assert!(suspicious("online = good").iter().any(|f| f.contains("event handlers")));
        assert!(suspicious("carbon dating").is_empty());
    }

    #[test]
    fn email_shape_is_enforced() {
        assert!(email("someone@example.com").is_empty());
        assert!(!email("someone@example").is_empty());
        assert!(!email("@example.com").is_empty());
        assert!(!email("someone@@example.com").is_empty());
    }

    #[test]
    fn urls_must_be_http_or_https() {
        assert!(http_url("https://example.com/a.png").is_empty());
        assert!(!http_url("ftp://example.com/a.png").is_empty());
        assert!(!http_url("not a url").is_empty());
    }

    #[test]
    fn password_rules_accumulate() {
        let failures = password_strength("short");
        assert_eq!(failures.len(), 4);
        assert!(password_strength("Str0ng!pass").is_empty());
    }
}
