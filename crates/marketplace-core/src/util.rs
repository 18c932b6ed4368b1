//! Small helpers shared by the Firebase clients and the CLI.

/// Longest slice of an HTTP error body carried into an error message.
const EXCERPT_CHARS: usize = 180;

/// Trimmed text, or `None` for missing and blank values.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Endpoint root without trailing slashes; only http(s) endpoints are accepted.
pub fn normalize_base_url(raw: &str, label: &str) -> Result<String, String> {
    let base = raw.trim().trim_end_matches('/');
    match base {
        "" => Err(format!("{label} must not be empty")),
        url if url.starts_with("https://") || url.starts_with("http://") => Ok(url.to_string()),
        _ => Err(format!("{label} must include http:// or https://")),
    }
}

pub fn response_excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_CHARS).collect()
}

/// Seconds since the Unix epoch, used for token expiry.
pub fn now_unix_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_normalizes_to_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" house-marketplace ".to_string())),
            Some("house-marketplace".to_string())
        );
    }

    #[test]
    fn base_url_needs_scheme_and_loses_trailing_slash() {
        assert!(normalize_base_url("  ", "Firestore base URL").is_err());
        assert!(normalize_base_url("firestore.googleapis.com", "Firestore base URL").is_err());
        assert_eq!(
            normalize_base_url("http://localhost:8080//", "Firestore base URL").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn excerpt_is_capped() {
        let body = format!("  {}", "e".repeat(400));
        assert_eq!(response_excerpt(&body).len(), EXCERPT_CHARS);
    }
}
