//! Detection of HTML error pages served where JSON was expected.
//!
//! Relays and CDNs answer failures with `200 OK` and a challenge or error
//! page, so a status check alone is not enough.

/// Bytes inspected at the head of a body.
const SNIFF_WINDOW: usize = 512;

/// Returns why the response is not JSON, or `None` if it looks acceptable.
pub fn reject_non_json(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.starts_with("text/html") || ct.starts_with("application/xhtml") {
            return Some(format!("content-type {ct}"));
        }
    }

    let head = &body[..body.len().min(SNIFF_WINDOW)];
    let first = head.iter().position(|b| !b.is_ascii_whitespace());
    match first {
        None => Some("empty body".to_string()),
        Some(i) if head[i] == b'<' => {
            let snippet = String::from_utf8_lossy(&head[i..head.len().min(i + 15)]).into_owned();
            Some(format!("markup body starting with {snippet:?}"))
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_json() {
        assert_eq!(reject_non_json(Some("application/json"), br#"{"streams":[]}"#), None);
        assert_eq!(reject_non_json(None, b"  [1,2]"), None);
    }

    #[test]
    fn rejects_html_content_type() {
        assert!(reject_non_json(Some("text/html; charset=utf-8"), b"{}").is_some());
    }

    #[test]
    fn rejects_markup_masquerading_as_json() {
        let body = b"\n  <!DOCTYPE html><html><body>Just a moment...</body></html>";
        let reason = reject_non_json(Some("application/json"), body).unwrap();
        assert!(reason.contains("<!DOCTYPE"));
    }

    #[test]
    fn rejects_empty_body() {
        assert!(reject_non_json(Some("application/json"), b"   ").is_some());
    }
}
