/// Content-type sniffing over the first bytes of a body.
///
/// Servers routinely mislabel HTML as text/plain or octet-stream, which
/// would send perfectly extractable pages down the "opaque bytes" path.
/// Sniffing is bounded to the first 1 KB and purely signature-based.
const SNIFF_WINDOW: usize = 1024;

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

pub fn looks_like_html(bytes: &[u8]) -> bool {
    let mut window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    // Skip UTF-8 BOM.
    if window.starts_with(&[0xEF, 0xBB, 0xBF]) {
        window = &window[3..];
    }
    let text = String::from_utf8_lossy(window).to_ascii_lowercase();
    let trimmed = text.trim_start();
    trimmed.starts_with("<!doctype html") || trimmed.contains("<html")
}

pub fn looks_like_json(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(window);
    matches!(text.trim_start().as_bytes().first(), Some(b'{') | Some(b'['))
}

fn mime_prefix(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Normalize a declared content type against the body bytes.
///
/// The declared type wins unless it is absent, octet-stream, or text/plain
/// while the body carries a stronger signature.
pub fn normalize_content_type(declared: Option<&str>, body: &[u8]) -> Option<String> {
    let declared = declared.map(mime_prefix).filter(|s| !s.is_empty());

    if looks_like_pdf(body) {
        return Some("application/pdf".to_string());
    }

    let weak = matches!(
        declared.as_deref(),
        None | Some("application/octet-stream") | Some("text/plain")
    );
    if weak && looks_like_html(body) {
        return Some("text/html".to_string());
    }
    if declared.as_deref() == Some("text/plain") && looks_like_json(body) {
        return Some("application/json".to_string());
    }

    declared
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_signature_upgrades_weak_declarations() {
        let body = b"  <!DOCTYPE HTML><html><body>x</body></html>";
        assert_eq!(
            normalize_content_type(None, body).as_deref(),
            Some("text/html")
        );
        assert_eq!(
            normalize_content_type(Some("application/octet-stream"), body).as_deref(),
            Some("text/html")
        );
        assert_eq!(
            normalize_content_type(Some("text/plain; charset=utf-8"), body).as_deref(),
            Some("text/html")
        );
    }

    #[test]
    fn declared_html_is_kept_and_lowercased() {
        assert_eq!(
            normalize_content_type(Some("Text/HTML; charset=UTF-8"), b"whatever").as_deref(),
            Some("text/html")
        );
    }

    #[test]
    fn pdf_magic_wins() {
        assert_eq!(
            normalize_content_type(Some("text/html"), b"%PDF-1.7 ...").as_deref(),
            Some("application/pdf")
        );
    }

    #[test]
    fn json_under_text_plain_is_detected() {
        assert_eq!(
            normalize_content_type(Some("text/plain"), b"  {\"a\":1}").as_deref(),
            Some("application/json")
        );
        // Declared json stays json even without a body signature.
        assert_eq!(
            normalize_content_type(Some("application/json"), b"").as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn bom_does_not_defeat_html_sniffing() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice(b"<!doctype html><html></html>");
        assert!(looks_like_html(&body));
    }
}
