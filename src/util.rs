pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Percent-encodes an ERDDAP query string.
///
/// The DAP query syntax is kept readable: `&` and `=` separators, commas,
/// colons and the griddap bracket selectors stay literal. Comparators (`<`,
/// `>`), spaces and quotes around string constraints are encoded so the
/// resulting URL parses cleanly.
pub(crate) fn percent_encode_query(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for b in query.bytes() {
        if is_query_safe(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn is_query_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'~' | b'&' | b'=' | b',' | b'(' | b')' | b'[' | b']' | b':'
        )
}

pub(crate) fn body_snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(500) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}
