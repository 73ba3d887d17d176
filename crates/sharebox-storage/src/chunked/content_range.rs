//! Chunk range headers and slot path segments.

use sharebox_entity::upload::ContentRange;

const MAX_SEGMENT_LEN: usize = 120;

/// Parse `bytes <start>-<end>/<total>`.
///
/// Returns `None` for anything else, including `end < start`, a zero
/// total, or the unknown-total form `*/total`.
pub fn parse_content_range(header: &str) -> Option<ContentRange> {
    let spec = header.trim().strip_prefix("bytes ")?;
    let (span, total) = spec.split_once('/')?;
    let (start, end) = span.split_once('-')?;

    let start = parse_digits(start)?;
    let end = parse_digits(end)?;
    let total = parse_digits(total)?;

    if end < start || total == 0 {
        return None;
    }
    Some(ContentRange { start, end, total })
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Reduce a client-supplied identifier to `[A-Za-z0-9_-]`, at most 120 chars.
pub fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_SEGMENT_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(
            parse_content_range("bytes 0-99/1000"),
            Some(ContentRange {
                start: 0,
                end: 99,
                total: 1000
            })
        );
        assert_eq!(
            parse_content_range("  bytes 5-5/6 ").map(|r| r.len()),
            Some(1)
        );
    }

    #[test]
    fn test_parse_content_range_rejects_malformed() {
        for header in [
            "",
            "bytes 10-5/100",
            "bytes 0-1/0",
            "bytes */100",
            "bytes 0-1/*",
            "bytes=0-1/10",
            "bytes -1-5/10",
            "bytes 0-+1/10",
            "items 0-1/10",
        ] {
            assert!(parse_content_range(header).is_none(), "{header}");
        }
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("abc-DEF_123"), "abc-DEF_123");
        assert_eq!(sanitize_segment("../../etc"), "etc");
        assert_eq!(sanitize_segment("a b/c"), "abc");
        assert_eq!(sanitize_segment(&"x".repeat(200)).len(), 120);
        assert_eq!(sanitize_segment("../"), "");
    }
}
