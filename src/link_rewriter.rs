//! Rewrites outbound links in sent-email HTML into click-tracking URLs.
//!
//! Operates at the tag level rather than through a full DOM parse and
//! reserialize, so whitespace and markup outside the rewritten `href` are
//! preserved byte-for-byte.

use regex::Regex;
use std::sync::OnceLock;

fn anchor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)(<a\b[^>]*?\bhref\s*=\s*)(["'])(.*?)\2"#).expect("valid anchor regex")
    })
}

fn is_skipped(href: &str) -> bool {
    let lower = href.trim_start();
    lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.starts_with('#')
}

/// Rewrites every eligible anchor's `href` in `html` into
/// `<base>/emails/<email_id>/click/<link_index>?url=<percent-encoded original>`.
///
/// `link_index` is 0-based and counts only rewritten anchors; skipped anchors
/// (`mailto:`, `tel:`, fragment-only) do not advance it. Idempotent: rewriting
/// an already-rewritten document is a no-op because the click URL itself
/// starts with `base`, which is not one of the skip prefixes, so it would be
/// rewritten again with a different `url=` value — callers must not
/// double-rewrite a document. To guarantee idempotence across repeated calls
/// with the same base, skip hrefs that already target this base's click path.
pub fn rewrite_links(html: &str, base: &str, email_id: &str) -> String {
    let click_prefix = format!("{base}/emails/{email_id}/click/");
    let mut link_index: usize = 0;
    let mut out = String::with_capacity(html.len());
    let mut last_end = 0;

    for caps in anchor_pattern().captures_iter(html) {
        let whole = caps.get(0).unwrap();
        let prefix = caps.get(1).unwrap().as_str();
        let quote = caps.get(2).unwrap().as_str();
        let href = caps.get(3).unwrap().as_str();

        out.push_str(&html[last_end..whole.start()]);

        if is_skipped(href) || href.starts_with(&click_prefix) {
            out.push_str(whole.as_str());
        } else {
            let encoded = urlencoding::encode(href);
            out.push_str(prefix);
            out.push_str(quote);
            out.push_str(&format!("{click_prefix}{link_index}?url={encoded}"));
            out.push_str(quote);
            link_index += 1;
        }

        last_end = whole.end();
    }

    out.push_str(&html[last_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com";

    #[test]
    fn rewrites_eligible_anchor() {
        let html = r#"<a href="https://a.example/page">go</a>"#;
        let rewritten = rewrite_links(html, BASE, "42");
        assert_eq!(
            rewritten,
            r#"<a href="https://example.com/emails/42/click/0?url=https%3A%2F%2Fa.example%2Fpage">go</a>"#
        );
    }

    #[test]
    fn skips_mailto_tel_and_fragment() {
        let html = r#"<a href="mailto:x@y.com">mail</a> <a href="tel:+15551234">call</a> <a href="#top">top</a>"#;
        let rewritten = rewrite_links(html, BASE, "1");
        assert_eq!(rewritten, html);
    }

    #[test]
    fn link_index_counts_only_rewritten_anchors() {
        let html = r#"<a href="#top">top</a><a href="https://a.example">a</a><a href="https://b.example">b</a>"#;
        let rewritten = rewrite_links(html, BASE, "7");
        assert!(rewritten.contains("/emails/7/click/0?url=https%3A%2F%2Fa.example"));
        assert!(rewritten.contains("/emails/7/click/1?url=https%3A%2F%2Fb.example"));
    }

    #[test]
    fn preserves_surrounding_markup_byte_for_byte() {
        let html = "<p>Hello <b>world</b></p>\n<a href=\"https://a.example\">link</a>\n<footer>bye</footer>";
        let rewritten = rewrite_links(html, BASE, "1");
        assert!(rewritten.starts_with("<p>Hello <b>world</b></p>\n"));
        assert!(rewritten.ends_with("\n<footer>bye</footer>"));
    }

    #[test]
    fn literal_three_anchor_scenario() {
        let html = r#"<a href="https://a">x</a><a href="mailto:z@z">y</a><a href="https://b">z</a>"#;
        let rewritten = rewrite_links(html, "https://h", "E1");
        assert_eq!(
            rewritten,
            concat!(
                r#"<a href="https://h/emails/E1/click/0?url=https%3A%2F%2Fa">x</a>"#,
                r#"<a href="mailto:z@z">y</a>"#,
                r#"<a href="https://h/emails/E1/click/1?url=https%3A%2F%2Fb">z</a>"#,
            )
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let html = r#"<a href="https://a.example/page">go</a>"#;
        let once = rewrite_links(html, BASE, "42");
        let twice = rewrite_links(&once, BASE, "42");
        assert_eq!(once, twice);
    }
}
