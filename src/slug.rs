//! Deterministic slug derivation for mailing lists and emails.

use sha1::{Digest, Sha1};

/// Derive a URL-safe slug from a source string.
///
/// Lowercases, maps `/` to `-` and `&`/` + ` to ` and `, drops runs of
/// characters outside `[a-z0-9 \-_]`, collapses runs of `{space,-,_}` into a
/// single `-`, and trims leading/trailing `-`. Falls back to the first 12 hex
/// characters of the SHA-1 of the lowercased, trimmed input when the result
/// would otherwise be empty.
pub fn slug(source: &str) -> String {
    let lowered = source.to_lowercase();
    let lowered = lowered
        .replace('/', "-")
        .replace(" + ", " and ")
        .replace('&', " and ");

    let mut filtered = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() || ch == ' ' || ch == '-' || ch == '_' {
            filtered.push(ch);
        }
    }

    let mut out = String::with_capacity(filtered.len());
    let mut in_run = false;
    for ch in filtered.chars() {
        if ch == ' ' || ch == '-' || ch == '_' {
            if !in_run {
                out.push('-');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }

    let trimmed = out.trim_matches('-').to_string();

    if trimmed.is_empty() {
        fallback(source)
    } else {
        trimmed
    }
}

fn fallback(source: &str) -> String {
    let canonical = source.trim().to_lowercase();
    let digest = Sha1::digest(canonical.as_bytes());
    hex::encode(digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_example_with_ampersand_and_slash() {
        assert_eq!(slug(" Foo & Bar/baz "), "foo-and-bar-baz");
    }

    #[test]
    fn falls_back_to_sha1_prefix_when_empty() {
        let expected = fallback("!!!");
        assert_eq!(slug("!!!"), expected);
        assert_eq!(slug("!!!").len(), 12);
    }

    #[test]
    fn deterministic() {
        let s = "Weekly Digest #42";
        assert_eq!(slug(s), slug(s));
    }

    #[test]
    fn collapses_mixed_separator_runs() {
        assert_eq!(slug("foo   --__  bar"), "foo-bar");
    }
}
