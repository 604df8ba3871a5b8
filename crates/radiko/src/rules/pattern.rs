//! URL filter matching.
//!
//! Filters use the declarative request-rewrite syntax:
//!
//! - `||` at the start anchors to the host, allowing any subdomain
//! - `|` at the start or end anchors to the beginning or end of the URL
//! - `*` matches any run of characters
//! - `^` matches a separator (anything but a letter, digit, `_`, `-`, `.`, `%`) or the end
//!
//! Anything else matches literally, case-insensitively.

use regex::Regex;

use crate::error::RuleError;

#[derive(Debug, Clone)]
pub struct UrlFilter {
    source: String,
    regex: Regex,
}

impl UrlFilter {
    pub fn compile(filter: &str) -> Result<Self, RuleError> {
        if filter.is_empty() {
            return Err(RuleError::InvalidPattern {
                filter: filter.to_string(),
                reason: "empty filter".to_string(),
            });
        }

        let mut body = filter;
        let mut pattern = String::from("(?i)");

        if let Some(rest) = body.strip_prefix("||") {
            pattern.push_str(r"^[a-z][a-z0-9+.\-]*://(?:[^/?#]*\.)?");
            body = rest;
        } else if let Some(rest) = body.strip_prefix('|') {
            pattern.push('^');
            body = rest;
        }

        let end_anchor = body.ends_with('|');
        if end_anchor {
            body = &body[..body.len() - 1];
        }

        for c in body.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '^' => pattern.push_str(r"(?:[^A-Za-z0-9_\-.%]|$)"),
                c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
            }
        }

        if end_anchor {
            pattern.push('$');
        }

        let regex = Regex::new(&pattern).map_err(|e| RuleError::InvalidPattern {
            filter: filter.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: filter.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(filter: &str, url: &str) -> bool {
        UrlFilter::compile(filter).unwrap().matches(url)
    }

    #[test]
    fn test_domain_anchor() {
        let f = "||radiko.jp/v2/api/ts/";
        assert!(m(f, "https://radiko.jp/v2/api/ts/playlist.m3u8?station_id=TBS"));
        assert!(m(f, "https://www.radiko.jp/v2/api/ts/playlist.m3u8"));
        assert!(m(f, "HTTPS://RADIKO.JP/v2/api/ts/x"));
        assert!(!m(f, "https://notradiko.jp/v2/api/ts/x"));
        assert!(!m(f, "https://example.com/?u=https://radiko.jp/v2/api/ts/"));
        assert!(!m(f, "https://radiko.jp/v2/api/auth1"));
    }

    #[test]
    fn test_cdn_hosts() {
        assert!(m("||smartstream.ne.jp/", "https://tf-f-rpaa-radiko.smartstream.ne.jp/tf/seg.aac"));
        assert!(m("||radiko-cf.com/", "https://rd-wowza-radiko.radiko-cf.com/x.m3u8"));
    }

    #[test]
    fn test_substring_and_edge_anchors() {
        assert!(m("https://radiko.jp/v2/api/auth1", "https://radiko.jp/v2/api/auth1"));
        assert!(m("radiko.jp/v2/api/auth1", "https://radiko.jp/v2/api/auth1?x=1"));
        assert!(m("|https://radiko.jp", "https://radiko.jp/"));
        assert!(!m("|radiko.jp", "https://radiko.jp/"));
        assert!(m(".aac|", "https://x/seg.aac"));
        assert!(!m(".aac|", "https://x/seg.aac?t=1"));
    }

    #[test]
    fn test_wildcard_and_separator() {
        assert!(m("||radiko.jp/*/stream/", "https://radiko.jp/v3/station/stream/"));
        assert!(m("||radiko.jp^", "https://radiko.jp/x"));
        assert!(m("||radiko.jp^", "https://radiko.jp"));
        assert!(!m("||radiko.jp^", "https://radiko.jpx/"));
    }

    #[test]
    fn test_literal_regex_characters() {
        assert!(m("playlist.m3u8?station_id=", "https://radiko.jp/v2/api/ts/playlist.m3u8?station_id=TBS"));
        assert!(!m("playlist.m3u8", "https://radiko.jp/playlistXm3u8"));
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(matches!(
            UrlFilter::compile(""),
            Err(RuleError::InvalidPattern { .. })
        ));
    }
}
