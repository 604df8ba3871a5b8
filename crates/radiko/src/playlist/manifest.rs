use m3u8_rs::{Playlist, parse_playlist_res};
use url::Url;

/// A parsed timefree playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    /// Segment URIs in playlist order
    Media(Vec<String>),
    /// Media playlist URIs in declaration order
    Variant(Vec<String>),
}

/// Parses a playlist body. Comment and blank lines carry no entries; every
/// URI line is kept in file order.
pub fn parse_manifest(body: &[u8]) -> Result<Manifest, String> {
    match parse_playlist_res(body) {
        Ok(Playlist::MediaPlaylist(pl)) => Ok(Manifest::Media(
            pl.segments.into_iter().map(|segment| segment.uri).collect(),
        )),
        Ok(Playlist::MasterPlaylist(pl)) => Ok(Manifest::Variant(
            pl.variants.into_iter().map(|variant| variant.uri).collect(),
        )),
        Err(e) => Err(e.to_string()),
    }
}

/// Resolves a manifest entry against the manifest's own URL.
pub fn resolve_entry(base: &Url, entry: &str) -> Result<Url, url::ParseError> {
    match Url::parse(entry) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(entry),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "#EXTM3U\n#EXTINF:10\nhttps://x/seg1.aac\n\nhttps://x/seg2.aac\n";
        assert_eq!(
            parse_manifest(text.as_bytes()).unwrap(),
            Manifest::Media(vec![
                "https://x/seg1.aac".to_string(),
                "https://x/seg2.aac".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_empty_media_playlist() {
        assert_eq!(
            parse_manifest(b"#EXTM3U\n#EXT-X-TARGETDURATION:5\n#EXT-X-ENDLIST\n").unwrap(),
            Manifest::Media(Vec::new())
        );
    }

    #[test]
    fn test_parse_variant() {
        let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=52973,CODECS=\"mp4a.40.5\"\nhttps://radiko.jp/v2/api/ts/chunklist/abc.m3u8\n";
        assert_eq!(
            parse_manifest(master.as_bytes()).unwrap(),
            Manifest::Variant(vec![
                "https://radiko.jp/v2/api/ts/chunklist/abc.m3u8".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_rejects_non_playlist() {
        assert!(parse_manifest(b"<html>not found</html>").is_err());
    }

    #[test]
    fn test_resolve_entry() {
        let base = Url::parse("https://radiko.jp/v2/api/ts/chunklist/abc.m3u8?x=1").unwrap();
        assert_eq!(
            resolve_entry(&base, "seg/1.aac").unwrap().as_str(),
            "https://radiko.jp/v2/api/ts/chunklist/seg/1.aac"
        );
        assert_eq!(
            resolve_entry(&base, "/segments/2.aac").unwrap().as_str(),
            "https://radiko.jp/segments/2.aac"
        );
        assert_eq!(
            resolve_entry(&base, "https://cdn.example/3.aac").unwrap().as_str(),
            "https://cdn.example/3.aac"
        );
    }
}
