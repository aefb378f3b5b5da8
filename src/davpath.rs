//! Path handling: URL/path joining, clark-notation namespace split/join,
//! HTTP date parsing/formatting, and RFC 5987 filename encoding.
//!
//! Grounded on djangodav's `utils.safe_join`/`url_join`/`ns_split`/`ns_join`
//! and `parse_time`, reworked into owned, panic-free Rust.

use std::path::PathBuf;
use std::time::SystemTime;

use http::Uri;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use unicode_normalization::UnicodeNormalization;

use crate::errors::{DavError, DavResult};

const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'\'').add(b'%');

/// A parsed, normalized request path. Segments never contain `/`, and
/// empty segments (from doubled slashes) are dropped, per spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavPath {
    prefix: String,
    segments: Vec<String>,
    collection: bool,
    star: bool,
}

impl DavPath {
    /// Parse the request URI, stripping `prefix` (the mount point) first.
    pub fn from_uri_and_prefix(uri: &Uri, prefix: &str) -> DavResult<DavPath> {
        if uri.path() == "*" {
            return Ok(DavPath {
                prefix: prefix.to_string(),
                segments: Vec::new(),
                collection: true,
                star: true,
            });
        }
        Self::from_str_and_prefix(uri.path(), prefix)
    }

    pub fn from_str_and_prefix(path: &str, prefix: &str) -> DavResult<DavPath> {
        let decoded = percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| DavError::Status(http::StatusCode::BAD_REQUEST))?
            .into_owned();
        let stripped = decoded
            .strip_prefix(prefix)
            .unwrap_or(decoded.trim_start_matches('/'));
        let collection = decoded.ends_with('/') || decoded.is_empty();
        let segments = stripped
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(DavPath {
            prefix: prefix.to_string(),
            segments,
            collection,
            star: false,
        })
    }

    pub fn root(prefix: &str) -> DavPath {
        DavPath {
            prefix: prefix.to_string(),
            segments: Vec::new(),
            collection: true,
            star: false,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    pub fn is_star(&self) -> bool {
        self.star
    }

    pub fn add_slash(&mut self) {
        self.collection = true;
    }

    pub fn strip_slash(&mut self) {
        self.collection = false;
    }

    /// The final path segment, or the empty string for the root.
    pub fn display_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path. The root's parent is itself (per spec invariant).
    pub fn parent(&self) -> DavPath {
        let mut segments = self.segments.clone();
        segments.pop();
        DavPath {
            prefix: self.prefix.clone(),
            segments,
            collection: true,
            star: false,
        }
    }

    pub fn child(&self, name: &str) -> DavPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        DavPath {
            prefix: self.prefix.clone(),
            segments,
            collection: false,
            star: false,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Absolute path without the stripped prefix, e.g. `/a/b`.
    pub fn as_url_string(&self) -> String {
        let mut s = safe_join("/", &self.segments.join("/"));
        if self.collection && !s.ends_with('/') {
            s.push('/');
        }
        s
    }

    /// Absolute path with the prefix re-added, for building hrefs.
    pub fn with_prefix(&self) -> DavPathUrl {
        DavPathUrl(url_join(&self.prefix, &self.as_url_string()))
    }

    /// Relative OS path (for filesystem backends), with no leading slash.
    pub fn as_rel_ospath(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

/// Wrapper so `as_url_string()` is explicit about joining with the prefix.
pub struct DavPathUrl(String);

impl DavPathUrl {
    pub fn as_url_string(&self) -> String {
        self.0.clone()
    }
}

/// Join `root` with `parts`, producing a `/`-delimited absolute path.
/// A leading slash on any part is stripped, so a part can never escape
/// the root by appearing absolute.
pub fn safe_join(root: &str, part: &str) -> String {
    let mut root = if root.starts_with('/') {
        root.to_string()
    } else {
        format!("/{root}")
    };
    while root.ends_with('/') {
        root.pop();
    }
    let part = part.trim_start_matches('/');
    root.push('/');
    root.push_str(part);
    root
}

/// Join `base` (a URL prefix) with a path produced by `safe_join`.
/// An empty `part` leaves `base` unchanged.
pub fn url_join(base: &str, part: &str) -> String {
    if part.is_empty() {
        return base.to_string();
    }
    let mut base = base.to_string();
    while base.ends_with('/') {
        base.pop();
    }
    format!("{base}{part}")
}

/// Split a clark-notation qualified name `{ns}local` into `(ns, local)`.
/// Names with no `{...}` prefix get an empty namespace.
pub fn ns_split(tag: &str) -> (&str, &str) {
    if let Some(rest) = tag.strip_prefix('{') {
        if let Some((ns, local)) = rest.split_once('}') {
            return (ns, local);
        }
    }
    ("", tag)
}

/// Join a namespace and local name into clark notation.
pub fn ns_join(ns: &str, local: &str) -> String {
    if ns.is_empty() {
        local.to_string()
    } else {
        format!("{{{ns}}}{local}")
    }
}

const FORMAT_RFC_1123: &[time::format_description::FormatItem] = time::macros::format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);
const FORMAT_RFC_850: &[time::format_description::FormatItem] = time::macros::format_description!(
    "[weekday], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] GMT"
);
const FORMAT_ASCTIME: &[time::format_description::FormatItem] = time::macros::format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// Parse an HTTP date in RFC 1123, RFC 850, or asctime form. Never panics;
/// returns `None` on anything it cannot make sense of.
pub fn parse_http_date(s: &str) -> Option<SystemTime> {
    let s = s.trim();
    for fmt in [FORMAT_RFC_1123, FORMAT_RFC_850, FORMAT_ASCTIME] {
        if let Ok(pd) = time::PrimitiveDateTime::parse(s, fmt) {
            return Some(pd.assume_utc().into());
        }
    }
    None
}

/// Format a timestamp as an RFC 1123 HTTP date, e.g.
/// `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format_http_date(t: SystemTime) -> String {
    let odt = crate::util::systemtime_to_offsetdatetime(t);
    odt.format(FORMAT_RFC_1123).unwrap_or_default()
}

/// Format a timestamp as RFC 3339, e.g. `1996-12-19T16:39:57Z`.
pub fn format_rfc3339(t: SystemTime) -> String {
    crate::util::systemtime_to_rfc3339(t)
}

/// RFC 5987 encoding of a (possibly non-ASCII) filename: ASCII-fold via
/// NFKD decomposition and drop what doesn't survive, plus a percent-encoded
/// `filename*` fallback when the ASCII-folded form differs from the original.
pub fn rfc5987_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let mut header = format!("filename=\"{ascii}\"");
    if ascii != name {
        let encoded = utf8_percent_encode(name, FRAGMENT);
        header.push_str(&format!("; filename*=UTF-8''{encoded}"));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_strips_leading_slash() {
        assert_eq!(safe_join("/a", "/b"), "/a/b");
        assert_eq!(safe_join("/a/", "//b"), "/a/b");
        assert_eq!(safe_join("a", "b"), "/a/b");
    }

    #[test]
    fn url_join_empty_part_is_noop() {
        assert_eq!(url_join("http://x/base/", ""), "http://x/base/");
        assert_eq!(url_join("http://x/base/", "/a"), "http://x/base/a");
    }

    #[test]
    fn clark_notation_roundtrip() {
        assert_eq!(ns_split("{DAV:}displayname"), ("DAV:", "displayname"));
        assert_eq!(ns_split("displayname"), ("", "displayname"));
        assert_eq!(ns_join("DAV:", "displayname"), "{DAV:}displayname");
        assert_eq!(ns_join("", "displayname"), "displayname");
    }

    #[test]
    fn parses_all_three_date_forms() {
        let rfc1123 = "Sun, 06 Nov 1994 08:49:37 GMT";
        let rfc850 = "Sunday, 06-Nov-94 08:49:37 GMT";
        let asctime = "Sun Nov  6 08:49:37 1994";
        let t1 = parse_http_date(rfc1123).unwrap();
        let t2 = parse_http_date(rfc850).unwrap();
        let t3 = parse_http_date(asctime).unwrap();
        assert_eq!(t1, t2);
        assert_eq!(t1, t3);
    }

    #[test]
    fn unparseable_date_is_none_not_panic() {
        assert!(parse_http_date("not a date").is_none());
    }

    #[test]
    fn rfc5987_ascii_only_has_no_star_variant() {
        let h = rfc5987_filename("report.txt");
        assert_eq!(h, "filename=\"report.txt\"");
    }

    #[test]
    fn rfc5987_unicode_gets_star_variant() {
        let h = rfc5987_filename("caf\u{e9}.txt");
        assert!(h.starts_with("filename=\"caf.txt\""));
        assert!(h.contains("filename*=UTF-8''caf%C3%A9.txt"));
    }
}
