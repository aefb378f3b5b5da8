use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use headers::Header;
use time::format_description::well_known::Rfc3339;
use time::macros::offset;

bitflags! {
    /// The set of WebDAV methods a `DavHandler` accepts. Defaults to
    /// everything; an embedder can narrow it (e.g. to serve a read-only
    /// mount).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DavMethodSet: u32 {
        const HEAD      = 0x0001;
        const GET       = 0x0002;
        const PUT       = 0x0004;
        const OPTIONS   = 0x0008;
        const PROPFIND  = 0x0010;
        const PROPPATCH = 0x0020;
        const MKCOL     = 0x0040;
        const COPY      = 0x0080;
        const MOVE      = 0x0100;
        const DELETE    = 0x0200;
        const LOCK      = 0x0400;
        const UNLOCK    = 0x0800;
    }
}

/// A single parsed WebDAV method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    Head,
    Get,
    Put,
    Options,
    PropFind,
    PropPatch,
    MkCol,
    Copy,
    Move,
    Delete,
    Lock,
    Unlock,
}

impl DavMethod {
    pub fn as_set(self) -> DavMethodSet {
        match self {
            DavMethod::Head => DavMethodSet::HEAD,
            DavMethod::Get => DavMethodSet::GET,
            DavMethod::Put => DavMethodSet::PUT,
            DavMethod::Options => DavMethodSet::OPTIONS,
            DavMethod::PropFind => DavMethodSet::PROPFIND,
            DavMethod::PropPatch => DavMethodSet::PROPPATCH,
            DavMethod::MkCol => DavMethodSet::MKCOL,
            DavMethod::Copy => DavMethodSet::COPY,
            DavMethod::Move => DavMethodSet::MOVE,
            DavMethod::Delete => DavMethodSet::DELETE,
            DavMethod::Lock => DavMethodSet::LOCK,
            DavMethod::Unlock => DavMethodSet::UNLOCK,
        }
    }
}

/// Translate an HTTP method into our webdav method enum. `None` for
/// anything this crate doesn't recognize.
pub fn dav_method(m: &http::Method) -> Option<DavMethod> {
    Some(match *m {
        http::Method::HEAD => DavMethod::Head,
        http::Method::GET => DavMethod::Get,
        http::Method::PUT => DavMethod::Put,
        http::Method::DELETE => DavMethod::Delete,
        http::Method::OPTIONS => DavMethod::Options,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PropFind,
            "PROPPATCH" => DavMethod::PropPatch,
            "MKCOL" => DavMethod::MkCol,
            "COPY" => DavMethod::Copy,
            "MOVE" => DavMethod::Move,
            "LOCK" => DavMethod::Lock,
            "UNLOCK" => DavMethod::Unlock,
            _ => return None,
        },
    })
}

pub fn systemtime_to_offsetdatetime(t: SystemTime) -> time::OffsetDateTime {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let tm = time::OffsetDateTime::from_unix_timestamp(d.as_secs() as i64)
                .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
            tm.to_offset(offset!(UTC))
        }
        Err(_) => time::OffsetDateTime::UNIX_EPOCH.to_offset(offset!(UTC)),
    }
}

/// RFC 1123 date, via the `headers` crate's typed `Date`, so it matches
/// whatever that crate puts on the wire for `Last-Modified`/`Date`.
pub fn systemtime_to_httpdate(t: SystemTime) -> String {
    let d = headers::Date::from(t);
    let mut v = Vec::new();
    d.encode(&mut v);
    v[0].to_str().unwrap_or_default().to_owned()
}

pub fn systemtime_to_rfc3339(t: SystemTime) -> String {
    // 1996-12-19T16:39:57Z
    systemtime_to_offsetdatetime(t)
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Pulls the lock-state-tokens out of a raw `If` header value, ignoring
/// the `Not`/`And`/`Or` tagged-list structure of RFC 4918 §10.4 (full
/// evaluation of that structure is a spec Non-goal). Good enough to let a
/// client present the token it was issued by `LOCK`.
///
/// Strips the `opaquelocktoken:` URI scheme, so the returned strings are
/// directly comparable with `DavLock::token` (which stores the bare
/// value, the same form `new_token()` generates).
pub fn extract_state_tokens(if_header: Option<&str>) -> Vec<String> {
    let s = match if_header {
        Some(s) => s,
        None => return Vec::new(),
    };
    let mut tokens = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("<opaquelocktoken:") {
        rest = &rest[start + "<opaquelocktoken:".len()..];
        if let Some(end) = rest.find('>') {
            tokens.push(rest[..end].to_string());
            rest = &rest[end + 1..];
        } else {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339() {
        assert_eq!(systemtime_to_rfc3339(UNIX_EPOCH), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn dav_method_roundtrips_standard_verbs() {
        assert_eq!(dav_method(&http::Method::GET), Some(DavMethod::Get));
        assert_eq!(dav_method(&http::Method::PUT), Some(DavMethod::Put));
        assert_eq!(dav_method(&http::Method::OPTIONS), Some(DavMethod::Options));
    }

    #[test]
    fn dav_method_rejects_unknown_verbs() {
        let custom = http::Method::from_bytes(b"FROB").unwrap();
        assert_eq!(dav_method(&custom), None);
    }

    #[test]
    fn extracts_state_token_from_lock_token_header() {
        let tokens = extract_state_tokens(Some("<opaquelocktoken:abc123>"));
        assert_eq!(tokens, vec!["abc123".to_string()]);
    }

    #[test]
    fn extracts_multiple_state_tokens_from_if_header() {
        let tokens = extract_state_tokens(Some(
            "(<opaquelocktoken:aaa>) (<opaquelocktoken:bbb>)",
        ));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn no_header_yields_no_tokens() {
        assert!(extract_state_tokens(None).is_empty());
    }
}
