//! Evaluates HTTP precondition headers into a single decision: proceed,
//! answer `304`, or answer `412` (spec.md §4.5).
//!
//! Kept close to the teacher's `conditional.rs` — same RFC 7232
//! evaluation order, same per-header structure — but rewired onto
//! [`crate::fs::DavMetaData`] and trimmed to the simple `If-*` headers
//! only (the full RFC 4918 tagged `If:` list with lock-token state is a
//! spec.md Non-goal and is not implemented here).
//!
//! **Does not reproduce the djangodav `If-Match` inversion bug**: that
//! source raises `precondition_failed` when the etag *matches*, backwards
//! from RFC 7232. This implementation fails the precondition only when
//! `If-Match` does *not* match, per spec.md §9 Open Question.

use headers::{ETag, HeaderMapExt, IfMatch, IfModifiedSince, IfNoneMatch, IfUnmodifiedSince};
use http::{HeaderMap, Method};

use crate::fs::DavMetaData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Proceed,
    NotModified,
    PreconditionFailed,
}

fn etag_header(meta: &dyn DavMetaData) -> Option<ETag> {
    format!("\"{}\"", meta.etag()).parse().ok()
}

/// Evaluate the request's conditional headers against `meta` (`None` if
/// the target resource does not exist).
pub fn evaluate(method: &Method, headers: &HeaderMap, meta: Option<&dyn DavMetaData>) -> Condition {
    // Rule 1: nonexistent resource skips every precondition.
    let meta = match meta {
        Some(m) => m,
        None => return Condition::Proceed,
    };
    let etag = etag_header(meta);
    let modified = meta.modified().ok();

    // Rule 2: If-Match. RFC 7232: fails when it does NOT match.
    if let Some(if_match) = headers.typed_get::<IfMatch>() {
        let matched = match etag.as_ref() {
            Some(t) => if_match.precondition_passes(t),
            None => false,
        };
        if !matched {
            trace!("precondition fail: If-Match");
            return Condition::PreconditionFailed;
        }
    }

    // Rule 3: If-Modified-Since tentatively decides not_modified.
    let mut pending_not_modified = false;
    if let (Some(ims), Some(modified)) = (headers.typed_get::<IfModifiedSince>(), modified) {
        if !ims.is_modified(modified) {
            pending_not_modified = true;
        }
    }

    // Rule 4: If-None-Match overrides the pending decision either way.
    if let Some(if_none_match) = headers.typed_get::<IfNoneMatch>() {
        let matched = match etag.as_ref() {
            Some(t) => !if_none_match.precondition_passes(t),
            None => false,
        };
        if matched {
            trace!("precondition fail: If-None-Match");
            return if *method == Method::GET || *method == Method::HEAD {
                Condition::NotModified
            } else {
                Condition::PreconditionFailed
            };
        }
        pending_not_modified = false;
    }

    // Rule 5: If-Unmodified-Since.
    if let (Some(ius), Some(modified)) = (headers.typed_get::<IfUnmodifiedSince>(), modified) {
        if !ius.precondition_passes(modified) {
            trace!("precondition fail: If-Unmodified-Since");
            return Condition::PreconditionFailed;
        }
    }

    if pending_not_modified {
        Condition::NotModified
    } else {
        Condition::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FsResult;
    use std::time::{Duration, SystemTime};

    #[derive(Debug)]
    struct FakeMeta {
        collection: bool,
        len: u64,
        modified: SystemTime,
        etag: String,
    }

    impl DavMetaData for FakeMeta {
        fn is_collection(&self) -> bool {
            self.collection
        }
        fn len(&self) -> u64 {
            self.len
        }
        fn modified(&self) -> FsResult<SystemTime> {
            Ok(self.modified)
        }
        fn created(&self) -> FsResult<SystemTime> {
            Ok(self.modified)
        }
        fn etag(&self) -> String {
            self.etag.clone()
        }
    }

    fn meta(etag: &str, modified: SystemTime) -> FakeMeta {
        FakeMeta {
            collection: false,
            len: 5,
            modified,
            etag: etag.to_string(),
        }
    }

    #[test]
    fn missing_resource_always_proceeds() {
        let mut h = HeaderMap::new();
        h.insert(http::header::IF_MATCH, "\"x\"".parse().unwrap());
        assert_eq!(evaluate(&Method::GET, &h, None), Condition::Proceed);
    }

    #[test]
    fn if_match_fails_when_etag_does_not_match() {
        let m = meta("abc", SystemTime::now());
        let mut h = HeaderMap::new();
        h.insert(http::header::IF_MATCH, "\"zzz\"".parse().unwrap());
        assert_eq!(
            evaluate(&Method::PUT, &h, Some(&m as &dyn DavMetaData)),
            Condition::PreconditionFailed
        );
    }

    #[test]
    fn if_match_proceeds_when_etag_matches_not_inverted() {
        let m = meta("abc", SystemTime::now());
        let mut h = HeaderMap::new();
        h.insert(http::header::IF_MATCH, "\"abc\"".parse().unwrap());
        assert_eq!(
            evaluate(&Method::PUT, &h, Some(&m as &dyn DavMetaData)),
            Condition::Proceed
        );
    }

    #[test]
    fn if_none_match_star_is_not_modified_on_get() {
        let m = meta("abc", SystemTime::now());
        let mut h = HeaderMap::new();
        h.insert(http::header::IF_NONE_MATCH, "*".parse().unwrap());
        assert_eq!(
            evaluate(&Method::GET, &h, Some(&m as &dyn DavMetaData)),
            Condition::NotModified
        );
    }

    #[test]
    fn if_none_match_star_is_precondition_failed_on_put() {
        let m = meta("abc", SystemTime::now());
        let mut h = HeaderMap::new();
        h.insert(http::header::IF_NONE_MATCH, "*".parse().unwrap());
        assert_eq!(
            evaluate(&Method::PUT, &h, Some(&m as &dyn DavMetaData)),
            Condition::PreconditionFailed
        );
    }

    #[test]
    fn if_unmodified_since_in_the_past_fails() {
        let now = SystemTime::now();
        let m = meta("abc", now);
        let mut h = HeaderMap::new();
        h.typed_insert(IfUnmodifiedSince::from(now - Duration::from_secs(3600)));
        assert_eq!(
            evaluate(&Method::PUT, &h, Some(&m as &dyn DavMetaData)),
            Condition::PreconditionFailed
        );
    }
}
