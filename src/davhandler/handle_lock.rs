//! `LOCK` (spec.md §4.6): parses `<lockinfo>`, calls the lock manager,
//! and renders the `lockdiscovery` response body. A request with no body
//! but a presented token refreshes that lock instead of creating one.

use std::time::Duration;

use http::{Request, Response, StatusCode};
use xmltree::{Element, XMLNode};

use crate::body::Body;
use crate::fs::Depth;
use crate::ls::{DavLock, LockScope};
use crate::xmlname::NS_DAV;
use crate::{DavError, DavResult};

const DEFAULT_TIMEOUT_SECS: u64 = 600;

impl crate::DavHandler {
    pub(crate) async fn handle_lock(
        &self,
        req: &Request<()>,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);
        let ls = self
            .ls
            .as_ref()
            .ok_or(DavError::Status(StatusCode::NOT_IMPLEMENTED))?;

        let principal = self.principal.as_deref().map(|s| s.to_string());
        let acl = self
            .acl
            .get_access(principal.as_deref(), &path);
        if !acl.write {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let timeout = parse_timeout(req.headers().get("timeout").and_then(|v| v.to_str().ok()));

        if body.is_empty() {
            let tokens = self.presented_tokens(req);
            let token = tokens
                .first()
                .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;
            let refreshed = ls
                .refresh(token, timeout)
                .map_err(|_| DavError::Status(StatusCode::PRECONDITION_FAILED))?;
            let mut res = lockdiscovery_response(&ls.discover(&path), StatusCode::OK);
            res.headers_mut().insert(
                "lock-token",
                format!("<opaquelocktoken:{}>", refreshed.token).parse().unwrap(),
            );
            return Ok(res);
        }

        let depth = Depth::parse(
            req.headers().get("depth").and_then(|v| v.to_str().ok()),
            Depth::Zero,
        )
        .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;

        let (scope, owner) = parse_lockinfo(body)?;

        let new_lock = match ls.lock(&path, scope, depth, timeout, owner.or(principal)) {
            Ok(lock) => lock,
            Err(_) => return Err(DavError::Status(StatusCode::LOCKED)),
        };
        // lockdiscovery reports every lock covering the resource (spec.md
        // §4.3), not just the one this request just created — relevant
        // once more than one shared lock applies to the same path.
        let locks = ls.discover(&path);
        let mut res = lockdiscovery_response(&locks, StatusCode::OK);
        res.headers_mut().insert(
            "lock-token",
            format!("<opaquelocktoken:{}>", new_lock.token).parse().unwrap(),
        );
        Ok(res)
    }
}

fn parse_timeout(header: Option<&str>) -> Duration {
    header
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().strip_prefix("Second-"))
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

fn parse_lockinfo(body: &[u8]) -> DavResult<(LockScope, Option<String>)> {
    let root = Element::parse(body).map_err(|_| DavError::XmlParseError)?;
    let lockscope = root
        .get_child("lockscope")
        .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;
    let scope = if lockscope.get_child("exclusive").is_some() {
        LockScope::Exclusive
    } else if lockscope.get_child("shared").is_some() {
        LockScope::Shared
    } else {
        return Err(DavError::Status(StatusCode::BAD_REQUEST));
    };
    root.get_child("locktype")
        .and_then(|lt| lt.get_child("write"))
        .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;
    let owner = root
        .get_child("owner")
        .and_then(|o| o.get_text())
        .map(|s| s.to_string());
    Ok((scope, owner))
}

/// Renders `<D:prop><D:lockdiscovery>` with one `<D:activelock>` per lock
/// `discover()` reports covering the resource (spec.md §4.3): there can be
/// more than one when several shared locks apply to the same path.
fn lockdiscovery_response(locks: &[DavLock], status: StatusCode) -> Response<Body> {
    let mut lockdiscovery = Element::new("D:lockdiscovery");
    for lock in locks {
        lockdiscovery
            .children
            .push(XMLNode::Element(activelock_element(lock)));
    }

    let mut prop = Element::new("D:prop");
    prop.children.push(XMLNode::Element(lockdiscovery));
    prop.attributes.insert("xmlns:D".to_string(), NS_DAV.to_string());

    let mut out = Vec::new();
    let _ = prop.write(&mut out);

    let mut res = Response::new(Body::from(out));
    *res.status_mut() = status;
    res.headers_mut()
        .insert("content-type", "text/xml; charset=utf-8".parse().unwrap());
    res
}

fn activelock_element(lock: &DavLock) -> Element {
    let mut activelock = Element::new("D:activelock");

    let mut locktype = Element::new("D:locktype");
    locktype.children.push(XMLNode::Element(Element::new("D:write")));
    activelock.children.push(XMLNode::Element(locktype));

    let mut scope = Element::new("D:lockscope");
    scope.children.push(XMLNode::Element(Element::new(match lock.scope {
        LockScope::Exclusive => "D:exclusive",
        LockScope::Shared => "D:shared",
    })));
    activelock.children.push(XMLNode::Element(scope));

    let mut depth = Element::new("D:depth");
    depth.children.push(XMLNode::Text(
        match lock.depth {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
        .to_string(),
    ));
    activelock.children.push(XMLNode::Element(depth));

    if let Some(owner) = &lock.owner {
        let mut owner_el = Element::new("D:owner");
        owner_el.children.push(XMLNode::Text(owner.clone()));
        activelock.children.push(XMLNode::Element(owner_el));
    }

    let mut timeout = Element::new("D:timeout");
    timeout
        .children
        .push(XMLNode::Text(format!("Second-{}", lock.timeout_seconds)));
    activelock.children.push(XMLNode::Element(timeout));

    let mut locktoken = Element::new("D:locktoken");
    let mut href = Element::new("D:href");
    href.children
        .push(XMLNode::Text(format!("opaquelocktoken:{}", lock.token)));
    locktoken.children.push(XMLNode::Element(href));
    activelock.children.push(XMLNode::Element(locktoken));

    activelock
}
