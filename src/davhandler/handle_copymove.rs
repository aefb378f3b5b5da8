//! `COPY`/`MOVE`, unified as `relocate()` (spec.md §4.6).

use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::handle_props::build_status_multistatus;
use crate::davpath::DavPath;
use crate::fs::{Depth, FsError};
use crate::util::DavMethod;
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_copymove(
        &self,
        req: &Request<()>,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);
        self.fs.metadata(&path).await?;

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let src_acl = self.acl.get_access(principal, &path);
        if !src_acl.read || !src_acl.relocate {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }
        if method == DavMethod::Move && !src_acl.delete {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        if method == DavMethod::Copy {
            let depth = Depth::parse(req.headers().get("depth").and_then(|v| v.to_str().ok()), Depth::Infinity);
            if depth != Some(Depth::Infinity) {
                return Err(DavError::Status(StatusCode::BAD_REQUEST));
            }
        }

        let dest_header = req
            .headers()
            .get("destination")
            .and_then(|v| v.to_str().ok())
            .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;
        let dest_uri: http::Uri = dest_header
            .parse()
            .map_err(|_| DavError::Status(StatusCode::BAD_REQUEST))?;

        // spec.md §4.6: scheme+host must match the source request, else 502.
        // This crate does no TLS termination of its own (out of scope per
        // spec.md's non-goals), so the request's effective scheme is "http"
        // unless the incoming URI already carries one (e.g. a proxy that
        // forwards an absolute-form request line).
        if let Some(dest_scheme) = dest_uri.scheme_str() {
            let req_scheme = req.uri().scheme_str().unwrap_or("http");
            if !dest_scheme.eq_ignore_ascii_case(req_scheme) {
                return Err(DavError::Status(StatusCode::BAD_GATEWAY));
            }
        }
        if let Some(dest_host) = dest_uri.host() {
            let req_host = req
                .headers()
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .and_then(|h| h.split(':').next());
            if Some(dest_host) != req_host {
                return Err(DavError::Status(StatusCode::BAD_GATEWAY));
            }
        }

        let mut dest = DavPath::from_str_and_prefix(dest_uri.path(), self.prefix.as_str())?;
        if path.is_collection() {
            dest.add_slash();
        }

        let overwrite = match req.headers().get("overwrite").and_then(|v| v.to_str().ok()) {
            None | Some("T") => true,
            Some("F") => false,
            Some(_) => return Err(DavError::Status(StatusCode::BAD_REQUEST)),
        };

        if !self.has_parent(&dest).await {
            return Err(DavError::Status(StatusCode::CONFLICT));
        }

        let dest_acl = self.acl.get_access(principal, &dest);
        if !dest_acl.create {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let tokens = self.presented_tokens(req);
        self.check_locked(&path, &tokens)?;
        self.check_locked(&dest, &tokens)?;

        let writable = self
            .fs
            .as_writable()
            .ok_or(DavError::Status(StatusCode::FORBIDDEN))?;

        let dest_existed = self.fs.metadata(&dest).await.is_ok();
        if dest_existed {
            if !overwrite {
                return Err(DavError::Status(StatusCode::PRECONDITION_FAILED));
            }
            if let Some(ls) = &self.ls {
                ls.delete_locks(&path);
                ls.delete_locks(&dest);
            }
            writable.delete(&dest).await?;
        }

        let result = match method {
            DavMethod::Copy => writable.copy(&path, &dest).await,
            DavMethod::Move => writable.rename(&path, &dest).await,
            _ => unreachable!("relocate only handles COPY/MOVE"),
        };

        match result {
            Ok(()) => {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = if dest_existed {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::CREATED
                };
                Ok(res)
            }
            Err(e) => {
                // spec.md §9 Open Question: a real multi-status body, not
                // an empty-bodied 207.
                let href = path.with_prefix().as_url_string();
                let body = build_status_multistatus(vec![(href, status_for(&e))])?;
                let mut res = Response::new(Body::from(body));
                *res.status_mut() = StatusCode::MULTI_STATUS;
                res.headers_mut()
                    .insert("content-type", "text/xml; charset=utf-8".parse().unwrap());
                Ok(res)
            }
        }
    }
}

fn status_for(e: &FsError) -> StatusCode {
    e.statuscode()
}
