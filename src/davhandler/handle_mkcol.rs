//! `MKCOL` (spec.md §4.6).

use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional::{self, Condition};
use crate::fs::FsError;
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_mkcol(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let mut path = self.path(req);
        let meta = self.fs.metadata(&path).await.ok();

        match conditional::evaluate(req.method(), req.headers(), meta.as_deref()) {
            Condition::PreconditionFailed => return Err(DavError::Status(StatusCode::PRECONDITION_FAILED)),
            Condition::NotModified | Condition::Proceed => {}
        }

        let tokens = self.presented_tokens(req);
        self.check_locked(&path, &tokens)?;

        let acl = self.acl.get_access(self.principal.as_deref().map(|s| s.as_str()), &path);
        if !acl.create {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let writable = self.fs.as_writable().ok_or(DavError::Status(StatusCode::FORBIDDEN))?;

        match writable.create_collection(&path).await {
            // RFC 4918 9.3.1 MKCOL Status Codes.
            Err(FsError::Exists) => {
                let allow = self.allowed_methods(true, false).await;
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
                res.headers_mut().insert("allow", allow.parse().unwrap());
                Ok(res)
            }
            Err(FsError::Conflict) => Err(DavError::Status(StatusCode::CONFLICT)),
            Err(e) => Err(DavError::FsError(e)),
            Ok(()) => {
                let mut res = Response::new(Body::empty());
                path.add_slash();
                res.headers_mut()
                    .typed_insert(headers::ContentLength(0));
                res.headers_mut().insert(
                    "content-location",
                    path.with_prefix().as_url_string().parse().unwrap(),
                );
                *res.status_mut() = StatusCode::CREATED;
                Ok(res)
            }
        }
    }
}
