//! `DELETE` (spec.md §4.6): recursive for collections, cascades lock
//! release.

use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional::{self, Condition};
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_delete(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let path = self.path(req);
        let meta = self.fs.metadata(&path).await?;

        match conditional::evaluate(req.method(), req.headers(), Some(&*meta)) {
            Condition::PreconditionFailed => {
                return Err(DavError::Status(StatusCode::PRECONDITION_FAILED))
            }
            Condition::NotModified | Condition::Proceed => {}
        }

        let tokens = self.presented_tokens(req);
        self.check_locked(&path, &tokens)?;

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let acl = self.acl.get_access(principal, &path);
        if !acl.delete {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let writable = self
            .fs
            .as_writable()
            .ok_or(DavError::Status(StatusCode::FORBIDDEN))?;

        writable.delete(&path).await?;
        if let Some(ls) = &self.ls {
            ls.delete_locks(&path);
        }

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::NO_CONTENT;
        Ok(res)
    }
}
