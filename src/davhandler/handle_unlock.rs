//! `UNLOCK` (spec.md §4.6): `Lock-Token` header required, `204` on
//! match, `403` otherwise.

use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_unlock(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let path = self.path(req);
        let ls = self
            .ls
            .as_ref()
            .ok_or(DavError::Status(StatusCode::NOT_IMPLEMENTED))?;

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let acl = self.acl.get_access(principal, &path);
        if !acl.write {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let tokens = crate::util::extract_state_tokens(
            req.headers().get("lock-token").and_then(|v| v.to_str().ok()),
        );
        let token = tokens.first().ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;

        match ls.unlock(&path, token) {
            Ok(()) => {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::NO_CONTENT;
                Ok(res)
            }
            Err(_) => Err(DavError::Status(StatusCode::FORBIDDEN)),
        }
    }
}
