//! `PROPPATCH` (spec.md §4.6): recognized but unimplemented — no
//! persistent property store is mandated by the spec.

use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::fs::Depth;
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_proppatch(
        &self,
        req: &Request<()>,
        _body: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);
        self.fs.metadata(&path).await?;

        let depth = Depth::parse(req.headers().get("depth").and_then(|v| v.to_str().ok()), Depth::Zero)
            .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;
        if depth != Depth::Zero {
            return Err(DavError::Status(StatusCode::BAD_REQUEST));
        }

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let acl = self.acl.get_access(principal, &path);
        if !acl.write {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        Err(DavError::Status(StatusCode::NOT_IMPLEMENTED))
    }
}
