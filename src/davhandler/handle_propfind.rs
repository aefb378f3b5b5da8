//! `PROPFIND` (spec.md §4.6).

use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::handle_props::{
    all_prop_names, build_propfind_multistatus, parse_propfind_body, render_prop, PropResponse,
    PropfindMode,
};
use crate::fs::{descendants, Depth};
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        let path = self.path(req);
        self.fs.metadata(&path).await?; // 404 if missing, per spec.md §4.6.

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let acl = self.acl.get_access(principal, &path);
        if !acl.read || !acl.list {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let depth = Depth::parse(
            req.headers().get("depth").and_then(|v| v.to_str().ok()),
            Depth::Infinity,
        )
        .ok_or(DavError::Status(StatusCode::BAD_REQUEST))?;

        let mode = parse_propfind_body(body)?;

        let entries = descendants(&*self.fs, &path, depth, true).await?;

        let mut responses = Vec::with_capacity(entries.len());
        for entry in entries {
            let href = entry.path.with_prefix().as_url_string();
            let props = match &mode {
                PropfindMode::AllProp => all_prop_names()
                    .iter()
                    .filter_map(|n| render_prop(n, &entry.path, &*entry.meta, &*self.fs, false))
                    .collect(),
                PropfindMode::PropName => all_prop_names()
                    .iter()
                    .filter_map(|n| render_prop(n, &entry.path, &*entry.meta, &*self.fs, true))
                    .collect(),
                PropfindMode::Named(names) => names
                    .iter()
                    .filter_map(|n| render_prop(n, &entry.path, &*entry.meta, &*self.fs, false))
                    .collect(),
            };
            responses.push(PropResponse { href, props });
        }

        let body = build_propfind_multistatus(responses)?;
        let mut res = Response::new(Body::from(body));
        *res.status_mut() = StatusCode::MULTI_STATUS;
        res.headers_mut()
            .insert("content-type", "text/xml; charset=utf-8".parse().unwrap());
        Ok(res)
    }
}
