//! `OPTIONS` (spec.md §4.6): advertise `DAV: 1,2` and the allowed-methods
//! computation, also reused to build the `Allow` header on `405`
//! responses elsewhere in `davhandler/`.

use headers::HeaderMapExt;
use http::{Request, Response};

use crate::body::Body;
use crate::util::{dav_method, DavMethod};
use crate::DavResult;

impl crate::DavHandler {
    pub(crate) async fn handle_options(&self, req: &Request<()>) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());
        let h = res.headers_mut();
        h.insert("DAV", "1,2".parse().unwrap());
        h.typed_insert(headers::ContentLength(0));

        let path = self.path(req);
        let meta = self.fs.metadata(&path).await;
        let exists = meta.is_ok();
        let is_object = meta.map(|m| m.is_object()).unwrap_or(false);

        let mut v: Vec<&str> = vec!["OPTIONS"];
        if !exists {
            if self.has_parent(&path).await {
                v.push("PUT");
                v.push("MKCOL");
            }
        } else {
            v.push("HEAD");
            v.push("GET");
            v.push("DELETE");
            v.push("PROPFIND");
            v.push("PROPPATCH");
            v.push("COPY");
            v.push("MOVE");
            v.push("LOCK");
            v.push("UNLOCK");
            if is_object {
                v.push("PUT");
                h.typed_insert(headers::AcceptRanges::bytes());
            }
        }

        let allowed: Vec<&str> = v
            .into_iter()
            .filter(|name| {
                dav_method(&http::Method::from_bytes(name.as_bytes()).unwrap())
                    .map(|m| self.allow.contains(m.as_set()))
                    .unwrap_or(*name == "OPTIONS")
            })
            .collect();
        res.headers_mut()
            .insert("allow", allowed.join(",").parse().unwrap());

        Ok(res)
    }

    /// Builds the `Allow` header value for the current path, used by
    /// `405` responses that know the resource state already (spec.md
    /// §4.6 "Allowed-methods computation").
    pub(crate) async fn allowed_methods(&self, exists: bool, is_object: bool) -> String {
        let mut v: Vec<DavMethod> = vec![DavMethod::Options];
        if exists {
            v.extend([
                DavMethod::Head,
                DavMethod::Get,
                DavMethod::Delete,
                DavMethod::PropFind,
                DavMethod::PropPatch,
                DavMethod::Copy,
                DavMethod::Move,
                DavMethod::Lock,
                DavMethod::Unlock,
            ]);
            if is_object {
                v.push(DavMethod::Put);
            }
        }
        v.into_iter()
            .filter(|m| self.allow.contains(m.as_set()))
            .map(method_name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn method_name(m: DavMethod) -> &'static str {
    match m {
        DavMethod::Head => "HEAD",
        DavMethod::Get => "GET",
        DavMethod::Put => "PUT",
        DavMethod::Options => "OPTIONS",
        DavMethod::PropFind => "PROPFIND",
        DavMethod::PropPatch => "PROPPATCH",
        DavMethod::MkCol => "MKCOL",
        DavMethod::Copy => "COPY",
        DavMethod::Move => "MOVE",
        DavMethod::Delete => "DELETE",
        DavMethod::Lock => "LOCK",
        DavMethod::Unlock => "UNLOCK",
    }
}
