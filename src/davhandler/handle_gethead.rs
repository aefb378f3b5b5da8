//! `GET`/`HEAD` (spec.md §4.6): canonical-form redirects, conditional
//! evaluation, streaming object bodies, and a minimal collection listing.

use futures_util::StreamExt;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional::{self, Condition};
use crate::fs::DavMetaData;
use crate::util::DavMethod;
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_gethead(
        &self,
        req: &Request<()>,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let mut path = self.path(req);
        let meta = self.fs.metadata(&path).await?;

        // Canonical-form redirect (spec.md §4.6): objects lose a trailing
        // slash, collections gain one.
        if meta.is_collection() && !path.is_collection() {
            path.add_slash();
            return Ok(redirect(&path.with_prefix().as_url_string()));
        }
        if meta.is_object() && path.is_collection() {
            path.strip_slash();
            return Ok(redirect(&path.with_prefix().as_url_string()));
        }

        let acl = self
            .acl
            .get_access(self.principal.as_deref().map(|s| s.as_str()), &path);
        if !acl.read {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        match conditional::evaluate(req.method(), req.headers(), Some(&*meta)) {
            Condition::PreconditionFailed => {
                return Err(DavError::Status(StatusCode::PRECONDITION_FAILED))
            }
            Condition::NotModified => {
                let mut res = Response::new(Body::empty());
                *res.status_mut() = StatusCode::NOT_MODIFIED;
                set_meta_headers(&mut res, &*meta);
                return Ok(res);
            }
            Condition::Proceed => {}
        }

        if meta.is_collection() {
            return self.render_listing(&path, method).await;
        }

        let mut res = Response::new(Body::empty());
        set_meta_headers(&mut res, &*meta);
        res.headers_mut()
            .typed_insert(headers::ContentLength(meta.len()));
        res.headers_mut()
            .insert("content-type", self.fs.content_type(&path).parse().unwrap());

        if method == DavMethod::Get {
            let stream = self.fs.read(&path).await?;
            *res.body_mut() = Body::stream(stream);
        }
        Ok(res)
    }

    async fn render_listing(
        &self,
        path: &crate::davpath::DavPath,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());
        res.headers_mut()
            .insert("content-type", "text/html; charset=utf-8".parse().unwrap());
        if method != DavMethod::Get {
            return Ok(res);
        }
        let mut children = self.fs.children(path).await?;
        let mut rows = String::new();
        while let Some(entry) = children.next().await {
            let entry = entry?;
            let suffix = if entry.meta.is_collection() { "/" } else { "" };
            rows.push_str(&format!(
                "<li><a href=\"{name}{suffix}\">{name}{suffix}</a></li>\n",
                name = htmlescape::encode_minimal(&entry.name),
            ));
        }
        let body = format!(
            "<!DOCTYPE html><html><head><title>{title}</title></head>\
             <body><h1>{title}</h1><ul>\n{rows}</ul></body></html>",
            title = htmlescape::encode_minimal(&path.as_url_string()),
        );
        res.headers_mut()
            .typed_insert(headers::ContentLength(body.len() as u64));
        *res.body_mut() = Body::from(body);
        Ok(res)
    }
}

fn redirect(location: &str) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::MOVED_PERMANENTLY;
    res.headers_mut()
        .insert("location", location.parse().unwrap());
    res
}

fn set_meta_headers(res: &mut Response<Body>, meta: &dyn DavMetaData) {
    if let Ok(modified) = meta.modified() {
        res.headers_mut()
            .typed_insert(headers::LastModified::from(modified));
    }
    res.headers_mut().insert(
        "etag",
        format!("\"{}\"", meta.etag()).parse().unwrap(),
    );
}
