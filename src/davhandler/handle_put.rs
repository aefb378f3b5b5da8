//! `PUT` (spec.md §4.6): parent must exist, target must not be a
//! collection, creates return `201`, overwrites return `204`.

use std::error::Error as StdError;

use bytes::buf::Buf;
use futures_util::stream;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::conditional::{self, Condition};
use crate::{DavError, DavResult};

impl crate::DavHandler {
    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let path = self.path(req);
        let meta = self.fs.metadata(&path).await.ok();
        let exists = meta.is_some();

        if path.is_collection() {
            let allow = self
                .allowed_methods(exists, meta.as_ref().map(|m| m.is_object()).unwrap_or(false))
                .await;
            let mut res = Response::new(Body::empty());
            *res.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            res.headers_mut().insert("allow", allow.parse().unwrap());
            return Ok(res);
        }

        if !exists && !self.has_parent(&path).await {
            return Err(DavError::Status(StatusCode::CONFLICT));
        }

        match conditional::evaluate(req.method(), req.headers(), meta.as_deref()) {
            Condition::PreconditionFailed => {
                return Err(DavError::Status(StatusCode::PRECONDITION_FAILED))
            }
            Condition::NotModified | Condition::Proceed => {}
        }

        let tokens = self.presented_tokens(req);
        self.check_locked(&path, &tokens)?;

        let principal = self.principal.as_deref().map(|s| s.as_str());
        let acl = self.acl.get_access(principal, &path);
        if (exists && !acl.write) || (!exists && !acl.create) {
            return Err(DavError::Status(StatusCode::FORBIDDEN));
        }

        let writable = self
            .fs
            .as_writable()
            .ok_or(DavError::Status(StatusCode::FORBIDDEN))?;

        let range_start = content_range_start(req);

        let stream = Box::pin(body.map_frame_data());
        let created = writable.write(&path, stream, range_start).await?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = if created {
            StatusCode::CREATED
        } else {
            StatusCode::NO_CONTENT
        };
        Ok(res)
    }
}

/// `Content-Range: bytes START-END/TOTAL`, Apache's `mod_dav`-style
/// partial-PUT hint (spec.md §4.6 "range_start hint for resumable
/// uploads"). Full Range-header semantics are not required.
fn content_range_start(req: &Request<()>) -> Option<u64> {
    let v = req.headers().get(http::header::CONTENT_RANGE)?.to_str().ok()?;
    let rest = v.strip_prefix("bytes ")?;
    let start = rest.split(&['-', '/'][..]).next()?;
    start.parse().ok()
}

trait MapFrameData<D, E> {
    fn map_frame_data(
        self,
    ) -> stream::BoxStream<'static, std::io::Result<bytes::Bytes>>;
}

impl<B, D, E> MapFrameData<D, E> for B
where
    B: HttpBody<Data = D, Error = E> + Send + 'static,
    D: Buf + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    fn map_frame_data(self) -> stream::BoxStream<'static, std::io::Result<bytes::Bytes>> {
        Box::pin(futures_util::stream::unfold(Box::pin(self), |mut body| async move {
            loop {
                let chunk = futures_util::future::poll_fn(|cx| body.as_mut().poll_data(cx)).await;
                match chunk {
                    Some(Ok(mut buf)) => {
                        let bytes = buf.copy_to_bytes(buf.remaining());
                        return Some((Ok(bytes), body));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
                            body,
                        ))
                    }
                    None => return None,
                }
            }
        }))
    }
}
