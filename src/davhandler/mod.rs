//! The main entry point of the library: [`DavHandler`].

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use bytes::buf::Buf;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::acl::{AclProvider, ReadOnlyAcl};
use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::DavError;
use crate::fs::DavFileSystem;
use crate::ls::memls::MemLs;
use crate::ls::DavLockSystem;
use crate::util::{dav_method, DavMethod, DavMethodSet};
use crate::DavResult;

pub mod handle_copymove;
pub mod handle_delete;
pub mod handle_gethead;
pub mod handle_lock;
pub mod handle_mkcol;
pub mod handle_options;
pub mod handle_propfind;
pub mod handle_proppatch;
pub mod handle_props;
pub mod handle_put;
pub mod handle_unlock;

/// A handle to the storage a `DavHandler` serves. Either of the two
/// backends this crate ships, or a custom one via [`Backend::Custom`].
#[derive(Clone)]
pub enum Backend {
    #[cfg(feature = "memfs")]
    Mem,
    #[cfg(feature = "localfs")]
    Local { base: std::path::PathBuf, public: bool },
    Custom(Arc<dyn DavFileSystem>),
}

impl Backend {
    fn build(self) -> Arc<dyn DavFileSystem> {
        match self {
            #[cfg(feature = "memfs")]
            Backend::Mem => crate::fs::memfs::MemFs::new(),
            #[cfg(feature = "localfs")]
            Backend::Local { base, public } => crate::fs::localfs::LocalFs::new(base, public),
            Backend::Custom(fs) => fs,
        }
    }
}

/// Configuration of the handler (spec.md §9: "constructor-time
/// configuration record", not process-wide state).
pub struct DavBuilder {
    prefix: String,
    fs: Backend,
    ls: Option<Arc<dyn DavLockSystem>>,
    acl: Arc<dyn AclProvider>,
    allow: DavMethodSet,
    principal: Option<String>,
}

impl DavBuilder {
    pub fn new(fs: Backend) -> DavBuilder {
        DavBuilder {
            prefix: String::new(),
            fs,
            ls: None,
            acl: Arc::new(ReadOnlyAcl),
            allow: DavMethodSet::all(),
            principal: None,
        }
    }

    /// Prefix to strip off the request path before resolving it against
    /// the backend.
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use a lock manager. Without one, `LOCK`/`UNLOCK` always `501`.
    pub fn locksystem(mut self, ls: Arc<dyn DavLockSystem>) -> Self {
        self.ls = Some(ls);
        self
    }

    /// Convenience over [`DavBuilder::locksystem`] for the shipped
    /// in-memory lock manager.
    pub fn memory_locksystem(self) -> Self {
        self.locksystem(MemLs::new())
    }

    /// ACL provider. Defaults to [`ReadOnlyAcl`] (spec.md §3 default
    /// stance).
    pub fn acl(mut self, acl: Arc<dyn AclProvider>) -> Self {
        self.acl = acl;
        self
    }

    /// Which methods to accept (default: all).
    pub fn methods(mut self, allow: DavMethodSet) -> Self {
        self.allow = allow;
        self
    }

    /// The webdav "principal" (owner attached to locks this handler
    /// creates).
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn build(self) -> DavHandler {
        DavHandler {
            prefix: Arc::new(self.prefix),
            fs: self.fs.build(),
            ls: self.ls,
            acl: self.acl,
            allow: self.allow,
            principal: self.principal.map(Arc::new),
        }
    }
}

/// The WebDAV request handler. Cloning is cheap (everything behind
/// `Arc`); a single instance is meant to be shared across every request a
/// server receives.
#[derive(Clone)]
pub struct DavHandler {
    pub(crate) prefix: Arc<String>,
    pub(crate) fs: Arc<dyn DavFileSystem>,
    pub(crate) ls: Option<Arc<dyn DavLockSystem>>,
    pub(crate) acl: Arc<dyn AclProvider>,
    pub(crate) allow: DavMethodSet,
    pub(crate) principal: Option<Arc<String>>,
}

impl DavHandler {
    pub fn builder(fs: Backend) -> DavBuilder {
        DavBuilder::new(fs)
    }

    /// Handle a request, producing a response. Never panics on a
    /// malformed request; every error path is caught and turned into an
    /// HTTP status response (spec.md §7).
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
    {
        self.handle_inner(req).await
    }

    /// Like [`DavHandler::handle`], but overriding the prefix/principal
    /// for just this request (e.g. a per-request authenticated user).
    pub async fn handle_with<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
        prefix: Option<String>,
        principal: Option<String>,
    ) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
    {
        let mut this = self.clone();
        if let Some(prefix) = prefix {
            this.prefix = Arc::new(prefix);
        }
        if let Some(principal) = principal {
            this.principal = Some(Arc::new(principal));
        }
        this.handle_inner(req).await
    }
}

impl DavHandler {
    pub(crate) fn path(&self, req: &Request<()>) -> DavPath {
        // Checked valid already in handle2, so this never fails.
        DavPath::from_uri_and_prefix(req.uri(), &self.prefix).unwrap()
    }

    pub(crate) async fn has_parent(&self, path: &DavPath) -> bool {
        self.fs
            .metadata(&path.parent())
            .await
            .map(|m| m.is_collection())
            .unwrap_or(false)
    }

    /// Every lock token the client presented, via `If` or `Lock-Token`.
    pub(crate) fn presented_tokens(&self, req: &Request<()>) -> Vec<String> {
        let mut tokens = crate::util::extract_state_tokens(
            req.headers().get("if").and_then(|v| v.to_str().ok()),
        );
        tokens.extend(crate::util::extract_state_tokens(
            req.headers()
                .get("lock-token")
                .and_then(|v| v.to_str().ok()),
        ));
        tokens
    }

    pub(crate) fn check_locked(&self, path: &DavPath, tokens: &[String]) -> DavResult<()> {
        if let Some(ls) = &self.ls {
            let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
            if ls.check(path, &refs).is_err() {
                return Err(DavError::Status(StatusCode::LOCKED));
            }
        }
        Ok(())
    }

    // Drains the request body into memory. WebDAV bodies (lockinfo,
    // propfind, proppatch) are always small XML documents; only PUT
    // streams.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        pin_utils::pin_mut!(body);
        while let Some(res) = body.data().await {
            let mut buf = res.map_err(|_| {
                DavError::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "UnexpectedEof"))
            })?;
            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // Outer dispatch boundary: the only place a `DavError` becomes an
    // HTTP response (spec.md §7 propagation policy).
    async fn handle_inner<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut resp = match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result OK");
                resp
            }
            Err(err) => {
                debug!("== END REQUEST result {:?}", err);
                let mut builder = Response::builder()
                    .header("content-length", "0")
                    .status(err.statuscode());
                if err.must_close() {
                    builder = builder.header("connection", "close");
                }
                builder.body(Body::empty()).unwrap()
            }
        };
        let headers = resp.headers_mut();
        if !headers.contains_key(http::header::DATE) {
            headers.typed_insert(headers::Date::from(std::time::SystemTime::now()));
        }
        if !headers.contains_key("server") {
            headers.insert("server", "davcore".parse().unwrap());
        }
        resp
    }

    // Common preamble plus per-method dispatch (spec.md §4.6).
    async fn handle2<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        let method = match dav_method(req.method()) {
            Some(m) => m,
            None => {
                debug!("refusing unknown method {} on {}", req.method(), req.uri());
                return Err(DavError::UnknownDavMethod);
            }
        };

        if !self.allow.contains(method.as_set()) {
            debug!("method {:?} not allowed on {}", method, req.uri());
            return Err(DavError::StatusClose(StatusCode::METHOD_NOT_ALLOWED));
        }

        let path = DavPath::from_uri_and_prefix(req.uri(), &self.prefix)?;

        let (body_stream, body_data) = match method {
            DavMethod::Put => (Some(body), Vec::new()),
            _ => (None, self.read_request(body, 65536).await?),
        };

        match method {
            DavMethod::Put | DavMethod::PropFind | DavMethod::PropPatch | DavMethod::Lock => {}
            _ => {
                if !body_data.is_empty() {
                    return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE.into());
                }
            }
        }

        debug!("== START REQUEST {:?} {:?}", method, path);

        match method {
            DavMethod::Options => self.handle_options(&req).await,
            DavMethod::PropFind => self.handle_propfind(&req, &body_data).await,
            DavMethod::PropPatch => self.handle_proppatch(&req, &body_data).await,
            DavMethod::MkCol => self.handle_mkcol(&req).await,
            DavMethod::Delete => self.handle_delete(&req).await,
            DavMethod::Lock => self.handle_lock(&req, &body_data).await,
            DavMethod::Unlock => self.handle_unlock(&req).await,
            DavMethod::Head | DavMethod::Get => self.handle_gethead(&req, method).await,
            DavMethod::Copy | DavMethod::Move => self.handle_copymove(&req, method).await,
            DavMethod::Put => self.handle_put(&req, body_stream.unwrap()).await,
        }
    }
}
