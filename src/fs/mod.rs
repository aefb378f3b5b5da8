//! The resource abstraction: the contract a backend must satisfy,
//! independent of whether storage is a local filesystem, an in-memory
//! tree, or something else entirely.
//!
//! Grounded on the teacher's `DavFileSystem`/`DavMetaData` traits (as used
//! by `localfs.rs` and referenced throughout `davhandler/`), reshaped per
//! spec.md §4.2 and the capability split of §9: every backend can read and
//! list, but only some can mutate. A backend that can mutate additionally
//! implements [`Writable`] and exposes it through [`DavFileSystem::as_writable`].

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream};
use http::StatusCode;

use crate::davpath::DavPath;

pub mod localfs;
pub mod memfs;

/// Errors a backend can report. Mapped to an HTTP status by the dispatcher
/// (spec.md §7), never surfaced to a caller uncaught.
#[derive(Debug)]
pub enum FsError {
    NotFound,
    NotACollection,
    NotAnObject,
    Exists,
    Conflict,
    Forbidden,
    Io(io::Error),
}

pub type FsResult<T> = Result<T, FsError>;
pub type FsFuture<'a, T> = Pin<Box<dyn Future<Output = FsResult<T>> + Send + 'a>>;
pub type FsStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

impl FsError {
    pub fn statuscode(&self) -> StatusCode {
        match self {
            FsError::NotFound => StatusCode::NOT_FOUND,
            FsError::NotACollection | FsError::NotAnObject => StatusCode::METHOD_NOT_ALLOWED,
            FsError::Exists => StatusCode::METHOD_NOT_ALLOWED,
            FsError::Conflict => StatusCode::CONFLICT,
            FsError::Forbidden => StatusCode::FORBIDDEN,
            FsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "not found"),
            FsError::NotACollection => write!(f, "not a collection"),
            FsError::NotAnObject => write!(f, "not an object"),
            FsError::Exists => write!(f, "already exists"),
            FsError::Conflict => write!(f, "parent missing"),
            FsError::Forbidden => write!(f, "forbidden"),
            FsError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::AlreadyExists => FsError::Exists,
            io::ErrorKind::PermissionDenied => FsError::Forbidden,
            _ => FsError::Io(e),
        }
    }
}

/// The attributes of a materialized resource (spec.md §3).
pub trait DavMetaData: fmt::Debug + Send + Sync {
    fn is_collection(&self) -> bool;
    fn is_object(&self) -> bool {
        !self.is_collection()
    }
    /// `content_length`, only meaningful when `is_object()`.
    fn len(&self) -> u64;
    fn modified(&self) -> FsResult<SystemTime>;
    fn created(&self) -> FsResult<SystemTime>;
    /// An opaque, per-version identifier. Backends are free to derive it
    /// however they like, as long as it changes whenever the content does.
    fn etag(&self) -> String;
    /// Whether `resourcetype` should additionally report `<calendar/>`
    /// (CalDAV namespace). No shipped backend declares calendars.
    fn is_calendar(&self) -> bool {
        false
    }
}

/// A direct child entry yielded by [`DavFileSystem::children`]: a name plus
/// its metadata. Kept separate from `DavPath` so backends don't need to
/// know the request's prefix/segments to describe what they contain.
pub struct DirEntry {
    pub name: String,
    pub meta: Box<dyn DavMetaData>,
}

/// Every backend implements this: existence, kind, children, metadata,
/// and reading bytes. Mutating operations live on [`Writable`].
pub trait DavFileSystem: Send + Sync {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>>;

    /// Direct children of a collection, in unspecified order. Must fail
    /// with `NotACollection` if the path isn't one. The returned stream is
    /// finite and single-pass, never restarted by callers.
    fn children<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<FsResult<DirEntry>>>;

    /// Byte stream of an object's content. Fails with `NotAnObject` if the
    /// path is a collection.
    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<io::Result<Bytes>>>;

    /// A best-effort MIME type, used for `Content-Type`/`getcontenttype`.
    fn content_type(&self, path: &DavPath) -> String {
        mime_guess::from_path(path.display_name())
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// `None` unless this backend also implements [`Writable`].
    fn as_writable(&self) -> Option<&dyn Writable> {
        None
    }
}

/// Mutating half of the backend contract: `PUT`, `MKCOL`, `DELETE`,
/// `COPY`, `MOVE`. A backend that only serves read-only content (e.g. a
/// mirror of upstream data) simply never implements this.
pub trait Writable: DavFileSystem {
    /// Write `data` to `path`, starting at `range_start` (0 if absent).
    /// Returns `true` if the resource was created, `false` if it already
    /// existed and was overwritten.
    fn write<'a>(
        &'a self,
        path: &'a DavPath,
        data: BoxStream<'static, io::Result<Bytes>>,
        range_start: Option<u64>,
    ) -> FsFuture<'a, bool>;

    fn create_collection<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    /// Recursive delete of a collection, or removal of an object.
    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()>;

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()>;

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()>;
}

/// Depth of a `descendants` walk (spec.md glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn parse(s: Option<&str>, default: Depth) -> Option<Depth> {
        match s.map(str::to_ascii_lowercase).as_deref() {
            None => Some(default),
            Some("0") => Some(Depth::Zero),
            Some("1") => Some(Depth::One),
            Some("infinity") => Some(Depth::Infinity),
            _ => None,
        }
    }
}

/// `(relative segments from the walk root, metadata)` pair produced by
/// [`descendants`].
pub struct Descendant {
    pub path: DavPath,
    pub meta: Box<dyn DavMetaData>,
}

/// Walk a resource's subtree to the given depth, built generically on top
/// of [`DavFileSystem::children`] so backends only ever implement the
/// direct-children case (spec.md §9 "coroutine-like get_children").
/// `include_self` controls whether the root itself is the first entry.
pub fn descendants<'a>(
    fs: &'a dyn DavFileSystem,
    root: &'a DavPath,
    depth: Depth,
    include_self: bool,
) -> FsFuture<'a, Vec<Descendant>> {
    Box::pin(async move {
        let mut out = Vec::new();
        let root_meta = fs.metadata(root).await?;
        let root_is_collection = root_meta.is_collection();
        if include_self {
            out.push(Descendant {
                path: root.clone(),
                meta: root_meta,
            });
        }
        if depth == Depth::Zero || !root_is_collection {
            return Ok(out);
        }
        walk(fs, root, depth, &mut out).await?;
        Ok(out)
    })
}

fn walk<'a>(
    fs: &'a dyn DavFileSystem,
    dir: &'a DavPath,
    depth: Depth,
    out: &'a mut Vec<Descendant>,
) -> FsFuture<'a, ()> {
    Box::pin(async move {
        use futures_util::StreamExt;
        let mut children = fs.children(dir).await?;
        while let Some(entry) = children.next().await {
            let entry = entry?;
            let child_path = dir.child(&entry.name);
            let child_path = if entry.meta.is_collection() {
                let mut p = child_path;
                p.add_slash();
                p
            } else {
                child_path
            };
            let is_collection = entry.meta.is_collection();
            out.push(Descendant {
                path: child_path.clone(),
                meta: entry.meta,
            });
            if depth == Depth::Infinity && is_collection {
                walk(fs, &child_path, depth, out).await?;
            }
        }
        Ok(())
    })
}
