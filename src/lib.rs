//! ## A WebDAV server core (RFC 4918 class 1/2)
//!
//! [`WebDAV`][RFC4918] is defined as HTTP (GET/HEAD/PUT/DELETE) plus a bunch
//! of extension methods (PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK,
//! UNLOCK) for managing collections, reading/writing properties, and
//! cooperative locking.
//!
//! A `handler` is a piece of code that takes an `http::Request`, processes
//! it, and produces an `http::Response`. This crate is such a handler: it
//! maps the HTTP/WebDAV protocol onto a backend storage abstraction. Two
//! backends are included ([`fs::localfs::LocalFs`] and
//! [`fs::memfs::MemFs`]); anything else implementing [`fs::DavFileSystem`]
//! works too.
//!
//! The handler works with the standard `http`/`http_body` types, so it can
//! be used with any server built on them (`hyper`, for instance).
//!
//! ## What's implemented
//!
//! All class 1 and class 2 [RFC4918] methods: `OPTIONS`, `GET`, `HEAD`,
//! `PUT`, `DELETE`, `MKCOL`, `COPY`, `MOVE`, `PROPFIND`, `PROPPATCH`,
//! `LOCK`, `UNLOCK`. RFC7232 conditional requests (`If-Match`,
//! `If-None-Match`, `If-Modified-Since`, `If-Unmodified-Since`) and
//! `Content-Range`-based partial `PUT`. A capability-based ACL hook lets an
//! embedder gate access without reimplementing dispatch.
//!
//! `PROPPATCH` is recognized but always answers `501`: no backend in this
//! crate maintains arbitrary dead properties.
//!
//! ## Example
//!
//! ```no_run
//! use davcore::{Backend, DavHandler};
//! use std::convert::Infallible;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dir = "/tmp";
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!
//!     let dav_server = DavHandler::builder(Backend::Local { base: dir.into(), public: false })
//!         .memory_locksystem()
//!         .build();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav_server = dav_server.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav_server = dav_server.clone();
//!                 async move { Ok::<_, Infallible>(dav_server.handle(req).await) }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     println!("Serving {} on {:?}", dir, addr);
//!     let _ = hyper::Server::bind(&addr)
//!         .serve(make_service)
//!         .await
//!         .map_err(|e| eprintln!("server error: {}", e));
//! }
//! ```
//!
//! [RFC4918]: https://tools.ietf.org/html/rfc4918

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;

mod acl;
mod conditional;
mod davhandler;
mod errors;
mod util;
mod xmlname;

pub mod body;
pub mod davpath;
pub mod fs;
pub mod ls;

use crate::errors::{DavError, DavResult};

pub use crate::acl::{AclProvider, AllowAllAcl, DavAcl, ReadOnlyAcl};
pub use crate::davhandler::{Backend, DavBuilder, DavHandler};
pub use crate::fs::{DavFileSystem, DavMetaData, FsError, Writable};
pub use crate::ls::{memls::MemLs, DavLock, DavLockSystem, LockError, LockScope};
pub use crate::util::{DavMethod, DavMethodSet};
