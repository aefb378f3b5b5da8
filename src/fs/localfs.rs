//! Local filesystem backend.
//!
//! Adapted from the teacher's `fs::localfs::LocalFs`: stateless, built
//! fresh per mount, wraps `tokio::fs` calls. Trimmed of the teacher's
//! case-insensitive lookup and macOS directory-size cache — those are
//! platform-compatibility concerns the spec doesn't ask for (see
//! DESIGN.md) — but keeps the same "rename across device types" fallback
//! and unix mode-bit handling.

use std::io;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::davpath::DavPath;
use crate::fs::{
    DavFileSystem, DavMetaData, DirEntry, FsError, FsFuture, FsResult, FsStream, Writable,
};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug)]
struct LocalMeta(std::fs::Metadata);

impl DavMetaData for LocalMeta {
    fn is_collection(&self) -> bool {
        self.0.is_dir()
    }
    fn len(&self) -> u64 {
        self.0.len()
    }
    fn modified(&self) -> FsResult<SystemTime> {
        Ok(self.0.modified()?)
    }
    fn created(&self) -> FsResult<SystemTime> {
        Ok(self.0.created().unwrap_or(SystemTime::UNIX_EPOCH))
    }
    // same construction as Apache's default etag: inode-size-mtime.
    fn etag(&self) -> String {
        #[cfg(unix)]
        {
            let t = self
                .0
                .modified()
                .ok()
                .and_then(|m| m.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() * 1_000_000 + d.subsec_micros() as u64)
                .unwrap_or(0);
            format!("{:x}-{:x}-{:x}", self.0.ino(), self.0.len(), t)
        }
        #[cfg(not(unix))]
        {
            let t = self
                .0
                .modified()
                .ok()
                .and_then(|m| m.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!("{:x}-{:x}", self.0.len(), t)
        }
    }
}

/// Serves a directory on the local filesystem. Stateless: create one per
/// mount and share it via `Arc`.
pub struct LocalFs {
    basedir: PathBuf,
    public: bool,
}

impl LocalFs {
    /// `public` controls the mode bits of newly created files/directories
    /// on unix (0644/0755 if true, 0600/0700 otherwise). Ignored elsewhere.
    pub fn new(base: impl Into<PathBuf>, public: bool) -> Arc<LocalFs> {
        Arc::new(LocalFs {
            basedir: base.into(),
            public,
        })
    }

    fn abs_path(&self, path: &DavPath) -> PathBuf {
        let mut p = self.basedir.clone();
        p.push(path.as_rel_ospath());
        p
    }
}

impl DavFileSystem for LocalFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        async move {
            let meta = tokio::fs::metadata(self.abs_path(path)).await?;
            Ok(Box::new(LocalMeta(meta)) as Box<dyn DavMetaData>)
        }
        .boxed()
    }

    fn children<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<FsResult<DirEntry>>> {
        async move {
            trace!("localfs: read_dir {path:?}");
            let abs = self.abs_path(path);
            let meta = tokio::fs::metadata(&abs).await?;
            if !meta.is_dir() {
                return Err(FsError::NotACollection);
            }
            let mut rd = tokio::fs::read_dir(&abs).await?;
            let mut entries = Vec::new();
            loop {
                match rd.next_entry().await {
                    Ok(Some(e)) => {
                        let name = e.file_name().to_string_lossy().into_owned();
                        let meta = std::fs::metadata(e.path()).map(LocalMeta);
                        entries.push(match meta {
                            Ok(m) => Ok(DirEntry {
                                name,
                                meta: Box::new(m) as Box<dyn DavMetaData>,
                            }),
                            Err(e) => Err(FsError::from(e)),
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        entries.push(Err(FsError::from(e)));
                        break;
                    }
                }
            }
            Ok(Box::pin(stream::iter(entries)) as FsStream<FsResult<DirEntry>>)
        }
        .boxed()
    }

    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<io::Result<Bytes>>> {
        async move {
            trace!("localfs: read {path:?}");
            let meta = tokio::fs::metadata(self.abs_path(path)).await?;
            if !meta.is_file() {
                return Err(FsError::NotAnObject);
            }
            let file = tokio::fs::File::open(self.abs_path(path)).await?;
            let s = stream::unfold(file, |mut file| async move {
                let mut buf = BytesMut::with_capacity(READ_CHUNK);
                match file.read_buf(&mut buf).await {
                    Ok(0) => None,
                    Ok(_) => Some((Ok(buf.freeze()), file)),
                    Err(e) => Some((Err(e), file)),
                }
            });
            Ok(Box::pin(s) as FsStream<io::Result<Bytes>>)
        }
        .boxed()
    }

    fn as_writable(&self) -> Option<&dyn Writable> {
        Some(self)
    }
}

impl Writable for LocalFs {
    fn write<'a>(
        &'a self,
        path: &'a DavPath,
        mut data: BoxStream<'static, io::Result<Bytes>>,
        range_start: Option<u64>,
    ) -> FsFuture<'a, bool> {
        async move {
            trace!("localfs: write {path:?} range_start={range_start:?}");
            let abs = self.abs_path(path);
            let created = tokio::fs::metadata(&abs).await.is_err();

            let mut opts = tokio::fs::OpenOptions::new();
            opts.write(true).create(true);
            if range_start.is_none() {
                opts.truncate(true);
            }
            #[cfg(unix)]
            opts.mode(if self.public { 0o644 } else { 0o600 });
            let mut file = opts.open(&abs).await?;
            if let Some(start) = range_start {
                file.seek(io::SeekFrom::Start(start)).await?;
            }
            while let Some(chunk) = data.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok(created)
        }
        .boxed()
    }

    fn create_collection<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("localfs: create_dir {path:?}");
            let abs = self.abs_path(path);
            #[cfg(unix)]
            {
                tokio::fs::DirBuilder::new()
                    .mode(if self.public { 0o755 } else { 0o700 })
                    .create(abs)
                    .await?;
            }
            #[cfg(not(unix))]
            {
                tokio::fs::DirBuilder::new().create(abs).await?;
            }
            Ok(())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("localfs: delete {path:?}");
            let abs = self.abs_path(path);
            let meta = tokio::fs::metadata(&abs).await?;
            if meta.is_dir() {
                tokio::fs::remove_dir_all(abs).await?;
            } else {
                tokio::fs::remove_file(abs).await?;
            }
            Ok(())
        }
        .boxed()
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("localfs: copy {from:?} -> {to:?}");
            copy_recursive(self.abs_path(from), self.abs_path(to)).await
        }
        .boxed()
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            trace!("localfs: rename {from:?} -> {to:?}");
            let p_from = self.abs_path(from);
            let p_to = self.abs_path(to);
            match tokio::fs::rename(&p_from, &p_to).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    // webdav allows renaming a directory onto an existing
                    // file; std::fs::rename refuses that on some platforms.
                    #[cfg(unix)]
                    let retry = e.raw_os_error() == Some(libc::ENOTDIR) && p_from.is_dir();
                    #[cfg(not(unix))]
                    let retry = false;
                    if retry {
                        let _ = tokio::fs::remove_file(&p_to).await;
                        tokio::fs::rename(p_from, p_to).await?;
                        Ok(())
                    } else {
                        Err(e.into())
                    }
                }
            }
        }
        .boxed()
    }
}

fn copy_recursive(from: PathBuf, to: PathBuf) -> FsFuture<'static, ()> {
    Box::pin(async move {
        let meta = tokio::fs::metadata(&from).await?;
        if meta.is_dir() {
            tokio::fs::create_dir_all(&to).await?;
            let mut rd = tokio::fs::read_dir(&from).await?;
            while let Some(entry) = rd.next_entry().await? {
                let name = entry.file_name();
                copy_recursive(from.join(&name), to.join(&name)).await?;
            }
        } else {
            tokio::fs::copy(&from, &to).await?;
        }
        Ok(())
    })
}
