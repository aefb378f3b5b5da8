//! Ephemeral in-memory backend. Exists mainly to exercise the dispatcher
//! and lock manager in tests without touching disk, but is a perfectly
//! usable `Writable` backend on its own (e.g. for scratch/testing mounts).

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use futures_util::FutureExt;

use crate::davpath::DavPath;
use crate::fs::{DavFileSystem, DavMetaData, DirEntry, FsError, FsFuture, FsResult, FsStream, Writable};

#[derive(Debug, Clone)]
struct Node {
    created: SystemTime,
    modified: SystemTime,
    data: Option<Vec<u8>>, // None => collection
}

impl DavMetaData for Node {
    fn is_collection(&self) -> bool {
        self.data.is_none()
    }
    fn len(&self) -> u64 {
        self.data.as_ref().map(|d| d.len() as u64).unwrap_or(0)
    }
    fn modified(&self) -> FsResult<SystemTime> {
        Ok(self.modified)
    }
    fn created(&self) -> FsResult<SystemTime> {
        Ok(self.created)
    }
    fn etag(&self) -> String {
        let secs = self
            .modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        format!("{:x}-{:x}", secs, self.len())
    }
}

/// In-memory filesystem. Cheap to clone (it's an `Arc` around a mutex'd
/// tree), so it's fine to hand one `Arc<MemFs>` to every request.
pub struct MemFs {
    nodes: Mutex<BTreeMap<Vec<String>, Node>>,
}

impl MemFs {
    pub fn new() -> Arc<MemFs> {
        let now = SystemTime::now();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            Vec::new(),
            Node {
                created: now,
                modified: now,
                data: None,
            },
        );
        Arc::new(MemFs {
            nodes: Mutex::new(nodes),
        })
    }

    fn key(path: &DavPath) -> Vec<String> {
        path.segments().to_vec()
    }
}

impl DavFileSystem for MemFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        async move {
            let nodes = self.nodes.lock().unwrap();
            match nodes.get(&Self::key(path)) {
                Some(n) => Ok(Box::new(n.clone()) as Box<dyn DavMetaData>),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn children<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<FsResult<DirEntry>>> {
        async move {
            let key = Self::key(path);
            let nodes = self.nodes.lock().unwrap();
            match nodes.get(&key) {
                Some(n) if n.is_collection() => {}
                Some(_) => return Err(FsError::NotACollection),
                None => return Err(FsError::NotFound),
            }
            let depth = key.len() + 1;
            let entries: Vec<FsResult<DirEntry>> = nodes
                .iter()
                .filter(|(k, _)| k.len() == depth && k[..key.len()] == key[..])
                .map(|(k, n)| {
                    Ok(DirEntry {
                        name: k[depth - 1].clone(),
                        meta: Box::new(n.clone()) as Box<dyn DavMetaData>,
                    })
                })
                .collect();
            Ok(Box::pin(stream::iter(entries)) as FsStream<FsResult<DirEntry>>)
        }
        .boxed()
    }

    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<io::Result<Bytes>>> {
        async move {
            let nodes = self.nodes.lock().unwrap();
            match nodes.get(&Self::key(path)) {
                Some(Node { data: Some(d), .. }) => {
                    let chunk: io::Result<Bytes> = Ok(Bytes::from(d.clone()));
                    Ok(Box::pin(stream::iter(vec![chunk])) as FsStream<io::Result<Bytes>>)
                }
                Some(_) => Err(FsError::NotAnObject),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn as_writable(&self) -> Option<&dyn Writable> {
        Some(self)
    }
}

impl Writable for MemFs {
    fn write<'a>(
        &'a self,
        path: &'a DavPath,
        mut data: BoxStream<'static, io::Result<Bytes>>,
        range_start: Option<u64>,
    ) -> FsFuture<'a, bool> {
        async move {
            let mut buf = Vec::new();
            while let Some(chunk) = data.next().await {
                buf.extend_from_slice(&chunk?);
            }
            let mut nodes = self.nodes.lock().unwrap();
            let key = Self::key(path);
            let now = SystemTime::now();
            let created = nodes
                .get(&key)
                .map(|n| n.created)
                .unwrap_or(now);
            let existing = nodes.get(&key).and_then(|n| n.data.clone());
            let new_data = match (existing, range_start) {
                (Some(mut existing), Some(start)) => {
                    let start = start as usize;
                    let end = start + buf.len();
                    if existing.len() < end {
                        existing.resize(end, 0);
                    }
                    existing[start..end].copy_from_slice(&buf);
                    existing
                }
                _ => buf,
            };
            let created_new = !nodes.contains_key(&key);
            nodes.insert(
                key,
                Node {
                    created,
                    modified: now,
                    data: Some(new_data),
                },
            );
            Ok(created_new)
        }
        .boxed()
    }

    fn create_collection<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            let mut nodes = self.nodes.lock().unwrap();
            let key = Self::key(path);
            if nodes.contains_key(&key) {
                return Err(FsError::Exists);
            }
            let parent = &key[..key.len().saturating_sub(1)];
            match nodes.get(parent) {
                Some(n) if n.is_collection() => {}
                _ => return Err(FsError::Conflict),
            }
            let now = SystemTime::now();
            nodes.insert(
                key,
                Node {
                    created: now,
                    modified: now,
                    data: None,
                },
            );
            Ok(())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            let mut nodes = self.nodes.lock().unwrap();
            let key = Self::key(path);
            if !nodes.contains_key(&key) {
                return Err(FsError::NotFound);
            }
            nodes.retain(|k, _| !(k.len() >= key.len() && k[..key.len()] == key[..]));
            Ok(())
        }
        .boxed()
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            let mut nodes = self.nodes.lock().unwrap();
            let from_key = Self::key(from);
            let to_key = Self::key(to);
            let to_parent = &to_key[..to_key.len().saturating_sub(1)];
            match nodes.get(to_parent) {
                Some(n) if n.is_collection() => {}
                _ => return Err(FsError::Conflict),
            }
            let subtree: Vec<(Vec<String>, Node)> = nodes
                .iter()
                .filter(|(k, _)| k.len() >= from_key.len() && k[..from_key.len()] == from_key[..])
                .map(|(k, n)| (k.clone(), n.clone()))
                .collect();
            if subtree.is_empty() {
                return Err(FsError::NotFound);
            }
            for (k, n) in subtree {
                let mut new_key = to_key.clone();
                new_key.extend_from_slice(&k[from_key.len()..]);
                nodes.insert(new_key, n);
            }
            Ok(())
        }
        .boxed()
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        async move {
            self.copy(from, to).await?;
            self.delete(from).await
        }
        .boxed()
    }
}
