//! ACL capability interface (spec.md §3/§6). The core consumes this; it
//! ships no policy engine of its own, only the capability set and a
//! couple of trivial implementations, grounded on djangodav's
//! `BaseDavAcl.get_access`/`has_access` default-stance pattern.

use crate::davpath::DavPath;

/// A capability set for a (principal, resource) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DavAcl {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub create: bool,
    pub relocate: bool,
    pub list: bool,
    pub full: bool,
}

impl DavAcl {
    pub fn read_only() -> DavAcl {
        DavAcl {
            read: true,
            list: true,
            ..Default::default()
        }
    }

    pub fn all() -> DavAcl {
        DavAcl {
            read: true,
            write: true,
            delete: true,
            create: true,
            relocate: true,
            list: true,
            full: true,
        }
    }
}

/// Evaluated once per request by the dispatcher's common preamble
/// (spec.md §4.6), before any mutation is attempted.
pub trait AclProvider: Send + Sync {
    fn get_access(&self, principal: Option<&str>, path: &DavPath) -> DavAcl;
}

/// Default stance (spec.md §3: "Default stance: read-only").
pub struct ReadOnlyAcl;

impl AclProvider for ReadOnlyAcl {
    fn get_access(&self, _principal: Option<&str>, _path: &DavPath) -> DavAcl {
        DavAcl::read_only()
    }
}

/// Grants every capability to every principal; useful for tests and for
/// embedders that have already done authorization upstream.
pub struct AllowAllAcl;

impl AclProvider for AllowAllAcl {
    fn get_access(&self, _principal: Option<&str>, _path: &DavPath) -> DavAcl {
        DavAcl::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_denies_write() {
        let acl = ReadOnlyAcl.get_access(None, &DavPath::root(""));
        assert!(acl.read);
        assert!(!acl.write);
    }

    #[test]
    fn allow_all_grants_everything() {
        let acl = AllowAllAcl.get_access(Some("u"), &DavPath::root(""));
        assert!(acl.full && acl.write && acl.delete);
    }
}
