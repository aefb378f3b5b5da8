//! DAV/CalDAV/CardDAv namespace constants and the qualified property name
//! type used throughout the prop engine (spec.md §4.4, §6).

use crate::davpath::{ns_join, ns_split};

pub const NS_DAV: &str = "DAV:";
pub const NS_CALDAV: &str = "urn:ietf:params:xml:ns:caldav";
pub const NS_CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

/// The seven recognized live properties (spec.md §4.4), in the order
/// `allprop` reports them.
pub const LIVE_PROPS: &[&str] = &[
    "resourcetype",
    "getcontentlength",
    "getcontenttype",
    "getetag",
    "getlastmodified",
    "creationdate",
    "displayname",
];

/// A clark-notation qualified property name, e.g. `{DAV:}displayname`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PropName {
    pub ns: String,
    pub local: String,
}

impl PropName {
    pub fn dav(local: &str) -> PropName {
        PropName {
            ns: NS_DAV.to_string(),
            local: local.to_string(),
        }
    }

    pub fn parse(clark: &str) -> PropName {
        let (ns, local) = ns_split(clark);
        PropName {
            ns: ns.to_string(),
            local: local.to_string(),
        }
    }

    pub fn as_clark(&self) -> String {
        ns_join(&self.ns, &self.local)
    }

    pub fn is_dav(&self) -> bool {
        self.ns == NS_DAV
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_roundtrip() {
        let p = PropName::parse("{DAV:}getetag");
        assert_eq!(p.ns, NS_DAV);
        assert_eq!(p.local, "getetag");
        assert_eq!(p.as_clark(), "{DAV:}getetag");
    }

    #[test]
    fn bare_name_has_no_namespace() {
        let p = PropName::parse("getetag");
        assert!(!p.is_dav());
        assert_eq!(p.as_clark(), "getetag");
    }
}
