//! PropEngine: maps property names to values drawn from a resource, and
//! assembles the `multistatus` XML used by `PROPFIND` (and, for partial
//! failures, by `COPY`/`MOVE`). Grounded on djangodav's
//! `get_property_tag`/`get_property_tag_list`/`views.propfind`, rebuilt
//! around `xmltree`/`xml-rs` with DTD and external-entity resolution left
//! at their library defaults (disabled) per spec.md §9.

use http::StatusCode;
use xmltree::{Element, XMLNode};

use crate::davpath::{format_http_date, format_rfc3339, DavPath};
use crate::errors::{DavError, DavResult};
use crate::fs::{DavFileSystem, DavMetaData};
use crate::xmlname::{PropName, LIVE_PROPS, NS_CALDAV, NS_CARDDAV, NS_DAV};

/// What a parsed `PROPFIND` request body asked for.
#[derive(Debug, Clone)]
pub enum PropfindMode {
    AllProp,
    PropName,
    Named(Vec<PropName>),
}

/// Parse a `PROPFIND` request body. An empty body means `allprop`
/// (spec.md §4.4). Exactly one of `<allprop/>`, `<propname/>`, `<prop>`
/// may appear, else `400 Bad Request`.
pub fn parse_propfind_body(data: &[u8]) -> DavResult<PropfindMode> {
    if data.is_empty() {
        return Ok(PropfindMode::AllProp);
    }
    let root = Element::parse(data).map_err(|_| DavError::XmlParseError)?;
    let mut modes = Vec::new();
    if root.get_child("allprop").is_some() {
        modes.push(PropfindMode::AllProp);
    }
    if root.get_child("propname").is_some() {
        modes.push(PropfindMode::PropName);
    }
    if let Some(prop) = root.get_child("prop") {
        let names = prop
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .map(element_prop_name)
            .collect();
        modes.push(PropfindMode::Named(names));
    }
    match modes.len() {
        1 => Ok(modes.into_iter().next().unwrap()),
        _ => Err(DavError::Status(StatusCode::BAD_REQUEST)),
    }
}

fn element_prop_name(e: &Element) -> PropName {
    match &e.namespace {
        Some(ns) => PropName {
            ns: ns.clone(),
            local: e.name.clone(),
        },
        None => PropName::dav(&e.name),
    }
}

/// Render one live property as an XML element, or `None` if the resource
/// doesn't have a value for it (e.g. `getcontentlength` on a collection).
pub fn render_prop(
    name: &PropName,
    path: &DavPath,
    meta: &dyn DavMetaData,
    fs: &dyn DavFileSystem,
    name_only: bool,
) -> Option<Element> {
    if !name.is_dav() {
        return None;
    }
    let mut e = Element::new(&format!("D:{}", name.local));
    if name_only {
        return Some(e);
    }
    match name.local.as_str() {
        "resourcetype" => {
            if meta.is_collection() {
                e.children.push(XMLNode::Element(Element::new("D:collection")));
            }
            if meta.is_calendar() {
                let mut cal = Element::new("cal:calendar");
                cal.namespace = Some(NS_CALDAV.to_string());
                e.children.push(XMLNode::Element(cal));
            }
        }
        "getcontentlength" => {
            if meta.is_object() {
                e.children.push(XMLNode::Text(meta.len().to_string()));
            } else {
                return None;
            }
        }
        "getcontenttype" => {
            e.children.push(XMLNode::Text(fs.content_type(path)));
        }
        "getetag" => {
            e.children
                .push(XMLNode::Text(format!("\"{}\"", meta.etag())));
        }
        "getlastmodified" => match meta.modified() {
            Ok(t) => e.children.push(XMLNode::Text(format_http_date(t))),
            Err(_) => return None,
        },
        "creationdate" => match meta.created() {
            Ok(t) => e.children.push(XMLNode::Text(format_rfc3339(t))),
            Err(_) => return None,
        },
        "displayname" => {
            e.children
                .push(XMLNode::Text(path.display_name().to_string()));
        }
        _ => return None,
    }
    Some(e)
}

/// One `<response>` entry: an href plus its found properties (all placed
/// under a single `200 OK` propstat; unknown names are simply omitted
/// rather than reported under `404`, per spec.md §9 Open Question).
pub struct PropResponse {
    pub href: String,
    pub props: Vec<Element>,
}

fn multistatus_root() -> Element {
    let mut root = Element::new("D:multistatus");
    root.attributes
        .insert("xmlns:D".to_string(), NS_DAV.to_string());
    root.attributes
        .insert("xmlns:cal".to_string(), NS_CALDAV.to_string());
    root.attributes
        .insert("xmlns:card".to_string(), NS_CARDDAV.to_string());
    root
}

fn serialize(root: Element) -> DavResult<Vec<u8>> {
    let mut out = Vec::new();
    root.write(&mut out)
        .map_err(|_| DavError::Status(StatusCode::INTERNAL_SERVER_ERROR))?;
    Ok(out)
}

/// Assemble the full `multistatus` body for `PROPFIND`.
pub fn build_propfind_multistatus(entries: Vec<PropResponse>) -> DavResult<Vec<u8>> {
    let mut root = multistatus_root();
    for entry in entries {
        let mut response = Element::new("D:response");
        let mut href = Element::new("D:href");
        href.children.push(XMLNode::Text(entry.href));
        response.children.push(XMLNode::Element(href));

        let mut propstat = Element::new("D:propstat");
        let mut prop = Element::new("D:prop");
        for p in entry.props {
            prop.children.push(XMLNode::Element(p));
        }
        propstat.children.push(XMLNode::Element(prop));
        let mut status = Element::new("D:status");
        status
            .children
            .push(XMLNode::Text("HTTP/1.1 200 OK".to_string()));
        propstat.children.push(XMLNode::Element(status));
        response.children.push(XMLNode::Element(propstat));

        root.children.push(XMLNode::Element(response));
    }
    serialize(root)
}

/// Assemble a `multistatus` body reporting a bare per-href status, used
/// for `COPY`/`MOVE` partial-failure responses (spec.md §9 Open Question:
/// a real body, not an empty-bodied `207`).
pub fn build_status_multistatus(entries: Vec<(String, StatusCode)>) -> DavResult<Vec<u8>> {
    let mut root = multistatus_root();
    for (href, status) in entries {
        let mut response = Element::new("D:response");
        let mut href_el = Element::new("D:href");
        href_el.children.push(XMLNode::Text(href));
        response.children.push(XMLNode::Element(href_el));
        let mut status_el = Element::new("D:status");
        status_el.children.push(XMLNode::Text(format!(
            "HTTP/1.1 {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )));
        response.children.push(XMLNode::Element(status_el));
        root.children.push(XMLNode::Element(response));
    }
    serialize(root)
}

/// Every live property name, used for `allprop`/`propname` modes.
pub fn all_prop_names() -> Vec<PropName> {
    LIVE_PROPS.iter().map(|n| PropName::dav(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_allprop() {
        assert!(matches!(parse_propfind_body(b""), Ok(PropfindMode::AllProp)));
    }

    #[test]
    fn allprop_body_parses() {
        let body = b"<?xml version=\"1.0\"?><D:propfind xmlns:D=\"DAV:\"><D:allprop/></D:propfind>";
        assert!(matches!(
            parse_propfind_body(body),
            Ok(PropfindMode::AllProp)
        ));
    }

    #[test]
    fn named_prop_body_parses_names() {
        let body = b"<?xml version=\"1.0\"?><D:propfind xmlns:D=\"DAV:\"><D:prop><D:displayname/><D:getetag/></D:prop></D:propfind>";
        match parse_propfind_body(body).unwrap() {
            PropfindMode::Named(names) => assert_eq!(names.len(), 2),
            _ => panic!("expected Named"),
        }
    }

    #[test]
    fn malformed_xml_is_bad_request() {
        let err = parse_propfind_body(b"<not valid").unwrap_err();
        assert_eq!(err.statuscode(), StatusCode::BAD_REQUEST);
    }
}
