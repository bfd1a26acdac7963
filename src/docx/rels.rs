//! Package relationships (`*.rels`) and `[Content_Types].xml`.
//!
//! Relationship tables are scoped to the part that owns them: the document,
//! every header/footer, the font table and the numbering part each get their
//! own [`Relationships`] value whose relative targets resolve against that
//! part's directory.

use std::collections::{HashMap, HashSet};

use super::archive::Archive;

pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipType {
    Image,
    Hyperlink,
    Header,
    Footer,
    Styles,
    Numbering,
    FontTable,
    Settings,
    Theme,
    Footnotes,
    Endnotes,
    Font,
    OfficeDocument,
    Other,
}

impl RelationshipType {
    /// Classify a relationship type URI by its last path segment, so the
    /// transitional and strict namespaces both match.
    pub fn from_uri(uri: &str) -> Self {
        let suffix = uri.rsplit('/').next().unwrap_or(uri);
        match suffix {
            "image" => Self::Image,
            "hyperlink" => Self::Hyperlink,
            "header" => Self::Header,
            "footer" => Self::Footer,
            "styles" => Self::Styles,
            "numbering" => Self::Numbering,
            "fontTable" => Self::FontTable,
            "settings" => Self::Settings,
            "theme" => Self::Theme,
            "footnotes" => Self::Footnotes,
            "endnotes" => Self::Endnotes,
            "font" => Self::Font,
            "officeDocument" => Self::OfficeDocument,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: RelationshipType,
    pub type_uri: String,
    pub target: String,
    pub external: bool,
}

/// Relationship table of one part.
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    /// Directory of the owning part, with trailing slash (`word/`), or empty for the root.
    base_dir: String,
    order: Vec<String>,
    map: HashMap<String, Relationship>,
    referenced: HashSet<String>,
}

impl Relationships {
    pub fn empty(base_dir: &str) -> Self {
        Self {
            base_dir: base_dir.to_string(),
            ..Self::default()
        }
    }

    /// Parse a `.rels` part. Malformed XML yields an empty table.
    pub fn parse(xml_content: &str, base_dir: &str) -> Self {
        let mut rels = Self::empty(base_dir);
        let xml = match roxmltree::Document::parse(xml_content) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("ignoring malformed relationships for {base_dir:?}: {e}");
                return rels;
            }
        };
        for node in xml.root_element().children() {
            if node.tag_name().name() != "Relationship" {
                continue;
            }
            let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
                continue;
            };
            let type_uri = node.attribute("Type").unwrap_or("");
            let external = node
                .attribute("TargetMode")
                .is_some_and(|m| m.eq_ignore_ascii_case("External"));
            if rels.map.contains_key(id) {
                log::debug!("duplicate relationship id {id}, keeping the first");
                continue;
            }
            rels.order.push(id.to_string());
            rels.map.insert(
                id.to_string(),
                Relationship {
                    id: id.to_string(),
                    rel_type: RelationshipType::from_uri(type_uri),
                    type_uri: type_uri.to_string(),
                    target: target.to_string(),
                    external,
                },
            );
        }
        rels
    }

    /// Load the relationships of `part_path` (e.g. `word/header1.xml` →
    /// `word/_rels/header1.xml.rels`). Missing parts give an empty table.
    pub fn load(archive: &mut Archive, part_path: &str) -> Self {
        let (dir, file) = match part_path.rsplit_once('/') {
            Some((d, f)) => (d, f),
            None => ("", part_path),
        };
        let (rels_path, base_dir) = if dir.is_empty() {
            (format!("_rels/{file}.rels"), String::new())
        } else {
            (format!("{dir}/_rels/{file}.rels"), format!("{dir}/"))
        };
        match archive.read_content(&rels_path) {
            Some(xml) => Self::parse(&xml, &base_dir),
            None => Self::empty(&base_dir),
        }
    }

    /// Look up a relationship and record that the id was referenced.
    pub fn get(&mut self, id: &str) -> Option<&Relationship> {
        self.referenced.insert(id.to_string());
        self.map.get(id)
    }

    /// Look up a relationship without recording a reference.
    pub fn peek(&self, id: &str) -> Option<&Relationship> {
        self.map.get(id)
    }

    /// Archive path (or URL for external targets) of relationship `id`.
    pub fn resolve_target(&mut self, id: &str) -> Option<String> {
        let base_dir = self.base_dir.clone();
        let rel = self.get(id)?;
        Some(resolve(rel, &base_dir))
    }

    /// First relationship of the given type, in declaration order, resolved to a path.
    pub fn first_of_type(&self, kind: RelationshipType) -> Option<String> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id))
            .find(|rel| rel.rel_type == kind && !rel.external)
            .map(|rel| resolve(rel, &self.base_dir))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.order.iter().filter_map(|id| self.map.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids that were passed to [`get`](Self::get) but are not defined here, sorted.
    pub fn validate_references(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .referenced
            .iter()
            .filter(|id| !self.map.contains_key(*id))
            .cloned()
            .collect();
        missing.sort();
        missing
    }
}

fn resolve(rel: &Relationship, base_dir: &str) -> String {
    if rel.external {
        return rel.target.clone();
    }
    if let Some(absolute) = rel.target.strip_prefix('/') {
        return absolute.to_string();
    }
    normalize_path(&format!("{base_dir}{}", rel.target))
}

/// Collapse `.` and `..` segments of an archive path.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Parsed `[Content_Types].xml`.
#[derive(Clone, Debug, Default)]
pub struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse(xml_content: &str) -> Self {
        let mut types = Self::default();
        let xml = match roxmltree::Document::parse(xml_content) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("ignoring malformed [Content_Types].xml: {e}");
                return types;
            }
        };
        for node in xml.root_element().children() {
            let Some(content_type) = node.attribute("ContentType") else {
                continue;
            };
            match node.tag_name().name() {
                "Default" => {
                    if let Some(ext) = node.attribute("Extension") {
                        types
                            .defaults
                            .insert(ext.to_ascii_lowercase(), content_type.to_string());
                    }
                }
                "Override" => {
                    if let Some(part) = node.attribute("PartName") {
                        let part = part.strip_prefix('/').unwrap_or(part);
                        types
                            .overrides
                            .insert(part.to_string(), content_type.to_string());
                    }
                }
                _ => {}
            }
        }
        types
    }

    pub fn load(archive: &mut Archive) -> Self {
        archive
            .read_content("[Content_Types].xml")
            .map(|xml| Self::parse(&xml))
            .unwrap_or_default()
    }

    /// Content type of a part: an Override for the exact path wins over the
    /// Default for its extension.
    pub fn content_type(&self, part: &str) -> Option<&str> {
        let part = part.strip_prefix('/').unwrap_or(part);
        if let Some(ct) = self.overrides.get(part) {
            return Some(ct);
        }
        let file = part.rsplit('/').next().unwrap_or(part);
        let (_, ext) = file.rsplit_once('.')?;
        self.defaults.get(&ext.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.overrides.is_empty()
    }
}
