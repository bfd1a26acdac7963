pub mod archive;
mod body;
pub mod numbering;
pub mod rels;
mod section;
pub mod styles;
pub mod theme;

use std::path::Path;
use std::time::Instant;

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::fonts::FontCatalog;
use crate::model::{
    Border, Document, HeaderFooter, HeaderFooterKind, PageType, PassThroughParts,
    UnresolvedReference,
};

use archive::Archive;
use body::BodyContext;
use numbering::{ListCounters, Numbering};
use rels::{ContentTypes, RelationshipType, Relationships};
use styles::{StyleCatalog, StyleResolver};
use theme::Theme;

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const WPS_NS: &str = "http://schemas.microsoft.com/office/word/2010/wordprocessingShape";
const VML_NS: &str = "urn:schemas-microsoft-com:vml";

const DOCUMENT_PART: &str = "word/document.xml";

pub(crate) fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

pub(crate) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Like [`parse_hex_color`], but `auto` reads as black.
pub(crate) fn parse_text_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" {
        return Some([0, 0, 0]);
    }
    parse_hex_color(val)
}

pub(crate) fn highlight_color(name: &str) -> Option<[u8; 3]> {
    match name {
        "yellow" => Some([255, 255, 0]),
        "green" => Some([0, 255, 0]),
        "cyan" => Some([0, 255, 255]),
        "magenta" => Some([255, 0, 255]),
        "red" => Some([255, 0, 0]),
        "blue" => Some([0, 0, 255]),
        "darkYellow" => Some([128, 128, 0]),
        "darkGreen" => Some([0, 128, 0]),
        "darkCyan" => Some([0, 128, 128]),
        "darkMagenta" => Some([128, 0, 128]),
        "darkRed" => Some([128, 0, 0]),
        "darkBlue" => Some([0, 0, 128]),
        "lightGray" => Some([192, 192, 192]),
        "darkGray" => Some([128, 128, 128]),
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        _ => None,
    }
}

/// Parse a WML boolean toggle element (e.g., w:b, w:i, w:strike).
/// Present with no val or val != "0"/"false" means true.
pub(crate) fn wml_bool(parent: roxmltree::Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false" && v != "off")
    })
}

pub(crate) fn wml<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(crate) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(crate) fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<f32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f32>().ok())
        .map(twips_to_pts)
}

/// One border side (`w:top`, `w:bottom`, ...). `none`/`nil` yields `None`.
pub(crate) fn parse_border(node: roxmltree::Node) -> Option<Border> {
    let val = node.attribute((WML_NS, "val")).unwrap_or("none");
    if val == "none" || val == "nil" {
        return None;
    }
    let width_pt = node
        .attribute((WML_NS, "sz"))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v / 8.0)
        .unwrap_or(0.5);
    let space_pt = node
        .attribute((WML_NS, "space"))
        .and_then(|v| v.parse::<f32>().ok())
        .unwrap_or(0.0);
    let color = node
        .attribute((WML_NS, "color"))
        .and_then(parse_hex_color)
        .unwrap_or([0, 0, 0]);
    Some(Border {
        width_pt,
        space_pt,
        color,
    })
}

/// Memory-map a `.docx` file and [`load`] it.
pub fn open(path: &Path) -> Result<Document> {
    let file = std::fs::File::open(path)?;
    let data = unsafe { Mmap::map(&file) }?;
    load(&data)
}

/// Read a DOCX package from memory into a [`Document`].
///
/// Only a non-ZIP input, a missing or malformed `word/document.xml` and a
/// missing `w:body` are fatal. Every optional part degrades to defaults.
pub fn load(bytes: &[u8]) -> Result<Document> {
    let t0 = Instant::now();
    let mut archive = Archive::new(bytes)?;
    if !archive.contains(DOCUMENT_PART) {
        return Err(Error::MissingPart(DOCUMENT_PART.to_string()));
    }

    let content_types = ContentTypes::load(&mut archive);
    let mut rels = Relationships::load(&mut archive, DOCUMENT_PART);
    log::debug!("document relationships: {} entries", rels.len());

    let part_path = |kind: RelationshipType, fallback: &str| {
        rels.first_of_type(kind)
            .unwrap_or_else(|| fallback.to_string())
    };
    let numbering_part = part_path(RelationshipType::Numbering, "word/numbering.xml");
    let font_table_part = part_path(RelationshipType::FontTable, "word/fontTable.xml");
    let settings_part = part_path(RelationshipType::Settings, "word/settings.xml");
    let footnotes_part = part_path(RelationshipType::Footnotes, "word/footnotes.xml");
    let endnotes_part = part_path(RelationshipType::Endnotes, "word/endnotes.xml");

    let theme = load_theme(&mut archive, &rels);
    let catalog = load_catalog(&mut archive, &rels, &theme);
    let mut styles = StyleResolver::new(catalog, &theme);
    let numbering = Numbering::load(&mut archive, &numbering_part, &theme);
    let t_styles = t0.elapsed();

    let xml_content = archive
        .read_content(DOCUMENT_PART)
        .ok_or_else(|| Error::InvalidDocx(format!("{DOCUMENT_PART} could not be read")))?;
    let xml = roxmltree::Document::parse(&xml_content).map_err(|source| Error::Xml {
        part: DOCUMENT_PART.to_string(),
        source,
    })?;
    let root = xml.root_element();
    let body = wml(root, "body")
        .ok_or_else(|| Error::InvalidDocx(format!("{DOCUMENT_PART} has no w:body element")))?;

    let mut counters = ListCounters::default();
    let nodes = {
        let mut ctx = BodyContext {
            archive: &mut archive,
            styles: &mut styles,
            theme: &theme,
            numbering: &numbering,
            rels: &mut rels,
            counters: &mut counters,
        };
        body::parse_blocks(&mut ctx, body)
    };
    log::debug!("body: {} top-level nodes", nodes.len());
    let t_body = t0.elapsed();

    let background = wml(root, "background")
        .and_then(|n| n.attribute((WML_NS, "color")))
        .and_then(parse_hex_color);
    let sections: Vec<_> = section::section_nodes(body)
        .into_iter()
        .map(|sect| section::parse_section_properties(sect, background))
        .collect();
    log::debug!("sections: {}", sections.len());

    let mut unresolved = Vec::new();
    let mut headers_footers: Vec<HeaderFooter> = Vec::new();
    for sect in &sections {
        for (kind, page_type, rel_id) in section::header_footer_refs(sect) {
            if headers_footers
                .iter()
                .any(|hf| hf.rel_id == rel_id && hf.kind == kind && hf.page_type == page_type)
            {
                continue;
            }
            let Some(part) = rels.resolve_target(rel_id) else {
                log::warn!("{kind:?} reference {rel_id} has no relationship");
                continue;
            };
            let Some(hf) = load_header_footer(
                &mut archive,
                &mut styles,
                &theme,
                &numbering,
                HeaderFooterTarget {
                    kind,
                    page_type,
                    rel_id,
                    part,
                },
                &mut unresolved,
            ) else {
                continue;
            };
            headers_footers.push(hf);
        }
    }

    let picture_bullets = numbering.into_picture_bullets();

    let fonts = FontCatalog::load(&mut archive, &font_table_part, &content_types);
    log::debug!("fonts: {} embedded faces", fonts.len());
    let fonts = fonts.into_fonts();

    let parts = PassThroughParts {
        settings: archive.read_content(&settings_part),
        content_types: archive.read_content("[Content_Types].xml"),
        root_relationships: archive.read_content("_rels/.rels"),
        header_background: archive.read_content("word/header_bg.xml"),
        header_background_relationships: archive.read_content("word/_rels/header_bg.xml.rels"),
        footnotes: archive.read_content(&footnotes_part),
        endnotes: archive.read_content(&endnotes_part),
    };

    let mut unresolved_references: Vec<UnresolvedReference> = rels
        .validate_references()
        .into_iter()
        .map(|id| UnresolvedReference {
            part: DOCUMENT_PART.to_string(),
            id,
        })
        .collect();
    unresolved_references.append(&mut unresolved);
    for r in &unresolved_references {
        log::warn!("{}: relationship {} is not defined", r.part, r.id);
    }

    let t_total = t0.elapsed();
    log::info!(
        "Loaded DOCX: styles={:.1}ms, body={:.1}ms, total={:.1}ms ({} nodes, {} sections, {} fonts)",
        t_styles.as_secs_f64() * 1000.0,
        (t_body - t_styles).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        nodes.len(),
        sections.len(),
        fonts.len(),
    );

    Ok(Document {
        nodes,
        sections,
        headers_footers,
        fonts,
        picture_bullets,
        content_types,
        parts,
        unresolved_references,
    })
}

/// Style catalog of a package, located and themed the same way [`load`] does.
pub fn load_styles(bytes: &[u8]) -> Result<StyleCatalog> {
    let mut archive = Archive::new(bytes)?;
    let rels = Relationships::load(&mut archive, DOCUMENT_PART);
    let theme = load_theme(&mut archive, &rels);
    Ok(load_catalog(&mut archive, &rels, &theme))
}

fn load_theme(archive: &mut Archive, rels: &Relationships) -> Theme {
    rels.first_of_type(RelationshipType::Theme)
        .or_else(|| first_theme_part(archive))
        .and_then(|part| archive.read_content(&part))
        .map(|xml| Theme::parse(&xml))
        .unwrap_or_default()
}

fn load_catalog(archive: &mut Archive, rels: &Relationships, theme: &Theme) -> StyleCatalog {
    let part = rels
        .first_of_type(RelationshipType::Styles)
        .unwrap_or_else(|| "word/styles.xml".to_string());
    match archive.read_content(&part) {
        Some(xml) => StyleCatalog::parse(&xml, theme),
        None => {
            log::debug!("{part}: absent, using default styles");
            StyleCatalog::default()
        }
    }
}

/// `word/theme/*.xml` in archive order, for packages whose relationships
/// omit the theme.
fn first_theme_part(archive: &Archive) -> Option<String> {
    archive
        .part_names()
        .find(|name| name.starts_with("word/theme/") && name.ends_with(".xml"))
        .map(str::to_string)
}

struct HeaderFooterTarget<'a> {
    kind: HeaderFooterKind,
    page_type: PageType,
    rel_id: &'a str,
    part: String,
}

/// Parse one header or footer part against its own relationship table.
fn load_header_footer(
    archive: &mut Archive,
    styles: &mut StyleResolver,
    theme: &Theme,
    numbering: &Numbering,
    target: HeaderFooterTarget,
    unresolved: &mut Vec<UnresolvedReference>,
) -> Option<HeaderFooter> {
    let part = target.part;
    let Some(xml_content) = archive.read_content(&part) else {
        log::warn!("{part}: referenced by {} but missing", target.rel_id);
        return None;
    };
    let xml = match roxmltree::Document::parse(&xml_content) {
        Ok(xml) => xml,
        Err(e) => {
            log::warn!("{part}: skipping malformed part ({e})");
            return None;
        }
    };

    let mut part_rels = Relationships::load(archive, &part);
    let mut counters = ListCounters::default();
    let nodes = {
        let mut ctx = BodyContext {
            archive,
            styles,
            theme,
            numbering,
            rels: &mut part_rels,
            counters: &mut counters,
        };
        body::parse_blocks(&mut ctx, xml.root_element())
    };
    unresolved.extend(
        part_rels
            .validate_references()
            .into_iter()
            .map(|id| UnresolvedReference {
                part: part.clone(),
                id,
            }),
    );
    log::debug!("{part}: {} nodes", nodes.len());

    Some(HeaderFooter {
        kind: target.kind,
        page_type: target.page_type,
        rel_id: target.rel_id.to_string(),
        part,
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_xml(inner: &str) -> String {
        format!(r#"<w:root xmlns:w="{WML_NS}">{inner}</w:root>"#)
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("FF0080"), Some([255, 0, 128]));
        assert_eq!(parse_hex_color("auto"), None);
        assert_eq!(parse_hex_color("F00"), None);
        assert_eq!(parse_text_color("auto"), Some([0, 0, 0]));
    }

    #[test]
    fn toggles_honor_false_values() {
        let xml = node_xml(r#"<w:b/><w:i w:val="0"/><w:caps w:val="false"/><w:strike w:val="1"/>"#);
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(wml_bool(root, "b"), Some(true));
        assert_eq!(wml_bool(root, "i"), Some(false));
        assert_eq!(wml_bool(root, "caps"), Some(false));
        assert_eq!(wml_bool(root, "strike"), Some(true));
        assert_eq!(wml_bool(root, "u"), None);
    }

    #[test]
    fn borders_in_eighths_of_a_point() {
        let xml = node_xml(
            r#"<w:top w:val="single" w:sz="12" w:space="2" w:color="FF0000"/><w:bottom w:val="nil"/><w:left w:val="single"/>"#,
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        let top = parse_border(wml(root, "top").unwrap()).unwrap();
        assert_eq!(top.width_pt, 1.5);
        assert_eq!(top.space_pt, 2.0);
        assert_eq!(top.color, [255, 0, 0]);
        assert!(parse_border(wml(root, "bottom").unwrap()).is_none());
        let left = parse_border(wml(root, "left").unwrap()).unwrap();
        assert_eq!(left.width_pt, 0.5);
        assert_eq!(left.color, [0, 0, 0]);
    }
}
