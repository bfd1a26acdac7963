use crate::model::{
    ColumnDef, ColumnsConfig, HeaderFooterKind, HeaderFooterRefs, Orientation, PageSize, PageType,
    SectionBreakType, SectionProperties,
};

use super::body::collect_block_nodes;
use super::rels::REL_NS;
use super::{WML_NS, twips_attr, twips_to_pts, wml};

/// Named page sizes by portrait width × height in twips.
const NAMED_SIZES: &[(PageSize, f32, f32)] = &[
    (PageSize::Letter, 12240.0, 15840.0),
    (PageSize::Legal, 12240.0, 20160.0),
    (PageSize::Executive, 10440.0, 15120.0),
    (PageSize::A3, 16838.0, 23811.0),
    (PageSize::A4, 11906.0, 16838.0),
    (PageSize::A5, 8391.0, 11906.0),
];

/// Word rounds metric sizes differently across versions.
const SIZE_TOLERANCE_TWIPS: f32 = 20.0;

/// Every `w:sectPr` of the body in document order: those closing a section
/// inside a paragraph's `w:pPr`, then the body-level one.
pub(super) fn section_nodes<'a>(body: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut out: Vec<_> = collect_block_nodes(body)
        .into_iter()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(WML_NS))
        .filter_map(|p| wml(p, "pPr").and_then(|ppr| wml(ppr, "sectPr")))
        .collect();
    if let Some(sect) = wml(body, "sectPr") {
        out.push(sect);
    }
    out
}

fn classify_page_size(w: f32, h: f32) -> Option<PageSize> {
    let (short, long) = if w <= h { (w, h) } else { (h, w) };
    NAMED_SIZES
        .iter()
        .find(|(_, sw, sh)| {
            (short - sw).abs() <= SIZE_TOLERANCE_TWIPS && (long - sh).abs() <= SIZE_TOLERANCE_TWIPS
        })
        .map(|(size, _, _)| *size)
}

fn twips_raw(node: roxmltree::Node, attr: &str) -> Option<f32> {
    node.attribute((WML_NS, attr)).and_then(|v| v.parse::<f32>().ok())
}

pub(super) fn parse_section_properties(
    sect_node: roxmltree::Node,
    background: Option<[u8; 3]>,
) -> SectionProperties {
    let defaults = SectionProperties::default();
    let pg_sz = wml(sect_node, "pgSz");
    let pg_mar = wml(sect_node, "pgMar");

    let mut page_size = PageSize::Letter;
    let mut custom_width = None;
    let mut custom_height = None;
    let mut orientation = Orientation::Portrait;
    if let Some(pg_sz) = pg_sz {
        let w = twips_raw(pg_sz, "w");
        let h = twips_raw(pg_sz, "h");
        match w.zip(h).and_then(|(w, h)| classify_page_size(w, h)) {
            Some(named) => page_size = named,
            None => {
                page_size = PageSize::Custom;
                custom_width = w.map(twips_to_pts);
                custom_height = h.map(twips_to_pts);
            }
        }
        let landscape = match pg_sz.attribute((WML_NS, "orient")) {
            Some(orient) => orient == "landscape",
            None => matches!((w, h), (Some(w), Some(h)) if w > h),
        };
        if landscape {
            orientation = Orientation::Landscape;
        }
    }

    let margin = |attr: &str, fallback: f32| pg_mar.and_then(|n| twips_attr(n, attr)).unwrap_or(fallback);
    let margin_top = margin("top", defaults.margin_top);
    let margin_bottom = margin("bottom", defaults.margin_bottom);
    let margin_left = margin("left", defaults.margin_left);
    let margin_right = margin("right", defaults.margin_right);
    let header_margin = margin("header", defaults.header_margin);
    let footer_margin = margin("footer", defaults.footer_margin);

    let different_first_page = wml(sect_node, "titlePg")
        .is_some_and(|n| n.attribute((WML_NS, "val")).is_none_or(|v| v != "0" && v != "false"));

    let break_type = wml(sect_node, "type")
        .and_then(|n| n.attribute((WML_NS, "val")))
        .map(|v| match v {
            "continuous" => SectionBreakType::Continuous,
            "oddPage" => SectionBreakType::OddPage,
            "evenPage" => SectionBreakType::EvenPage,
            _ => SectionBreakType::NextPage,
        })
        .unwrap_or(SectionBreakType::NextPage);

    let mut section = SectionProperties {
        page_size,
        custom_width,
        custom_height,
        orientation,
        margin_top,
        margin_bottom,
        margin_left,
        margin_right,
        header_margin,
        footer_margin,
        columns: None,
        headers: HeaderFooterRefs::default(),
        footers: HeaderFooterRefs::default(),
        different_first_page,
        break_type,
        background_color: background,
    };

    let available = section
        .page_dimensions()
        .map(|(w, _)| w - margin_left - margin_right);
    section.columns = wml(sect_node, "cols").and_then(|cols| parse_columns(cols, available));

    for child in sect_node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        let refs = match child.tag_name().name() {
            "headerReference" => &mut section.headers,
            "footerReference" => &mut section.footers,
            _ => continue,
        };
        let Some(rid) = child.attribute((REL_NS, "id")) else {
            continue;
        };
        let slot = match child.attribute((WML_NS, "type")).unwrap_or("default") {
            "first" => &mut refs.first,
            "even" => &mut refs.even,
            _ => &mut refs.default,
        };
        *slot = Some(rid.to_string());
    }

    section
}

/// Column layout; `None` for a single column. Equal-width columns split the
/// text area when the page width is known.
fn parse_columns(cols_node: roxmltree::Node, available: Option<f32>) -> Option<ColumnsConfig> {
    let num: u32 = cols_node
        .attribute((WML_NS, "num"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let equal_width = cols_node
        .attribute((WML_NS, "equalWidth"))
        .is_none_or(|v| v == "1" || v == "true");
    let sep = cols_node
        .attribute((WML_NS, "sep"))
        .is_some_and(|v| v == "1" || v == "true");

    let child_cols: Vec<_> = cols_node
        .children()
        .filter(|c| c.tag_name().name() == "col" && c.tag_name().namespace() == Some(WML_NS))
        .collect();

    let columns: Vec<ColumnDef> = if !equal_width && !child_cols.is_empty() {
        child_cols
            .iter()
            .map(|c| ColumnDef {
                width: twips_attr(*c, "w").unwrap_or(0.0),
                space: twips_attr(*c, "space").unwrap_or(0.0),
            })
            .collect()
    } else if num > 1 {
        let space = twips_attr(cols_node, "space").unwrap_or(36.0);
        let width = available
            .map(|a| ((a - (num - 1) as f32 * space) / num as f32).max(1.0))
            .unwrap_or(0.0);
        (0..num)
            .map(|i| ColumnDef {
                width,
                space: if i < num - 1 { space } else { 0.0 },
            })
            .collect()
    } else {
        return None;
    };

    Some(ColumnsConfig { columns, sep })
}

/// Header and footer references of a section as (kind, page type, rel id).
pub(super) fn header_footer_refs(
    section: &SectionProperties,
) -> Vec<(HeaderFooterKind, PageType, &str)> {
    let mut out = Vec::new();
    for (kind, refs) in [
        (HeaderFooterKind::Header, &section.headers),
        (HeaderFooterKind::Footer, &section.footers),
    ] {
        for (page_type, rid) in [
            (PageType::Default, &refs.default),
            (PageType::First, &refs.first),
            (PageType::Even, &refs.even),
        ] {
            if let Some(rid) = rid {
                out.push((kind, page_type, rid.as_str()));
            }
        }
    }
    out
}
