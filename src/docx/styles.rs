use std::collections::{HashMap, HashSet};

use crate::model::{Alignment, Border, LineSpacing, ResolvedStyle, VertAlign};

use super::theme::Theme;
use super::{
    WML_NS, highlight_color, parse_border, parse_hex_color, parse_text_color, twips_attr, wml,
    wml_attr, wml_bool,
};

/// Partially specified formatting. `None` means "inherit".
///
/// `highlight` and the border sides are doubly optional: `Some(None)` is an
/// explicit `none`/`nil` that clears whatever a lower layer set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleProps {
    pub alignment: Option<Alignment>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    pub line_spacing: Option<LineSpacing>,
    pub indent_left: Option<f32>,
    pub indent_right: Option<f32>,
    pub indent_first_line: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<[u8; 3]>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub highlight: Option<Option<[u8; 3]>>,
    pub vertical_align: Option<VertAlign>,
    pub caps: Option<bool>,
    pub small_caps: Option<bool>,
    pub strike: Option<bool>,
    pub outline: Option<bool>,
    pub shadow: Option<bool>,
    pub emboss: Option<bool>,
    pub imprint: Option<bool>,
    pub border_top: Option<Option<Border>>,
    pub border_bottom: Option<Option<Border>>,
    pub border_left: Option<Option<Border>>,
    pub border_right: Option<Option<Border>>,
}

macro_rules! for_each_prop {
    ($m:ident) => {
        $m!(
            alignment,
            space_before,
            space_after,
            line_spacing,
            indent_left,
            indent_right,
            indent_first_line,
            bold,
            italic,
            underline,
            color,
            font_size,
            font_family,
            highlight,
            vertical_align,
            caps,
            small_caps,
            strike,
            outline,
            shadow,
            emboss,
            imprint
        )
    };
}

impl StyleProps {
    /// Layer `top` over `self`: every field `top` sets replaces the current value.
    pub fn overlay(&mut self, top: &StyleProps) {
        macro_rules! take_present {
            ($($field:ident),*) => {
                $(
                    if top.$field.is_some() {
                        self.$field = top.$field.clone();
                    }
                )*
            };
        }
        for_each_prop!(take_present);
        take_present!(border_top, border_bottom, border_left, border_right);
    }

    /// Write every present field into a resolved snapshot.
    pub fn apply_to(&self, out: &mut ResolvedStyle) {
        macro_rules! write_present {
            ($($field:ident),*) => {
                $(
                    if let Some(v) = &self.$field {
                        out.$field = v.clone();
                    }
                )*
            };
        }
        for_each_prop!(write_present);
        if let Some(b) = self.border_top {
            out.borders.top = b;
        }
        if let Some(b) = self.border_bottom {
            out.borders.bottom = b;
        }
        if let Some(b) = self.border_left {
            out.borders.left = b;
        }
        if let Some(b) = self.border_right {
            out.borders.right = b;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StyleProps::default()
    }

    /// Read paragraph (`w:pPr`) and run (`w:rPr`) properties. Theme color and
    /// font references are resolved against `theme` here.
    pub fn from_nodes(
        ppr: Option<roxmltree::Node>,
        rpr: Option<roxmltree::Node>,
        theme: &Theme,
    ) -> Self {
        let mut props = StyleProps::default();
        if let Some(ppr) = ppr {
            props.read_paragraph(ppr);
        }
        if let Some(rpr) = rpr {
            props.read_run(rpr, theme);
        }
        props
    }

    fn read_paragraph(&mut self, ppr: roxmltree::Node) {
        self.alignment = wml_attr(ppr, "jc").map(parse_alignment);

        if let Some(spacing) = wml(ppr, "spacing") {
            self.space_before = twips_attr(spacing, "before");
            self.space_after = twips_attr(spacing, "after");
            self.line_spacing = spacing
                .attribute((WML_NS, "line"))
                .and_then(|v| v.parse::<f32>().ok())
                .map(|line_val| parse_line_spacing(spacing, line_val));
        }

        if let Some(ind) = wml(ppr, "ind") {
            self.indent_left = twips_attr(ind, "left").or_else(|| twips_attr(ind, "start"));
            self.indent_right = twips_attr(ind, "right").or_else(|| twips_attr(ind, "end"));
            self.indent_first_line = twips_attr(ind, "hanging")
                .map(|h| -h)
                .or_else(|| twips_attr(ind, "firstLine"));
        }

        if let Some(pbdr) = wml(ppr, "pBdr") {
            let side = |name: &str| wml(pbdr, name).map(parse_border);
            self.border_top = side("top");
            self.border_bottom = side("bottom");
            self.border_left = side("left").or_else(|| side("start"));
            self.border_right = side("right").or_else(|| side("end"));
        }
    }

    fn read_run(&mut self, rpr: roxmltree::Node, theme: &Theme) {
        self.bold = wml_bool(rpr, "b");
        self.italic = wml_bool(rpr, "i");
        self.underline = wml(rpr, "u")
            .map(|n| n.attribute((WML_NS, "val")).is_none_or(|v| v != "none"));
        self.strike = wml_bool(rpr, "strike").or_else(|| wml_bool(rpr, "dstrike"));
        self.caps = wml_bool(rpr, "caps");
        self.small_caps = wml_bool(rpr, "smallCaps");
        self.outline = wml_bool(rpr, "outline");
        self.shadow = wml_bool(rpr, "shadow");
        self.emboss = wml_bool(rpr, "emboss");
        self.imprint = wml_bool(rpr, "imprint");

        self.font_size = wml_attr(rpr, "sz")
            .and_then(|v| v.parse::<f32>().ok())
            .map(|hp| hp / 2.0);

        self.font_family = wml(rpr, "rFonts").and_then(|rfonts| resolve_font(rfonts, theme));

        self.color = wml(rpr, "color").and_then(|n| {
            n.attribute((WML_NS, "themeColor"))
                .and_then(|name| theme.get_color(name))
                .and_then(parse_hex_color)
                .or_else(|| n.attribute((WML_NS, "val")).and_then(parse_text_color))
        });

        self.highlight = wml_attr(rpr, "highlight").map(highlight_color);

        self.vertical_align = wml_attr(rpr, "vertAlign").map(|v| match v {
            "superscript" => VertAlign::Superscript,
            "subscript" => VertAlign::Subscript,
            _ => VertAlign::Baseline,
        });
    }
}

pub(super) fn parse_alignment(val: &str) -> Alignment {
    match val {
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "distribute" => Alignment::Justify,
        _ => Alignment::Left,
    }
}

pub(super) fn parse_line_spacing(spacing: roxmltree::Node, line_val: f32) -> LineSpacing {
    match spacing.attribute((WML_NS, "lineRule")) {
        Some("exact") => LineSpacing::Exact(line_val / 20.0),
        Some("atLeast") => LineSpacing::AtLeast(line_val / 20.0),
        _ => LineSpacing::Auto(line_val / 240.0),
    }
}

/// Explicit family from `w:rFonts`, falling back to its theme reference.
pub(super) fn resolve_font(rfonts: roxmltree::Node, theme: &Theme) -> Option<String> {
    let explicit = rfonts
        .attribute((WML_NS, "ascii"))
        .or_else(|| rfonts.attribute((WML_NS, "hAnsi")));
    if let Some(f) = explicit {
        return Some(f.to_string());
    }
    rfonts
        .attribute((WML_NS, "asciiTheme"))
        .or_else(|| rfonts.attribute((WML_NS, "hAnsiTheme")))
        .and_then(|r| theme.get_font(r))
        .map(str::to_string)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TableBorders {
    pub top: Option<Border>,
    pub bottom: Option<Border>,
    pub left: Option<Border>,
    pub right: Option<Border>,
    pub inside_h: Option<Border>,
    pub inside_v: Option<Border>,
}

impl TableBorders {
    pub(super) fn parse(tbl_borders: roxmltree::Node) -> Self {
        let side = |name: &str| wml(tbl_borders, name).and_then(parse_border);
        TableBorders {
            top: side("top"),
            bottom: side("bottom"),
            left: side("left").or_else(|| side("start")),
            right: side("right").or_else(|| side("end")),
            inside_h: side("insideH"),
            inside_v: side("insideV"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Style {
    pub id: String,
    pub name: Option<String>,
    pub kind: StyleKind,
    pub based_on: Option<String>,
    pub is_default: bool,
    pub props: StyleProps,
    pub table_borders: Option<TableBorders>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatentStyleException {
    pub locked: Option<bool>,
    pub ui_priority: Option<u32>,
    pub semi_hidden: Option<bool>,
    pub unhide_when_used: Option<bool>,
    pub q_format: Option<bool>,
}

/// `w:latentStyles`: defaults for built-in styles the document does not define.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentStyles {
    pub default_locked: bool,
    pub default_ui_priority: u32,
    pub default_semi_hidden: bool,
    pub default_unhide_when_used: bool,
    pub default_q_format: bool,
    pub count: Option<u32>,
    pub exceptions: HashMap<String, LatentStyleException>,
}

impl Default for LatentStyles {
    fn default() -> Self {
        Self {
            default_locked: false,
            default_ui_priority: 99,
            default_semi_hidden: false,
            default_unhide_when_used: false,
            default_q_format: false,
            count: None,
            exceptions: HashMap::new(),
        }
    }
}

fn on_off_attr(node: roxmltree::Node, name: &str) -> Option<bool> {
    node.attribute((WML_NS, name))
        .map(|v| v == "1" || v == "true" || v == "on")
}

impl LatentStyles {
    fn parse(node: roxmltree::Node) -> Self {
        let mut latent = LatentStyles::default();
        if let Some(v) = on_off_attr(node, "defLockedState") {
            latent.default_locked = v;
        }
        if let Some(v) = node
            .attribute((WML_NS, "defUIPriority"))
            .and_then(|v| v.parse().ok())
        {
            latent.default_ui_priority = v;
        }
        if let Some(v) = on_off_attr(node, "defSemiHidden") {
            latent.default_semi_hidden = v;
        }
        if let Some(v) = on_off_attr(node, "defUnhideWhenUsed") {
            latent.default_unhide_when_used = v;
        }
        if let Some(v) = on_off_attr(node, "defQFormat") {
            latent.default_q_format = v;
        }
        latent.count = node
            .attribute((WML_NS, "count"))
            .and_then(|v| v.parse().ok());

        for exc in node.children().filter(|n| {
            n.tag_name().name() == "lsdException" && n.tag_name().namespace() == Some(WML_NS)
        }) {
            let Some(name) = exc.attribute((WML_NS, "name")) else {
                continue;
            };
            latent.exceptions.insert(
                name.to_string(),
                LatentStyleException {
                    locked: on_off_attr(exc, "locked"),
                    ui_priority: exc
                        .attribute((WML_NS, "uiPriority"))
                        .and_then(|v| v.parse().ok()),
                    semi_hidden: on_off_attr(exc, "semiHidden"),
                    unhide_when_used: on_off_attr(exc, "unhideWhenUsed"),
                    q_format: on_off_attr(exc, "qFormat"),
                },
            );
        }
        latent
    }

    pub fn ui_priority(&self, name: &str) -> u32 {
        self.exceptions
            .get(name)
            .and_then(|e| e.ui_priority)
            .unwrap_or(self.default_ui_priority)
    }

    pub fn is_quick_format(&self, name: &str) -> bool {
        self.exceptions
            .get(name)
            .and_then(|e| e.q_format)
            .unwrap_or(self.default_q_format)
    }

    pub fn is_semi_hidden(&self, name: &str) -> bool {
        self.exceptions
            .get(name)
            .and_then(|e| e.semi_hidden)
            .unwrap_or(self.default_semi_hidden)
    }
}

/// Named style definitions of `word/styles.xml`.
#[derive(Clone, Debug, Default)]
pub struct StyleCatalog {
    pub doc_defaults: StyleProps,
    pub latent: LatentStyles,
    styles: HashMap<String, Style>,
}

impl StyleCatalog {
    pub fn parse(xml_content: &str, theme: &Theme) -> Self {
        let mut catalog = StyleCatalog::default();
        let xml = match roxmltree::Document::parse(xml_content) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("ignoring malformed styles part: {e}");
                return catalog;
            }
        };
        let root = xml.root_element();

        if let Some(doc_defaults) = wml(root, "docDefaults") {
            let rpr = wml(doc_defaults, "rPrDefault").and_then(|n| wml(n, "rPr"));
            let ppr = wml(doc_defaults, "pPrDefault").and_then(|n| wml(n, "pPr"));
            catalog.doc_defaults = StyleProps::from_nodes(ppr, rpr, theme);
        }

        if let Some(latent) = wml(root, "latentStyles") {
            catalog.latent = LatentStyles::parse(latent);
        }

        for style_node in root.children() {
            if style_node.tag_name().name() != "style"
                || style_node.tag_name().namespace() != Some(WML_NS)
            {
                continue;
            }
            let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
                continue;
            };
            let kind = match style_node.attribute((WML_NS, "type")) {
                Some("character") => StyleKind::Character,
                Some("table") => StyleKind::Table,
                Some("numbering") => StyleKind::Numbering,
                _ => StyleKind::Paragraph,
            };
            let table_borders = wml(style_node, "tblPr")
                .and_then(|pr| wml(pr, "tblBorders"))
                .map(TableBorders::parse);

            catalog.insert(Style {
                id: style_id.to_string(),
                name: wml_attr(style_node, "name").map(str::to_string),
                kind,
                based_on: wml_attr(style_node, "basedOn").map(str::to_string),
                is_default: on_off_attr(style_node, "default").unwrap_or(false),
                props: StyleProps::from_nodes(
                    wml(style_node, "pPr"),
                    wml(style_node, "rPr"),
                    theme,
                ),
                table_borders,
            });
        }

        log::debug!("styles: {} definitions", catalog.styles.len());
        catalog
    }

    pub fn insert(&mut self, style: Style) {
        self.styles.insert(style.id.clone(), style);
    }

    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Style> {
        self.styles.values()
    }

    /// Id of the style marked `w:default="1"` for a kind.
    pub fn default_style_id(&self, kind: StyleKind) -> Option<&str> {
        self.styles
            .values()
            .find(|s| s.kind == kind && s.is_default)
            .map(|s| s.id.as_str())
    }

    /// The `basedOn` chain of `id`, nearest first. Stops at the first id seen
    /// twice so cyclic chains terminate.
    pub fn chain(&self, id: &str) -> Vec<&Style> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if !seen.insert(cur) {
                log::warn!("basedOn cycle through style {cur:?} (resolving {id:?})");
                break;
            }
            let Some(style) = self.styles.get(cur) else {
                if cur != id {
                    log::debug!("style {id:?} is based on undefined style {cur:?}");
                }
                break;
            };
            chain.push(style);
            current = style.based_on.as_deref();
        }
        chain
    }
}

/// Inputs of a run-level resolution.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunStyleRequest<'a> {
    pub paragraph_style_id: Option<&'a str>,
    /// The enclosing paragraph's own `w:pPr`, so run snapshots agree with it.
    pub paragraph_direct: Option<&'a StyleProps>,
    pub run_style_id: Option<&'a str>,
    pub direct: Option<&'a StyleProps>,
}

/// Turns style ids and direct formatting into [`ResolvedStyle`] snapshots.
///
/// The flattened properties of each style id are cached for the lifetime of
/// the resolver (one document load); run-level composition is recomputed on
/// every call.
pub struct StyleResolver {
    catalog: StyleCatalog,
    base: ResolvedStyle,
    cache: HashMap<String, StyleProps>,
}

impl StyleResolver {
    pub fn new(catalog: StyleCatalog, theme: &Theme) -> Self {
        let base = ResolvedStyle {
            font_family: theme.fonts.minor.latin.clone(),
            ..ResolvedStyle::default()
        };
        Self {
            catalog,
            base,
            cache: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Snapshot used when no style id is given: documented defaults, the
    /// theme body font, `w:docDefaults` and the `w:default="1"` paragraph style.
    pub fn default_style(&mut self) -> ResolvedStyle {
        self.resolve_paragraph_style(None)
    }

    /// Properties of `id` with its whole `basedOn` chain flattened, parent first.
    pub fn flattened(&mut self, id: &str) -> StyleProps {
        if let Some(hit) = self.cache.get(id) {
            return hit.clone();
        }
        let mut props = StyleProps::default();
        for style in self.catalog.chain(id).iter().rev() {
            props.overlay(&style.props);
        }
        self.cache.insert(id.to_string(), props.clone());
        props
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn paragraph_layer(&mut self, style_id: Option<&str>) -> StyleProps {
        let id = style_id
            .map(str::to_string)
            .or_else(|| {
                self.catalog
                    .default_style_id(StyleKind::Paragraph)
                    .map(str::to_string)
            });
        let mut props = self.catalog.doc_defaults.clone();
        if let Some(id) = id {
            props.overlay(&self.flattened(&id));
        }
        props
    }

    fn finish(&self, props: &StyleProps) -> ResolvedStyle {
        let mut out = self.base.clone();
        props.apply_to(&mut out);
        out
    }

    /// Resolve a paragraph style id; `None` selects the default paragraph style.
    pub fn resolve_paragraph_style(&mut self, style_id: Option<&str>) -> ResolvedStyle {
        let props = self.paragraph_layer(style_id);
        self.finish(&props)
    }

    /// Paragraph style plus the paragraph's own direct properties.
    pub fn resolve_paragraph_with(
        &mut self,
        style_id: Option<&str>,
        direct: &StyleProps,
    ) -> ResolvedStyle {
        let mut props = self.paragraph_layer(style_id);
        props.overlay(direct);
        self.finish(&props)
    }

    /// Compose paragraph style, paragraph direct properties, character style
    /// and direct run properties, in that order. Each layer only overrides
    /// the fields it sets.
    pub fn resolve_run_style(&mut self, request: &RunStyleRequest) -> ResolvedStyle {
        let mut props = self.paragraph_layer(request.paragraph_style_id);
        if let Some(paragraph_direct) = request.paragraph_direct {
            props.overlay(paragraph_direct);
        }
        if let Some(run_id) = request.run_style_id {
            props.overlay(&self.flattened(run_id));
        }
        if let Some(direct) = request.direct {
            props.overlay(direct);
        }
        self.finish(&props)
    }

    /// Nearest table-border definition along a table style's `basedOn` chain.
    pub fn table_borders(&self, style_id: &str) -> Option<TableBorders> {
        self.catalog
            .chain(style_id)
            .into_iter()
            .find_map(|s| s.table_borders)
    }
}
