use std::collections::HashMap;

use crate::docx::rels::ContentTypes;
use crate::fonts::EmbeddedFont;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VertAlign {
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineSpacing {
    Auto(f32),    // multiplier (e.g. 1.0 = single, 1.15 = default)
    Exact(f32),   // fixed height in points
    AtLeast(f32), // minimum height in points
}

/// One side of a paragraph or cell border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    pub width_pt: f32,
    pub space_pt: f32,
    pub color: [u8; 3],
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Borders {
    pub top: Option<Border>,
    pub bottom: Option<Border>,
    pub left: Option<Border>,
    pub right: Option<Border>,
}

/// Fully populated formatting snapshot produced by the style resolver.
///
/// Every field carries a concrete value; see the [`Default`] impl for the
/// values used when nothing in the cascade sets a field.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    pub alignment: Alignment,
    pub space_before: f32, // points
    pub space_after: f32,  // points
    pub line_spacing: LineSpacing,
    pub indent_left: f32,
    pub indent_right: f32,
    /// Negative for a hanging indent.
    pub indent_first_line: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: [u8; 3],
    pub font_size: f32, // points
    pub font_family: String,
    pub highlight: Option<[u8; 3]>,
    pub vertical_align: VertAlign,
    pub caps: bool,
    pub small_caps: bool,
    pub strike: bool,
    pub outline: bool,
    pub shadow: bool,
    pub emboss: bool,
    pub imprint: bool,
    pub borders: Borders,
}

/// Family of [`ResolvedStyle::default`]. Loaded documents never show it: the
/// style resolver starts from the theme's minor font instead.
pub const DEFAULT_FONT_FAMILY: &str = "Calibri";
pub const DEFAULT_FONT_SIZE: f32 = 11.0;

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: LineSpacing::Auto(1.0),
            indent_left: 0.0,
            indent_right: 0.0,
            indent_first_line: 0.0,
            bold: false,
            italic: false,
            underline: false,
            color: [0, 0, 0],
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            highlight: None,
            vertical_align: VertAlign::Baseline,
            caps: false,
            small_caps: false,
            strike: false,
            outline: false,
            shadow: false,
            emboss: false,
            imprint: false,
            borders: Borders::default(),
        }
    }
}

/// A node of the document tree. Paragraphs, cells and list items own ordered
/// children of the same type.
#[derive(Clone, Debug)]
pub enum Node {
    Paragraph(Paragraph),
    Run(Run),
    Table(Table),
    List(List),
    Image(Image),
    Shape(Shape),
}

#[derive(Clone, Debug)]
pub struct Paragraph {
    pub style_id: Option<String>,
    pub style: ResolvedStyle,
    pub children: Vec<Node>,
    pub page_break_before: bool,
}

impl Paragraph {
    /// Concatenated text of all runs, including runs nested in shapes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Run(run) => out.push_str(&run.text),
            Node::Paragraph(p) => collect_text(&p.children, out),
            Node::Shape(s) => collect_text(&s.children, out),
            Node::Table(_) | Node::List(_) | Node::Image(_) => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldCode {
    Page,
    NumPages,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Hyperlink {
    /// External URL resolved from the part's relationships.
    Url(String),
    /// Bookmark inside the document (`w:anchor`).
    Anchor(String),
}

#[derive(Clone, Debug)]
pub struct Run {
    /// Tabs are `\t`, line breaks `\n`.
    pub text: String,
    pub style_id: Option<String>,
    pub style: ResolvedStyle,
    pub hyperlink: Option<Hyperlink>,
    pub field_code: Option<FieldCode>,
    pub footnote_id: Option<u32>,
    pub endnote_id: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Other,
}

#[derive(Clone, Debug)]
pub struct Image {
    pub rel_id: String,
    /// Archive path of the image part; `None` when the relationship is dangling.
    pub target: Option<String>,
    pub data: Option<Vec<u8>>,
    pub format: Option<ImageFormat>,
    pub pixel_size: Option<(u32, u32)>,
    pub display_width: f32,  // points
    pub display_height: f32, // points
    pub description: Option<String>,
    pub floating: bool,
}

#[derive(Clone, Debug)]
pub struct Shape {
    /// Preset geometry name (`rect`, `ellipse`, ...).
    pub geometry: Option<String>,
    pub width: f32,  // points
    pub height: f32, // points
    pub fill: Option<[u8; 3]>,
    pub floating: bool,
    /// Text-box content.
    pub children: Vec<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VMerge {
    None,
    Restart,
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellVAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Debug)]
pub struct Table {
    pub style_id: Option<String>,
    pub grid_columns: Vec<f32>, // points
    pub rows: Vec<TableRow>,
    pub indent: f32,
}

#[derive(Clone, Debug)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub height: Option<f32>,
    pub height_exact: bool,
    pub is_header: bool,
}

#[derive(Clone, Debug)]
pub struct TableCell {
    pub width: Option<f32>, // points
    pub children: Vec<Node>,
    pub col_span: u16,
    /// Rows covered by a vertical merge that starts here; 1 otherwise,
    /// and 0 on continuation cells.
    pub row_span: u16,
    pub v_merge: VMerge,
    pub borders: Borders,
    pub shading: Option<[u8; 3]>,
    pub v_align: CellVAlign,
}

#[derive(Clone, Debug)]
pub struct List {
    pub num_id: String,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Debug)]
pub struct ListItem {
    pub level: u8,
    /// Rendered label such as `1.`, `a)` or a bullet glyph. Empty for picture bullets.
    pub label: String,
    /// Key into [`Document::picture_bullets`].
    pub picture_bullet: Option<u32>,
    pub children: Vec<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PageSize {
    Letter,
    Legal,
    Executive,
    A3,
    A4,
    A5,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SectionBreakType {
    NextPage,
    Continuous,
    OddPage,
    EvenPage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub width: f32, // points
    pub space: f32, // gap after this column, in points
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnsConfig {
    pub columns: Vec<ColumnDef>,
    pub sep: bool,
}

/// Relationship ids of the header or footer parts, per page type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderFooterRefs {
    pub default: Option<String>,
    pub first: Option<String>,
    pub even: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SectionProperties {
    pub page_size: PageSize,
    /// Only populated for [`PageSize::Custom`]; named sizes carry no explicit dimensions.
    pub custom_width: Option<f32>,
    pub custom_height: Option<f32>,
    pub orientation: Orientation,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub header_margin: f32,
    pub footer_margin: f32,
    pub columns: Option<ColumnsConfig>,
    pub headers: HeaderFooterRefs,
    pub footers: HeaderFooterRefs,
    pub different_first_page: bool,
    pub break_type: SectionBreakType,
    pub background_color: Option<[u8; 3]>,
}

impl SectionProperties {
    /// Page dimensions in points, portrait-normalized for named sizes then
    /// swapped for landscape. `None` for a custom size missing a dimension.
    pub fn page_dimensions(&self) -> Option<(f32, f32)> {
        let (w, h) = match self.page_size {
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Executive => (522.0, 756.0),
            PageSize::A3 => (841.9, 1190.55),
            PageSize::A4 => (595.3, 841.9),
            PageSize::A5 => (419.55, 595.3),
            PageSize::Custom => return Some((self.custom_width?, self.custom_height?)),
        };
        match self.orientation {
            Orientation::Portrait => Some((w, h)),
            Orientation::Landscape => Some((h, w)),
        }
    }
}

impl Default for SectionProperties {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            custom_width: None,
            custom_height: None,
            orientation: Orientation::Portrait,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
            margin_right: 72.0,
            header_margin: 36.0,
            footer_margin: 36.0,
            columns: None,
            headers: HeaderFooterRefs::default(),
            footers: HeaderFooterRefs::default(),
            different_first_page: false,
            break_type: SectionBreakType::NextPage,
            background_color: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PageType {
    Default,
    First,
    Even,
}

#[derive(Clone, Debug)]
pub struct HeaderFooter {
    pub kind: HeaderFooterKind,
    pub page_type: PageType,
    pub rel_id: String,
    pub part: String,
    pub nodes: Vec<Node>,
}

/// Auxiliary parts kept verbatim for re-export.
#[derive(Clone, Debug, Default)]
pub struct PassThroughParts {
    pub settings: Option<String>,
    pub content_types: Option<String>,
    pub root_relationships: Option<String>,
    pub header_background: Option<String>,
    pub header_background_relationships: Option<String>,
    pub footnotes: Option<String>,
    pub endnotes: Option<String>,
}

/// A relationship id used by `part` that its relationship table lacks.
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedReference {
    pub part: String,
    pub id: String,
}

#[derive(Debug)]
pub struct Document {
    pub nodes: Vec<Node>,
    /// One entry per `w:sectPr`, in document order; the body-level section is last.
    pub sections: Vec<SectionProperties>,
    pub headers_footers: Vec<HeaderFooter>,
    pub fonts: Vec<EmbeddedFont>,
    /// Picture-bullet images from the numbering part, keyed by `w:numPicBulletId`.
    pub picture_bullets: HashMap<u32, Vec<u8>>,
    pub content_types: ContentTypes,
    pub parts: PassThroughParts,
    /// Relationship ids referenced by some part but not defined in its scope.
    pub unresolved_references: Vec<UnresolvedReference>,
}

impl Document {
    /// The body-level (final) section, if the document declares one.
    pub fn section(&self) -> Option<&SectionProperties> {
        self.sections.last()
    }

    pub fn picture_bullet(&self, id: u32) -> Option<&[u8]> {
        self.picture_bullets.get(&id).map(Vec::as_slice)
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Paragraph(p) => Some(p),
            _ => None,
        })
    }
}
