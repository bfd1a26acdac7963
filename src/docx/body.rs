//! Block-level parsing of `w:body`, header/footer roots, table cells and
//! text boxes into [`Node`] trees.

use std::io::Cursor;

use crate::model::{
    Borders, CellVAlign, FieldCode, Hyperlink, Image, ImageFormat, List, ListItem, Node,
    Paragraph, ResolvedStyle, Run, Shape, Table, TableCell, TableRow, VMerge,
};

use super::archive::Archive;
use super::numbering::{ListCounters, ListLabel, Numbering, symbol_pua_to_unicode};
use super::rels::{REL_NS, Relationships};
use super::styles::{RunStyleRequest, StyleProps, StyleResolver, TableBorders};
use super::theme::Theme;
use super::{
    DML_NS, VML_NS, WML_NS, WPD_NS, WPS_NS, parse_border, parse_hex_color, twips_attr, wml,
    wml_attr, wml_bool,
};

const MC_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
const EMU_PER_PT: f32 = 12700.0;

/// Everything a block parser needs from the load in progress. Headers and
/// footers get their own context with their part's relationships.
pub(super) struct BodyContext<'a, 'b> {
    pub(super) archive: &'a mut Archive<'b>,
    pub(super) styles: &'a mut StyleResolver,
    pub(super) theme: &'a Theme,
    pub(super) numbering: &'a Numbering,
    pub(super) rels: &'a mut Relationships,
    pub(super) counters: &'a mut ListCounters,
}

fn is_element(node: roxmltree::Node, ns: &str, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(ns)
}

fn child<'a>(
    node: roxmltree::Node<'a, 'a>,
    ns: &str,
    name: &str,
) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_element(*n, ns, name))
}

/// Flatten SDT wrappers: descend into w:sdtContent and collect effective children.
pub(super) fn collect_block_nodes<'a>(
    parent: roxmltree::Node<'a, 'a>,
) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if is_element(child, WML_NS, "sdt") {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

/// Paragraphs and tables of a block container, with consecutive numbered
/// paragraphs of the same `numId` grouped into one [`List`].
pub(super) fn parse_blocks(ctx: &mut BodyContext, parent: roxmltree::Node) -> Vec<Node> {
    let mut out = Vec::new();
    for node in collect_block_nodes(parent) {
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "p" => {
                let (para, label) = parse_paragraph(ctx, node);
                match label {
                    Some(label) => push_list_item(&mut out, label, para),
                    None => out.push(Node::Paragraph(para)),
                }
            }
            "tbl" => out.push(Node::Table(parse_table(ctx, node))),
            _ => {}
        }
    }
    out
}

fn push_list_item(out: &mut Vec<Node>, label: ListLabel, para: Paragraph) {
    let item = ListItem {
        level: label.level,
        label: label.text,
        picture_bullet: label.picture_bullet,
        children: vec![Node::Paragraph(para)],
    };
    if let Some(Node::List(list)) = out.last_mut()
        && list.num_id == label.num_id
    {
        list.items.push(item);
        return;
    }
    out.push(Node::List(List {
        num_id: label.num_id,
        items: vec![item],
    }));
}

fn parse_paragraph(ctx: &mut BodyContext, p: roxmltree::Node) -> (Paragraph, Option<ListLabel>) {
    let ppr = wml(p, "pPr");
    let style_id = ppr.and_then(|n| wml_attr(n, "pStyle"));
    let direct = StyleProps::from_nodes(ppr, None, ctx.theme);

    let label = ppr.and_then(|n| wml(n, "numPr")).and_then(|num_pr| {
        let num_id = wml_attr(num_pr, "numId")?;
        let ilvl = wml_attr(num_pr, "ilvl")
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(0);
        ctx.counters.next_label(ctx.numbering, num_id, ilvl)
    });

    // Numbering indents sit between the paragraph style and direct pPr.
    let direct = match &label {
        Some(label) => {
            let mut props = StyleProps {
                indent_left: Some(label.indent_left),
                indent_first_line: Some(-label.indent_hanging),
                ..StyleProps::default()
            };
            props.overlay(&direct);
            props
        }
        None => direct,
    };
    let style = ctx.styles.resolve_paragraph_with(style_id, &direct);

    let mut state = InlineState::new(style_id, &direct);
    let mut children = Vec::new();
    parse_inline(ctx, p, None, &mut state, &mut children);

    let page_break_before =
        ppr.and_then(|n| wml_bool(n, "pageBreakBefore")).unwrap_or(false) || state.page_break;

    let para = Paragraph {
        style_id: style_id.map(str::to_string),
        style,
        children,
        page_break_before,
    };
    (para, label)
}

#[derive(Clone, Copy, PartialEq)]
enum FieldPhase {
    Outside,
    Instruction,
    Result,
}

/// Field and break tracking across the runs of one paragraph; complex
/// fields routinely span several runs.
struct InlineState<'s> {
    paragraph_style_id: Option<&'s str>,
    paragraph_direct: &'s StyleProps,
    field_depth: u32,
    phase: FieldPhase,
    instr: String,
    hide_result: bool,
    page_break: bool,
}

impl<'s> InlineState<'s> {
    fn new(paragraph_style_id: Option<&'s str>, paragraph_direct: &'s StyleProps) -> Self {
        Self {
            paragraph_style_id,
            paragraph_direct,
            field_depth: 0,
            phase: FieldPhase::Outside,
            instr: String::new(),
            hide_result: false,
            page_break: false,
        }
    }

    fn shows_text(&self) -> bool {
        match self.phase {
            FieldPhase::Outside => true,
            FieldPhase::Instruction => false,
            FieldPhase::Result => !self.hide_result,
        }
    }
}

fn field_code(instr: &str) -> Option<FieldCode> {
    let keyword = instr.split_whitespace().next()?;
    if keyword.eq_ignore_ascii_case("PAGE") {
        Some(FieldCode::Page)
    } else if keyword.eq_ignore_ascii_case("NUMPAGES") {
        Some(FieldCode::NumPages)
    } else {
        None
    }
}

fn parse_inline(
    ctx: &mut BodyContext,
    parent: roxmltree::Node,
    link: Option<&Hyperlink>,
    state: &mut InlineState,
    out: &mut Vec<Node>,
) {
    for node in parent.children() {
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "r" => parse_run(ctx, node, link, state, out),
            "hyperlink" => {
                let target = hyperlink_target(ctx.rels, node);
                parse_inline(ctx, node, target.as_ref().or(link), state, out);
            }
            "fldSimple" => {
                let code = node.attribute((WML_NS, "instr")).and_then(field_code);
                match code {
                    Some(code) => {
                        let rpr = wml(node, "r").and_then(|r| wml(r, "rPr"));
                        let run = RunBuilder::new(ctx, rpr, link, state);
                        out.push(run.field(code));
                    }
                    None => parse_inline(ctx, node, link, state, out),
                }
            }
            "sdt" => {
                if let Some(content) = wml(node, "sdtContent") {
                    parse_inline(ctx, content, link, state, out);
                }
            }
            "ins" | "smartTag" | "customXml" => parse_inline(ctx, node, link, state, out),
            _ => {}
        }
    }
}

/// External URL for `r:id`, bookmark for `w:anchor`. A dangling id is
/// recorded by the relationship table and yields no link.
fn hyperlink_target(rels: &mut Relationships, node: roxmltree::Node) -> Option<Hyperlink> {
    if let Some(rid) = node.attribute((REL_NS, "id")) {
        return rels.resolve_target(rid).map(Hyperlink::Url);
    }
    node.attribute((WML_NS, "anchor"))
        .map(|anchor| Hyperlink::Anchor(anchor.to_string()))
}

/// Accumulates the text of one `w:r` under its resolved style.
struct RunBuilder {
    style: ResolvedStyle,
    style_id: Option<String>,
    hyperlink: Option<Hyperlink>,
    text: String,
}

impl RunBuilder {
    fn new(
        ctx: &mut BodyContext,
        rpr: Option<roxmltree::Node>,
        link: Option<&Hyperlink>,
        state: &InlineState,
    ) -> Self {
        let run_style_id = rpr.and_then(|n| wml_attr(n, "rStyle"));
        let direct = rpr.map(|n| StyleProps::from_nodes(None, Some(n), ctx.theme));
        let style = ctx.styles.resolve_run_style(&RunStyleRequest {
            paragraph_style_id: state.paragraph_style_id,
            paragraph_direct: Some(state.paragraph_direct),
            run_style_id,
            direct: direct.as_ref(),
        });
        Self {
            style,
            style_id: run_style_id.map(str::to_string),
            hyperlink: link.cloned(),
            text: String::new(),
        }
    }

    fn run(&self, text: String) -> Run {
        Run {
            text,
            style_id: self.style_id.clone(),
            style: self.style.clone(),
            hyperlink: self.hyperlink.clone(),
            field_code: None,
            footnote_id: None,
            endnote_id: None,
        }
    }

    fn flush(&mut self, out: &mut Vec<Node>) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            out.push(Node::Run(self.run(text)));
        }
    }

    fn field(&self, code: FieldCode) -> Node {
        Node::Run(Run {
            field_code: Some(code),
            ..self.run(String::new())
        })
    }
}

fn parse_run(
    ctx: &mut BodyContext,
    r: roxmltree::Node,
    link: Option<&Hyperlink>,
    state: &mut InlineState,
    out: &mut Vec<Node>,
) {
    let mut run = RunBuilder::new(ctx, wml(r, "rPr"), link, state);

    for node in r.children() {
        if is_element(node, MC_NS, "AlternateContent") {
            run.flush(out);
            out.extend(parse_alternate_content(ctx, node));
            continue;
        }
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "fldChar" => match node.attribute((WML_NS, "fldCharType")) {
                Some("begin") => {
                    run.flush(out);
                    state.field_depth += 1;
                    if state.field_depth == 1 {
                        state.phase = FieldPhase::Instruction;
                        state.instr.clear();
                    }
                }
                Some("separate") if state.field_depth == 1 => {
                    state.phase = FieldPhase::Result;
                    state.hide_result = field_code(&state.instr).is_some();
                }
                Some("end") if state.field_depth > 0 => {
                    run.flush(out);
                    if state.field_depth == 1 {
                        if let Some(code) = field_code(&state.instr) {
                            out.push(run.field(code));
                        }
                        state.phase = FieldPhase::Outside;
                        state.hide_result = false;
                        state.instr.clear();
                    }
                    state.field_depth -= 1;
                }
                _ => {}
            },
            "instrText" if state.field_depth == 1 && state.phase == FieldPhase::Instruction => {
                if let Some(t) = node.text() {
                    state.instr.push_str(t);
                }
            }
            _ if !state.shows_text() => {}
            "t" => {
                if let Some(t) = node.text() {
                    // Word treats newlines in w:t as whitespace; only w:br creates line breaks
                    run.text.push_str(&t.replace('\n', " "));
                }
            }
            "tab" | "ptab" => run.text.push('\t'),
            "br" => match node.attribute((WML_NS, "type")) {
                Some("page") => state.page_break = true,
                Some("column") => {}
                _ => run.text.push('\n'),
            },
            "cr" => run.text.push('\n'),
            "noBreakHyphen" => run.text.push('\u{2011}'),
            "softHyphen" => run.text.push('\u{AD}'),
            "sym" => {
                if let Some(c) = node
                    .attribute((WML_NS, "char"))
                    .and_then(|v| u32::from_str_radix(v, 16).ok())
                    .and_then(|cp| {
                        if (0xF000..=0xF0FF).contains(&cp) {
                            symbol_pua_to_unicode(cp)
                        } else {
                            char::from_u32(cp)
                        }
                    })
                {
                    run.text.push(c);
                }
            }
            "footnoteReference" | "endnoteReference" => {
                run.flush(out);
                let id = node
                    .attribute((WML_NS, "id"))
                    .and_then(|v| v.parse::<u32>().ok());
                let mut note = run.run(String::new());
                if node.tag_name().name() == "footnoteReference" {
                    note.footnote_id = id;
                } else {
                    note.endnote_id = id;
                }
                out.push(Node::Run(note));
            }
            "drawing" => {
                run.flush(out);
                out.extend(parse_drawing(ctx, node));
            }
            "pict" | "object" => {
                run.flush(out);
                out.extend(parse_vml_picture(ctx, node));
            }
            _ => {}
        }
    }
    run.flush(out);
}

/// `mc:AlternateContent` wrapping a drawing: the first `mc:Choice` holding a
/// `w:drawing` wins, else the `mc:Fallback` (usually VML).
fn parse_alternate_content(ctx: &mut BodyContext, node: roxmltree::Node) -> Vec<Node> {
    let choice = node
        .children()
        .filter(|n| is_element(*n, MC_NS, "Choice"))
        .find(|n| wml(*n, "drawing").is_some());
    let Some(branch) = choice.or_else(|| child(node, MC_NS, "Fallback")) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for n in branch.children() {
        if is_element(n, WML_NS, "drawing") {
            out.extend(parse_drawing(ctx, n));
        } else if is_element(n, WML_NS, "pict") {
            out.extend(parse_vml_picture(ctx, n));
        }
    }
    out
}

struct Placement {
    width: f32,
    height: f32,
    description: Option<String>,
    floating: bool,
}

fn parse_drawing(ctx: &mut BodyContext, drawing: roxmltree::Node) -> Vec<Node> {
    let mut out = Vec::new();
    for container in drawing.children() {
        let floating = match container.tag_name().name() {
            "inline" => false,
            "anchor" => true,
            _ => continue,
        };
        if container.tag_name().namespace() != Some(WPD_NS) {
            continue;
        }

        let extent = child(container, WPD_NS, "extent");
        let emu = |attr: &str| {
            extent
                .and_then(|n| n.attribute(attr))
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.0)
                / EMU_PER_PT
        };
        let description = child(container, WPD_NS, "docPr")
            .and_then(|n| n.attribute("descr").or_else(|| n.attribute("title")))
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let placement = Placement {
            width: emu("cx"),
            height: emu("cy"),
            description,
            floating,
        };

        if let Some(wsp) = container
            .descendants()
            .find(|n| is_element(*n, WPS_NS, "wsp"))
        {
            out.push(Node::Shape(parse_shape(ctx, wsp, placement)));
        } else if let Some(embed) = find_blip_embed(container) {
            out.push(Node::Image(load_image(ctx, embed, placement)));
        }
    }
    out
}

fn find_blip_embed<'a>(container: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    container
        .descendants()
        .find(|n| is_element(*n, DML_NS, "blip"))
        .and_then(|n| n.attribute((REL_NS, "embed")))
}

fn parse_shape(ctx: &mut BodyContext, wsp: roxmltree::Node, placement: Placement) -> Shape {
    let sp_pr = child(wsp, WPS_NS, "spPr");
    let geometry = sp_pr
        .and_then(|n| child(n, DML_NS, "prstGeom"))
        .and_then(|n| n.attribute("prst"))
        .map(str::to_string);
    let fill = sp_pr
        .and_then(|n| child(n, DML_NS, "solidFill"))
        .and_then(|fill| {
            if let Some(srgb) = child(fill, DML_NS, "srgbClr") {
                srgb.attribute("val").and_then(parse_hex_color)
            } else {
                child(fill, DML_NS, "schemeClr")
                    .and_then(|n| n.attribute("val"))
                    .and_then(|name| ctx.theme.get_color(name))
                    .and_then(parse_hex_color)
            }
        });
    let children = child(wsp, WPS_NS, "txbx")
        .and_then(|txbx| wml(txbx, "txbxContent"))
        .map(|content| parse_blocks(ctx, content))
        .unwrap_or_default();

    Shape {
        geometry,
        width: placement.width,
        height: placement.height,
        fill,
        floating: placement.floating,
        children,
    }
}

/// Legacy `w:pict` image: `v:imagedata r:id` sized by the `v:shape` style.
fn parse_vml_picture(ctx: &mut BodyContext, pict: roxmltree::Node) -> Option<Node> {
    let imagedata = pict
        .descendants()
        .find(|n| is_element(*n, VML_NS, "imagedata"))?;
    let rel_id = imagedata.attribute((REL_NS, "id"))?;
    let shape = imagedata.parent_element();
    let style = shape.and_then(|s| s.attribute("style")).unwrap_or("");
    let (width, height) = vml_size(style);
    let placement = Placement {
        width,
        height,
        description: shape
            .and_then(|s| s.attribute("alt"))
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        floating: style.contains("position:absolute"),
    };
    Some(Node::Image(load_image(ctx, rel_id, placement)))
}

/// `width:100pt;height:50pt` (also `in`, `px`) in points.
fn vml_size(style: &str) -> (f32, f32) {
    let mut width = 0.0;
    let mut height = 0.0;
    for decl in style.split(';') {
        let Some((key, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let pts = if let Some(v) = value.strip_suffix("pt") {
            v.parse::<f32>().ok()
        } else if let Some(v) = value.strip_suffix("in") {
            v.parse::<f32>().ok().map(|v| v * 72.0)
        } else if let Some(v) = value.strip_suffix("px") {
            v.parse::<f32>().ok().map(|v| v * 0.75)
        } else {
            value.parse::<f32>().ok()
        };
        match (key.trim(), pts) {
            ("width", Some(v)) => width = v,
            ("height", Some(v)) => height = v,
            _ => {}
        }
    }
    (width, height)
}

/// Resolve an image relationship and sniff the payload. Dangling or external
/// targets keep their placement but carry no data.
fn load_image(ctx: &mut BodyContext, rel_id: &str, placement: Placement) -> Image {
    let external = ctx.rels.peek(rel_id).is_some_and(|rel| rel.external);
    let target = ctx.rels.resolve_target(rel_id);
    let data = match &target {
        Some(path) if !external => {
            let data = ctx.archive.read_bytes(path);
            if data.is_none() {
                log::warn!("image {rel_id}: part {path} is missing");
            }
            data
        }
        Some(_) => None,
        None => {
            log::warn!("image {rel_id}: dangling relationship");
            None
        }
    };
    let format = data.as_deref().map(image_format);
    let pixel_size = data.as_deref().and_then(pixel_size);

    Image {
        rel_id: rel_id.to_string(),
        target,
        data,
        format,
        pixel_size,
        display_width: placement.width,
        display_height: placement.height,
        description: placement.description,
        floating: placement.floating,
    }
}

fn image_format(data: &[u8]) -> ImageFormat {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Png) => ImageFormat::Png,
        Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Ok(image::ImageFormat::Gif) => ImageFormat::Gif,
        Ok(image::ImageFormat::Bmp) => ImageFormat::Bmp,
        _ => ImageFormat::Other,
    }
}

/// Pixel dimensions from the image header, without decoding.
fn pixel_size(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn parse_table(ctx: &mut BodyContext, tbl: roxmltree::Node) -> Table {
    let tbl_pr = wml(tbl, "tblPr");
    let style_id = tbl_pr.and_then(|n| wml_attr(n, "tblStyle"));
    let indent = tbl_pr
        .and_then(|n| wml(n, "tblInd"))
        .and_then(|n| twips_attr(n, "w"))
        .unwrap_or(0.0);

    let grid_columns: Vec<f32> = wml(tbl, "tblGrid")
        .map(|grid| {
            grid.children()
                .filter(|c| is_element(*c, WML_NS, "gridCol"))
                .map(|c| twips_attr(c, "w").unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();

    let table_borders = tbl_pr
        .and_then(|n| wml(n, "tblBorders"))
        .map(TableBorders::parse)
        .or_else(|| style_id.and_then(|id| ctx.styles.table_borders(id)))
        .unwrap_or_default();

    let row_nodes: Vec<_> = collect_block_nodes(tbl)
        .into_iter()
        .filter(|n| is_element(*n, WML_NS, "tr"))
        .collect();
    let row_count = row_nodes.len();

    let mut rows = Vec::with_capacity(row_count);
    // Grid column of every cell, for the vertical-merge pass.
    let mut grid_positions: Vec<Vec<usize>> = Vec::with_capacity(row_count);
    for (row_idx, tr) in row_nodes.into_iter().enumerate() {
        let tr_pr = wml(tr, "trPr");
        let height_node = tr_pr.and_then(|n| wml(n, "trHeight"));
        let height = height_node.and_then(|n| twips_attr(n, "val"));
        let height_exact = height_node
            .and_then(|n| n.attribute((WML_NS, "hRule")))
            .is_some_and(|rule| rule == "exact");
        let is_header = tr_pr.and_then(|n| wml_bool(n, "tblHeader")).unwrap_or(false);
        let mut grid_col = tr_pr
            .and_then(|n| wml_attr(n, "gridBefore"))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0)
            .min(grid_columns.len());

        let position = CellPosition {
            first_row: row_idx == 0,
            last_row: row_idx + 1 == row_count,
            grid_len: grid_columns.len(),
        };
        let mut cells = Vec::new();
        let mut positions = Vec::new();
        for tc in collect_block_nodes(tr)
            .into_iter()
            .filter(|n| is_element(*n, WML_NS, "tc"))
        {
            let cell = parse_cell(ctx, tc, &table_borders, &position, grid_col);
            positions.push(grid_col);
            grid_col = grid_col.saturating_add(cell.col_span as usize);
            cells.push(cell);
        }
        grid_positions.push(positions);
        rows.push(TableRow {
            cells,
            height,
            height_exact,
            is_header,
        });
    }

    compute_row_spans(&mut rows, &grid_positions);

    Table {
        style_id: style_id.map(str::to_string),
        grid_columns,
        rows,
        indent,
    }
}

struct CellPosition {
    first_row: bool,
    last_row: bool,
    grid_len: usize,
}

fn parse_cell(
    ctx: &mut BodyContext,
    tc: roxmltree::Node,
    table_borders: &TableBorders,
    position: &CellPosition,
    grid_col: usize,
) -> TableCell {
    let tc_pr = wml(tc, "tcPr");

    let width = tc_pr.and_then(|n| wml(n, "tcW")).and_then(|n| {
        match n.attribute((WML_NS, "type")).unwrap_or("dxa") {
            "dxa" => twips_attr(n, "w"),
            _ => None,
        }
    });
    let col_span = tc_pr
        .and_then(|n| wml_attr(n, "gridSpan"))
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(1)
        .max(1);
    let v_merge = match tc_pr.and_then(|n| wml(n, "vMerge")) {
        None => VMerge::None,
        Some(n) if n.attribute((WML_NS, "val")) == Some("restart") => VMerge::Restart,
        Some(_) => VMerge::Continue,
    };
    let v_align = match tc_pr.and_then(|n| wml_attr(n, "vAlign")) {
        Some("center") => CellVAlign::Center,
        Some("bottom") => CellVAlign::Bottom,
        _ => CellVAlign::Top,
    };
    let shading = tc_pr
        .and_then(|n| wml(n, "shd"))
        .and_then(|n| n.attribute((WML_NS, "fill")))
        .and_then(parse_hex_color);

    let last_col = grid_col.saturating_add(col_span as usize) >= position.grid_len;
    let mut borders = Borders {
        top: if position.first_row { table_borders.top } else { table_borders.inside_h },
        bottom: if position.last_row { table_borders.bottom } else { table_borders.inside_h },
        left: if grid_col == 0 { table_borders.left } else { table_borders.inside_v },
        right: if last_col { table_borders.right } else { table_borders.inside_v },
    };
    if let Some(tc_borders) = tc_pr.and_then(|n| wml(n, "tcBorders")) {
        let side = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| wml(tc_borders, name))
                .map(parse_border)
        };
        if let Some(b) = side(&["top"]) {
            borders.top = b;
        }
        if let Some(b) = side(&["bottom"]) {
            borders.bottom = b;
        }
        if let Some(b) = side(&["left", "start"]) {
            borders.left = b;
        }
        if let Some(b) = side(&["right", "end"]) {
            borders.right = b;
        }
    }

    TableCell {
        width,
        children: parse_blocks(ctx, tc),
        col_span,
        row_span: if v_merge == VMerge::Continue { 0 } else { 1 },
        v_merge,
        borders,
        shading,
        v_align,
    }
}

/// A `restart` cell spans itself plus every directly following row whose
/// cell at the same grid column continues the merge.
fn compute_row_spans(rows: &mut [TableRow], grid_positions: &[Vec<usize>]) {
    let continues_at = |row: usize, col: usize| -> bool {
        grid_positions[row]
            .iter()
            .position(|&c| c == col)
            .is_some_and(|idx| rows[row].cells[idx].v_merge == VMerge::Continue)
    };
    let mut spans = Vec::new();
    for (r, positions) in grid_positions.iter().enumerate() {
        for (idx, &col) in positions.iter().enumerate() {
            if rows[r].cells[idx].v_merge != VMerge::Restart {
                continue;
            }
            let extra = (r + 1..rows.len())
                .take_while(|&next| continues_at(next, col))
                .count();
            spans.push((r, idx, 1 + extra as u16));
        }
    }
    for (r, idx, span) in spans {
        rows[r].cells[idx].row_span = span;
    }
}
