mod common;

use common::styles_xml;
use docxide_ooxml::docx::styles::{RunStyleRequest, StyleCatalog, StyleProps, StyleResolver};
use docxide_ooxml::docx::theme::Theme;
use docxide_ooxml::model::{Alignment, LineSpacing, ResolvedStyle, VertAlign};

fn resolver(inner: &str) -> StyleResolver {
    common::init_logging();
    let theme = Theme::default();
    StyleResolver::new(StyleCatalog::parse(&styles_xml(inner), &theme), &theme)
}

/// The snapshot a resolver produces when no style applies.
fn base() -> ResolvedStyle {
    ResolvedStyle {
        font_family: Theme::default().fonts.minor.latin,
        ..ResolvedStyle::default()
    }
}

const CHAIN: &str = r#"
<w:style w:type="paragraph" w:styleId="A">
  <w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr>
  <w:rPr><w:sz w:val="28"/><w:b/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="B">
  <w:basedOn w:val="A"/>
  <w:rPr><w:i/><w:color w:val="FF0000"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="C">
  <w:basedOn w:val="B"/>
  <w:pPr><w:jc w:val="right"/></w:pPr>
  <w:rPr><w:b w:val="0"/></w:rPr>
</w:style>"#;

#[test]
fn own_fields_overlay_defaults() {
    let mut r = resolver(CHAIN);
    let a = r.resolve_paragraph_style(Some("A"));
    let expected = ResolvedStyle {
        alignment: Alignment::Center,
        space_after: 12.0,
        font_size: 14.0,
        bold: true,
        ..base()
    };
    assert_eq!(a, expected);
}

#[test]
fn inheritance_chain_nearest_wins() {
    let mut r = resolver(CHAIN);
    let c = r.resolve_paragraph_style(Some("C"));
    assert_eq!(c.alignment, Alignment::Right);
    assert_eq!(c.space_after, 12.0);
    assert_eq!(c.font_size, 14.0);
    assert!(c.italic);
    assert!(!c.bold, "explicit w:val=0 in C must clear A's bold");
    assert_eq!(c.color, [255, 0, 0]);
}

#[test]
fn direct_only_run_is_defaults_plus_direct() {
    let mut r = resolver("");
    let direct = StyleProps {
        bold: Some(true),
        font_size: Some(9.0),
        vertical_align: Some(VertAlign::Superscript),
        ..StyleProps::default()
    };
    let run = r.resolve_run_style(&RunStyleRequest {
        paragraph_style_id: None,
        paragraph_direct: None,
        run_style_id: None,
        direct: Some(&direct),
    });
    let expected = ResolvedStyle {
        bold: true,
        font_size: 9.0,
        vertical_align: VertAlign::Superscript,
        ..base()
    };
    assert_eq!(run, expected);
}

#[test]
fn character_style_setting_default_value_still_overrides() {
    let mut r = resolver(
        r#"
<w:style w:type="paragraph" w:styleId="Loud"><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="character" w:styleId="Quiet"><w:rPr><w:b w:val="0"/><w:sz w:val="22"/></w:rPr></w:style>"#,
    );
    let run = r.resolve_run_style(&RunStyleRequest {
        paragraph_style_id: Some("Loud"),
        paragraph_direct: None,
        run_style_id: Some("Quiet"),
        direct: None,
    });
    assert!(!run.bold);
    assert_eq!(run.font_size, 11.0);

    let direct = StyleProps {
        bold: Some(true),
        ..StyleProps::default()
    };
    let run = r.resolve_run_style(&RunStyleRequest {
        paragraph_style_id: Some("Loud"),
        paragraph_direct: None,
        run_style_id: Some("Quiet"),
        direct: Some(&direct),
    });
    assert!(run.bold);
    assert_eq!(run.font_size, 11.0);
}

#[test]
fn default_paragraph_style_and_doc_defaults() {
    let mut r = resolver(
        r#"
<w:docDefaults>
  <w:rPrDefault><w:rPr><w:rFonts w:ascii="Georgia"/><w:sz w:val="24"/></w:rPr></w:rPrDefault>
  <w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault>
</w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:pPr><w:jc w:val="both"/></w:pPr></w:style>"#,
    );
    let default = r.default_style();
    assert_eq!(default.font_family, "Georgia");
    assert_eq!(default.font_size, 12.0);
    assert_eq!(default.alignment, Alignment::Justify);
    assert_eq!(default.space_after, 8.0);
    assert_eq!(default.line_spacing, LineSpacing::Auto(259.0 / 240.0));

    assert_eq!(default, r.resolve_paragraph_style(None));
    assert_eq!(default, r.resolve_paragraph_style(Some("Normal")));
}

#[test]
fn direct_only_run_over_default_paragraph_style() {
    let mut r = resolver(
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style>"#,
    );
    let direct = StyleProps {
        italic: Some(true),
        ..StyleProps::default()
    };
    let run = r.resolve_run_style(&RunStyleRequest {
        direct: Some(&direct),
        ..RunStyleRequest::default()
    });

    let mut expected = r.default_style();
    assert!(expected.bold);
    assert_eq!(expected.font_size, 20.0);
    expected.italic = true;
    assert_eq!(run, expected);
}

#[test]
fn paragraph_direct_props_reach_runs() {
    let mut r = resolver(CHAIN);
    let paragraph_direct = StyleProps {
        alignment: Some(Alignment::Justify),
        indent_left: Some(36.0),
        ..StyleProps::default()
    };
    let run_direct = StyleProps {
        alignment: Some(Alignment::Left),
        ..StyleProps::default()
    };
    let paragraph = r.resolve_paragraph_with(Some("A"), &paragraph_direct);
    let run = r.resolve_run_style(&RunStyleRequest {
        paragraph_style_id: Some("A"),
        paragraph_direct: Some(&paragraph_direct),
        run_style_id: None,
        direct: None,
    });
    assert_eq!(run, paragraph);

    let run = r.resolve_run_style(&RunStyleRequest {
        paragraph_style_id: Some("A"),
        paragraph_direct: Some(&paragraph_direct),
        run_style_id: None,
        direct: Some(&run_direct),
    });
    assert_eq!(run.alignment, Alignment::Left);
    assert_eq!(run.indent_left, 36.0);
}

const LATENT: &str = r#"
<w:latentStyles w:defLockedState="0" w:defUIPriority="99" w:defSemiHidden="1" w:defUnhideWhenUsed="0" w:defQFormat="0" w:count="376">
  <w:lsdException w:name="Normal" w:semiHidden="0" w:uiPriority="0" w:qFormat="1"/>
  <w:lsdException w:name="heading 1" w:semiHidden="0" w:uiPriority="9" w:unhideWhenUsed="0" w:qFormat="1"/>
  <w:lsdException w:name="Mention" w:locked="1"/>
</w:latentStyles>"#;

#[test]
fn latent_style_defaults_and_exceptions() {
    let r = resolver(LATENT);
    let latent = &r.catalog().latent;
    assert_eq!(latent.count, Some(376));
    assert_eq!(latent.exceptions.len(), 3);

    assert_eq!(latent.ui_priority("heading 1"), 9);
    assert!(latent.is_quick_format("heading 1"));
    assert!(!latent.is_semi_hidden("heading 1"));

    assert_eq!(latent.ui_priority("Mention"), 99);
    assert!(latent.is_semi_hidden("Mention"));
    assert_eq!(latent.exceptions["Mention"].locked, Some(true));

    assert_eq!(latent.ui_priority("Caption"), 99);
    assert!(!latent.is_quick_format("Caption"));
    assert!(latent.is_semi_hidden("Caption"));
}

#[test]
fn unknown_style_id_resolves_to_defaults() {
    let mut r = resolver(CHAIN);
    assert_eq!(r.resolve_paragraph_style(Some("Missing")), base());
}

#[test]
fn based_on_cycles_terminate() {
    let mut r = resolver(
        r#"
<w:style w:type="paragraph" w:styleId="X"><w:basedOn w:val="Y"/><w:rPr><w:b/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Y"><w:basedOn w:val="X"/><w:rPr><w:i/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Self"><w:basedOn w:val="Self"/><w:rPr><w:caps/></w:rPr></w:style>"#,
    );
    let x = r.resolve_paragraph_style(Some("X"));
    assert!(x.bold && x.italic);
    let s = r.resolve_paragraph_style(Some("Self"));
    assert!(s.caps);
    assert_eq!(r.catalog().chain("X").len(), 2);
    assert_eq!(r.catalog().chain("Self").len(), 1);
}

#[test]
fn cache_fills_lazily_and_clears() {
    let mut r = resolver(CHAIN);
    assert!(!r.is_cached("C"));
    let first = r.resolve_paragraph_style(Some("C"));
    assert!(r.is_cached("C"));
    r.clear_cache();
    assert!(!r.is_cached("C"));
    assert_eq!(r.resolve_paragraph_style(Some("C")), first);
}

#[test]
fn explicit_none_clears_inherited_highlight_and_border() {
    let mut r = resolver(
        r#"
<w:style w:type="paragraph" w:styleId="Boxed">
  <w:pPr><w:pBdr><w:top w:val="single" w:sz="8"/><w:bottom w:val="single" w:sz="8"/></w:pBdr></w:pPr>
  <w:rPr><w:highlight w:val="yellow"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Open">
  <w:basedOn w:val="Boxed"/>
  <w:pPr><w:pBdr><w:top w:val="nil"/></w:pBdr></w:pPr>
  <w:rPr><w:highlight w:val="none"/></w:rPr>
</w:style>"#,
    );
    let boxed = r.resolve_paragraph_style(Some("Boxed"));
    assert_eq!(boxed.highlight, Some([255, 255, 0]));
    assert_eq!(boxed.borders.top.map(|b| b.width_pt), Some(1.0));

    let open = r.resolve_paragraph_style(Some("Open"));
    assert_eq!(open.highlight, None);
    assert!(open.borders.top.is_none());
    assert!(open.borders.bottom.is_some());
}

#[test]
fn theme_fonts_and_colors_resolve() {
    let mut r = resolver(
        r#"
<w:style w:type="paragraph" w:styleId="Heading1">
  <w:rPr><w:rFonts w:asciiTheme="majorHAnsi" w:hAnsiTheme="majorHAnsi"/><w:color w:val="000000" w:themeColor="accent1"/></w:rPr>
</w:style>"#,
    );
    let h = r.resolve_paragraph_style(Some("Heading1"));
    assert_eq!(h.font_family, "Aptos Display");
    assert_eq!(h.color, [0x15, 0x60, 0x82]);
}

#[test]
fn hanging_indent_is_negative_first_line() {
    let mut r = resolver(
        r#"<w:style w:type="paragraph" w:styleId="Hang"><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:style>"#,
    );
    let s = r.resolve_paragraph_style(Some("Hang"));
    assert_eq!(s.indent_left, 36.0);
    assert_eq!(s.indent_first_line, -18.0);
}

#[test]
fn table_borders_follow_based_on() {
    let r = resolver(
        r#"
<w:style w:type="table" w:styleId="Grid">
  <w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/></w:tblBorders></w:tblPr>
</w:style>
<w:style w:type="table" w:styleId="GridAccent"><w:basedOn w:val="Grid"/></w:style>"#,
    );
    let borders = r.table_borders("GridAccent").unwrap();
    assert_eq!(borders.top.map(|b| b.width_pt), Some(0.5));
    assert!(borders.inside_h.is_some());
    assert!(borders.bottom.is_none());
    assert!(r.table_borders("Nope").is_none());
}
