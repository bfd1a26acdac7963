use super::DML_NS;

fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

fn typeface<'a>(font: roxmltree::Node<'a, 'a>, slot: &str) -> Option<&'a str> {
    dml(font, slot)
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

/// Color slots of `a:clrScheme`, as six-digit uppercase hex.
#[derive(Clone, Debug, PartialEq)]
pub struct ThemeColors {
    pub dk1: String,
    pub lt1: String,
    pub dk2: String,
    pub lt2: String,
    pub accent: [String; 6],
    pub hlink: String,
    pub fol_hlink: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        let s = |v: &str| v.to_string();
        Self {
            dk1: s("000000"),
            lt1: s("FFFFFF"),
            dk2: s("0E2841"),
            lt2: s("E8E8E8"),
            accent: [
                s("156082"),
                s("E97132"),
                s("196B24"),
                s("0F9ED5"),
                s("A02B93"),
                s("4EA72E"),
            ],
            hlink: s("467886"),
            fol_hlink: s("96607D"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FontSlots {
    pub latin: String,
    pub east_asia: Option<String>,
    pub complex_script: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThemeFonts {
    pub major: FontSlots,
    pub minor: FontSlots,
}

impl Default for ThemeFonts {
    fn default() -> Self {
        Self {
            major: FontSlots {
                latin: String::from("Aptos Display"),
                east_asia: None,
                complex_script: None,
            },
            minor: FontSlots {
                latin: String::from("Aptos"),
                east_asia: None,
                complex_script: None,
            },
        }
    }
}

/// Aliases used by `w:themeColor` / `w:color` and the canonical slot they map to.
const COLOR_ALIASES: &[(&str, &str)] = &[
    ("text1", "dk1"),
    ("background1", "lt1"),
    ("text2", "dk2"),
    ("background2", "lt2"),
    ("dark1", "dk1"),
    ("light1", "lt1"),
    ("dark2", "dk2"),
    ("light2", "lt2"),
    ("tx1", "dk1"),
    ("bg1", "lt1"),
    ("tx2", "dk2"),
    ("bg2", "lt2"),
    ("hyperlink", "hlink"),
    ("followedHyperlink", "folHlink"),
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Theme {
    pub colors: ThemeColors,
    pub fonts: ThemeFonts,
}

impl Theme {
    /// Parse `word/theme/theme1.xml`. Slots the part does not define keep the
    /// default Office theme values; malformed XML yields the default theme.
    pub fn parse(xml_content: &str) -> Self {
        let mut theme = Theme::default();
        let xml = match roxmltree::Document::parse(xml_content) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("ignoring malformed theme part: {e}");
                return theme;
            }
        };

        for node in xml.descendants() {
            if node.tag_name().namespace() != Some(DML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "clrScheme" => {
                    for slot in node.children().filter(|n| n.is_element()) {
                        let Some(hex) = scheme_color_value(slot) else {
                            continue;
                        };
                        if let Some(target) = theme.color_slot_mut(slot.tag_name().name()) {
                            *target = hex;
                        }
                    }
                }
                "majorFont" => read_font_slots(node, &mut theme.fonts.major),
                "minorFont" => read_font_slots(node, &mut theme.fonts.minor),
                _ => {}
            }
        }
        theme
    }

    fn color_slot_mut(&mut self, name: &str) -> Option<&mut String> {
        let c = &mut self.colors;
        Some(match name {
            "dk1" => &mut c.dk1,
            "lt1" => &mut c.lt1,
            "dk2" => &mut c.dk2,
            "lt2" => &mut c.lt2,
            "accent1" => &mut c.accent[0],
            "accent2" => &mut c.accent[1],
            "accent3" => &mut c.accent[2],
            "accent4" => &mut c.accent[3],
            "accent5" => &mut c.accent[4],
            "accent6" => &mut c.accent[5],
            "hlink" => &mut c.hlink,
            "folHlink" => &mut c.fol_hlink,
            _ => return None,
        })
    }

    /// Hex value of a scheme color by canonical name or alias.
    pub fn get_color(&self, name: &str) -> Option<&str> {
        let canonical = COLOR_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, target)| *target)
            .unwrap_or(name);
        let c = &self.colors;
        let hex = match canonical {
            "dk1" => &c.dk1,
            "lt1" => &c.lt1,
            "dk2" => &c.dk2,
            "lt2" => &c.lt2,
            "accent1" => &c.accent[0],
            "accent2" => &c.accent[1],
            "accent3" => &c.accent[2],
            "accent4" => &c.accent[3],
            "accent5" => &c.accent[4],
            "accent6" => &c.accent[5],
            "hlink" => &c.hlink,
            "folHlink" => &c.fol_hlink,
            _ => return None,
        };
        Some(hex.as_str())
    }

    /// Family for a theme font reference such as `minorHAnsi` or `majorEastAsia`.
    pub fn get_font(&self, reference: &str) -> Option<&str> {
        let (slots, slot) = if let Some(rest) = reference.strip_prefix("major") {
            (&self.fonts.major, rest)
        } else if let Some(rest) = reference.strip_prefix("minor") {
            (&self.fonts.minor, rest)
        } else {
            return None;
        };
        match slot {
            "Latin" | "HAnsi" | "Ascii" => Some(slots.latin.as_str()),
            "EastAsia" => slots.east_asia.as_deref(),
            "Bidi" | "ComplexScript" => slots.complex_script.as_deref(),
            _ => None,
        }
    }
}

fn read_font_slots(font: roxmltree::Node, slots: &mut FontSlots) {
    if let Some(tf) = typeface(font, "latin") {
        slots.latin = tf.to_string();
    }
    if let Some(tf) = typeface(font, "ea") {
        slots.east_asia = Some(tf.to_string());
    }
    if let Some(tf) = typeface(font, "cs") {
        slots.complex_script = Some(tf.to_string());
    }
}

fn scheme_color_value(slot: roxmltree::Node) -> Option<String> {
    let value = if let Some(srgb) = dml(slot, "srgbClr") {
        srgb.attribute("val")
    } else {
        dml(slot, "sysClr").and_then(|n| n.attribute("lastClr"))
    }?;
    (value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| value.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="44546a"/></a:dk2>
      <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
      <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
    </a:clrScheme>
    <a:fontScheme name="Office">
      <a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface="Times New Roman"/></a:majorFont>
      <a:minorFont><a:latin typeface="Calibri"/><a:ea typeface="MS Mincho"/><a:cs typeface=""/></a:minorFont>
    </a:fontScheme>
  </a:themeElements>
</a:theme>"#;

    #[test]
    fn aliases_resolve_to_canonical_slots() {
        for theme in [Theme::default(), Theme::parse(THEME)] {
            assert_eq!(theme.get_color("text1"), theme.get_color("dk1"));
            assert_eq!(theme.get_color("background1"), theme.get_color("lt1"));
            assert_eq!(theme.get_color("text2"), theme.get_color("dk2"));
            assert_eq!(theme.get_color("background2"), theme.get_color("lt2"));
        }
    }

    #[test]
    fn parses_scheme_colors_and_fonts() {
        let theme = Theme::parse(THEME);
        assert_eq!(theme.get_color("dk2"), Some("44546A"));
        assert_eq!(theme.get_color("accent1"), Some("4472C4"));
        assert_eq!(theme.get_color("accent2"), Some("E97132"));
        assert_eq!(theme.get_color("hyperlink"), Some("0563C1"));
        assert_eq!(theme.get_color("nope"), None);

        assert_eq!(theme.get_font("majorHAnsi"), Some("Calibri Light"));
        assert_eq!(theme.get_font("minorAscii"), Some("Calibri"));
        assert_eq!(theme.get_font("minorEastAsia"), Some("MS Mincho"));
        assert_eq!(theme.get_font("majorEastAsia"), None);
        assert_eq!(theme.get_font("majorBidi"), Some("Times New Roman"));
    }

    #[test]
    fn malformed_theme_falls_back_to_defaults() {
        assert_eq!(Theme::parse("<a:theme"), Theme::default());
    }
}
