use std::collections::HashMap;

use super::archive::Archive;
use super::rels::{REL_NS, Relationships};
use super::styles::resolve_font;
use super::theme::Theme;
use super::{DML_NS, VML_NS, WML_NS, parse_hex_color, twips_attr, wml, wml_attr};

/// How a list level draws its bullet.
#[derive(Clone, Debug, PartialEq)]
pub enum Bullet {
    /// A literal glyph, optionally in an explicit font.
    Glyph { glyph: String, font: Option<String> },
    /// A glyph whose font or color comes from the theme.
    Themed {
        glyph: String,
        font: Option<String>,
        color: Option<[u8; 3]>,
    },
    /// A picture bullet, keyed by `w:numPicBulletId`.
    Picture { id: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumberingLevel {
    pub level: u8,
    pub format: String,
    pub level_text: String,
    pub start: u32,
    pub indent_left: f32,
    pub indent_hanging: f32,
    pub bullet: Option<Bullet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumberingDefinition {
    pub abstract_id: String,
    pub levels: HashMap<u8, NumberingLevel>,
}

#[derive(Clone, Debug)]
struct NumInstance {
    abstract_id: String,
    start_overrides: HashMap<u8, u32>,
}

/// Word rejects list start values above this.
const MAX_START: u32 = 32767;

/// Parsed `word/numbering.xml`.
#[derive(Clone, Debug, Default)]
pub struct Numbering {
    abstract_nums: HashMap<String, NumberingDefinition>,
    nums: HashMap<String, NumInstance>,
    picture_bullets: HashMap<u32, Vec<u8>>,
}

impl Numbering {
    /// Load numbering definitions; picture bullets are read through the part's
    /// own relationships. A missing or malformed part yields no definitions.
    pub fn load(archive: &mut Archive, part: &str, theme: &Theme) -> Self {
        let Some(xml_content) = archive.read_content(part) else {
            return Numbering::default();
        };
        let mut rels = Relationships::load(archive, part);
        let mut numbering = Numbering::parse(&xml_content, theme);

        let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
            return numbering;
        };
        for pic in xml.root_element().children().filter(|n| {
            n.tag_name().name() == "numPicBullet" && n.tag_name().namespace() == Some(WML_NS)
        }) {
            let Some(id) = pic
                .attribute((WML_NS, "numPicBulletId"))
                .and_then(|v| v.parse::<u32>().ok())
            else {
                continue;
            };
            let rel_id = pic.descendants().find_map(|n| {
                let ns = n.tag_name().namespace();
                match n.tag_name().name() {
                    "imagedata" if ns == Some(VML_NS) => n.attribute((REL_NS, "id")),
                    "blip" if ns == Some(DML_NS) => n.attribute((REL_NS, "embed")),
                    _ => None,
                }
            });
            let data = rel_id
                .and_then(|rid| rels.resolve_target(rid))
                .and_then(|path| archive.read_bytes(&path));
            match data {
                Some(bytes) => {
                    numbering.picture_bullets.insert(id, bytes);
                }
                None => log::debug!("picture bullet {id} has no readable image"),
            }
        }
        numbering
    }

    pub fn parse(xml_content: &str, theme: &Theme) -> Self {
        let mut numbering = Numbering::default();
        let xml = match roxmltree::Document::parse(xml_content) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("ignoring malformed numbering part: {e}");
                return numbering;
            }
        };

        for node in xml.root_element().children() {
            if node.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match node.tag_name().name() {
                "abstractNum" => {
                    let Some(abs_id) = node.attribute((WML_NS, "abstractNumId")) else {
                        continue;
                    };
                    let levels = node
                        .children()
                        .filter(|n| {
                            n.tag_name().name() == "lvl" && n.tag_name().namespace() == Some(WML_NS)
                        })
                        .filter_map(|lvl| parse_level(lvl, theme))
                        .map(|l| (l.level, l))
                        .collect();
                    numbering.abstract_nums.insert(
                        abs_id.to_string(),
                        NumberingDefinition {
                            abstract_id: abs_id.to_string(),
                            levels,
                        },
                    );
                }
                "num" => {
                    let Some(num_id) = node.attribute((WML_NS, "numId")) else {
                        continue;
                    };
                    let Some(abs_id) = wml_attr(node, "abstractNumId") else {
                        continue;
                    };
                    let start_overrides = node
                        .children()
                        .filter(|n| {
                            n.tag_name().name() == "lvlOverride"
                                && n.tag_name().namespace() == Some(WML_NS)
                        })
                        .filter_map(|o| {
                            let ilvl = o.attribute((WML_NS, "ilvl"))?.parse::<u8>().ok()?;
                            let start = wml_attr(o, "startOverride")?.parse::<u32>().ok()?;
                            let start = start.min(MAX_START);
                            Some((ilvl, start))
                        })
                        .collect();
                    numbering.nums.insert(
                        num_id.to_string(),
                        NumInstance {
                            abstract_id: abs_id.to_string(),
                            start_overrides,
                        },
                    );
                }
                _ => {}
            }
        }
        numbering
    }

    pub fn definition(&self, num_id: &str) -> Option<&NumberingDefinition> {
        let num = self.nums.get(num_id)?;
        self.abstract_nums.get(&num.abstract_id)
    }

    pub fn level(&self, num_id: &str, ilvl: u8) -> Option<&NumberingLevel> {
        self.definition(num_id)?.levels.get(&ilvl)
    }

    /// Start value of a level, honoring `w:lvlOverride/w:startOverride`.
    pub fn start(&self, num_id: &str, ilvl: u8) -> u32 {
        self.nums
            .get(num_id)
            .and_then(|n| n.start_overrides.get(&ilvl).copied())
            .or_else(|| self.level(num_id, ilvl).map(|l| l.start))
            .unwrap_or(1)
    }

    pub fn picture_bullet(&self, id: u32) -> Option<&[u8]> {
        self.picture_bullets.get(&id).map(Vec::as_slice)
    }

    /// Image bytes of every readable `w:numPicBullet`, keyed by its id.
    pub fn into_picture_bullets(self) -> HashMap<u32, Vec<u8>> {
        self.picture_bullets
    }

    pub fn is_empty(&self) -> bool {
        self.nums.is_empty()
    }
}

fn parse_level(lvl: roxmltree::Node, theme: &Theme) -> Option<NumberingLevel> {
    let level = lvl.attribute((WML_NS, "ilvl"))?.parse::<u8>().ok()?;
    if level > 8 {
        return None;
    }
    let format = wml_attr(lvl, "numFmt").unwrap_or("decimal").to_string();
    let level_text = wml_attr(lvl, "lvlText").unwrap_or("").to_string();
    let start = wml_attr(lvl, "start")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(1)
        .min(MAX_START);
    let ind = wml(lvl, "pPr").and_then(|ppr| wml(ppr, "ind"));
    let indent_left = ind
        .and_then(|n| twips_attr(n, "left").or_else(|| twips_attr(n, "start")))
        .unwrap_or(0.0);
    let indent_hanging = ind.and_then(|n| twips_attr(n, "hanging")).unwrap_or(0.0);

    let bullet = if let Some(id) = wml_attr(lvl, "lvlPicBulletId").and_then(|v| v.parse().ok()) {
        Some(Bullet::Picture { id })
    } else if format == "bullet" {
        let rpr = wml(lvl, "rPr");
        let rfonts = rpr.and_then(|n| wml(n, "rFonts"));
        let color_node = rpr.and_then(|n| wml(n, "color"));
        let theme_font = rfonts.is_some_and(|n| {
            n.attribute((WML_NS, "asciiTheme")).is_some()
                || n.attribute((WML_NS, "hAnsiTheme")).is_some()
        });
        let theme_color = color_node.and_then(|n| n.attribute((WML_NS, "themeColor")));
        let font = rfonts.and_then(|n| resolve_font(n, theme));
        let glyph = normalize_bullet_text(&level_text);
        if theme_font || theme_color.is_some() {
            let color = theme_color
                .and_then(|name| theme.get_color(name))
                .and_then(parse_hex_color)
                .or_else(|| {
                    color_node
                        .and_then(|n| n.attribute((WML_NS, "val")))
                        .and_then(parse_hex_color)
                });
            Some(Bullet::Themed { glyph, font, color })
        } else {
            Some(Bullet::Glyph { glyph, font })
        }
    } else {
        None
    };

    Some(NumberingLevel {
        level,
        format,
        level_text,
        start,
        indent_left,
        indent_hanging,
        bullet,
    })
}

fn to_roman(mut n: u32) -> String {
    const TABLE: &[(u32, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut result = String::new();
    for &(value, numeral) in TABLE {
        while n >= value {
            result.push_str(numeral);
            n -= value;
        }
    }
    result
}

fn to_letters(value: u32, base: u8) -> String {
    if value == 0 {
        return String::new();
    }
    let mut n = value - 1;
    let mut result = String::new();
    loop {
        result.insert(0, (base + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

pub(crate) fn format_number(value: u32, num_fmt: &str) -> String {
    match num_fmt {
        "decimal" => value.to_string(),
        "decimalZero" => format!("{value:02}"),
        "lowerLetter" => to_letters(value, b'a'),
        "upperLetter" => to_letters(value, b'A'),
        "lowerRoman" => to_roman(value),
        "upperRoman" => to_roman(value).to_uppercase(),
        "none" => String::new(),
        _ => value.to_string(),
    }
}

fn normalize_bullet_text(text: &str) -> String {
    let text: String = text
        .chars()
        .map(|c| {
            let cp = c as u32;
            if (0xF000..=0xF0FF).contains(&cp) {
                symbol_pua_to_unicode(cp).unwrap_or(c)
            } else {
                c
            }
        })
        .collect();
    if text.is_empty() {
        "\u{2022}".to_string()
    } else {
        text
    }
}

pub(super) fn symbol_pua_to_unicode(cp: u32) -> Option<char> {
    let sym = cp - 0xF000;
    let mapped = match sym {
        0xB7 => '\u{2022}', // bullet
        0xA7 => '\u{25A0}', // black square (Wingdings)
        0xA8 => '\u{25CB}', // white circle
        0xD8 => '\u{2666}', // diamond
        0x76 => '\u{221A}', // check mark
        _ => return char::from_u32(sym),
    };
    Some(mapped)
}

/// List label produced for one numbered paragraph.
#[derive(Clone, Debug, PartialEq)]
pub struct ListLabel {
    pub num_id: String,
    pub level: u8,
    pub text: String,
    pub picture_bullet: Option<u32>,
    pub indent_left: f32,
    pub indent_hanging: f32,
}

/// Running per-list counters while walking the body in document order.
#[derive(Debug, Default)]
pub struct ListCounters {
    counters: HashMap<(String, u8), u32>,
    last_seen_level: HashMap<String, u8>,
}

impl ListCounters {
    /// Advance the counter for `(num_id, ilvl)` and render its label.
    /// Returns `None` for `numId` 0 or undefined numbering.
    pub fn next_label(&mut self, numbering: &Numbering, num_id: &str, ilvl: u8) -> Option<ListLabel> {
        if num_id == "0" {
            return None;
        }
        let levels = &numbering.definition(num_id)?.levels;
        let def = levels.get(&ilvl)?;

        // Reset deeper-level counters when returning to a higher level
        if let Some(prev) = self.last_seen_level.get(num_id).copied()
            && ilvl <= prev
        {
            for deeper in (ilvl + 1)..=prev {
                self.counters.remove(&(num_id.to_string(), deeper));
            }
        }
        self.last_seen_level.insert(num_id.to_string(), ilvl);

        let start = numbering.start(num_id, ilvl);
        let current = *self
            .counters
            .entry((num_id.to_string(), ilvl))
            .and_modify(|c| *c = c.saturating_add(1))
            .or_insert(start);

        let (text, picture_bullet) = match &def.bullet {
            Some(Bullet::Picture { id }) => (String::new(), Some(*id)),
            Some(Bullet::Glyph { glyph, .. }) | Some(Bullet::Themed { glyph, .. }) => {
                (glyph.clone(), None)
            }
            None => {
                let mut label = def.level_text.clone();
                for lvl_idx in 0..9u8 {
                    let placeholder = format!("%{}", lvl_idx + 1);
                    if !label.contains(&placeholder) {
                        continue;
                    }
                    let value = if lvl_idx == ilvl {
                        current
                    } else {
                        self.counters
                            .get(&(num_id.to_string(), lvl_idx))
                            .copied()
                            .unwrap_or_else(|| numbering.start(num_id, lvl_idx))
                    };
                    let fmt = levels
                        .get(&lvl_idx)
                        .map(|d| d.format.as_str())
                        .unwrap_or("decimal");
                    label = label.replace(&placeholder, &format_number(value, fmt));
                }
                (label, None)
            }
        };

        Some(ListLabel {
            num_id: num_id.to_string(),
            level: ilvl,
            text,
            picture_bullet,
            indent_left: def.indent_left,
            indent_hanging: def.indent_hanging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERING: &str = r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/>
      <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl>
    <w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%1.%2)"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="&#xF0B7;"/>
      <w:rPr><w:rFonts w:ascii="Symbol" w:hAnsi="Symbol"/></w:rPr></w:lvl>
    <w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/><w:lvlText w:val="o"/>
      <w:rPr><w:color w:val="000000" w:themeColor="accent1"/></w:rPr></w:lvl>
    <w:lvl w:ilvl="2"><w:numFmt w:val="bullet"/><w:lvlText w:val=""/><w:lvlPicBulletId w:val="3"/></w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
  <w:num w:numId="3"><w:abstractNumId w:val="0"/>
    <w:lvlOverride w:ilvl="0"><w:startOverride w:val="5"/></w:lvlOverride></w:num>
</w:numbering>"#;

    #[test]
    fn labels_count_and_nest() {
        let numbering = Numbering::parse(NUMBERING, &Theme::default());
        let mut counters = ListCounters::default();
        let labels: Vec<String> = [(0u8), 1, 1, 0, 1]
            .iter()
            .map(|&lvl| counters.next_label(&numbering, "1", lvl).unwrap().text)
            .collect();
        assert_eq!(labels, ["1.", "1.a)", "1.b)", "2.", "2.a)"]);
    }

    #[test]
    fn start_override_applies_per_instance() {
        let numbering = Numbering::parse(NUMBERING, &Theme::default());
        let mut counters = ListCounters::default();
        assert_eq!(counters.next_label(&numbering, "3", 0).unwrap().text, "5.");
        assert_eq!(counters.next_label(&numbering, "1", 0).unwrap().text, "1.");
    }

    #[test]
    fn bullet_kinds() {
        let numbering = Numbering::parse(NUMBERING, &Theme::default());
        assert_eq!(
            numbering.level("2", 0).unwrap().bullet,
            Some(Bullet::Glyph {
                glyph: "\u{2022}".into(),
                font: Some("Symbol".into())
            })
        );
        assert_eq!(
            numbering.level("2", 1).unwrap().bullet,
            Some(Bullet::Themed {
                glyph: "o".into(),
                font: None,
                color: Some([0x15, 0x60, 0x82])
            })
        );
        assert_eq!(
            numbering.level("2", 2).unwrap().bullet,
            Some(Bullet::Picture { id: 3 })
        );
        assert_eq!(numbering.level("1", 0).unwrap().indent_left, 36.0);
    }

    #[test]
    fn number_formats() {
        assert_eq!(format_number(4, "upperRoman"), "IV");
        assert_eq!(format_number(28, "lowerLetter"), "ab");
        assert_eq!(format_number(7, "decimalZero"), "07");
        assert_eq!(format_number(3, "none"), "");
    }

    #[test]
    fn huge_start_values_are_clamped() {
        let xml = r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:start w:val="4294967295"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="0"/>
    <w:lvlOverride w:ilvl="0"><w:startOverride w:val="4294967295"/></w:lvlOverride></w:num>
</w:numbering>"#;
        let numbering = Numbering::parse(xml, &Theme::default());
        assert_eq!(numbering.start("1", 0), MAX_START);
        assert_eq!(numbering.start("2", 0), MAX_START);
        let mut counters = ListCounters::default();
        let labels: Vec<String> = (0..3)
            .map(|_| counters.next_label(&numbering, "1", 0).unwrap().text)
            .collect();
        assert_eq!(labels, ["32767.", "32768.", "32769."]);
    }

    #[test]
    fn counters_saturate() {
        let numbering = Numbering::parse(NUMBERING, &Theme::default());
        let mut counters = ListCounters::default();
        counters.counters.insert(("1".to_string(), 0), u32::MAX);
        counters.last_seen_level.insert("1".to_string(), 0);
        let label = counters.next_label(&numbering, "1", 0).unwrap();
        assert_eq!(label.text, format!("{}.", u32::MAX));
    }

    #[test]
    fn num_id_zero_is_not_a_list() {
        let numbering = Numbering::parse(NUMBERING, &Theme::default());
        assert!(ListCounters::default().next_label(&numbering, "0", 0).is_none());
    }
}
