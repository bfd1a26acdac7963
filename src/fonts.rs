//! Embedded fonts of a DOCX package.
//!
//! Word stores embedded fonts as obfuscated binaries: the first 32 bytes are
//! XOR-masked with a key derived from the `w:fontKey` GUID of the font table
//! entry. The catalog is built per document load; nothing here is shared
//! between loads.

use std::collections::HashMap;

use ttf_parser::Face;

use crate::docx::archive::Archive;
use crate::docx::rels::{ContentTypes, REL_NS, Relationships};
use crate::docx::{WML_NS, wml};
use crate::error::{Error, Result};

const OBFUSCATED_LEN: usize = 32;

/// Parse a GUID such as `{302EE813-EB4A-4642-A93A-89EF99B2457E}` into the
/// 16 key bytes of its binary layout: the 4-byte group and the two 2-byte
/// groups are little-endian, the trailing 8 bytes keep string order.
pub fn parse_font_key(guid: &str) -> Result<[u8; 16]> {
    let hex: String = guid.chars().filter(|c| *c != '{' && *c != '}' && *c != '-').collect();
    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidFontKey(guid.to_string()));
    }
    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| Error::InvalidFontKey(guid.to_string()))?;
    }
    Ok([
        bytes[3], bytes[2], bytes[1], bytes[0], // Data1 (LE)
        bytes[5], bytes[4], // Data2 (LE)
        bytes[7], bytes[6], // Data3 (LE)
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    ])
}

/// XOR the first 32 bytes with the key read back to front. Applying it twice
/// with the same key restores the input.
pub fn deobfuscate(data: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let mut out = data.to_vec();
    for (i, byte) in out.iter_mut().take(OBFUSCATED_LEN).enumerate() {
        *byte ^= key[15 - (i % 16)];
    }
    out
}

/// Family name from the `name` table (ID 1, not the typographic family).
fn font_family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

#[derive(Clone, Debug)]
pub struct EmbeddedFont {
    /// Family name as declared in `word/fontTable.xml`.
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    /// Deobfuscated font binary.
    pub data: Vec<u8>,
    pub key: Option<[u8; 16]>,
    /// Family reported by the font's own `name` table, once validated.
    pub face_family: Option<String>,
}

impl EmbeddedFont {
    /// Decode an obfuscated font binary. Fails only on a malformed key.
    pub fn from_obfuscated(family: &str, obfuscated: &[u8], key: &str) -> Result<Self> {
        let key = parse_font_key(key)?;
        Ok(Self {
            family: family.to_string(),
            bold: false,
            italic: false,
            data: deobfuscate(obfuscated, &key),
            key: Some(key),
            face_family: None,
        })
    }

    /// The binary as stored in the package.
    pub fn obfuscated_bytes(&self) -> Vec<u8> {
        match &self.key {
            Some(key) => deobfuscate(&self.data, key),
            None => self.data.clone(),
        }
    }

    /// Parse the binary as a font face; `None` means the font is unusable.
    pub fn validate(&self) -> Option<String> {
        match Face::parse(&self.data, 0) {
            Ok(face) => Some(font_family_name(&face).unwrap_or_else(|| self.family.clone())),
            Err(e) => {
                log::warn!("embedded font {} is not a usable font ({e})", self.family);
                None
            }
        }
    }
}

struct EmbedInfo {
    font_name: String,
    bold: bool,
    italic: bool,
    rel_id: String,
    font_key: Option<String>,
}

const OBFUSCATED_FONT_CT: &str = "application/vnd.openxmlformats-officedocument.obfuscatedFont";

/// Fonts embedded through `word/fontTable.xml`, keyed by
/// (lowercase family, bold, italic).
#[derive(Debug, Default)]
pub struct FontCatalog {
    fonts: HashMap<(String, bool, bool), EmbeddedFont>,
}

impl FontCatalog {
    /// Read the font table and its relationships, extract every embedded
    /// variant and deobfuscate it. Unreadable entries are skipped with a warning.
    pub fn load(
        archive: &mut Archive,
        part: &str,
        content_types: &ContentTypes,
    ) -> Self {
        let mut catalog = FontCatalog::default();

        let embeds = {
            let Some(xml_content) = archive.read_content(part) else {
                return catalog;
            };
            let xml = match roxmltree::Document::parse(&xml_content) {
                Ok(xml) => xml,
                Err(e) => {
                    log::warn!("ignoring malformed font table: {e}");
                    return catalog;
                }
            };

            let embed_variants: &[(&str, bool, bool)] = &[
                ("embedRegular", false, false),
                ("embedBold", true, false),
                ("embedItalic", false, true),
                ("embedBoldItalic", true, true),
            ];

            let mut embeds = Vec::new();
            for font_node in xml.root_element().children() {
                if font_node.tag_name().name() != "font"
                    || font_node.tag_name().namespace() != Some(WML_NS)
                {
                    continue;
                }
                let Some(font_name) = font_node.attribute((WML_NS, "name")) else {
                    continue;
                };
                for &(embed_tag, bold, italic) in embed_variants {
                    let Some(embed_node) = wml(font_node, embed_tag) else {
                        continue;
                    };
                    let Some(r_id) = embed_node.attribute((REL_NS, "id")) else {
                        continue;
                    };
                    embeds.push(EmbedInfo {
                        font_name: font_name.to_string(),
                        bold,
                        italic,
                        rel_id: r_id.to_string(),
                        font_key: embed_node
                            .attribute((WML_NS, "fontKey"))
                            .map(str::to_string),
                    });
                }
            }
            embeds
        };

        if embeds.is_empty() {
            return catalog;
        }

        let mut rels = Relationships::load(archive, part);
        for info in embeds {
            let Some(path) = rels.resolve_target(&info.rel_id) else {
                log::warn!("embedded font {}: dangling relationship {}", info.font_name, info.rel_id);
                continue;
            };
            let Some(raw) = archive.read_bytes(&path) else {
                log::warn!("embedded font {}: missing part {path}", info.font_name);
                continue;
            };

            let obfuscated = content_types.content_type(&path) == Some(OBFUSCATED_FONT_CT)
                || path.ends_with(".odttf");
            let mut font = match (&info.font_key, obfuscated) {
                (Some(key), _) => match EmbeddedFont::from_obfuscated(&info.font_name, &raw, key) {
                    Ok(font) => font,
                    Err(e) => {
                        log::warn!("embedded font {}: {e}", info.font_name);
                        continue;
                    }
                },
                (None, true) => {
                    log::warn!("embedded font {}: obfuscated but no fontKey", info.font_name);
                    continue;
                }
                (None, false) => EmbeddedFont {
                    family: info.font_name.clone(),
                    bold: false,
                    italic: false,
                    data: raw,
                    key: None,
                    face_family: None,
                },
            };
            font.bold = info.bold;
            font.italic = info.italic;

            let Some(face_family) = font.validate() else {
                continue;
            };
            font.face_family = Some(face_family);

            log::info!(
                "Extracted embedded font: {} bold={} italic={} ({} bytes)",
                font.family,
                font.bold,
                font.italic,
                font.data.len()
            );
            catalog
                .fonts
                .insert((font.family.to_lowercase(), font.bold, font.italic), font);
        }

        catalog
    }

    /// Look up an embedded face, falling back to the regular variant when the
    /// requested bold/italic combination is not embedded.
    pub fn find(&self, family: &str, bold: bool, italic: bool) -> Option<&EmbeddedFont> {
        let key = family.to_lowercase();
        self.fonts.get(&(key.clone(), bold, italic)).or_else(|| {
            if bold || italic {
                self.fonts.get(&(key, false, false))
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn into_fonts(self) -> Vec<EmbeddedFont> {
        let mut fonts: Vec<EmbeddedFont> = self.fonts.into_values().collect();
        fonts.sort_by(|a, b| {
            (a.family.as_str(), a.bold, a.italic).cmp(&(b.family.as_str(), b.bold, b.italic))
        });
        fonts
    }
}
