use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// Named-part access to the ZIP container of a DOCX package.
pub struct Archive<'a> {
    zip: zip::ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Archive<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::InvalidDocx("input is not a ZIP archive".into()))?;
        Ok(Self { zip })
    }

    /// Decoded text of a part, or `None` when the part is absent or unreadable.
    pub fn read_content(&mut self, part: &str) -> Option<String> {
        let bytes = self.read_bytes(part)?;
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("{part}: not valid UTF-8, decoding lossily");
                Some(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    pub fn read_bytes(&mut self, part: &str) -> Option<Vec<u8>> {
        let mut entry = self.zip.by_name(normalize_part(part)).ok()?;
        let mut data = Vec::new();
        if let Err(e) = entry.read_to_end(&mut data) {
            log::warn!("{part}: failed to read from archive: {e}");
            return None;
        }
        Some(data)
    }

    pub fn contains(&self, part: &str) -> bool {
        self.zip.index_for_name(normalize_part(part)).is_some()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }
}

fn normalize_part(part: &str) -> &str {
    part.strip_prefix('/').unwrap_or(part)
}
