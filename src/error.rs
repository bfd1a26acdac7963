use thiserror::Error;

/// Errors that abort a document load.
///
/// Optional parts never produce these: a missing or malformed styles, numbering,
/// theme, font or settings part degrades to defaults instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not a usable DOCX package.
    #[error("invalid DOCX: {0}")]
    InvalidDocx(String),

    /// A mandatory part is absent from the package.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// A mandatory part is not well-formed XML.
    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    /// An obfuscation key that does not reduce to exactly 32 hex digits.
    #[error("invalid font obfuscation key {0:?}: expected a 128-bit GUID")]
    InvalidFontKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
