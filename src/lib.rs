//! Reader for OOXML word-processing packages (`.docx`).
//!
//! [`load`] turns the bytes of a package into a [`Document`]: a node tree
//! with every style resolved to concrete formatting, section geometry,
//! header/footer content and the deobfuscated embedded fonts.

pub mod docx;
pub mod error;
pub mod fonts;
pub mod model;
pub mod validate;

pub use docx::{load, open};
pub use error::{Error, Result};
pub use model::{Document, Node, Paragraph, ResolvedStyle, Run, SectionProperties};
pub use validate::{ValidationIssue, Validator};
