//! Common utilities shared across the package and document layers.

pub mod xml;

pub use xml::{escape_xml, unescape_xml};
