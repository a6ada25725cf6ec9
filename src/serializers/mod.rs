//! Structures for serializing and deserializing.

mod xml;
pub use xml::SchemaError;
pub use xml::XmlFlatSerializer;
pub use xml::XmlSerializationError;
pub use xml::XmlSerializer;
