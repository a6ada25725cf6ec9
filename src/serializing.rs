use std::{
    error::Error,
    io::{self, BufRead, ErrorKind, Write},
};

use crate::{
    Meta,
    serializers::{XmlSerializationError, XmlSerializer},
};

/// A format a [Meta] can be written to and read back from.
pub trait Serializer {
    type Error: Error;

    /// The name of the format, used in diagnostics.
    fn name() -> &'static str;

    fn serialize(buffer: &mut impl Write, meta: &Meta) -> Result<(), Self::Error>;

    fn deserialize(buffer: &mut impl BufRead) -> Result<Meta, Self::Error>;
}

/// Serializes a meta to an indented XML document.
pub fn serialize(meta: &Meta) -> Result<String, XmlSerializationError> {
    let mut buffer = Vec::new();
    XmlSerializer::serialize(&mut buffer, meta)?;
    String::from_utf8(buffer).map_err(|error| XmlSerializationError::Io(io::Error::new(ErrorKind::InvalidData, error)))
}

/// Deserializes a meta from an XML document.
pub fn deserialize(text: &str) -> Result<Meta, XmlSerializationError> {
    XmlSerializer::deserialize(&mut text.as_bytes())
}
