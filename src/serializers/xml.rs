use std::io::{BufRead, Error, Write};

use quick_xml::{
    Reader, Writer,
    escape::{escape, resolve_predefined_entity},
    events::{BytesDecl, BytesEnd, BytesRef, BytesStart, BytesText, Event},
};
use thiserror::Error as ThisError;
use tracing::{debug, trace};

use crate::{
    Attribute, Meta, Serializer,
    attribute::{EncodingError, validate_text},
};

const ROOT_TAG: &str = "ismrmrdMeta";
const ENTRY_TAG: &str = "meta";
const NAME_TAG: &str = "name";
const VALUE_TAG: &str = "value";

#[derive(Debug, ThisError)]
pub enum XmlSerializationError {
    #[error("IO Error: {0}")]
    Io(#[from] Error),
    #[error("Failed To Encode Attribute {0:?}: {1}")]
    Encoding(String, #[source] EncodingError),
    #[error("Malformed Document: {0}")]
    MalformedDocument(String),
    #[error("Schema Error: {0}")]
    Schema(#[from] SchemaError),
}

impl XmlSerializationError {
    /// Returns true if a value in the meta couldn't be represented as text.
    pub fn is_encoding(&self) -> bool {
        matches!(self, XmlSerializationError::Encoding(_, _))
    }

    /// Returns true if the text was not well formed XML.
    pub fn is_malformed(&self) -> bool {
        matches!(self, XmlSerializationError::MalformedDocument(_))
    }

    /// Returns true if the XML was well formed but not a meta document.
    pub fn is_schema(&self) -> bool {
        matches!(self, XmlSerializationError::Schema(_))
    }
}

impl From<quick_xml::Error> for XmlSerializationError {
    fn from(error: quick_xml::Error) -> Self {
        XmlSerializationError::MalformedDocument(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SchemaError {
    #[error("Root Element Is <{0}> Instead Of <ismrmrdMeta>")]
    UnexpectedRoot(String),
    #[error("Meta Entry Has No Name")]
    MissingName,
    #[error("Meta Entry {0:?} Has No Value")]
    MissingValue(String),
    #[error("Unexpected Element <{0}> Inside Text Element")]
    UnexpectedElement(String),
}

/// Writes meta documents with each element on its own indented line.
pub struct XmlSerializer;

impl Serializer for XmlSerializer {
    type Error = XmlSerializationError;

    fn name() -> &'static str {
        "xml"
    }

    fn serialize(buffer: &mut impl Write, meta: &Meta) -> Result<(), Self::Error> {
        write_document(Writer::new_with_indent(buffer, b' ', 2), meta)?;
        debug!(serializer = Self::name(), attributes = meta.len(), "serialized meta");
        Ok(())
    }

    fn deserialize(buffer: &mut impl BufRead) -> Result<Meta, Self::Error> {
        let meta = read_document(Reader::from_reader(buffer))?;
        debug!(serializer = Self::name(), attributes = meta.len(), "deserialized meta");
        Ok(meta)
    }
}

/// Writes meta documents without any whitespace between elements.
pub struct XmlFlatSerializer;

impl Serializer for XmlFlatSerializer {
    type Error = XmlSerializationError;

    fn name() -> &'static str {
        "xml_flat"
    }

    fn serialize(buffer: &mut impl Write, meta: &Meta) -> Result<(), Self::Error> {
        write_document(Writer::new(buffer), meta)?;
        debug!(serializer = Self::name(), attributes = meta.len(), "serialized meta");
        Ok(())
    }

    fn deserialize(buffer: &mut impl BufRead) -> Result<Meta, Self::Error> {
        let meta = read_document(Reader::from_reader(buffer))?;
        debug!(serializer = Self::name(), attributes = meta.len(), "deserialized meta");
        Ok(meta)
    }
}

fn write_document<W: Write>(mut writer: Writer<W>, meta: &Meta) -> Result<(), XmlSerializationError> {
    // Everything is checked up front so a failure never leaves half a document in the buffer.
    for (name, attribute) in meta {
        validate_text(name)
            .and_then(|_| attribute.validate())
            .map_err(|error| XmlSerializationError::Encoding(name.clone(), error))?;
    }

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    if meta.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(ROOT_TAG)))?;
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;

    for (name, attribute) in meta {
        writer.write_event(Event::Start(BytesStart::new(ENTRY_TAG)))?;
        write_text_element(&mut writer, NAME_TAG, name)?;
        for value in attribute.values() {
            write_text_element(&mut writer, VALUE_TAG, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new(ENTRY_TAG)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;

    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<(), XmlSerializationError> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        return Ok(());
    }

    // A raw carriage return would be read back as a line feed.
    let escaped = escape(text).replace('\r', "&#xD;");

    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;

    Ok(())
}

fn read_document<R: BufRead>(mut reader: Reader<R>) -> Result<Meta, XmlSerializationError> {
    let mut buffer = Vec::new();
    let mut builder = MetaBuilder::default();

    loop {
        match reader.read_event_into(&mut buffer)? {
            Event::Start(element) => builder.open(check_element(&element)?)?,
            Event::Empty(element) => {
                builder.open(check_element(&element)?)?;
                builder.close()?;
            }
            Event::End(_) => builder.close()?,
            Event::Text(text) => {
                let text = text.xml_content().map_err(malformed)?;
                builder.text(check_text(&text)?)?;
            }
            Event::CData(data) => {
                let text = data.xml_content().map_err(malformed)?;
                builder.text(check_text(&text)?)?;
            }
            Event::GeneralRef(reference) => builder.text(&resolve_reference(&reference)?)?,
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }

        buffer.clear();
    }

    builder.finish()
}

fn malformed(error: impl ToString) -> XmlSerializationError {
    XmlSerializationError::MalformedDocument(error.to_string())
}

/// Returns the name of the element once its name and attributes are known to be well formed.
fn check_element<'a>(element: &'a BytesStart<'_>) -> Result<&'a [u8], XmlSerializationError> {
    let tag = element.name().into_inner();
    let name = std::str::from_utf8(tag).map_err(malformed)?;

    let mut characters = name.chars();
    let valid_start = characters.next().is_some_and(|character| character.is_alphabetic() || matches!(character, '_' | ':'));
    let valid_rest = characters.all(|character| character.is_alphanumeric() || matches!(character, '_' | ':' | '-' | '.' | '\u{B7}'));
    if !valid_start || !valid_rest {
        return Err(XmlSerializationError::MalformedDocument(format!("Invalid Element Name {:?}", name)));
    }

    for attribute in element.attributes() {
        attribute.map_err(malformed)?;
    }

    Ok(tag)
}

/// Rejects characters XML 1.0 can't carry, so anything read can be written again.
fn check_text(text: &str) -> Result<&str, XmlSerializationError> {
    validate_text(text).map_err(malformed)?;
    Ok(text)
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, XmlSerializationError> {
    if let Some(character) = reference.resolve_char_ref().map_err(malformed)? {
        let text = String::from(character);
        check_text(&text)?;
        return Ok(text);
    }

    let name = std::str::from_utf8(reference).map_err(malformed)?;

    resolve_predefined_entity(name)
        .map(String::from)
        .ok_or_else(|| XmlSerializationError::MalformedDocument(format!("Unknown Entity Reference &{};", name)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Root,
    Entry,
    Name,
    Value,
    Skipped,
}

#[derive(Debug, Default)]
struct PendingEntry {
    name: Option<String>,
    values: Vec<String>,
}

/// Folds the element events of a document into a [Meta].
#[derive(Debug, Default)]
struct MetaBuilder {
    meta: Meta,
    scopes: Vec<Scope>,
    has_root: bool,
    entry: PendingEntry,
    text: String,
}

impl MetaBuilder {
    fn open(&mut self, tag: &[u8]) -> Result<(), XmlSerializationError> {
        let scope = match self.scopes.last().copied() {
            None => {
                if self.has_root {
                    return Err(XmlSerializationError::MalformedDocument(String::from("Document Has More Than One Root Element")));
                }
                self.has_root = true;

                if tag != ROOT_TAG.as_bytes() {
                    return Err(SchemaError::UnexpectedRoot(String::from_utf8_lossy(tag).into_owned()).into());
                }

                Scope::Root
            }
            Some(Scope::Root) if tag == ENTRY_TAG.as_bytes() => {
                self.entry = PendingEntry::default();
                Scope::Entry
            }
            Some(Scope::Entry) if tag == NAME_TAG.as_bytes() => {
                self.text.clear();
                Scope::Name
            }
            Some(Scope::Entry) if tag == VALUE_TAG.as_bytes() => {
                self.text.clear();
                Scope::Value
            }
            Some(Scope::Name | Scope::Value) => {
                return Err(SchemaError::UnexpectedElement(String::from_utf8_lossy(tag).into_owned()).into());
            }
            Some(Scope::Root | Scope::Entry | Scope::Skipped) => {
                trace!(element = %String::from_utf8_lossy(tag), "skipping unknown element");
                Scope::Skipped
            }
        };

        self.scopes.push(scope);
        Ok(())
    }

    fn close(&mut self) -> Result<(), XmlSerializationError> {
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| XmlSerializationError::MalformedDocument(String::from("Closing Tag Without Opening Tag")))?;

        match scope {
            Scope::Name => {
                let text = std::mem::take(&mut self.text);
                self.entry.name.get_or_insert(text);
            }
            Scope::Value => {
                let text = std::mem::take(&mut self.text);
                self.entry.values.push(text);
            }
            Scope::Entry => self.finish_entry()?,
            Scope::Root | Scope::Skipped => {}
        }

        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), XmlSerializationError> {
        match self.scopes.last().copied() {
            Some(Scope::Name | Scope::Value) => self.text.push_str(text),
            None if !text.trim().is_empty() => {
                return Err(XmlSerializationError::MalformedDocument(String::from("Text Outside Of The Root Element")));
            }
            _ => {}
        }

        Ok(())
    }

    fn finish_entry(&mut self) -> Result<(), XmlSerializationError> {
        let PendingEntry { name, mut values } = std::mem::take(&mut self.entry);
        let name = name.ok_or(SchemaError::MissingName)?;

        let attribute = match values.len() {
            0 => return Err(SchemaError::MissingValue(name).into()),
            1 => Attribute::Scalar(values.remove(0)),
            _ => Attribute::Sequence(values),
        };

        trace!(name = %name, values = attribute.len(), "read meta entry");
        self.meta.append(name, attribute);

        Ok(())
    }

    fn finish(self) -> Result<Meta, XmlSerializationError> {
        if !self.has_root {
            return Err(XmlSerializationError::MalformedDocument(String::from("Document Has No Root Element")));
        }

        if !self.scopes.is_empty() {
            return Err(XmlSerializationError::MalformedDocument(String::from("Unexpected End Of Document")));
        }

        Ok(self.meta)
    }
}
