use indexmap::{IndexMap, map::Entry};

use crate::{
    Attribute, XmlSerializationError,
    attribute::{EncodingError, Value},
};

/// The meta struct represents the attributes carried alongside an image or acquisition.
///
/// It maps names to [Attribute]s and keeps them in insertion order, which is the order they are serialized in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Meta {
    attributes: IndexMap<String, Attribute>,
}

impl Meta {
    /// Creates an empty meta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty meta with space for at least `capacity` attributes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            attributes: IndexMap::with_capacity(capacity),
        }
    }

    /// Returns the attribute with the given name. If the attribute does not exist, returns None.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&Attribute> {
        self.attributes.get(name.as_ref())
    }

    /// Returns the attribute with the given name mutably. If the attribute does not exist, returns None.
    pub fn get_mut(&mut self, name: impl AsRef<str>) -> Option<&mut Attribute> {
        self.attributes.get_mut(name.as_ref())
    }

    /// Sets the attribute with the given name. If there was an attribute with the same name then its returned.
    pub fn set(&mut self, name: impl Into<String>, attribute: impl Into<Attribute>) -> Option<Attribute> {
        self.attributes.insert(name.into(), attribute.into())
    }

    /// Sets the attribute with the given name from a loosely typed value.
    ///
    /// Fails if the value is not text, a number, a boolean or a non empty list of those.
    /// The meta is left untouched on failure.
    pub fn try_set(&mut self, name: impl Into<String>, value: Value) -> Result<Option<Attribute>, EncodingError> {
        let attribute = Attribute::try_from(value)?;
        Ok(self.set(name, attribute))
    }

    /// Adds another occurrence of the attribute with the given name.
    ///
    /// A new name is inserted as is. An existing name becomes a sequence with the new values appended.
    pub fn append(&mut self, name: impl Into<String>, attribute: impl Into<Attribute>) {
        match self.attributes.entry(name.into()) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(attribute.into()),
            Entry::Vacant(entry) => {
                entry.insert(attribute.into());
            }
        }
    }

    /// Removes the attribute with the given name and returns it, keeping the order of the others.
    pub fn remove(&mut self, name: impl AsRef<str>) -> Option<Attribute> {
        self.attributes.shift_remove(name.as_ref())
    }

    pub fn contains_key(&self, name: impl AsRef<str>) -> bool {
        self.attributes.contains_key(name.as_ref())
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns an iterator over the attributes in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Attribute> {
        self.attributes.iter()
    }

    /// Returns an iterator over the attribute names in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Attribute> {
        self.attributes.keys()
    }

    /// Serializes the meta to an indented XML document.
    pub fn serialize(&self) -> Result<String, XmlSerializationError> {
        crate::serialize(self)
    }

    /// Deserializes a meta from an XML document.
    pub fn deserialize(text: &str) -> Result<Self, XmlSerializationError> {
        crate::deserialize(text)
    }
}

impl<'a> IntoIterator for &'a Meta {
    type Item = (&'a String, &'a Attribute);
    type IntoIter = indexmap::map::Iter<'a, String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

impl IntoIterator for Meta {
    type Item = (String, Attribute);
    type IntoIter = indexmap::map::IntoIter<String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

impl<K: Into<String>, V: Into<Attribute>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Meta::new();
        meta.extend(iter);
        meta
    }
}

impl<K: Into<String>, V: Into<Attribute>> Extend<(K, V)> for Meta {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, attribute) in iter {
            self.set(name, attribute);
        }
    }
}

impl TryFrom<IndexMap<String, Value>> for Meta {
    type Error = EncodingError;

    fn try_from(values: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        let mut meta = Meta::with_capacity(values.len());

        for (name, value) in values {
            meta.try_set(name, value)?;
        }

        Ok(meta)
    }
}
