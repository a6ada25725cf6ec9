//! Serialize and deserialize ISMRMRD meta attributes to and from their XML document form.

mod attribute;

pub use attribute::Attribute;
pub use attribute::EncodingError;
pub use attribute::Value;

mod meta;

pub use meta::Meta;

mod serializing;

pub use serializing::Serializer;
pub use serializing::deserialize;
pub use serializing::serialize;

pub mod serializers;

pub use serializers::SchemaError;
pub use serializers::XmlSerializationError;
