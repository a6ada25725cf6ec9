use indexmap::IndexMap;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EncodingError {
    #[error("Attribute Sequence Is Empty")]
    EmptySequence,
    #[error("Attribute Sequence Contains A Sequence")]
    NestedSequence,
    #[error("Attribute Can't Be A Mapping")]
    Mapping,
    #[error("Character {0:?} Is Not Allowed In XML")]
    InvalidCharacter(char),
}

/// A single meta attribute.
///
/// An attribute is either exactly one string or an ordered sequence of strings.
/// Numbers and booleans are converted to their text form when the attribute is created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Scalar(String),
    Sequence(Vec<String>),
}

impl Attribute {
    /// Returns the value if the attribute is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Attribute::Scalar(value) => Some(value),
            Attribute::Sequence(_) => None,
        }
    }

    /// Returns the values if the attribute is a sequence.
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Attribute::Scalar(_) => None,
            Attribute::Sequence(values) => Some(values),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Attribute::Scalar(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Attribute::Sequence(_))
    }

    /// Returns every value of the attribute, a scalar being a single value.
    pub fn values(&self) -> &[String] {
        match self {
            Attribute::Scalar(value) => std::slice::from_ref(value),
            Attribute::Sequence(values) => values,
        }
    }

    /// Returns the number of values the attribute holds.
    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Consumes the attribute and returns its values, a scalar becoming a one value vector.
    pub fn into_values(self) -> Vec<String> {
        match self {
            Attribute::Scalar(value) => vec![value],
            Attribute::Sequence(values) => values,
        }
    }

    /// Merges another occurrence of the same key into this attribute.
    ///
    /// A scalar is promoted to a one value sequence first, then the values of `other` are appended in order.
    /// The result is always a sequence.
    pub fn merge(&mut self, other: Attribute) {
        let mut values = std::mem::replace(self, Attribute::Sequence(Vec::new())).into_values();

        match other {
            Attribute::Scalar(value) => values.push(value),
            Attribute::Sequence(other_values) => values.extend(other_values),
        }

        *self = Attribute::Sequence(values);
    }

    /// Checks the attribute can be written as XML text.
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.is_empty() {
            return Err(EncodingError::EmptySequence);
        }

        for value in self.values() {
            validate_text(value)?;
        }

        Ok(())
    }
}

/// Returns an error for the first character that XML 1.0 can't carry.
pub(crate) fn validate_text(text: &str) -> Result<(), EncodingError> {
    match text.chars().find(|character| !is_xml_char(*character)) {
        Some(character) => Err(EncodingError::InvalidCharacter(character)),
        None => Ok(()),
    }
}

fn is_xml_char(character: char) -> bool {
    matches!(character, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

macro_rules! declare_attribute {
    ($($qualifier:ty),* $(,)?) => {
        $(
            impl From<$qualifier> for Attribute {
                fn from(value: $qualifier) -> Self {
                    Attribute::Scalar(value.to_string())
                }
            }

            impl From<Vec<$qualifier>> for Attribute {
                fn from(values: Vec<$qualifier>) -> Self {
                    Attribute::Sequence(values.iter().map(ToString::to_string).collect())
                }
            }

            impl From<&[$qualifier]> for Attribute {
                fn from(values: &[$qualifier]) -> Self {
                    Attribute::Sequence(values.iter().map(ToString::to_string).collect())
                }
            }
        )*
    };
}

declare_attribute!(&str, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool);

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::Scalar(value)
    }
}

impl From<Vec<String>> for Attribute {
    fn from(values: Vec<String>) -> Self {
        Attribute::Sequence(values)
    }
}

impl From<&[String]> for Attribute {
    fn from(values: &[String]) -> Self {
        Attribute::Sequence(values.to_vec())
    }
}

/// A loosely typed value, as handed over by callers that don't know the shape of their data up front.
///
/// Only text, numbers, booleans and flat lists of those are representable as an [Attribute].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    fn into_text(self) -> Result<String, EncodingError> {
        match self {
            Value::Text(value) => Ok(value),
            Value::Integer(value) => Ok(value.to_string()),
            Value::Float(value) => Ok(value.to_string()),
            Value::Boolean(value) => Ok(value.to_string()),
            Value::List(_) => Err(EncodingError::NestedSequence),
            Value::Map(_) => Err(EncodingError::Mapping),
        }
    }
}

impl TryFrom<Value> for Attribute {
    type Error = EncodingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::List(values) => {
                if values.is_empty() {
                    return Err(EncodingError::EmptySequence);
                }

                let values = values.into_iter().map(Value::into_text).collect::<Result<Vec<_>, _>>()?;
                Ok(Attribute::Sequence(values))
            }
            value => value.into_text().map(Attribute::Scalar),
        }
    }
}

macro_rules! declare_value {
    ($qualifier:ty, $value:path) => {
        impl From<$qualifier> for Value {
            fn from(value: $qualifier) -> Self {
                $value(value.into())
            }
        }
    };
}

declare_value!(String, Value::Text);
declare_value!(&str, Value::Text);
declare_value!(i32, Value::Integer);
declare_value!(i64, Value::Integer);
declare_value!(u32, Value::Integer);
declare_value!(f32, Value::Float);
declare_value!(f64, Value::Float);
declare_value!(bool, Value::Boolean);
declare_value!(Vec<Value>, Value::List);
declare_value!(IndexMap<String, Value>, Value::Map);
