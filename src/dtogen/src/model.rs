#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A property of a class to generate a DTO for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PropertyDescription {
    /// The name of the property.
    pub name: String,
    /// The fully-qualified name of the property type.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub type_name: String,
}

impl PropertyDescription {
    /// Creates a new property description.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// The structure of a class to generate a DTO for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ClassDescription {
    /// The name of the class.
    pub name: String,
    /// The properties of the class, in declaration order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: Vec<PropertyDescription>,
}

impl ClassDescription {
    /// Creates a class description without properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Appends a property to the class.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(PropertyDescription::new(name, type_name));
        self
    }
}
