//! Shape of the credentials file.
//!
//! The schema is plain data: the list of allowed properties, their types
//! and whether anything else may appear. [`Schema::validate`] applies it to
//! an already parsed JSON value.

use std::fmt;

use serde_json::Value;

/// JSON type a property must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Property {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub properties: &'static [Property],
    pub additional_properties: bool,
}

/// Credentials record: `fromaddr` and `password`, both required strings,
/// nothing else.
pub const CREDENTIAL_SCHEMA: Schema = Schema {
    properties: &[
        Property {
            name: "fromaddr",
            field_type: FieldType::String,
            required: true,
        },
        Property {
            name: "password",
            field_type: FieldType::String,
            required: true,
        },
    ],
    additional_properties: false,
};

/// A single reason a value does not match a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NotAnObject,
    Missing(&'static str),
    Unexpected(String),
    WrongType {
        property: &'static str,
        expected: &'static str,
    },
    Empty(&'static str),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotAnObject => write!(f, "expected a JSON object"),
            Violation::Missing(name) => write!(f, "missing required property '{}'", name),
            Violation::Unexpected(name) => write!(f, "unexpected property '{}'", name),
            Violation::WrongType { property, expected } => {
                write!(f, "property '{}' must be a {}", property, expected)
            }
            Violation::Empty(name) => write!(f, "property '{}' must not be empty", name),
        }
    }
}

impl Schema {
    fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check `value` against the schema, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let object = match value.as_object() {
            Some(object) => object,
            None => return Err(vec![Violation::NotAnObject]),
        };

        let mut violations = Vec::new();

        for property in self.properties {
            match object.get(property.name) {
                None if property.required => violations.push(Violation::Missing(property.name)),
                None => {}
                Some(value) if !property.field_type.matches(value) => {
                    violations.push(Violation::WrongType {
                        property: property.name,
                        expected: property.field_type.name(),
                    });
                }
                Some(Value::String(s)) if s.is_empty() => {
                    violations.push(Violation::Empty(property.name));
                }
                Some(_) => {}
            }
        }

        if !self.additional_properties {
            for key in object.keys() {
                if self.property(key).is_none() {
                    violations.push(Violation::Unexpected(key.clone()));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
