//! Mapping from schema types to TypeScript type expressions.

use std::fmt;

use crate::descriptor::{Cardinality, DescriptorSet, FieldDesc, FieldKind, ScalarKind};
use crate::wellknown::WellKnownType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Named(String),
    List(Box<Type>),
    /// Keys are always strings, matching the JSON mapping of protobuf maps.
    Map(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn reference(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(element) => write!(f, "{element}[]"),
            Self::Map(value) => write!(f, "{{ [key: string]: {value} }}"),
        }
    }
}

fn package_prefix(package: &str) -> String {
    format!("{}_", package.replace('.', ""))
}

/// Name of a message or enum as seen from `package`; declarations from another package carry
/// that package as a prefix (`einrideexamplev1_Message`).
pub fn scoped_type_name(package: &str, declared_in: &str, type_name: &str) -> String {
    if declared_in == package {
        type_name.to_string()
    } else {
        format!("{}{type_name}", package_prefix(declared_in))
    }
}

/// Appends `suffix` unless the name already ends with it.
pub fn suffix_name(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    set: &'a DescriptorSet,
    package: &'a str,
}

impl<'a> TypeMapper<'a> {
    pub fn new(set: &'a DescriptorSet, package: &'a str) -> Self {
        Self { set, package }
    }

    pub fn package(&self) -> &'a str {
        self.package
    }

    /// Scoped name of a message, without any request/response suffix.
    pub fn message_name(&self, full_name: &str) -> String {
        self.map_message(full_name).reference()
    }

    pub fn map_message(&self, full_name: &str) -> Type {
        if let Some(wkt) = WellKnownType::lookup(full_name) {
            return Type::Named(wkt.name());
        }
        match self.set.message(full_name) {
            Some(message) => Type::Named(scoped_type_name(
                self.package,
                &message.package,
                &message.type_name,
            )),
            None => Type::named("unknown"),
        }
    }

    pub fn map_enum(&self, full_name: &str) -> Type {
        if let Some(wkt) = WellKnownType::lookup(full_name) {
            return Type::Named(wkt.name());
        }
        match self.set.enumeration(full_name) {
            Some(enumeration) => Type::Named(scoped_type_name(
                self.package,
                &enumeration.package,
                &enumeration.type_name,
            )),
            None => Type::named("unknown"),
        }
    }

    /// Type of a single element of the field: the field itself for singular fields, one item
    /// for repeated fields, one value for maps.
    pub fn map_element(&self, field: &FieldDesc) -> Type {
        if field.string_encoded {
            return Type::named("string");
        }
        match &field.kind {
            FieldKind::Scalar(scalar) => Type::named(scalar_type(*scalar)),
            FieldKind::Enum(full_name) => self.map_enum(full_name),
            FieldKind::Message(full_name) => self.map_message(full_name),
        }
    }

    pub fn map_field(&self, field: &FieldDesc) -> Type {
        wrap(field, self.map_element(field))
    }
}

/// Wraps an element type according to the field's cardinality.
pub fn wrap(field: &FieldDesc, element: Type) -> Type {
    match field.cardinality {
        Cardinality::Singular => element,
        Cardinality::Repeated => Type::List(Box::new(element)),
        Cardinality::Map => Type::Map(Box::new(element)),
    }
}

// 64-bit integers map to `number` like every other numeric kind; only `jstype = JS_STRING`
// switches them to `string`.
fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String | ScalarKind::Bytes => "string",
        ScalarKind::Bool => "boolean",
        ScalarKind::Double
        | ScalarKind::Float
        | ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::Uint32
        | ScalarKind::Uint64
        | ScalarKind::Sint32
        | ScalarKind::Sint64
        | ScalarKind::Fixed32
        | ScalarKind::Fixed64
        | ScalarKind::Sfixed32
        | ScalarKind::Sfixed64 => "number",
    }
}
