//! Fixed aliases for `google.protobuf.*` types.
//!
//! Well-known types are never synthesized from their fields. They map to a `wellKnown<Name>`
//! alias whose declaration is written once per output file that references it.

use crate::codegen::CodeFile;

const PREFIX: &str = "google.protobuf.";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WellKnownType {
    Any,
    Duration,
    Empty,
    FieldMask,
    Struct,
    Timestamp,
    FloatValue,
    Int64Value,
    Int32Value,
    UInt64Value,
    UInt32Value,
    BytesValue,
    DoubleValue,
    BoolValue,
    StringValue,
    Value,
    NullValue,
    ListValue,
    /// Any other `google.protobuf` message or enum, declared as `unknown`.
    Other(String),
}

impl WellKnownType {
    /// Looks up a message or enum by its fully-qualified name.
    pub fn lookup(full_name: &str) -> Option<Self> {
        let name = full_name.strip_prefix(PREFIX)?;
        Some(match name {
            "Any" => Self::Any,
            "Duration" => Self::Duration,
            "Empty" => Self::Empty,
            "FieldMask" => Self::FieldMask,
            "Struct" => Self::Struct,
            "Timestamp" => Self::Timestamp,
            "FloatValue" => Self::FloatValue,
            "Int64Value" => Self::Int64Value,
            "Int32Value" => Self::Int32Value,
            "UInt64Value" => Self::UInt64Value,
            "UInt32Value" => Self::UInt32Value,
            "BytesValue" => Self::BytesValue,
            "DoubleValue" => Self::DoubleValue,
            "BoolValue" => Self::BoolValue,
            "StringValue" => Self::StringValue,
            "Value" => Self::Value,
            "NullValue" => Self::NullValue,
            "ListValue" => Self::ListValue,
            other => Self::Other(other.replace('.', "_")),
        })
    }

    pub fn is_well_known(full_name: &str) -> bool {
        full_name.starts_with(PREFIX)
    }

    fn short_name(&self) -> &str {
        match self {
            Self::Any => "Any",
            Self::Duration => "Duration",
            Self::Empty => "Empty",
            Self::FieldMask => "FieldMask",
            Self::Struct => "Struct",
            Self::Timestamp => "Timestamp",
            Self::FloatValue => "FloatValue",
            Self::Int64Value => "Int64Value",
            Self::Int32Value => "Int32Value",
            Self::UInt64Value => "UInt64Value",
            Self::UInt32Value => "UInt32Value",
            Self::BytesValue => "BytesValue",
            Self::DoubleValue => "DoubleValue",
            Self::BoolValue => "BoolValue",
            Self::StringValue => "StringValue",
            Self::Value => "Value",
            Self::NullValue => "NullValue",
            Self::ListValue => "ListValue",
            Self::Other(name) => name,
        }
    }

    /// The alias the generated code uses, e.g. `wellKnownTimestamp`.
    pub fn name(&self) -> String {
        format!("wellKnown{}", self.short_name())
    }

    /// Other well-known types whose aliases this declaration refers to.
    pub fn dependencies(&self) -> Vec<WellKnownType> {
        match self {
            Self::ListValue => vec![Self::Value],
            _ => Vec::new(),
        }
    }

    pub fn write_declaration(&self, f: &mut CodeFile) {
        let name = self.name();
        match self {
            Self::Any => {
                doc(
                    f,
                    &[
                        "If the Any contains a value that has a special JSON mapping,",
                        "it will be converted as follows:",
                        "{\"@type\": xxx, \"value\": yyy}.",
                        "Otherwise, the value will be converted into a JSON object,",
                        "and the \"@type\" field will be inserted to indicate the actual data type.",
                    ],
                );
                f.line(0, format!("interface {name} {{"));
                f.line(1, "\"@type\": string;");
                f.line(1, "[key: string]: unknown;");
                f.line(0, "}");
            }
            Self::Duration => {
                doc(
                    f,
                    &[
                        "Generated output always contains 0, 3, 6, or 9 fractional digits,",
                        "depending on required precision, followed by the suffix \"s\".",
                        "Accepted are any fractional digits (also none) as long as they fit",
                        "into nano-seconds precision and the suffix \"s\" is required.",
                    ],
                );
                f.line(0, format!("type {name} = string;"));
            }
            Self::Empty => {
                doc(f, &["An empty JSON object"]);
                f.line(0, format!("type {name} = Record<never, never>;"));
            }
            Self::Timestamp => {
                doc(
                    f,
                    &[
                        "Encoded using RFC 3339, where generated output will always be Z-normalized",
                        "and uses 0, 3, 6 or 9 fractional digits.",
                        "Offsets other than \"Z\" are also accepted.",
                    ],
                );
                f.line(0, format!("type {name} = string;"));
            }
            Self::FieldMask => {
                doc(
                    f,
                    &[
                        "In JSON, a field mask is encoded as a single string where paths are",
                        "separated by a comma. Fields name in each path are converted",
                        "to/from lower-camel naming conventions.",
                    ],
                );
                f.line(0, format!("type {name} = string;"));
            }
            Self::FloatValue
            | Self::DoubleValue
            | Self::Int64Value
            | Self::Int32Value
            | Self::UInt64Value
            | Self::UInt32Value => f.line(0, format!("type {name} = number | null;")),
            Self::BytesValue | Self::StringValue => {
                f.line(0, format!("type {name} = string | null;"))
            }
            Self::BoolValue => f.line(0, format!("type {name} = boolean | null;")),
            Self::Struct => {
                doc(f, &["Any JSON value."]);
                f.line(0, format!("type {name} = Record<string, unknown>;"));
            }
            Self::Value => f.line(0, format!("type {name} = unknown;")),
            Self::NullValue => f.line(0, format!("type {name} = null;")),
            Self::ListValue => f.line(0, format!("type {name} = {}[];", Self::Value.name())),
            Self::Other(_) => {
                doc(f, &["No mapping for this well known type is generated, yet."]);
                f.line(0, format!("type {name} = unknown;"));
            }
        }
        f.blank();
    }
}

fn doc(f: &mut CodeFile, lines: &[&str]) {
    f.line(0, "/**");
    for line in lines {
        f.line(0, format!(" * {line}"));
    }
    f.line(0, " */");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recognizes_google_protobuf_types_only() {
        assert_eq!(
            WellKnownType::lookup("google.protobuf.Timestamp"),
            Some(WellKnownType::Timestamp)
        );
        assert_eq!(
            WellKnownType::lookup("google.protobuf.Api"),
            Some(WellKnownType::Other("Api".to_string()))
        );
        assert_eq!(WellKnownType::lookup("google.api.HttpRule"), None);
        assert_eq!(WellKnownType::lookup("library.v1.Timestamp"), None);
    }

    #[test]
    fn alias_names() {
        assert_eq!(WellKnownType::Timestamp.name(), "wellKnownTimestamp");
        assert_eq!(WellKnownType::UInt64Value.name(), "wellKnownUInt64Value");
    }

    #[test]
    fn list_value_declaration_refers_to_value() {
        let mut f = CodeFile::new();
        WellKnownType::ListValue.write_declaration(&mut f);
        assert_eq!(f.content(), "type wellKnownListValue = wellKnownValue[];\n\n");
        assert_eq!(WellKnownType::ListValue.dependencies(), vec![WellKnownType::Value]);
    }

    #[test]
    fn any_is_an_open_interface() {
        let mut f = CodeFile::new();
        WellKnownType::Any.write_declaration(&mut f);
        assert!(f.content().contains("interface wellKnownAny {\n  \"@type\": string;\n"));
    }
}
