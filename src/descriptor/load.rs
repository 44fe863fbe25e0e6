use std::collections::HashMap;

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, ExtensionDescriptor, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::field_options::JsType;
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};

use super::annotations::{http_rule::Pattern, HttpRule, FIELD_BEHAVIOR_EXTENSION, HTTP_EXTENSION};
use super::{
    DescriptorSet, EnumDesc, EnumValueDesc, FieldBehavior, FieldDesc, FieldKind,
    FileDesc, HttpBinding, MessageDesc, MethodDesc, ScalarKind, ServiceDesc,
};
use crate::error::Result;

// Field numbers inside `FileDescriptorProto` and friends, used for `source_code_info` paths.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

impl DescriptorSet {
    ///
    /// Builds the model from a decoded descriptor pool.
    ///
    /// The pool is what keeps custom options intact: `google.api.http` and
    /// `google.api.field_behavior` are read through it when their definitions are present.
    ///
    pub fn from_pool(pool: &DescriptorPool) -> Result<Self> {
        let loader = Loader::new(pool);
        let mut set = DescriptorSet::default();
        for file in pool.files() {
            set.add_file(loader.file(file.file_descriptor_proto())?);
        }
        Ok(set)
    }
}

struct Loader<'a> {
    pool: &'a DescriptorPool,
    http: Option<ExtensionDescriptor>,
    field_behavior: Option<ExtensionDescriptor>,
    /// Map entry message → kind of its value field.
    map_entries: HashMap<String, FieldKind>,
}

impl<'a> Loader<'a> {
    fn new(pool: &'a DescriptorPool) -> Self {
        let mut map_entries = HashMap::new();
        for file in pool.files() {
            let proto = file.file_descriptor_proto();
            for message in &proto.message_type {
                collect_map_entries(proto.package(), message, &mut map_entries);
            }
        }
        Self {
            pool,
            http: pool.get_extension_by_name(HTTP_EXTENSION),
            field_behavior: pool.get_extension_by_name(FIELD_BEHAVIOR_EXTENSION),
            map_entries,
        }
    }

    fn file(&self, proto: &FileDescriptorProto) -> Result<FileDesc> {
        let comments = Comments::new(proto);
        let package = proto.package();
        let mut file = FileDesc::new(proto.name(), package);

        for (index, enumeration) in proto.enum_type.iter().enumerate() {
            let path = vec![FILE_ENUM_TYPE, index as i32];
            file.enums
                .push(self.enumeration(package, "", enumeration, &path, &comments));
        }
        for (index, message) in proto.message_type.iter().enumerate() {
            let path = vec![FILE_MESSAGE_TYPE, index as i32];
            self.message(&mut file, "", message, &path, &comments);
        }
        for (index, service) in proto.service.iter().enumerate() {
            let path = vec![FILE_SERVICE, index as i32];
            let mut desc = ServiceDesc::new(package, service.name());
            desc.comments = comments.get(&path);
            for (index, method) in service.method.iter().enumerate() {
                let path = child(&path, SERVICE_METHOD, index);
                let mut method_desc = MethodDesc::new(
                    method.name(),
                    method.input_type().trim_start_matches('.'),
                    method.output_type().trim_start_matches('.'),
                )
                .streaming(method.client_streaming(), method.server_streaming());
                method_desc.http = self.http_binding(&desc.full_name, method.name())?;
                method_desc.comments = comments.get(&path);
                desc.methods.push(method_desc);
            }
            file.services.push(desc);
        }
        Ok(file)
    }

    fn message(
        &self,
        file: &mut FileDesc,
        scope: &str,
        proto: &DescriptorProto,
        path: &[i32],
        comments: &Comments,
    ) {
        if is_map_entry(proto) {
            return;
        }
        let relative = scoped(scope, proto.name());
        let mut message = MessageDesc::new(file.package.as_str(), &relative);
        message.comments = comments.get(path);

        for (index, field) in proto.field.iter().enumerate() {
            let path = child(path, MESSAGE_FIELD, index);
            let mut desc = self.field(field, proto);
            desc.behaviors = self.field_behaviors(&message.full_name, field.name());
            desc.comments = comments.get(&path);
            message.fields.push(desc);
        }
        file.messages.push(message);

        for (index, enumeration) in proto.enum_type.iter().enumerate() {
            let path = child(path, MESSAGE_ENUM_TYPE, index);
            let desc = self.enumeration(&file.package, &relative, enumeration, &path, comments);
            file.enums.push(desc);
        }
        for (index, nested) in proto.nested_type.iter().enumerate() {
            let path = child(path, MESSAGE_NESTED_TYPE, index);
            self.message(file, &relative, nested, &path, comments);
        }
    }

    fn field(&self, proto: &FieldDescriptorProto, parent: &DescriptorProto) -> FieldDesc {
        let kind = field_kind(proto);
        let map_value = kind
            .as_message()
            .and_then(|name| self.map_entries.get(name))
            .filter(|_| proto.label() == Label::Repeated);

        let mut field = match map_value {
            Some(value) => FieldDesc::new(proto.name(), value.clone()).map(),
            None if proto.label() == Label::Repeated => {
                FieldDesc::new(proto.name(), kind).repeated()
            }
            None => FieldDesc::new(proto.name(), kind),
        };
        if let Some(json_name) = &proto.json_name {
            field.json_name = json_name.clone();
        }
        field.proto3_optional = proto.proto3_optional();
        if !field.proto3_optional {
            field.oneof = proto
                .oneof_index
                .and_then(|index| parent.oneof_decl.get(index as usize))
                .map(|oneof| oneof.name().to_string());
        }
        field.string_encoded = proto
            .options
            .as_ref()
            .is_some_and(|options| options.jstype() == JsType::JsString);
        field
    }

    fn enumeration(
        &self,
        package: &str,
        scope: &str,
        proto: &EnumDescriptorProto,
        path: &[i32],
        comments: &Comments,
    ) -> EnumDesc {
        let mut desc = EnumDesc::new(package, &scoped(scope, proto.name()));
        desc.comments = comments.get(path);
        desc.values = proto
            .value
            .iter()
            .enumerate()
            .map(|(index, value)| EnumValueDesc {
                name: value.name().to_string(),
                number: value.number(),
                comments: comments.get(&child(path, ENUM_VALUE, index)),
            })
            .collect();
        desc
    }

    fn field_behaviors(&self, message: &str, field: &str) -> Vec<FieldBehavior> {
        let Some(ext) = &self.field_behavior else {
            return Vec::new();
        };
        let Some(field) = self
            .pool
            .get_message_by_name(message)
            .and_then(|message| message.get_field_by_name(field))
        else {
            return Vec::new();
        };
        let options = field.options();
        if !options.has_extension(ext) {
            return Vec::new();
        }
        match options.get_extension(ext).as_ref() {
            Value::List(values) => values
                .iter()
                .filter_map(|value| value.as_enum_number())
                .filter_map(FieldBehavior::from_i32)
                .collect(),
            Value::EnumNumber(number) => FieldBehavior::from_i32(*number).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn http_binding(&self, service: &str, method: &str) -> Result<Option<HttpBinding>> {
        let Some(ext) = &self.http else {
            return Ok(None);
        };
        let Some(method) = self
            .pool
            .get_service_by_name(service)
            .and_then(|service| service.methods().find(|m| m.name() == method))
        else {
            return Ok(None);
        };
        let rule = decode_extension::<HttpRule>(&method.options(), ext)?;
        Ok(rule.and_then(binding_from_rule))
    }
}

fn decode_extension<T: Message + Default>(
    options: &DynamicMessage,
    ext: &ExtensionDescriptor,
) -> Result<Option<T>> {
    if !options.has_extension(ext) {
        return Ok(None);
    }
    if let Value::Message(message) = options.get_extension(ext).as_ref() {
        return Ok(Some(T::decode(message.encode_to_vec().as_slice())?));
    }
    Ok(None)
}

pub(crate) fn binding_from_rule(rule: HttpRule) -> Option<HttpBinding> {
    let (method, path) = match rule.pattern? {
        Pattern::Get(path) => ("GET".to_string(), path),
        Pattern::Put(path) => ("PUT".to_string(), path),
        Pattern::Post(path) => ("POST".to_string(), path),
        Pattern::Delete(path) => ("DELETE".to_string(), path),
        Pattern::Patch(path) => ("PATCH".to_string(), path),
        Pattern::Custom(custom) => (custom.kind, custom.path),
    };
    Some(HttpBinding {
        method,
        path,
        body: rule.body,
    })
}

fn field_kind(proto: &FieldDescriptorProto) -> FieldKind {
    let type_name = proto.type_name().trim_start_matches('.');
    let scalar = match proto.r#type() {
        Type::Message | Type::Group => return FieldKind::Message(type_name.to_string()),
        Type::Enum => return FieldKind::Enum(type_name.to_string()),
        Type::Double => ScalarKind::Double,
        Type::Float => ScalarKind::Float,
        Type::Int64 => ScalarKind::Int64,
        Type::Uint64 => ScalarKind::Uint64,
        Type::Int32 => ScalarKind::Int32,
        Type::Fixed64 => ScalarKind::Fixed64,
        Type::Fixed32 => ScalarKind::Fixed32,
        Type::Bool => ScalarKind::Bool,
        Type::String => ScalarKind::String,
        Type::Bytes => ScalarKind::Bytes,
        Type::Uint32 => ScalarKind::Uint32,
        Type::Sfixed32 => ScalarKind::Sfixed32,
        Type::Sfixed64 => ScalarKind::Sfixed64,
        Type::Sint32 => ScalarKind::Sint32,
        Type::Sint64 => ScalarKind::Sint64,
    };
    FieldKind::Scalar(scalar)
}

fn is_map_entry(proto: &DescriptorProto) -> bool {
    proto
        .options
        .as_ref()
        .is_some_and(|options| options.map_entry())
}

fn collect_map_entries(
    scope: &str,
    proto: &DescriptorProto,
    entries: &mut HashMap<String, FieldKind>,
) {
    let full_name = scoped(scope, proto.name());
    if is_map_entry(proto) {
        if let Some(value) = proto.field.iter().find(|field| field.number() == 2) {
            entries.insert(full_name.clone(), field_kind(value));
        }
    }
    for nested in &proto.nested_type {
        collect_map_entries(&full_name, nested, entries);
    }
}

fn scoped(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn child(path: &[i32], field: i32, index: usize) -> Vec<i32> {
    let mut path = path.to_vec();
    path.extend([field, index as i32]);
    path
}

/// Leading comments of a file, keyed by `source_code_info` path.
struct Comments(HashMap<Vec<i32>, String>);

impl Comments {
    fn new(file: &FileDescriptorProto) -> Self {
        let locations = file
            .source_code_info
            .iter()
            .flat_map(|info| &info.location)
            .filter_map(|location| {
                let comment = location.leading_comments.as_deref()?.trim_end();
                (!comment.trim().is_empty()).then(|| (location.path.clone(), comment.to_string()))
            })
            .collect();
        Self(locations)
    }

    fn get(&self, path: &[i32]) -> Option<String> {
        self.0.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::annotations::CustomHttpPattern;
    use crate::descriptor::Cardinality;
    use pretty_assertions::assert_eq;
    use prost_types::source_code_info::Location;
    use prost_types::{
        FieldOptions, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
        OneofDescriptorProto, ServiceDescriptorProto, SourceCodeInfo,
    };

    fn field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(kind as i32),
            ..Default::default()
        }
    }

    fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            type_name: Some(type_name.to_string()),
            ..field(name, number, Type::Message)
        }
    }

    fn library_file() -> FileDescriptorProto {
        let labels_entry = DescriptorProto {
            name: Some("LabelsEntry".to_string()),
            field: vec![field("key", 1, Type::String), field("value", 2, Type::Int64)],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let book = DescriptorProto {
            name: Some("Book".to_string()),
            field: vec![
                FieldDescriptorProto {
                    json_name: Some("displayName".to_string()),
                    ..field("display_name", 1, Type::String)
                },
                FieldDescriptorProto {
                    label: Some(Label::Repeated as i32),
                    ..message_field("labels", 2, ".library.v1.Book.LabelsEntry")
                },
                FieldDescriptorProto {
                    options: Some(FieldOptions {
                        jstype: Some(JsType::JsString as i32),
                        ..Default::default()
                    }),
                    ..field("page_count", 3, Type::Int64)
                },
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("isbn", 4, Type::String)
                },
                FieldDescriptorProto {
                    oneof_index: Some(1),
                    proto3_optional: Some(true),
                    ..field("subtitle", 5, Type::String)
                },
                FieldDescriptorProto {
                    label: Some(Label::Repeated as i32),
                    ..message_field("related", 6, ".library.v1.Book")
                },
            ],
            nested_type: vec![labels_entry],
            oneof_decl: vec![
                OneofDescriptorProto {
                    name: Some("identifier".to_string()),
                    ..Default::default()
                },
                OneofDescriptorProto {
                    name: Some("_subtitle".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        FileDescriptorProto {
            name: Some("library/v1/library.proto".to_string()),
            package: Some("library.v1".to_string()),
            message_type: vec![book],
            service: vec![ServiceDescriptorProto {
                name: Some("Library".to_string()),
                method: vec![MethodDescriptorProto {
                    name: Some("GetBook".to_string()),
                    input_type: Some(".library.v1.Book".to_string()),
                    output_type: Some(".library.v1.Book".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            source_code_info: Some(SourceCodeInfo {
                location: vec![
                    Location {
                        path: vec![FILE_MESSAGE_TYPE, 0],
                        leading_comments: Some(" A book on a shelf.\n".to_string()),
                        ..Default::default()
                    },
                    Location {
                        path: vec![FILE_MESSAGE_TYPE, 0, MESSAGE_FIELD, 0],
                        leading_comments: Some(" Title shown to readers.\n".to_string()),
                        ..Default::default()
                    },
                ],
            }),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    fn load(file: FileDescriptorProto) -> DescriptorSet {
        let bytes = FileDescriptorSet { file: vec![file] }.encode_to_vec();
        let pool = DescriptorPool::decode(bytes.as_slice()).unwrap();
        DescriptorSet::from_pool(&pool).unwrap()
    }

    #[test]
    fn loads_messages_fields_and_services() {
        let set = load(library_file());
        let file = set.file("library/v1/library.proto").unwrap();
        assert_eq!(file.package, "library.v1");
        assert_eq!(
            file.messages.iter().map(|m| m.full_name.as_str()).collect::<Vec<_>>(),
            vec!["library.v1.Book"],
            "map entries are not messages of their own"
        );

        let book = set.message("library.v1.Book").unwrap();
        assert_eq!(book.comments.as_deref(), Some(" A book on a shelf."));

        let display_name = book.field("display_name").unwrap();
        assert_eq!(display_name.json_name, "displayName");
        assert_eq!(display_name.comments.as_deref(), Some(" Title shown to readers."));

        let labels = book.field("labels").unwrap();
        assert_eq!(labels.cardinality, Cardinality::Map);
        assert_eq!(labels.kind, FieldKind::Scalar(ScalarKind::Int64));

        assert!(book.field("page_count").unwrap().string_encoded);
        assert_eq!(book.field("isbn").unwrap().oneof.as_deref(), Some("identifier"));

        let subtitle = book.field("subtitle").unwrap();
        assert!(subtitle.proto3_optional);
        assert_eq!(subtitle.oneof, None);

        let related = book.field("related").unwrap();
        assert_eq!(related.cardinality, Cardinality::Repeated);
        assert_eq!(related.kind, FieldKind::message("library.v1.Book"));

        let service = &file.services[0];
        assert_eq!(service.full_name, "library.v1.Library");
        assert_eq!(service.methods[0].input_type, "library.v1.Book");
        assert_eq!(service.methods[0].http, None);
    }

    #[test]
    fn binding_from_custom_pattern_keeps_kind() {
        let rule = HttpRule {
            selector: String::new(),
            body: "book".to_string(),
            pattern: Some(Pattern::Custom(CustomHttpPattern {
                kind: "patch".to_string(),
                path: "/v1/{book.name}".to_string(),
            })),
        };
        assert_eq!(
            binding_from_rule(rule),
            Some(HttpBinding::new("patch", "/v1/{book.name}", "book"))
        );
    }

    #[test]
    fn binding_requires_a_pattern() {
        let rule = HttpRule {
            selector: String::new(),
            body: "*".to_string(),
            pattern: None,
        };
        assert_eq!(binding_from_rule(rule), None);
    }
}
