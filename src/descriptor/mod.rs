//! Read-only view of the schema the generator works on.
//!
//! The model is either loaded from a [`prost_reflect::DescriptorPool`] (see
//! [`DescriptorSet::from_pool`]) or assembled by hand with the builder methods. Messages and enums
//! are addressed by their fully-qualified name without the leading dot, e.g.
//! `library.v1.Shelf.Book`.

pub mod annotations;
mod load;

use std::collections::HashMap;

use heck::ToLowerCamelCase;

pub use annotations::FieldBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum(String),
    Message(String),
}

impl FieldKind {
    pub fn message(full_name: impl Into<String>) -> Self {
        Self::Message(full_name.into())
    }

    pub fn enumeration(full_name: impl Into<String>) -> Self {
        Self::Enum(full_name.into())
    }

    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
    /// A `map<K, V>` field. The field's kind is the kind of `V`; keys are always rendered as
    /// strings.
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub json_name: String,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    /// Name of the containing oneof, synthetic proto3 `optional` oneofs excluded.
    pub oneof: Option<String>,
    pub proto3_optional: bool,
    pub behaviors: Vec<FieldBehavior>,
    /// `[jstype = JS_STRING]`
    pub string_encoded: bool,
    pub comments: Option<String>,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            json_name: name.to_lower_camel_case(),
            name,
            kind,
            cardinality: Cardinality::Singular,
            oneof: None,
            proto3_optional: false,
            behaviors: Vec::new(),
            string_encoded: false,
            comments: None,
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldKind::Scalar(kind))
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn map(mut self) -> Self {
        self.cardinality = Cardinality::Map;
        self
    }

    pub fn in_oneof(mut self, oneof: impl Into<String>) -> Self {
        self.oneof = Some(oneof.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.proto3_optional = true;
        self
    }

    pub fn with_behaviors(mut self, behaviors: impl IntoIterator<Item = FieldBehavior>) -> Self {
        self.behaviors.extend(behaviors);
        self
    }

    pub fn string_encoded(mut self) -> Self {
        self.string_encoded = true;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn has_behavior(&self, behavior: FieldBehavior) -> bool {
        self.behaviors.contains(&behavior)
    }

    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

/// Splits a package-relative path such as `Shelf.Book` into the short name, full name and
/// scoped type name (`Shelf_Book`).
fn qualify(package: &str, path: &str) -> (String, String, String) {
    let name = path.rsplit('.').next().unwrap_or(path).to_string();
    let full_name = if package.is_empty() {
        path.to_string()
    } else {
        format!("{package}.{path}")
    };
    (name, full_name, path.replace('.', "_"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDesc {
    pub name: String,
    pub full_name: String,
    pub package: String,
    /// Name within the package, nesting joined with `_`.
    pub type_name: String,
    pub fields: Vec<FieldDesc>,
    pub comments: Option<String>,
}

impl MessageDesc {
    /// `path` is the message's name relative to its package, e.g. `Shelf.Book` for a nested
    /// message.
    pub fn new(package: impl Into<String>, path: &str) -> Self {
        let package = package.into();
        let (name, full_name, type_name) = qualify(&package, path);
        Self {
            name,
            full_name,
            package,
            type_name,
            fields: Vec::new(),
            comments: None,
        }
    }

    pub fn with_field(mut self, field: FieldDesc) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDesc {
    pub name: String,
    pub number: i32,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDesc {
    pub name: String,
    pub full_name: String,
    pub package: String,
    pub type_name: String,
    pub values: Vec<EnumValueDesc>,
    pub comments: Option<String>,
}

impl EnumDesc {
    pub fn new(package: impl Into<String>, path: &str) -> Self {
        let package = package.into();
        let (name, full_name, type_name) = qualify(&package, path);
        Self {
            name,
            full_name,
            package,
            type_name,
            values: Vec::new(),
            comments: None,
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push(EnumValueDesc {
            name: name.into(),
            number,
            comments: None,
        });
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// The primary `google.api.http` binding of a method, as written in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBinding {
    /// `get`, `post`, ... or the `kind` of a custom pattern.
    pub method: String,
    pub path: String,
    pub body: String,
}

impl HttpBinding {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDesc {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub http: Option<HttpBinding>,
    pub comments: Option<String>,
}

impl MethodDesc {
    pub fn new(
        name: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            client_streaming: false,
            server_streaming: false,
            http: None,
            comments: None,
        }
    }

    pub fn with_http(mut self, binding: HttpBinding) -> Self {
        self.http = Some(binding);
        self
    }

    pub fn streaming(mut self, client: bool, server: bool) -> Self {
        self.client_streaming = client;
        self.server_streaming = server;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDesc {
    pub name: String,
    pub full_name: String,
    pub package: String,
    pub methods: Vec<MethodDesc>,
    pub comments: Option<String>,
}

impl ServiceDesc {
    pub fn new(package: impl Into<String>, name: &str) -> Self {
        let package = package.into();
        let (name, full_name, _) = qualify(&package, name);
        Self {
            name,
            full_name,
            package,
            methods: Vec::new(),
            comments: None,
        }
    }

    pub fn with_method(mut self, method: MethodDesc) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// A schema file. Nested messages and enums are flattened in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDesc {
    pub name: String,
    pub package: String,
    pub messages: Vec<MessageDesc>,
    pub enums: Vec<EnumDesc>,
    pub services: Vec<ServiceDesc>,
}

impl FileDesc {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: MessageDesc) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_enum(mut self, enumeration: EnumDesc) -> Self {
        self.enums.push(enumeration);
        self
    }

    pub fn with_service(mut self, service: ServiceDesc) -> Self {
        self.services.push(service);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    files: Vec<FileDesc>,
    messages: HashMap<String, (usize, usize)>,
    enums: HashMap<String, (usize, usize)>,
}

impl DescriptorSet {
    pub fn new(files: impl IntoIterator<Item = FileDesc>) -> Self {
        let mut set = Self::default();
        for file in files {
            set.add_file(file);
        }
        set
    }

    pub fn add_file(&mut self, file: FileDesc) {
        let index = self.files.len();
        for (position, message) in file.messages.iter().enumerate() {
            self.messages
                .insert(message.full_name.clone(), (index, position));
        }
        for (position, enumeration) in file.enums.iter().enumerate() {
            self.enums
                .insert(enumeration.full_name.clone(), (index, position));
        }
        self.files.push(file);
    }

    pub fn files(&self) -> &[FileDesc] {
        &self.files
    }

    pub fn file(&self, name: &str) -> Option<&FileDesc> {
        self.files.iter().find(|file| file.name == name)
    }

    pub fn message(&self, full_name: &str) -> Option<&MessageDesc> {
        let (file, position) = self.messages.get(full_name)?;
        self.files[*file].messages.get(*position)
    }

    pub fn enumeration(&self, full_name: &str) -> Option<&EnumDesc> {
        let (file, position) = self.enums.get(full_name)?;
        self.files[*file].enums.get(*position)
    }
}
