//! The protoc plugin protocol: a `CodeGeneratorRequest` in, a `CodeGeneratorResponse` out.

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;

use crate::descriptor::DescriptorSet;
use crate::error::Result;
use crate::options::Options;
use crate::{generate, Error};

///
/// `CodeGeneratorRequest` with the descriptors kept as raw bytes.
///
/// Decoding them through `prost_types` would drop the extension fields (`google.api.http`,
/// `google.api.field_behavior`) before the descriptor pool gets to see them.
///
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(bytes, repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawFileDescriptorSet {
    #[prost(bytes, repeated, tag = "1")]
    pub file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

pub fn decode_request(input: &[u8]) -> Result<RawCodeGeneratorRequest> {
    Ok(RawCodeGeneratorRequest::decode(input)?)
}

pub fn build_descriptor_pool(request: &RawCodeGeneratorRequest) -> Result<DescriptorPool> {
    let fds = RawFileDescriptorSet {
        file: request.proto_file.clone(),
    };
    Ok(DescriptorPool::decode(fds.encode_to_vec().as_slice())?)
}

/// Generates every requested file and wraps the result for protoc.
pub fn respond(
    request: &RawCodeGeneratorRequest,
    options: Options,
) -> Result<CodeGeneratorResponse> {
    tracing::debug!(
        %options,
        files = ?request.file_to_generate,
        "handling plugin request"
    );
    let pool = build_descriptor_pool(request)?;
    let set = DescriptorSet::from_pool(&pool)?;
    let files = generate(&set, &request.file_to_generate, options)?;

    Ok(CodeGeneratorResponse {
        file: files
            .into_iter()
            .map(|file| File {
                name: Some(file.name),
                content: Some(file.content),
                ..Default::default()
            })
            .collect(),
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    })
}

/// A response that makes protoc report `error` and fail.
pub fn error_response(error: &Error) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error: Some(error.to_string()),
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    }
}

///
/// One plugin run: the decoded request and its options.
///
/// Decoding is split from generation so that the caller can set up logging from the options
/// before anything is generated.
///
pub struct Invocation {
    request: Result<RawCodeGeneratorRequest>,
    options: Result<Options>,
}

impl Invocation {
    pub fn decode(input: &[u8]) -> Self {
        let request = decode_request(input);
        let options = match &request {
            Ok(request) => Options::parse(request.parameter.as_deref()),
            Err(_) => Ok(Options::default()),
        };
        Self { request, options }
    }

    pub fn verbose(&self) -> bool {
        self.options.as_ref().is_ok_and(|options| options.verbose)
    }

    /// Generates and always produces a response; failures end up in its `error` field.
    pub fn into_response(self) -> CodeGeneratorResponse {
        let Self { request, options } = self;
        let response = request.and_then(|request| respond(&request, options?));
        match response {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(%error, "generation failed");
                error_response(&error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prost_types::compiler::CodeGeneratorRequest;
    use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

    fn request(parameter: Option<&str>) -> Vec<u8> {
        let file = FileDescriptorProto {
            name: Some("shop/v1/shop.proto".to_string()),
            package: Some("shop.v1".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Item".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("display_name".to_string()),
                    number: Some(1),
                    label: Some(prost_types::field_descriptor_proto::Label::Optional as i32),
                    r#type: Some(prost_types::field_descriptor_proto::Type::String as i32),
                    json_name: Some("displayName".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        CodeGeneratorRequest {
            file_to_generate: vec!["shop/v1/shop.proto".to_string()],
            parameter: parameter.map(str::to_string),
            proto_file: vec![file],
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[test]
    fn generates_one_file_per_package() {
        let response = Invocation::decode(&request(None)).into_response();
        assert_eq!(response.error, None);
        assert_eq!(response.supported_features, Some(1));
        assert_eq!(response.file.len(), 1);

        let file = &response.file[0];
        assert_eq!(file.name.as_deref(), Some("shop/v1/index.ts"));
        let content = file.content.as_deref().unwrap_or_default();
        assert!(content
            .starts_with("// Code generated by protoc-gen-typescript-http. DO NOT EDIT.\n"));
        assert!(content.contains("export type Item = {\n  displayName: string;\n};\n"));
        assert!(content.ends_with("// @@protoc_insertion_point(typescript-http-eof)\n"));
    }

    #[test]
    fn bad_parameter_becomes_an_error_response() {
        let invocation = Invocation::decode(&request(Some("colour=blue")));
        assert!(!invocation.verbose());
        let response = invocation.into_response();
        assert!(response.file.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Invalid plugin parameter: unknown option `colour`")
        );
    }

    #[test]
    fn garbage_input_becomes_an_error_response() {
        let response = Invocation::decode(&[0xff, 0xff, 0xff]).into_response();
        assert!(response.error.is_some());
    }

    #[test]
    fn verbose_comes_from_the_parameter() {
        assert!(Invocation::decode(&request(Some("verbose"))).verbose());
        assert!(!Invocation::decode(&request(None)).verbose());
        assert!(!Invocation::decode(&[0xff, 0xff, 0xff]).verbose());
    }
}
