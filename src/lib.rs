//!
//! TypeScript types and HTTP clients for gRPC services annotated with `google.api.http`.
//!
//! For every package in the request, the generator writes one `index.ts` containing:
//! - a string-union type per enum,
//! - a type per message, mirroring its JSON mapping,
//! - an interface per service, and a `create<Service>Client(handler)` factory that turns each
//!   call into a `{ path, method, body }` request using the method's HTTP binding,
//! - separate `<Message>__Request` / `<Message>__Response` types for messages whose fields carry
//!   `OUTPUT_ONLY`, `INPUT_ONLY` or `OPTIONAL` behaviors, so that each direction only sees the
//!   fields that exist on the wire.
//!
//! # Example
//!
//! Given this proto file:
//! ```protobuf
//! syntax = "proto3";
//! package library.v1;
//!
//! service Library {
//!     rpc GetBook(GetBookRequest) returns (Book) {
//!         option (google.api.http) = { get: "/v1/{name=shelves/*/books/*}" };
//!     }
//! }
//! ```
//!
//! the generated client builds `GET /v1/${request.name}` and sends every other leaf field of
//! `GetBookRequest` as a query parameter.
//!
//! The crate is normally driven through the `protoc-gen-typescript-http` binary; [`generate`]
//! exposes the same pipeline for an already loaded [`DescriptorSet`].
//!

use std::collections::BTreeMap;

pub mod codegen;
mod comments;
pub mod context;
pub mod descriptor;
pub mod discriminate;
pub mod error;
pub mod httprule;
pub mod message;
pub mod options;
pub mod package;
pub mod plugin;
pub mod service;
pub mod types;
pub mod wellknown;

pub use context::GenerationContext;
pub use descriptor::DescriptorSet;
pub use error::{Error, GenerationError, Result};
pub use options::Options;

use descriptor::FileDesc;
use package::{output_path, PackageGenerator};

/// One generated output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

///
/// Generates the TypeScript output for `files_to_generate`.
///
/// Files are grouped by package and each package becomes one file. Problems found along the way
/// are collected; if there are any, the whole run fails with [`Error::Generation`] and no output
/// is returned.
///
pub fn generate(
    set: &DescriptorSet,
    files_to_generate: &[String],
    options: Options,
) -> Result<Vec<GeneratedFile>> {
    let mut packages: BTreeMap<&str, Vec<&FileDesc>> = BTreeMap::new();
    for name in files_to_generate {
        let file = set
            .file(name)
            .ok_or_else(|| Error::FileNotFound(name.clone()))?;
        packages.entry(file.package.as_str()).or_default().push(file);
    }

    let mut ctx = GenerationContext::new(options);
    let mut generated = Vec::with_capacity(packages.len());
    for (package, files) in packages {
        tracing::debug!(
            package,
            files = ?files.iter().map(|file| file.name.as_str()).collect::<Vec<_>>(),
            "generating package"
        );
        let content = PackageGenerator::new(set, package, files).generate(&mut ctx);
        generated.push(GeneratedFile {
            name: output_path(package),
            content: content.into_string(),
        });
    }

    let errors = ctx.take_errors();
    if !errors.is_empty() {
        for error in &errors {
            tracing::error!(%error, "generation error");
        }
        return Err(Error::Generation(errors));
    }
    Ok(generated)
}
