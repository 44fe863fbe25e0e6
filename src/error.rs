use crate::httprule::TemplateSyntaxError;

///
/// [`GenerationError`] is a structural problem found while walking the schema.
///
/// These are collected into the generation context instead of being returned right away, so a
/// single run reports every broken method at once.
///
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("({method}) {source}")]
    TemplateSyntax {
        method: String,
        #[source]
        source: TemplateSyntaxError,
    },
    #[error("({method}) field path `{path}` cannot be resolved: {reason}")]
    UnresolvedFieldPath {
        method: String,
        path: String,
        reason: String,
    },
    #[error("({method}) message `{message}` is not part of the descriptor set")]
    UnresolvedMessage { method: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to decode plugin request: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Failed to build descriptor pool: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),
    #[error("Invalid plugin parameter: {0}")]
    Options(String),
    #[error("File `{0}` was requested but is not part of the descriptor set")]
    FileNotFound(String),
    #[error("Encountered {} error(s) during generation:{}", .0.len(), list(.0))]
    Generation(Vec<GenerationError>),
}

fn list(errors: &[GenerationError]) -> String {
    errors.iter().map(|err| format!("\n  - {err}")).collect()
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
