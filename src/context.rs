use std::collections::HashMap;

use crate::discriminate::Discriminator;
use crate::error::GenerationError;
use crate::options::Options;

#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// First time this name is emitted.
    New,
    /// Already emitted for the same message.
    Existing,
    /// Already emitted for a different message, named here.
    Collision(String),
}

///
/// Registry of generated type names for one run.
///
/// Keys are qualified by output unit (the package), so two packages that both need
/// `commonv1_Money` each get their own declaration.
///
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: HashMap<(String, String), String>,
}

impl TypeRegistry {
    pub fn claim(&mut self, unit: &str, type_name: &str, message: &str) -> Claim {
        let key = (unit.to_string(), type_name.to_string());
        match self.entries.get(&key) {
            Some(existing) if existing == message => Claim::Existing,
            Some(existing) => Claim::Collision(existing.clone()),
            None => {
                self.entries.insert(key, message.to_string());
                Claim::New
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State shared by every generator during one invocation.
#[derive(Debug, Default)]
pub struct GenerationContext {
    pub options: Options,
    pub registry: TypeRegistry,
    pub discriminator: Discriminator,
    errors: Vec<GenerationError>,
}

impl GenerationContext {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn add_error(&mut self, error: GenerationError) {
        tracing::debug!(%error, "generation error");
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[GenerationError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<GenerationError> {
        std::mem::take(&mut self.errors)
    }
}
