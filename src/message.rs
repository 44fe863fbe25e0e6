//! Message and enum declarations.

use std::collections::VecDeque;

use crate::codegen::{quote, CodeFile};
use crate::comments;
use crate::context::{Claim, GenerationContext};
use crate::descriptor::{DescriptorSet, EnumDesc, FieldBehavior, FieldDesc, MessageDesc};
use crate::types::{suffix_name, wrap, Type, TypeMapper};
use crate::wellknown::WellKnownType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn suffix<'c>(&self, ctx: &'c GenerationContext) -> &'c str {
        match self {
            Self::Request => &ctx.options.request_type_suffix,
            Self::Response => &ctx.options.response_type_suffix,
        }
    }

    /// Fields that never appear in this direction.
    fn excluded_behavior(&self) -> FieldBehavior {
        match self {
            Self::Request => FieldBehavior::OutputOnly,
            Self::Response => FieldBehavior::InputOnly,
        }
    }
}

/// One pending synthesis: the message and the directions it is used in.
struct Pending<'a> {
    message: &'a MessageDesc,
    used_in_request: bool,
    used_in_response: bool,
}

pub struct MessageGenerator<'a> {
    set: &'a DescriptorSet,
    types: TypeMapper<'a>,
}

impl<'a> MessageGenerator<'a> {
    pub fn new(set: &'a DescriptorSet, package: &'a str) -> Self {
        Self {
            set,
            types: TypeMapper::new(set, package),
        }
    }

    ///
    /// Emits the declarations `message` needs for the given usage.
    ///
    /// Without usage, or when the message does not require discrimination, this is the default
    /// type. Otherwise it is the request and/or response variant. Nested messages that need
    /// their own variants are queued and emitted after the current declaration; names that were
    /// already emitted in this run are skipped.
    ///
    pub fn synthesize(
        &self,
        ctx: &mut GenerationContext,
        f: &mut CodeFile,
        message: &'a MessageDesc,
        used_in_request: bool,
        used_in_response: bool,
    ) {
        let mut queue = VecDeque::from([Pending {
            message,
            used_in_request,
            used_in_response,
        }]);

        while let Some(pending) = queue.pop_front() {
            let message = pending.message;
            if WellKnownType::is_well_known(&message.full_name) {
                continue;
            }
            let used = pending.used_in_request || pending.used_in_response;
            if !used || !ctx.discriminator.requires_discrimination(self.set, message) {
                self.write_default(ctx, f, message);
                continue;
            }
            if pending.used_in_request {
                self.write_variant(ctx, f, &pending, Direction::Request, &mut queue);
            }
            if pending.used_in_response {
                self.write_variant(ctx, f, &pending, Direction::Response, &mut queue);
            }
        }
    }

    fn write_default(&self, ctx: &mut GenerationContext, f: &mut CodeFile, message: &MessageDesc) {
        let name = self.types.message_name(&message.full_name);
        if !self.claim(ctx, &name, message) {
            return;
        }

        comments::write_leading(f, 0, message.comments.as_deref(), &[]);
        f.line(0, format!("export type {name} = {{"));
        // Presence is only marked on the per-direction variants.
        for field in &message.fields {
            comments::write_field(f, 1, field);
            write_field(f, field, false, &self.types.map_field(field));
        }
        f.line(0, "};");
        f.blank();
    }

    fn write_variant(
        &self,
        ctx: &mut GenerationContext,
        f: &mut CodeFile,
        pending: &Pending<'a>,
        direction: Direction,
        queue: &mut VecDeque<Pending<'a>>,
    ) {
        let message = pending.message;
        let suffix = direction.suffix(ctx).to_string();
        let name = suffix_name(&self.types.message_name(&message.full_name), &suffix);
        if !self.claim(ctx, &name, message) {
            return;
        }

        comments::write_leading(f, 0, message.comments.as_deref(), &[]);
        f.line(0, format!("export type {name} = {{"));
        for field in &message.fields {
            if field.has_behavior(direction.excluded_behavior()) {
                continue;
            }

            let nested = field
                .kind
                .as_message()
                .filter(|name| !WellKnownType::is_well_known(name))
                .and_then(|name| self.set.message(name))
                .filter(|nested| ctx.discriminator.requires_discrimination(self.set, nested));

            let ty = match nested {
                Some(nested) => {
                    queue.push_back(match direction {
                        Direction::Request => Pending {
                            message: nested,
                            used_in_request: true,
                            used_in_response: pending.used_in_response,
                        },
                        Direction::Response => Pending {
                            message: nested,
                            used_in_request: pending.used_in_request,
                            used_in_response: true,
                        },
                    });
                    let element = suffix_name(&self.types.message_name(&nested.full_name), &suffix);
                    wrap(field, Type::Named(element))
                }
                None => self.types.map_field(field),
            };

            let optional = field.oneof.is_some()
                || field.proto3_optional
                || field.has_behavior(FieldBehavior::Optional);
            comments::write_field(f, 1, field);
            write_field(f, field, optional, &ty);
        }
        f.line(0, "};");
        f.blank();
    }

    fn claim(&self, ctx: &mut GenerationContext, type_name: &str, message: &MessageDesc) -> bool {
        match ctx
            .registry
            .claim(self.types.package(), type_name, &message.full_name)
        {
            Claim::New => true,
            Claim::Existing => {
                tracing::debug!(type_name, "skipping type, already generated");
                false
            }
            Claim::Collision(existing) => {
                tracing::warn!(
                    type_name,
                    message = %message.full_name,
                    existing = %existing,
                    "type name collision, keeping the first declaration"
                );
                false
            }
        }
    }
}

fn write_field(f: &mut CodeFile, field: &FieldDesc, optional: bool, ty: &Type) {
    let marker = if optional { "?" } else { "" };
    f.line(1, format!("{}{marker}: {ty};", field.json_name));
}

/// Emits an enum as a union of its value names.
pub fn write_enum(f: &mut CodeFile, name: &str, enumeration: &EnumDesc) {
    comments::write_leading(f, 0, enumeration.comments.as_deref(), &[]);
    f.line(0, format!("export type {name} ="));
    match enumeration.values.as_slice() {
        [] => f.line(1, "never;"),
        [value] => {
            comments::write_leading(f, 1, value.comments.as_deref(), &[]);
            f.line(1, format!("{};", quote(&value.name)));
        }
        values => {
            let last = values.len() - 1;
            for (index, value) in values.iter().enumerate() {
                comments::write_leading(f, 1, value.comments.as_deref(), &[]);
                let terminator = if index == last { ";" } else { "" };
                f.line(1, format!("| {}{terminator}", quote(&value.name)));
            }
        }
    }
    f.blank();
}
