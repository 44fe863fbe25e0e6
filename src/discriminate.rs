//! Decides whether a message needs separate request and response shapes.

use std::collections::{HashMap, HashSet};

use crate::descriptor::{DescriptorSet, FieldBehavior, FieldDesc, MessageDesc};

/// Behaviors that change which fields appear in one direction, or their optionality.
const DISCRIMINATING: [FieldBehavior; 3] = [
    FieldBehavior::OutputOnly,
    FieldBehavior::InputOnly,
    FieldBehavior::Optional,
];

/// Memoizes [`Discriminator::requires_discrimination`] for one generation run.
#[derive(Debug, Default)]
pub struct Discriminator {
    memo: HashMap<String, bool>,
}

impl Discriminator {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Returns whether any field reachable from `message` carries `OUTPUT_ONLY`, `INPUT_ONLY`
    /// or `OPTIONAL`.
    ///
    /// Message-typed fields are not tested themselves; the walk descends into their message
    /// instead. A message seen earlier in the same walk counts as `false`, which is what breaks
    /// cycles.
    ///
    pub fn requires_discrimination(&mut self, set: &DescriptorSet, message: &MessageDesc) -> bool {
        if let Some(result) = self.memo.get(&message.full_name) {
            return *result;
        }
        let result = walk(set, message, &mut HashSet::new());
        self.memo.insert(message.full_name.clone(), result);
        result
    }

    /// Same as [`Discriminator::requires_discrimination`], by name. Unknown messages never
    /// require discrimination.
    pub fn requires_discrimination_by_name(
        &mut self,
        set: &DescriptorSet,
        full_name: &str,
    ) -> bool {
        match set.message(full_name) {
            Some(message) => self.requires_discrimination(set, message),
            None => false,
        }
    }
}

fn walk<'a>(
    set: &'a DescriptorSet,
    message: &'a MessageDesc,
    visited: &mut HashSet<&'a str>,
) -> bool {
    if !visited.insert(message.full_name.as_str()) {
        return false;
    }
    let mut required = false;
    for field in &message.fields {
        match field.kind.as_message() {
            Some(nested) => {
                if let Some(nested) = set.message(nested) {
                    required |= walk(set, nested, visited);
                }
            }
            None => required |= is_discriminating(field),
        }
    }
    required
}

pub fn is_discriminating(field: &FieldDesc) -> bool {
    field
        .behaviors
        .iter()
        .any(|behavior| DISCRIMINATING.contains(behavior))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldKind, FileDesc, ScalarKind};

    fn set(messages: Vec<MessageDesc>) -> DescriptorSet {
        let file = messages
            .into_iter()
            .fold(FileDesc::new("test.proto", "test"), FileDesc::with_message);
        DescriptorSet::new([file])
    }

    fn check(set: &DescriptorSet, name: &str) -> bool {
        Discriminator::new().requires_discrimination_by_name(set, name)
    }

    #[test]
    fn plain_and_required_fields_do_not_discriminate() {
        let set = set(vec![MessageDesc::new("test", "Book")
            .with_field(FieldDesc::scalar("name", ScalarKind::String))
            .with_field(
                FieldDesc::scalar("title", ScalarKind::String)
                    .with_behaviors([FieldBehavior::Required, FieldBehavior::Immutable]),
            )]);
        assert!(!check(&set, "test.Book"));
    }

    #[test]
    fn each_discriminating_behavior_counts() {
        for behavior in DISCRIMINATING {
            let set = set(vec![MessageDesc::new("test", "Book").with_field(
                FieldDesc::scalar("etag", ScalarKind::String).with_behaviors([behavior]),
            )]);
            assert!(check(&set, "test.Book"), "{behavior}");
        }
    }

    #[test]
    fn nested_messages_are_searched() {
        let set = set(vec![
            MessageDesc::new("test", "Shelf")
                .with_field(FieldDesc::new("book", FieldKind::message("test.Book"))),
            MessageDesc::new("test", "Book").with_field(
                FieldDesc::scalar("create_time", ScalarKind::String)
                    .with_behaviors([FieldBehavior::OutputOnly]),
            ),
        ]);
        assert!(check(&set, "test.Shelf"));
    }

    #[test]
    fn behavior_on_a_message_field_itself_is_not_tested() {
        let set = set(vec![
            MessageDesc::new("test", "Shelf").with_field(
                FieldDesc::new("book", FieldKind::message("test.Book"))
                    .with_behaviors([FieldBehavior::OutputOnly]),
            ),
            MessageDesc::new("test", "Book")
                .with_field(FieldDesc::scalar("name", ScalarKind::String)),
        ]);
        assert!(!check(&set, "test.Shelf"));
    }

    #[test]
    fn self_reference_terminates() {
        let plain = set(vec![MessageDesc::new("test", "Node")
            .with_field(FieldDesc::scalar("value", ScalarKind::Int32))
            .with_field(FieldDesc::new("next", FieldKind::message("test.Node")))]);
        assert!(!check(&plain, "test.Node"));

        let discriminated = set(vec![MessageDesc::new("test", "Node")
            .with_field(FieldDesc::new("children", FieldKind::message("test.Node")).repeated())
            .with_field(
                FieldDesc::scalar("id", ScalarKind::String)
                    .with_behaviors([FieldBehavior::OutputOnly]),
            )]);
        assert!(check(&discriminated, "test.Node"));
    }

    #[test]
    fn mutual_recursion_terminates() {
        let set = set(vec![
            MessageDesc::new("test", "A")
                .with_field(FieldDesc::new("b", FieldKind::message("test.B"))),
            MessageDesc::new("test", "B")
                .with_field(FieldDesc::new("a", FieldKind::message("test.A")))
                .with_field(
                    FieldDesc::scalar("note", ScalarKind::String)
                        .with_behaviors([FieldBehavior::InputOnly]),
                ),
        ]);
        let mut discriminator = Discriminator::new();
        assert!(discriminator.requires_discrimination_by_name(&set, "test.A"));
        assert!(discriminator.requires_discrimination_by_name(&set, "test.B"));
    }

    #[test]
    fn unknown_message_does_not_discriminate() {
        let set = set(vec![]);
        assert!(!check(&set, "test.Missing"));
    }
}
