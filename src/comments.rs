//! JSDoc blocks carried over from schema comments.

use crate::codegen::CodeFile;
use crate::descriptor::{FieldBehavior, FieldDesc};

/// Writes the leading comment block of a declaration, if it has anything to say.
#[cfg(feature = "doc")]
pub fn write_leading(
    f: &mut CodeFile,
    level: usize,
    comments: Option<&str>,
    behaviors: &[FieldBehavior],
) {
    let lines = comments
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    let behaviors = behavior_comment(behaviors);

    if lines.is_empty() && behaviors.is_none() {
        return;
    }

    f.line(level, "/**");
    for line in &lines {
        f.line(level, format!(" * {line}"));
    }
    if let Some(behaviors) = behaviors {
        if !lines.is_empty() {
            f.line(level, " *");
        }
        f.line(level, format!(" * {behaviors}"));
    }
    f.line(level, " */");
}

#[cfg(not(feature = "doc"))]
pub fn write_leading(
    _f: &mut CodeFile,
    _level: usize,
    _comments: Option<&str>,
    _behaviors: &[FieldBehavior],
) {
}

pub fn write_field(f: &mut CodeFile, level: usize, field: &FieldDesc) {
    write_leading(f, level, field.comments.as_deref(), &field.behaviors);
}

fn behavior_comment(behaviors: &[FieldBehavior]) -> Option<String> {
    if behaviors.is_empty() {
        return None;
    }
    let names = behaviors
        .iter()
        .map(FieldBehavior::as_str_name)
        .collect::<Vec<_>>();
    Some(format!("Behaviors: {}", names.join(", ")))
}
