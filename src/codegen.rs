/// Indentation unit of the generated TypeScript.
pub const INDENT: &str = "  ";

pub fn indent_by(level: usize) -> String {
    INDENT.repeat(level)
}

/// Append-only text buffer for one generated file.
#[derive(Debug, Default, Clone)]
pub struct CodeFile {
    buf: String,
}

impl CodeFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one line at the given indentation level.
    pub fn line(&mut self, level: usize, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            self.buf.push_str(&indent_by(level));
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn append(&mut self, other: &CodeFile) {
        self.buf.push_str(&other.buf);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn content(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Quotes a string as a TypeScript string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lines_are_indented_and_blank_lines_stay_empty() {
        let mut f = CodeFile::new();
        f.line(0, "export type A = {");
        f.line(1, "a: string;");
        f.line(3, "");
        f.line(0, "};");
        assert_eq!(f.content(), "export type A = {\n  a: string;\n\n};\n");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("missing \"name\""), "\"missing \\\"name\\\"\"");
        assert_eq!(quote("PAGE_SIZE"), "\"PAGE_SIZE\"");
    }
}
