//! Parsing of `google.api.http` bindings.
//!
//! A binding is turned into a [`Rule`]: the HTTP method, the parsed URL [`Template`] and the
//! [`BodySelector`]. The template grammar is the one from `google/api/http.proto`:
//!
//! ```text
//! Template = "/" Segments [ Verb ] ;
//! Segments = Segment { "/" Segment } ;
//! Segment  = "*" | "**" | LITERAL | Variable ;
//! Variable = "{" FieldPath [ "=" Segments ] "}" ;
//! FieldPath = IDENT { "." IDENT } ;
//! Verb     = ":" LITERAL ;
//! ```

use std::fmt;

use crate::descriptor::HttpBinding;

/// A dotted path of schema field names, starting at the request message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable {
        field_path: FieldPath,
        /// Raw sub-pattern after `=`, kept for diagnostics only.
        pattern: Option<String>,
    },
    MatchSingle,
    MatchMultiple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
    pub verb: Option<String>,
}

impl Template {
    pub fn variables(&self) -> impl Iterator<Item = &FieldPath> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable { field_path, .. } => Some(field_path),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Maps a binding kind such as `get` or `PATCH` to a method. Anything else is unsupported.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySelector {
    None,
    Whole,
    Field(FieldPath),
}

impl BodySelector {
    pub fn parse(body: &str) -> Result<Self, TemplateSyntaxError> {
        match body {
            "" => Ok(Self::None),
            "*" => Ok(Self::Whole),
            field => parse_field_path(field, field, 0).map(Self::Field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub method: HttpMethod,
    pub template: Template,
    pub body: BodySelector,
}

impl Rule {
    ///
    /// Parses a binding into a [`Rule`].
    ///
    /// Returns `Ok(None)` when the binding uses a method kind that is not supported, which callers
    /// treat the same as a method without any binding.
    ///
    pub fn from_binding(binding: &HttpBinding) -> Result<Option<Self>, TemplateSyntaxError> {
        let Some(method) = HttpMethod::from_kind(&binding.method) else {
            return Ok(None);
        };
        Ok(Some(Self {
            method,
            template: parse_template(&binding.path)?,
            body: BodySelector::parse(&binding.body)?,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid http template `{template}` at offset {offset}: {reason}")]
pub struct TemplateSyntaxError {
    pub template: String,
    pub offset: usize,
    pub reason: String,
}

impl TemplateSyntaxError {
    fn new(template: &str, offset: usize, reason: impl Into<String>) -> Self {
        Self {
            template: template.to_string(),
            offset,
            reason: reason.into(),
        }
    }
}

pub fn parse_template(template: &str) -> Result<Template, TemplateSyntaxError> {
    let Some(rest) = template.strip_prefix('/') else {
        return Err(TemplateSyntaxError::new(template, 0, "must start with `/`"));
    };

    let (path, verb) = split_verb(template, rest)?;
    let components = split_components(template, path)?;

    let mut segments = Vec::with_capacity(components.len());
    let last = components.len().saturating_sub(1);
    for (index, (offset, component)) in components.into_iter().enumerate() {
        let segment = parse_segment(template, offset, component)?;
        if segment == Segment::MatchMultiple && index != last {
            return Err(TemplateSyntaxError::new(
                template,
                offset,
                "`**` is only allowed as the last segment",
            ));
        }
        segments.push(segment);
    }

    Ok(Template { segments, verb })
}

/// Splits `:verb` off the path, looking only at colons outside of variables.
fn split_verb<'a>(
    template: &str,
    rest: &'a str,
) -> Result<(&'a str, Option<String>), TemplateSyntaxError> {
    let mut depth = 0usize;
    for (index, ch) in rest.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    TemplateSyntaxError::new(template, index + 1, "unbalanced `}`")
                })?
            }
            ':' if depth == 0 => {
                let verb = &rest[index + 1..];
                if verb.is_empty() {
                    return Err(TemplateSyntaxError::new(template, index + 1, "empty verb"));
                }
                if verb.contains(['/', '{', '}', ':']) {
                    return Err(TemplateSyntaxError::new(
                        template,
                        index + 2,
                        format!("invalid verb `{verb}`"),
                    ));
                }
                return Ok((&rest[..index], Some(verb.to_string())));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(TemplateSyntaxError::new(template, template.len(), "unbalanced `{`"));
    }
    Ok((rest, None))
}

/// Splits the path on `/` outside of variables, keeping each component's offset in the template.
fn split_components<'a>(
    template: &str,
    path: &'a str,
) -> Result<Vec<(usize, &'a str)>, TemplateSyntaxError> {
    let mut components = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in path.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    TemplateSyntaxError::new(template, index + 1, "unbalanced `}`")
                })?
            }
            '/' if depth == 0 => {
                components.push((start + 1, &path[start..index]));
                start = index + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(TemplateSyntaxError::new(template, template.len(), "unbalanced `{`"));
    }
    components.push((start + 1, &path[start..]));

    if let Some((offset, _)) = components.iter().find(|(_, c)| c.is_empty()) {
        return Err(TemplateSyntaxError::new(template, *offset, "empty path segment"));
    }
    Ok(components)
}

fn parse_segment(
    template: &str,
    offset: usize,
    component: &str,
) -> Result<Segment, TemplateSyntaxError> {
    match component {
        "*" => return Ok(Segment::MatchSingle),
        "**" => return Ok(Segment::MatchMultiple),
        _ => {}
    }

    if let Some(inner) = component.strip_prefix('{') {
        let Some(inner) = inner.strip_suffix('}') else {
            return Err(TemplateSyntaxError::new(
                template,
                offset,
                format!("variable `{component}` must end with `}}`"),
            ));
        };
        if inner.contains(['{', '}']) {
            return Err(TemplateSyntaxError::new(
                template,
                offset,
                "nested variables are not allowed",
            ));
        }
        let (path, pattern) = match inner.split_once('=') {
            Some((path, pattern)) => {
                if pattern.is_empty() {
                    return Err(TemplateSyntaxError::new(
                        template,
                        offset + path.len() + 2,
                        "empty variable pattern",
                    ));
                }
                (path, Some(pattern.to_string()))
            }
            None => (inner, None),
        };
        return Ok(Segment::Variable {
            field_path: parse_field_path(template, path, offset + 1)?,
            pattern,
        });
    }

    if component.contains(['{', '}', '*']) {
        return Err(TemplateSyntaxError::new(
            template,
            offset,
            format!("invalid literal `{component}`"),
        ));
    }
    Ok(Segment::Literal(component.to_string()))
}

fn parse_field_path(
    template: &str,
    path: &str,
    offset: usize,
) -> Result<FieldPath, TemplateSyntaxError> {
    if path.is_empty() {
        return Err(TemplateSyntaxError::new(template, offset, "empty field path"));
    }
    let mut segments = Vec::new();
    let mut position = offset;
    for ident in path.split('.') {
        if !is_ident(ident) {
            return Err(TemplateSyntaxError::new(
                template,
                position,
                format!("invalid field name `{ident}` in `{path}`"),
            ));
        }
        segments.push(ident.to_string());
        position += ident.len() + 1;
    }
    Ok(FieldPath(segments))
}

fn is_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literal(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn variable(path: &str, pattern: Option<&str>) -> Segment {
        Segment::Variable {
            field_path: FieldPath::new(path.split('.')),
            pattern: pattern.map(str::to_string),
        }
    }

    #[test]
    fn parses_literals_and_variables() {
        let template = parse_template("/v1/{name}/items/{item_id}").unwrap();
        assert_eq!(
            template.segments,
            vec![
                literal("v1"),
                variable("name", None),
                literal("items"),
                variable("item_id", None),
            ]
        );
        assert_eq!(template.verb, None);
    }

    #[test]
    fn parses_variable_with_pattern_and_nested_path() {
        let template = parse_template("/v1/{book.name=shelves/*/books/**}").unwrap();
        assert_eq!(
            template.segments,
            vec![literal("v1"), variable("book.name", Some("shelves/*/books/**"))]
        );
    }

    #[test]
    fn extracts_custom_verb() {
        let template = parse_template("/v1/{name=projects/*}:archive").unwrap();
        assert_eq!(template.verb.as_deref(), Some("archive"));
        assert_eq!(
            template.segments,
            vec![literal("v1"), variable("name", Some("projects/*"))]
        );
    }

    #[test]
    fn parses_wildcards() {
        let template = parse_template("/v1/*/files/**").unwrap();
        assert_eq!(
            template.segments,
            vec![
                literal("v1"),
                Segment::MatchSingle,
                literal("files"),
                Segment::MatchMultiple,
            ]
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        let cases = [
            ("v1/{name}", "must start with `/`"),
            ("/v1/{name", "unbalanced `{`"),
            ("/v1/name}", "unbalanced `}`"),
            ("/v1/{}", "empty field path"),
            ("/v1/{=shelves/*}", "empty field path"),
            ("/v1/{name=}", "empty variable pattern"),
            ("/v1//books", "empty path segment"),
            ("/v1/**/books", "`**` is only allowed as the last segment"),
            ("/v1/{name}:", "empty verb"),
            ("/v1/{a.}", "invalid field name `` in `a.`"),
            ("/v1/x{name}", "invalid literal `x{name}`"),
        ];
        for (template, reason) in cases {
            let err = parse_template(template).unwrap_err();
            assert_eq!(err.reason, reason, "template: {template}");
            assert_eq!(err.template, template);
        }
    }

    #[test]
    fn rule_from_binding() {
        let binding = HttpBinding::new("post", "/v1/{parent=shelves/*}/books", "book");
        let rule = Rule::from_binding(&binding).unwrap().unwrap();
        assert_eq!(rule.method, HttpMethod::Post);
        assert_eq!(rule.body, BodySelector::Field(FieldPath::new(["book"])));
        assert_eq!(
            rule.template.variables().collect::<Vec<_>>(),
            vec![&FieldPath::new(["parent"])]
        );
    }

    #[test]
    fn unsupported_method_kind_is_not_an_error() {
        let binding = HttpBinding::new("HEAD", "/v1/things", "");
        assert_eq!(Rule::from_binding(&binding), Ok(None));
    }

    #[test]
    fn body_selector_variants() {
        assert_eq!(BodySelector::parse(""), Ok(BodySelector::None));
        assert_eq!(BodySelector::parse("*"), Ok(BodySelector::Whole));
        assert!(BodySelector::parse("not valid").is_err());
    }
}
