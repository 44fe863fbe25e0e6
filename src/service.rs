//! Service interfaces and the HTTP clients implementing them.

use crate::codegen::{quote, CodeFile};
use crate::comments;
use crate::context::GenerationContext;
use crate::descriptor::{
    Cardinality, DescriptorSet, FieldDesc, MessageDesc, MethodDesc, ServiceDesc,
};
use crate::error::GenerationError;
use crate::httprule::{BodySelector, FieldPath, Rule, Segment};
use crate::message::Direction;
use crate::types::{suffix_name, TypeMapper};
use crate::wellknown::WellKnownType;

/// A field path resolved against a request message, field by field.
#[derive(Debug, Clone)]
pub struct ResolvedPath<'a> {
    pub path: FieldPath,
    fields: Vec<&'a FieldDesc>,
}

impl<'a> ResolvedPath<'a> {
    fn from_fields(fields: Vec<&'a FieldDesc>) -> Self {
        Self {
            path: FieldPath::new(fields.iter().map(|field| field.name.as_str())),
            fields,
        }
    }

    /// `a.b.c` using wire-JSON names.
    pub fn json_path(&self) -> String {
        self.json_segments().join(".")
    }

    /// `a?.b?.c` using wire-JSON names.
    pub fn null_path(&self) -> String {
        self.json_segments().join("?.")
    }

    fn json_segments(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.json_name.as_str()).collect()
    }

    fn leaf(&self) -> Option<&'a FieldDesc> {
        self.fields.last().copied()
    }
}

///
/// Resolves `path` against `message`.
///
/// Every segment but the last must name a singular message field.
///
pub fn resolve<'a>(
    set: &'a DescriptorSet,
    message: &'a MessageDesc,
    path: &FieldPath,
) -> Result<ResolvedPath<'a>, String> {
    let mut current = message;
    let mut fields = Vec::with_capacity(path.len());
    let last = path.len().saturating_sub(1);

    for (index, segment) in path.segments().iter().enumerate() {
        let field = current
            .field(segment)
            .ok_or_else(|| format!("no field `{segment}` in message `{}`", current.full_name))?;
        fields.push(field);
        if index == last {
            break;
        }

        let nested = match (&field.cardinality, field.kind.as_message()) {
            (Cardinality::Singular, Some(name)) => set.message(name),
            _ => None,
        };
        current = nested.ok_or_else(|| {
            format!(
                "field `{segment}` of `{}` is not a singular message",
                current.full_name
            )
        })?;
    }

    if fields.is_empty() {
        return Err("empty field path".to_string());
    }
    Ok(ResolvedPath::from_fields(fields))
}

///
/// Collects the query candidates of `message`, depth first in declaration order.
///
/// Singular message fields are descended into, except well-known types which are leaves. Maps,
/// repeated messages and messages already on the current path are skipped.
///
pub fn query_leaves<'a>(set: &'a DescriptorSet, message: &'a MessageDesc) -> Vec<ResolvedPath<'a>> {
    let mut leaves = Vec::new();
    walk_leaves(set, message, &mut Vec::new(), &mut Vec::new(), &mut leaves);
    leaves
}

fn walk_leaves<'a>(
    set: &'a DescriptorSet,
    message: &'a MessageDesc,
    prefix: &mut Vec<&'a FieldDesc>,
    on_path: &mut Vec<&'a str>,
    leaves: &mut Vec<ResolvedPath<'a>>,
) {
    on_path.push(&message.full_name);
    for field in &message.fields {
        prefix.push(field);
        match (&field.cardinality, field.kind.as_message()) {
            (Cardinality::Map, _) => {}
            (_, Some(name)) if WellKnownType::is_well_known(name) => {
                leaves.push(ResolvedPath::from_fields(prefix.clone()));
            }
            (Cardinality::Singular, Some(name)) => {
                if let Some(nested) = set.message(name) {
                    if !on_path.contains(&nested.full_name.as_str()) {
                        walk_leaves(set, nested, prefix, on_path, leaves);
                    }
                }
            }
            (Cardinality::Repeated, Some(_)) => {}
            (_, None) => leaves.push(ResolvedPath::from_fields(prefix.clone())),
        }
        prefix.pop();
    }
    on_path.pop();
}

enum PathPart<'a> {
    Text(&'static str),
    Literal(String),
    Variable(ResolvedPath<'a>),
}

/// A method with a usable binding, its template and body already resolved.
pub struct MethodPlan<'a> {
    pub method: &'a MethodDesc,
    pub input: &'a MessageDesc,
    rule: Rule,
    path: Vec<PathPart<'a>>,
    variables: Vec<ResolvedPath<'a>>,
    body: Option<ResolvedPath<'a>>,
}

pub struct ServiceGenerator<'a> {
    set: &'a DescriptorSet,
    types: TypeMapper<'a>,
    service: &'a ServiceDesc,
}

impl<'a> ServiceGenerator<'a> {
    pub fn new(set: &'a DescriptorSet, package: &'a str, service: &'a ServiceDesc) -> Self {
        Self {
            set,
            types: TypeMapper::new(set, package),
            service,
        }
    }

    ///
    /// Writes the interface and the client factory, and returns the methods that made it into
    /// them.
    ///
    /// Streaming methods, methods without a binding and methods with an unsupported binding kind
    /// are left out quietly. Methods whose template or field paths are broken are left out and
    /// reported through the context.
    ///
    pub fn generate(&self, ctx: &mut GenerationContext, f: &mut CodeFile) -> Vec<MethodPlan<'a>> {
        let plans = self
            .service
            .methods
            .iter()
            .filter_map(|method| self.plan(ctx, method))
            .collect::<Vec<_>>();

        self.write_interface(ctx, f, &plans);
        self.write_client(ctx, f, &plans);
        plans
    }

    fn method_name(&self, method: &MethodDesc) -> String {
        format!("{}.{}", self.service.full_name, method.name)
    }

    fn plan(&self, ctx: &mut GenerationContext, method: &'a MethodDesc) -> Option<MethodPlan<'a>> {
        let name = self.method_name(method);
        if method.client_streaming || method.server_streaming {
            tracing::debug!(method = %name, "skipping streaming method");
            return None;
        }
        let Some(binding) = method.http.as_ref() else {
            tracing::debug!(method = %name, "skipping method without http binding");
            return None;
        };
        let rule = match Rule::from_binding(binding) {
            Ok(Some(rule)) => rule,
            Ok(None) => {
                tracing::debug!(
                    method = %name,
                    kind = %binding.method,
                    "skipping unsupported http method"
                );
                return None;
            }
            Err(source) => {
                ctx.add_error(GenerationError::TemplateSyntax { method: name, source });
                return None;
            }
        };
        let Some(input) = self.set.message(&method.input_type) else {
            ctx.add_error(GenerationError::UnresolvedMessage {
                method: name,
                message: method.input_type.clone(),
            });
            return None;
        };
        tracing::debug!(
            method = %name,
            http = %binding.method,
            path = %binding.path,
            "generating method"
        );

        let mut failed = false;
        let mut resolve_or_report = |ctx: &mut GenerationContext, path: &FieldPath| {
            match resolve(self.set, input, path) {
                Ok(resolved) => Some(resolved),
                Err(reason) => {
                    failed = true;
                    ctx.add_error(GenerationError::UnresolvedFieldPath {
                        method: name.clone(),
                        path: path.to_string(),
                        reason,
                    });
                    None
                }
            }
        };

        let mut path = vec![PathPart::Text("/")];
        let mut variables = Vec::new();
        for (index, segment) in rule.template.segments.iter().enumerate() {
            if index > 0 {
                path.push(PathPart::Text("/"));
            }
            match segment {
                Segment::Literal(literal) => path.push(PathPart::Literal(literal.clone())),
                Segment::MatchSingle => path.push(PathPart::Text("*")),
                Segment::MatchMultiple => path.push(PathPart::Text("**")),
                Segment::Variable { field_path, .. } => {
                    if let Some(resolved) = resolve_or_report(ctx, field_path) {
                        variables.push(resolved.clone());
                        path.push(PathPart::Variable(resolved));
                    }
                }
            }
        }
        if let Some(verb) = &rule.template.verb {
            path.push(PathPart::Literal(format!(":{verb}")));
        }

        let body = match &rule.body {
            BodySelector::Field(field_path) => resolve_or_report(ctx, field_path),
            BodySelector::None | BodySelector::Whole => None,
        };

        if failed {
            return None;
        }
        Some(MethodPlan {
            method,
            input,
            rule,
            path,
            variables,
            body,
        })
    }

    /// Name used for a method's input or output in signatures.
    fn signature_type(
        &self,
        ctx: &mut GenerationContext,
        full_name: &str,
        direction: Direction,
    ) -> String {
        let name = self.types.message_name(full_name);
        if WellKnownType::is_well_known(full_name)
            || !ctx.discriminator.requires_discrimination_by_name(self.set, full_name)
        {
            return name;
        }
        suffix_name(&name, direction.suffix(ctx))
    }

    fn write_interface(
        &self,
        ctx: &mut GenerationContext,
        f: &mut CodeFile,
        plans: &[MethodPlan<'a>],
    ) {
        comments::write_leading(f, 0, self.service.comments.as_deref(), &[]);
        f.line(0, format!("export interface {} {{", self.service.name));
        for plan in plans {
            let method = plan.method;
            let input = self.signature_type(ctx, &method.input_type, Direction::Request);
            let output = self.signature_type(ctx, &method.output_type, Direction::Response);
            comments::write_leading(f, 1, method.comments.as_deref(), &[]);
            f.line(
                1,
                format!("{}(request: {input}): Promise<{output}>;", method.name),
            );
        }
        f.line(0, "}");
        f.blank();
    }

    fn write_client(
        &self,
        ctx: &mut GenerationContext,
        f: &mut CodeFile,
        plans: &[MethodPlan<'a>],
    ) {
        let service = &self.service.name;
        f.line(0, format!("export function create{service}Client("));
        f.line(1, "handler: RequestHandler");
        f.line(0, format!("): {service} {{"));
        f.line(1, "return {");
        for plan in plans {
            let output = self.signature_type(ctx, &plan.method.output_type, Direction::Response);
            self.write_method(f, plan, &output);
        }
        f.line(1, "};");
        f.line(0, "}");
        f.blank();
    }

    fn write_method(&self, f: &mut CodeFile, plan: &MethodPlan<'a>, output: &str) {
        let method = plan.method;
        f.line(
            2,
            format!(
                "{}(request) {{ // eslint-disable-line @typescript-eslint/no-unused-vars",
                method.name
            ),
        );

        for variable in &plan.variables {
            let message = format!("missing required field request.{}", variable.path);
            f.line(3, format!("if (!request.{}) {{", variable.null_path()));
            f.line(4, format!("throw new Error({});", quote(&message)));
            f.line(3, "}");
        }

        let path = plan
            .path
            .iter()
            .map(|part| match part {
                PathPart::Text(text) => text.to_string(),
                PathPart::Literal(literal) => literal.clone(),
                PathPart::Variable(variable) => format!("${{request.{}}}", variable.json_path()),
            })
            .collect::<String>();
        f.line(3, format!("const path = `{path}`; // eslint-disable-line quotes"));

        match (&plan.rule.body, &plan.body) {
            (BodySelector::Whole, _) => f.line(3, "const body = JSON.stringify(request);"),
            (BodySelector::Field(_), Some(body)) => f.line(
                3,
                format!("const body = JSON.stringify(request?.{} ?? {{}});", body.null_path()),
            ),
            _ => f.line(3, "const body = null;"),
        }

        f.line(3, "const queryParams: string[] = [];");
        if plan.rule.body != BodySelector::Whole {
            self.write_query(f, plan);
        }

        f.line(3, "let uri = path;");
        f.line(3, "if (queryParams.length > 0) {");
        f.line(4, "uri += `?${queryParams.join(\"&\")}`");
        f.line(3, "}");
        f.line(3, "return handler({");
        f.line(4, "path: uri,");
        f.line(4, format!("method: {},", quote(plan.rule.method.as_str())));
        f.line(4, "body,");
        f.line(3, "}, {");
        f.line(4, format!("service: {},", quote(&self.service.name)));
        f.line(4, format!("method: {},", quote(&method.name)));
        f.line(3, format!("}}) as Promise<{output}>;"));
        f.line(2, "},");
    }

    fn write_query(&self, f: &mut CodeFile, plan: &MethodPlan<'a>) {
        for leaf in query_leaves(self.set, plan.input) {
            let in_path = plan
                .variables
                .iter()
                .any(|variable| leaf.path.starts_with(&variable.path));
            let in_body = plan
                .body
                .as_ref()
                .is_some_and(|body| leaf.path.starts_with(&body.path));
            if in_path || in_body {
                continue;
            }

            let json_path = leaf.json_path();
            f.line(3, format!("if (request.{}) {{", leaf.null_path()));
            if leaf.leaf().is_some_and(FieldDesc::is_list) {
                f.line(4, format!("request.{json_path}.forEach((x) => {{"));
                f.line(
                    5,
                    format!(
                        "queryParams.push(`{json_path}=${{encodeURIComponent(x.toString())}}`)"
                    ),
                );
                f.line(4, "})");
            } else {
                f.line(
                    4,
                    format!(
                        "queryParams.push(`{json_path}=${{encodeURIComponent(request.{json_path}.toString())}}`)"
                    ),
                );
            }
            f.line(3, "}");
        }
    }
}

/// Declarations every client factory in a file relies on.
pub fn write_service_header(f: &mut CodeFile) {
    f.line(0, "type RequestType = {");
    f.line(1, "path: string;");
    f.line(1, "method: string;");
    f.line(1, "body: string | null;");
    f.line(0, "};");
    f.blank();
    f.line(
        0,
        "type RequestHandler = (request: RequestType, meta: { service: string, method: string }) => Promise<unknown>;",
    );
    f.blank();
}
