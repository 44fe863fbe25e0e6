//! One output file per package.

use std::collections::{BTreeMap, HashSet};

use crate::codegen::CodeFile;
use crate::context::GenerationContext;
use crate::descriptor::{DescriptorSet, EnumDesc, FieldKind, FileDesc, MessageDesc};
use crate::message::{write_enum, MessageGenerator};
use crate::service::{write_service_header, ServiceGenerator};
use crate::types::TypeMapper;
use crate::wellknown::WellKnownType;

const HEADER: [&str; 3] = [
    "// Code generated by protoc-gen-typescript-http. DO NOT EDIT.",
    "/* eslint-disable camelcase */",
    "// @ts-nocheck",
];

const TRAILER: &str = "// @@protoc_insertion_point(typescript-http-eof)";

/// Output path of a package, e.g. `library/v1/index.ts`.
pub fn output_path(package: &str) -> String {
    if package.is_empty() {
        return "index.ts".to_string();
    }
    format!("{}/index.ts", package.replace('.', "/"))
}

/// Everything a package's output has to declare.
#[derive(Debug, Default)]
struct Reachable<'a> {
    messages: Vec<&'a MessageDesc>,
    enums: Vec<&'a EnumDesc>,
    /// Keyed by alias so declarations come out sorted.
    well_known: BTreeMap<String, WellKnownType>,
    seen: HashSet<&'a str>,
}

impl<'a> Reachable<'a> {
    fn add_message(&mut self, set: &'a DescriptorSet, full_name: &'a str) {
        if let Some(wkt) = WellKnownType::lookup(full_name) {
            self.add_well_known(wkt);
            return;
        }
        if !self.seen.insert(full_name) {
            return;
        }
        match set.message(full_name) {
            Some(message) => self.messages.push(message),
            None => tracing::warn!(message = full_name, "referenced message not found"),
        }
    }

    fn add_enum(&mut self, set: &'a DescriptorSet, full_name: &'a str) {
        if let Some(wkt) = WellKnownType::lookup(full_name) {
            self.add_well_known(wkt);
            return;
        }
        if !self.seen.insert(full_name) {
            return;
        }
        match set.enumeration(full_name) {
            Some(enumeration) => self.enums.push(enumeration),
            None => tracing::warn!(enumeration = full_name, "referenced enum not found"),
        }
    }

    fn add_well_known(&mut self, wkt: WellKnownType) {
        for dependency in wkt.dependencies() {
            self.add_well_known(dependency);
        }
        self.well_known.entry(wkt.name()).or_insert(wkt);
    }

    ///
    /// Collects the package's own declarations, the messages its methods use, and everything
    /// their fields refer to.
    ///
    fn collect(set: &'a DescriptorSet, files: &[&'a FileDesc]) -> Self {
        let mut reachable = Self::default();
        for &file in files {
            for enumeration in &file.enums {
                reachable.add_enum(set, &enumeration.full_name);
            }
            for message in &file.messages {
                reachable.add_message(set, &message.full_name);
            }
        }
        for &file in files {
            for method in file.services.iter().flat_map(|service| &service.methods) {
                reachable.add_message(set, &method.input_type);
                reachable.add_message(set, &method.output_type);
            }
        }

        let mut index = 0;
        while let Some(message) = reachable.messages.get(index).copied() {
            for field in &message.fields {
                match &field.kind {
                    FieldKind::Message(name) => reachable.add_message(set, name),
                    FieldKind::Enum(name) => reachable.add_enum(set, name),
                    FieldKind::Scalar(_) => {}
                }
            }
            index += 1;
        }
        reachable
    }
}

pub struct PackageGenerator<'a> {
    set: &'a DescriptorSet,
    package: &'a str,
    files: Vec<&'a FileDesc>,
}

impl<'a> PackageGenerator<'a> {
    pub fn new(set: &'a DescriptorSet, package: &'a str, files: Vec<&'a FileDesc>) -> Self {
        Self { set, package, files }
    }

    pub fn generate(&self, ctx: &mut GenerationContext) -> CodeFile {
        let reachable = Reachable::collect(self.set, &self.files);
        tracing::debug!(
            package = self.package,
            messages = reachable.messages.len(),
            enums = reachable.enums.len(),
            well_known = reachable.well_known.len(),
            "generating package"
        );

        let types = TypeMapper::new(self.set, self.package);
        let messages = MessageGenerator::new(self.set, self.package);
        let mut body = CodeFile::new();

        for enumeration in &reachable.enums {
            let name = types.map_enum(&enumeration.full_name).reference();
            write_enum(&mut body, &name, enumeration);
        }
        for &message in &reachable.messages {
            messages.synthesize(ctx, &mut body, message, false, false);
        }

        let services = self
            .files
            .iter()
            .flat_map(|&file| &file.services)
            .collect::<Vec<_>>();
        let mut plans = Vec::new();
        if !services.is_empty() {
            write_service_header(&mut body);
        }
        for service in services {
            let generator = ServiceGenerator::new(self.set, self.package, service);
            plans.extend(generator.generate(ctx, &mut body));
        }
        for plan in &plans {
            messages.synthesize(ctx, &mut body, plan.input, true, false);
            if let Some(output) = self.set.message(&plan.method.output_type) {
                messages.synthesize(ctx, &mut body, output, false, true);
            }
        }

        let mut f = CodeFile::new();
        for line in HEADER {
            f.line(0, line);
        }
        f.blank();
        for wkt in reachable.well_known.values() {
            wkt.write_declaration(&mut f);
        }
        f.append(&body);
        f.blank();
        f.line(0, TRAILER);
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDesc, ScalarKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn output_paths() {
        assert_eq!(output_path("library.v1"), "library/v1/index.ts");
        assert_eq!(output_path(""), "index.ts");
    }

    #[test]
    fn collects_transitive_references_and_well_known_types() {
        let set = DescriptorSet::new([
            FileDesc::new("common.proto", "common.v1").with_message(
                MessageDesc::new("common.v1", "Money")
                    .with_field(FieldDesc::scalar("units", ScalarKind::Int64))
                    .with_field(FieldDesc::new(
                        "currency",
                        FieldKind::enumeration("common.v1.Currency"),
                    )),
            ),
            FileDesc::new("shop.proto", "shop.v1").with_message(
                MessageDesc::new("shop.v1", "Item")
                    .with_field(FieldDesc::new("price", FieldKind::message("common.v1.Money")))
                    .with_field(FieldDesc::new(
                        "tags",
                        FieldKind::message("google.protobuf.ListValue"),
                    ))
                    .with_field(
                        FieldDesc::new("created", FieldKind::message("google.protobuf.Timestamp")),
                    ),
            ),
        ]);
        let shop = set.file("shop.proto").unwrap();
        let reachable = Reachable::collect(&set, &[shop]);

        let messages = reachable
            .messages
            .iter()
            .map(|m| m.full_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["shop.v1.Item", "common.v1.Money"]);
        assert!(reachable.enums.is_empty(), "unknown enums are skipped");
        assert_eq!(
            reachable.well_known.keys().cloned().collect::<Vec<_>>(),
            vec!["wellKnownListValue", "wellKnownTimestamp", "wellKnownValue"]
        );
    }
}
