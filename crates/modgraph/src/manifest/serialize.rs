//! Canonical descriptor rendering.
//!
//! Writes a [`Manifest`] back as a build descriptor that parses to an
//! equal manifest. Comments, statement order among unknown fields, and
//! formatting of the original file are not preserved.

use std::fmt::Write;

use super::model::{DependencyList, Manifest, UnknownField};
use super::parser::{PRIVATE_DEPENDENCIES, PUBLIC_DEPENDENCIES};

const TARGET: &str = "Target";
const INDENT: &str = "    ";

/// Render `manifest` in canonical descriptor form.
pub fn serialize(manifest: &Manifest) -> String {
    let mut out = String::new();
    let name = &manifest.name;
    let body = INDENT.repeat(2);

    out.push_str("using UnrealBuildTool;\n\n");
    let _ = writeln!(out, "public class {name} : ModuleRules\n{{");
    let _ = writeln!(
        out,
        "{INDENT}public {name}(ReadOnlyTargetRules {TARGET}) : base({TARGET})\n{INDENT}{{"
    );
    let _ = writeln!(out, "{body}PCHUsage = PCHUsageMode.{};", manifest.pch_usage);

    out.push('\n');
    write_list(&mut out, &body, PUBLIC_DEPENDENCIES, &manifest.public);
    out.push('\n');
    write_list(&mut out, &body, PRIVATE_DEPENDENCIES, &manifest.private);
    write_unknown(&mut out, &body, &manifest.unknown);

    let nested = INDENT.repeat(3);
    for block in &manifest.conditionals {
        out.push('\n');
        let _ = writeln!(out, "{body}if ({})\n{body}{{", block.condition.to_source(TARGET));
        let mut first = true;
        for (field, list) in [
            (PUBLIC_DEPENDENCIES, &block.public),
            (PRIVATE_DEPENDENCIES, &block.private),
        ] {
            if list.is_empty() {
                continue;
            }
            if !first {
                out.push('\n');
            }
            write_list(&mut out, &nested, field, list);
            first = false;
        }
        write_unknown(&mut out, &nested, &block.unknown);
        let _ = writeln!(out, "{body}}}");
    }

    let _ = writeln!(out, "{INDENT}}}\n}}");
    out
}

fn write_list(out: &mut String, indent: &str, field: &str, list: &DependencyList) {
    let _ = writeln!(out, "{indent}{field}.AddRange(new string[] {{");
    let count = list.len();
    for (i, dep) in list.iter().enumerate() {
        let comma = if i + 1 < count { "," } else { "" };
        let _ = writeln!(out, "{indent}{INDENT}\"{}\"{comma}", dep.name);
    }
    let _ = writeln!(out, "{indent}}});");
}

fn write_unknown(out: &mut String, indent: &str, fields: &[UnknownField]) {
    if fields.is_empty() {
        return;
    }
    out.push('\n');
    for field in fields {
        let _ = writeln!(out, "{indent}{}", field.raw);
    }
}
