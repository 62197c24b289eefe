//! Checks on generated validator source.
//!
//! Re-parses the output and reports syntax errors and schema references that
//! are undeclared or used before their declaration.

use crate::input::{ParseError, typescript_parser};
use crate::traits::ConvertError;
use std::collections::HashSet;
use tree_sitter::Node;

/// Validate generated Zod source.
pub fn validate_zod_source(source: &str) -> Result<Vec<ConvertError>, ParseError> {
    let mut parser = typescript_parser()?;
    let tree = parser.parse(source, None).ok_or(ParseError::Failed)?;
    let root = tree.root_node();
    let mut errors = Vec::new();

    if let Some(node) = first_error(root) {
        errors.push(ConvertError::global(format!(
            "generated source does not parse (line {})",
            node.start_position().row + 1
        )));
    }

    let mut declarations = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if let Some(declarator) = exported_declarator(child)
            && let Some(name) = declarator.child_by_field_name("name")
        {
            declarations.push((text(name, source).to_string(), declarator));
        }
    }

    let all: HashSet<&str> = declarations.iter().map(|(n, _)| n.as_str()).collect();
    let mut declared: HashSet<&str> = HashSet::new();
    for (name, declarator) in &declarations {
        declared.insert(name.as_str());
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        let mut used = Vec::new();
        collect_identifiers(value, source, &mut used);
        for ident in used {
            if ident == "z" || declared.contains(ident) {
                continue;
            }
            let message = if all.contains(ident) {
                format!("`{}` is used before its declaration", ident)
            } else {
                format!("reference to undeclared schema `{}`", ident)
            };
            errors.push(ConvertError::new(name.as_str(), message));
        }
    }

    Ok(errors)
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// The declarator of `export const X = ...`.
fn exported_declarator(node: Node) -> Option<Node> {
    if node.kind() != "export_statement" {
        return None;
    }
    let decl = node.child_by_field_name("declaration")?;
    if decl.kind() != "lexical_declaration" {
        return None;
    }
    let mut cursor = decl.walk();
    decl.named_children(&mut cursor)
        .find(|c| c.kind() == "variable_declarator")
}

fn collect_identifiers<'s>(node: Node, source: &'s str, out: &mut Vec<&'s str>) {
    if node.kind() == "identifier" {
        let name = text(node, source);
        if !out.contains(&name) {
            out.push(name);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, source, out);
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
