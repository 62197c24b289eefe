//! Declaration preprocessing.
//!
//! Supabase nests every table, view, enum and function under one `Database`
//! type. The converter works on flat top-level declarations, so the selected
//! schema is flattened first:
//!
//! ```text
//! Database["public"]["Tables"]["channels"]["Row"]   -> export type ChannelsRow = ...;
//! Database["public"]["Views"]["active_users"]["Row"] -> export type ActiveUsersRow = ...;
//! Database["public"]["Enums"]["user_status"]        -> export type UserStatus = ...;
//! Database["public"]["CompositeTypes"]["address"]   -> export type Address = ...;
//! Database["public"]["Functions"]["search"]["Args"] -> export type SearchArgs = ...;
//! ```
//!
//! Lookups into `Database` inside flattened bodies are rewritten to the
//! flattened names. Other exported, non-generic declarations (`Json`) pass
//! through. Name and JSDoc-tag filters then decide what reaches the converter.

use crate::error::{Diagnostic, Error, Stage};
use crate::naming::Naming;
use convert_case::{Case, Casing};
use regex::{Captures, Regex};
use std::collections::HashMap;
use supazod_typegen::input::{parse_jsdoc, typescript_parser};
use supazod_typegen::ir::{JsDoc, JsDocTag};
use tree_sitter::Node;

/// Predicate over declaration names. `false` excludes the declaration.
pub type NameFilter = dyn Fn(&str) -> bool + Send + Sync;

/// Predicate over the JSDoc tags attached to a declaration. `false`
/// excludes the declaration.
pub type JsDocTagFilter = dyn Fn(&[JsDocTag]) -> bool + Send + Sync;

/// Members flattened out of table and view entries.
const TABLE_MEMBERS: [&str; 3] = ["Row", "Insert", "Update"];
const FUNCTION_MEMBERS: [&str; 2] = ["Args", "Returns"];

pub struct PreprocessOptions<'a> {
    /// Schema to flatten, e.g. `public`.
    pub schema: &'a str,
    /// Name of the nested database type.
    pub database_type: &'a str,
    pub naming: &'a Naming,
    pub name_filter: Option<&'a NameFilter>,
    pub jsdoc_tag_filter: Option<&'a JsDocTagFilter>,
}

/// Source handed to the converter.
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub source: String,
    /// Names of the declarations in `source`, in order.
    pub declarations: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A top-level declaration before filtering.
struct Candidate {
    name: String,
    tags: Vec<JsDocTag>,
    text: String,
}

/// Flatten the database type and apply filters.
pub fn preprocess(source: &str, options: &PreprocessOptions) -> Result<Preprocessed, Error> {
    let mut parser = typescript_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or(supazod_typegen::ParseError::Failed)?;
    let root = tree.root_node();
    let ctx = Context {
        source,
        options,
        lookup: lookup_pattern(options.database_type)?,
    };

    let mut candidates = Vec::new();
    let mut diagnostics = Vec::new();
    let mut database_seen = false;
    for Annotated { node, doc, start } in with_comments(root, source) {
        if node.kind() != "export_statement" {
            tracing::debug!(kind = node.kind(), "skipping non-exported statement");
            continue;
        }
        let Some(decl) = node.child_by_field_name("declaration") else {
            continue;
        };
        if !matches!(
            decl.kind(),
            "type_alias_declaration" | "interface_declaration" | "enum_declaration"
        ) {
            tracing::debug!(kind = decl.kind(), "skipping value declaration");
            continue;
        }
        let Some(name) = decl.child_by_field_name("name").map(|n| ctx.text(n)) else {
            continue;
        };

        if name == options.database_type {
            database_seen = true;
            ctx.flatten_database(decl, &mut candidates, &mut diagnostics)?;
            continue;
        }
        if decl.child_by_field_name("type_parameters").is_some() {
            tracing::debug!(name, "skipping generic declaration");
            continue;
        }
        if references(decl, source, options.database_type) {
            tracing::debug!(name, "skipping declaration that refers to the database type");
            continue;
        }
        candidates.push(Candidate {
            name: name.to_string(),
            tags: doc.map(|d| d.tags).unwrap_or_default(),
            text: source[start..node.end_byte()].to_string(),
        });
    }

    if !database_seen {
        tracing::debug!(
            database = options.database_type,
            "no database type; passing declarations through"
        );
    }

    Ok(filter(candidates, diagnostics, options))
}

fn filter(
    candidates: Vec<Candidate>,
    diagnostics: Vec<Diagnostic>,
    options: &PreprocessOptions,
) -> Preprocessed {
    let mut out = Preprocessed {
        diagnostics,
        ..Preprocessed::default()
    };
    let mut identifiers: HashMap<String, String> = HashMap::new();
    let mut texts = Vec::new();

    for candidate in candidates {
        if let Some(filter) = options.name_filter
            && !filter(&candidate.name)
        {
            tracing::debug!(name = %candidate.name, "excluded by name filter");
            continue;
        }
        if let Some(filter) = options.jsdoc_tag_filter
            && !filter(&candidate.tags)
        {
            tracing::debug!(name = %candidate.name, "excluded by JSDoc tag filter");
            continue;
        }

        let identifier = options.naming.schema_name(&candidate.name);
        if let Some(first) = identifiers.get(&identifier) {
            let diag = Diagnostic::new(
                Stage::Preprocess,
                &candidate.name,
                format!("validator name `{}` is already used by `{}`; dropped", identifier, first),
            );
            tracing::warn!("{}", diag);
            out.diagnostics.push(diag);
            continue;
        }
        identifiers.insert(identifier, candidate.name.clone());

        texts.push(candidate.text);
        out.declarations.push(candidate.name);
    }

    out.source = texts.join("\n\n");
    out.source.push('\n');
    out
}

struct Context<'a> {
    source: &'a str,
    options: &'a PreprocessOptions<'a>,
    lookup: Regex,
}

impl Context<'_> {
    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Flatten the selected schema of the database type into `out`.
    fn flatten_database(
        &self,
        decl: Node,
        out: &mut Vec<Candidate>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Error> {
        let schemas = decl
            .child_by_field_name("value")
            .or_else(|| decl.child_by_field_name("body"))
            .filter(|n| matches!(n.kind(), "object_type" | "interface_body"));
        let members = schemas.map(|n| self.members(n)).unwrap_or_default();

        let schema = members
            .iter()
            .find(|m| m.name == self.options.schema)
            .and_then(|m| m.ty);
        let Some(schema) = schema else {
            return Err(Error::SchemaNotFound {
                schema: self.options.schema.to_string(),
                database: self.options.database_type.to_string(),
                available: members.into_iter().map(|m| m.name).collect(),
            });
        };

        for section in self.members(schema) {
            let Some(section_ty) = section.ty else {
                continue;
            };
            match section.name.as_str() {
                "Tables" | "Views" => {
                    self.flatten_entries(section_ty, &TABLE_MEMBERS, out, diagnostics)
                }
                "Functions" => {
                    self.flatten_entries(section_ty, &FUNCTION_MEMBERS, out, diagnostics)
                }
                "Enums" | "CompositeTypes" => {
                    for entry in self.members(section_ty) {
                        if let Some(ty) = entry.ty {
                            let name = entry.name.to_case(Case::Pascal);
                            out.push(self.candidate(name, entry.tags, ty));
                        }
                    }
                }
                other => tracing::debug!(section = other, "skipping unknown schema section"),
            }
        }
        Ok(())
    }

    /// Emit `<Entry><Member>` for every entry of a `Tables`, `Views` or
    /// `Functions` section. Entries that are not a single object type, such
    /// as overloaded functions, are reported and dropped.
    fn flatten_entries(
        &self,
        section: Node,
        wanted: &[&str],
        out: &mut Vec<Candidate>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for entry in self.members(section) {
            let Some(entry_ty) = entry.ty else {
                continue;
            };
            let base = entry.name.to_case(Case::Pascal);
            if entry_ty.kind() != "object_type" {
                let message = match entry_ty.kind() {
                    "union_type" => "has overloaded signatures; not generated".to_string(),
                    kind => format!("is a `{}`, not an object type; not generated", kind),
                };
                let diag = Diagnostic::new(Stage::Preprocess, &entry.name, message);
                tracing::warn!("{}", diag);
                diagnostics.push(diag);
                continue;
            }
            for member in self.members(entry_ty) {
                if !wanted.contains(&member.name.as_str()) {
                    continue;
                }
                if let Some(ty) = member.ty {
                    let mut tags = entry.tags.clone();
                    tags.extend(member.tags);
                    out.push(self.candidate(format!("{}{}", base, member.name), tags, ty));
                }
            }
        }
    }

    fn candidate(&self, name: String, tags: Vec<JsDocTag>, ty: Node) -> Candidate {
        let body = self.rewrite_lookups(self.text(ty));
        tracing::debug!(%name, "flattened declaration");
        Candidate {
            text: format!("export type {} = {};", name, body),
            name,
            tags,
        }
    }

    /// Property signatures of an object type, with their JSDoc tags.
    /// Index signatures (`[_ in never]: never`) are skipped.
    fn members<'t>(&self, object: Node<'t>) -> Vec<Member<'t>> {
        with_comments(object, self.source)
            .into_iter()
            .filter(|item| item.node.kind() == "property_signature")
            .filter_map(|Annotated { node, doc, .. }| {
                let name = node.child_by_field_name("name")?;
                Some(Member {
                    name: unquote(self.text(name)),
                    ty: node
                        .child_by_field_name("type")
                        .and_then(|annotation| annotation.named_child(0)),
                    tags: doc.map(|d| d.tags).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Replace `Database["<schema>"]["Enums"]["x"]`-style lookups with the
    /// flattened name. Lookups into other schemas are left alone.
    fn rewrite_lookups(&self, text: &str) -> String {
        self.lookup
            .replace_all(text, |caps: &Captures| {
                if &caps[1] != self.options.schema {
                    return caps[0].to_string();
                }
                let mut name = caps[2].to_string().to_case(Case::Pascal);
                if let Some(member) = caps.get(3) {
                    name.push_str(member.as_str());
                }
                name
            })
            .into_owned()
    }
}

struct Member<'t> {
    name: String,
    ty: Option<Node<'t>>,
    tags: Vec<JsDocTag>,
}

fn lookup_pattern(database_type: &str) -> Result<Regex, Error> {
    let q = r#"\[\s*["']([^"']+)["']\s*\]"#;
    let pattern = format!(
        r#"\b{db}{q}\[\s*["'](?:Tables|Views|Enums|CompositeTypes|Functions)["']\s*\]{q}(?:\[\s*["'](Row|Insert|Update|Args|Returns)["']\s*\])?"#,
        db = regex::escape(database_type),
        q = q,
    );
    Regex::new(&pattern).map_err(|e| Error::Config(format!("database type pattern: {}", e)))
}

/// A named child with the comments directly above it.
struct Annotated<'t> {
    node: Node<'t>,
    doc: Option<JsDoc>,
    /// Start of the first attached comment, or of the node itself.
    start: usize,
}

fn with_comments<'t>(parent: Node<'t>, source: &str) -> Vec<Annotated<'t>> {
    let mut out = Vec::new();
    let mut doc = None;
    let mut start = None;
    let mut cursor = parent.walk();
    for node in parent.named_children(&mut cursor) {
        if node.kind() == "comment" {
            start.get_or_insert(node.start_byte());
            if let Some(parsed) = node.utf8_text(source.as_bytes()).ok().and_then(parse_jsdoc) {
                doc = Some(parsed);
            }
            continue;
        }
        out.push(Annotated {
            node,
            doc: doc.take(),
            start: start.take().unwrap_or(node.start_byte()),
        });
    }
    out
}

/// Whether the subtree mentions `name` as a type.
fn references(node: Node, source: &str, name: &str) -> bool {
    if node.kind() == "type_identifier" {
        return node.utf8_text(source.as_bytes()) == Ok(name);
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .any(|child| references(child, source, name))
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}
