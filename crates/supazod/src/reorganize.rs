//! Schema reorganization.
//!
//! Converter output is a flat list of validator declarations. This module
//! lexes it into top-level statements, folds the schema declarations into
//! entity groups (`UsersRow`, `UsersInsert` and `UsersUpdate` all belong to
//! `Users`), and renders the grouped module:
//!
//! ```text
//! import { z } from "zod";
//! import type { Json } from "./types";
//!
//! export const JsonSchema = ...;        // Json sentinel, always first
//!
//! export const UsersRowSchema = ...;    // every other block, first-seen order
//! export const UsersInsertSchema = ...;
//!
//! export type UsersRow = z.infer<typeof UsersRowSchema>;
//! export type UsersInsert = z.infer<typeof UsersInsertSchema>;
//!
//! export type Users = { Row: UsersRow; Insert: UsersInsert };
//! export const UsersSchema = { Row: UsersRowSchema, Insert: UsersInsertSchema };
//! ```
//!
//! Aggregate pairs are only emitted for groups with two or more members, and
//! only when their names are free. Types the converter imports (recursive
//! declarations) are added to the `Json` import instead of being inferred.

use crate::error::{Diagnostic, Stage};
use crate::naming::{DEFAULT_SUFFIXES, Naming};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use supazod_typegen::ParseError;
use supazod_typegen::input::typescript_parser;
use tree_sitter::Node;

/// Reorganizer configuration.
#[derive(Debug, Clone)]
pub struct ReorganizeOptions {
    pub naming: Naming,
    /// Entity suffixes, e.g. `Row`, `Insert`, `Update`.
    pub suffixes: Vec<String>,
    /// Identifier of the Json sentinel declaration.
    pub json_identifier: String,
}

impl Default for ReorganizeOptions {
    fn default() -> Self {
        Self::new(Naming::default(), DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect())
    }
}

impl ReorganizeOptions {
    pub fn new(naming: Naming, suffixes: Vec<String>) -> Self {
        let json_identifier = naming.schema_name("Json");
        Self {
            naming,
            suffixes,
            json_identifier,
        }
    }

    /// Split a marker-stripped name into entity and suffix. The longest
    /// matching suffix wins; a suffix never consumes the whole name.
    pub fn split_suffix<'a>(&self, name: &'a str) -> (&'a str, Option<&'a str>) {
        let best = self
            .suffixes
            .iter()
            .filter(|s| !s.is_empty() && name.len() > s.len() && name.ends_with(s.as_str()))
            .max_by_key(|s| s.len());
        match best {
            Some(suffix) => {
                let at = name.len() - suffix.len();
                (&name[..at], Some(&name[at..]))
            }
            None => (name, None),
        }
    }
}

/// A top-level statement of converter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Source text, including comments attached directly above it.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `export const <identifier> ...`
    ExportedConst { identifier: String },
    /// An import; `types` lists the names of an `import type { ... }`.
    Import { types: Vec<String> },
    Other,
}

/// Split source into top-level statements. Comments attach to the statement
/// that follows them; trailing comments are dropped.
pub fn lex(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut parser = typescript_parser()?;
    let tree = parser.parse(source, None).ok_or(ParseError::Failed)?;
    let root = tree.root_node();

    let mut statements = Vec::new();
    let mut comment_start: Option<usize> = None;
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() == "comment" {
            comment_start.get_or_insert(node.start_byte());
            continue;
        }
        let start = comment_start.take().unwrap_or(node.start_byte());
        let text = source[start..node.end_byte()].to_string();
        let kind = match node.kind() {
            "import_statement" => StatementKind::Import {
                types: imported_types(node, source),
            },
            "export_statement" => match exported_const_name(node, source) {
                Some(identifier) => StatementKind::ExportedConst { identifier },
                None => StatementKind::Other,
            },
            _ => StatementKind::Other,
        };
        statements.push(Statement { kind, text });
    }
    Ok(statements)
}

fn exported_const_name(node: Node, source: &str) -> Option<String> {
    let decl = node.child_by_field_name("declaration")?;
    if decl.kind() != "lexical_declaration" {
        return None;
    }
    let mut cursor = decl.walk();
    let declarator = decl
        .named_children(&mut cursor)
        .find(|c| c.kind() == "variable_declarator")?;
    let name = declarator.child_by_field_name("name")?;
    if name.kind() != "identifier" {
        return None;
    }
    name.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

/// Names bound by a type-only import.
fn imported_types(node: Node, source: &str) -> Vec<String> {
    let text = node.utf8_text(source.as_bytes()).unwrap_or("");
    if !text.starts_with("import type") {
        return Vec::new();
    }
    let mut names = Vec::new();
    collect_specifiers(node, source, &mut names);
    names
}

fn collect_specifiers(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "import_specifier" {
        let binding = node
            .child_by_field_name("alias")
            .or_else(|| node.child_by_field_name("name"));
        if let Some(name) = binding.and_then(|n| n.utf8_text(source.as_bytes()).ok()) {
            out.push(name.to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_specifiers(child, source, out);
    }
}

/// One schema declaration, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Generated identifier, e.g. `UsersRowSchema`.
    pub identifier: String,
    /// Marker-stripped name, e.g. `UsersRow`.
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub identifier: String,
    pub name: String,
    pub suffix: Option<String>,
}

/// Blocks sharing an entity name, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGroup {
    pub entity: String,
    pub members: Vec<GroupMember>,
    /// The aggregate names are already taken by other exports.
    pub name_taken: bool,
}

impl EntityGroup {
    /// Whether this group gets an aggregate type and object. A member without
    /// a suffix would collide with the aggregate's names, so its presence
    /// suppresses the pair.
    pub fn has_pair(&self) -> bool {
        self.members.len() >= 2
            && !self.name_taken
            && self.members.iter().all(|m| m.suffix.is_some())
    }
}

/// The grouped module, before rendering.
#[derive(Debug, Clone, Default)]
pub struct Reorganized {
    pub json: Option<Block>,
    pub blocks: Vec<Block>,
    pub groups: Vec<EntityGroup>,
    /// Types imported from the input file besides `Json`.
    pub type_imports: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Accumulator for the fold over statements.
struct Grouping<'o> {
    options: &'o ReorganizeOptions,
    result: Reorganized,
    seen: HashSet<String>,
    index: HashMap<String, usize>,
}

impl<'o> Grouping<'o> {
    fn new(options: &'o ReorganizeOptions) -> Self {
        Self {
            options,
            result: Reorganized::default(),
            seen: HashSet::new(),
            index: HashMap::new(),
        }
    }

    fn push(mut self, statement: Statement) -> Self {
        let identifier = match statement.kind {
            StatementKind::ExportedConst { identifier } => identifier,
            StatementKind::Import { types } => {
                tracing::debug!(?types, "dropping converter import");
                for name in types {
                    if name != "Json" && !self.result.type_imports.contains(&name) {
                        self.result.type_imports.push(name);
                    }
                }
                return self;
            }
            StatementKind::Other => {
                let text = first_line(&statement.text);
                tracing::debug!(text, "dropping non-schema statement");
                return self;
            }
        };

        let Some(name) = self.options.naming.base_name(&identifier) else {
            let marker = self.options.naming.marker();
            let message = format!("exported const without the `{}` marker; dropped", marker);
            self.warn(&identifier, message);
            return self;
        };

        if !self.seen.insert(identifier.clone()) {
            self.warn(&identifier, "declared more than once; keeping the first");
            return self;
        }

        let block = Block {
            identifier,
            name,
            text: statement.text,
        };
        if block.identifier == self.options.json_identifier {
            tracing::debug!(identifier = %block.identifier, "json sentinel");
            self.result.json = Some(block);
            return self;
        }

        let (entity, suffix) = self.options.split_suffix(&block.name);
        let member = GroupMember {
            identifier: block.identifier.clone(),
            name: block.name.clone(),
            suffix: suffix.map(str::to_string),
        };
        tracing::debug!(identifier = %block.identifier, entity, "schema block");
        match self.index.get(entity) {
            Some(&i) => self.result.groups[i].members.push(member),
            None => {
                self.index.insert(entity.to_string(), self.result.groups.len());
                self.result.groups.push(EntityGroup {
                    entity: entity.to_string(),
                    members: vec![member],
                    name_taken: false,
                });
            }
        }
        self.result.blocks.push(block);
        self
    }

    fn warn(&mut self, declaration: &str, message: impl Into<String>) {
        let diag = Diagnostic::new(Stage::Reorganize, declaration, message);
        tracing::warn!("{}", diag);
        self.result.diagnostics.push(diag);
    }

    /// Flag groupings that rest on a name merely ending in a suffix.
    fn finish(mut self) -> Reorganized {
        let mut flagged = Vec::new();
        for group in &self.result.groups {
            if group.members.len() >= 2 {
                for member in group.members.iter().filter(|m| m.suffix.is_none()) {
                    flagged.push((
                        member.identifier.clone(),
                        format!(
                            "has no suffix but shares entity `{}` with suffixed declarations; no aggregate emitted for `{}`",
                            group.entity, group.entity
                        ),
                    ));
                }
            } else if let [member] = group.members.as_slice()
                && let Some(suffix) = &member.suffix
                && suffix != "Row"
            {
                flagged.push((
                    member.identifier.clone(),
                    format!(
                        "ends in `{}` but no other declaration of `{}` exists; treated as a standalone schema",
                        suffix, group.entity
                    ),
                ));
            }
        }
        for (identifier, message) in flagged {
            self.warn(&identifier, message);
        }
        self.reserve_aggregate_names();
        self.result
    }

    /// Drop pairs whose type or object name is already exported, e.g. the
    /// `AuditRow` entity of an `audit_row` table next to the `audit` table's
    /// `AuditRow` validator.
    fn reserve_aggregate_names(&mut self) {
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert("Json".to_string());
        taken.insert(self.options.json_identifier.clone());
        taken.extend(self.result.type_imports.iter().cloned());
        for block in &self.result.blocks {
            taken.insert(block.identifier.clone());
            taken.insert(block.name.clone());
        }

        let naming = &self.options.naming;
        let mut collisions = Vec::new();
        for (i, group) in self.result.groups.iter().enumerate() {
            if !group.has_pair() {
                continue;
            }
            let aggregate = naming.aggregate_name(&group.entity);
            let clash = [&group.entity, &aggregate]
                .into_iter()
                .find(|name| taken.contains(name.as_str()))
                .cloned();
            match clash {
                Some(name) => collisions.push((i, name)),
                None => {
                    taken.insert(group.entity.clone());
                    taken.insert(aggregate);
                }
            }
        }

        for (i, name) in collisions {
            self.result.groups[i].name_taken = true;
            let entity = self.result.groups[i].entity.clone();
            let message = format!(
                "`{}` is already exported; no aggregate emitted for `{}`",
                name, entity
            );
            self.warn(&entity, message);
        }
    }
}

/// Group converter output by entity.
pub fn reorganize(source: &str, options: &ReorganizeOptions) -> Result<Reorganized, ParseError> {
    let statements = lex(source)?;
    Ok(statements
        .into_iter()
        .fold(Grouping::new(options), Grouping::push)
        .finish())
}

impl Reorganized {
    /// Render the grouped module. `types_import_path` is the module the
    /// `Json` type is imported from.
    pub fn render(&self, naming: &Naming, types_import_path: &str) -> String {
        let mut sections = Vec::new();

        let mut imported = vec!["Json"];
        imported.extend(self.type_imports.iter().map(String::as_str));
        sections.push(format!(
            "import {{ z }} from \"zod\";\nimport type {{ {} }} from \"{}\";",
            imported.join(", "),
            types_import_path
        ));

        if let Some(json) = &self.json {
            sections.push(json.text.clone());
        }
        for block in &self.blocks {
            sections.push(block.text.clone());
        }

        let inferred: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|b| !self.type_imports.contains(&b.name))
            .collect();
        if !inferred.is_empty() {
            let mut types = String::new();
            for block in inferred {
                writeln!(
                    types,
                    "export type {} = z.infer<typeof {}>;",
                    block.name, block.identifier
                )
                .unwrap();
            }
            types.pop();
            sections.push(types);
        }

        for group in self.groups.iter().filter(|g| g.has_pair()) {
            let keyed: Vec<(&str, &GroupMember)> = group
                .members
                .iter()
                .filter_map(|m| m.suffix.as_deref().map(|s| (s, m)))
                .collect();

            let mut ty = format!("export type {} = {{\n", group.entity);
            for (suffix, member) in &keyed {
                writeln!(ty, "  {}: {};", suffix, member.name).unwrap();
            }
            ty.push_str("};");
            sections.push(ty);

            let aggregate = naming.aggregate_name(&group.entity);
            let mut object = format!("export const {} = {{\n", aggregate);
            for (suffix, member) in &keyed {
                writeln!(object, "  {}: {},", suffix, member.identifier).unwrap();
            }
            object.push_str("};");
            sections.push(object);
        }

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organize(source: &str) -> Reorganized {
        reorganize(source, &ReorganizeOptions::default()).unwrap()
    }

    const CONVERTED: &str = r#"// Generated by supazod
import { z } from "zod";
import type { Json } from "./types";

export const ChannelsRowSchema = z.object({
  id: z.number(),
});

export const JsonSchema: z.ZodSchema<Json> = z.lazy(() => z.union([z.string(), z.array(JsonSchema)]).nullable());

/** A message. */
export const MessagesRowSchema = z.object({
  id: z.number(),
});

export const ChannelsInsertSchema = z.object({
  id: z.number().optional(),
});

export const ChannelsUpdateSchema = z.object({
  id: z.number().optional(),
});
"#;

    #[test]
    fn test_lex() {
        let statements = lex(CONVERTED).unwrap();
        let kinds: Vec<_> = statements.iter().map(|s| &s.kind).collect();
        assert_eq!(kinds.len(), 7);
        assert_eq!(kinds[0], &StatementKind::Import { types: vec![] });
        assert_eq!(
            kinds[1],
            &StatementKind::Import {
                types: vec!["Json".into()]
            }
        );
        assert_eq!(
            kinds[4],
            &StatementKind::ExportedConst {
                identifier: "MessagesRowSchema".into()
            }
        );
        assert!(statements[4].text.starts_with("/** A message. */\nexport const MessagesRowSchema"));
        // The leading line comment attaches to the first import
        assert!(statements[0].text.starts_with("// Generated by supazod\nimport"));
    }

    #[test]
    fn test_grouping() {
        let result = organize(CONVERTED);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.json.as_ref().unwrap().identifier, "JsonSchema");

        let entities: Vec<_> = result.groups.iter().map(|g| g.entity.as_str()).collect();
        assert_eq!(entities, vec!["Channels", "Messages"]);

        let channels: Vec<_> = result.groups[0]
            .members
            .iter()
            .map(|m| m.suffix.as_deref().unwrap())
            .collect();
        assert_eq!(channels, vec!["Row", "Insert", "Update"]);
        assert!(result.groups[0].has_pair());
        assert!(!result.groups[1].has_pair());
    }

    #[test]
    fn test_render() {
        let result = organize(CONVERTED);
        let out = result.render(&Naming::default(), "./types");
        assert_eq!(
            out,
            r#"import { z } from "zod";
import type { Json } from "./types";

export const JsonSchema: z.ZodSchema<Json> = z.lazy(() => z.union([z.string(), z.array(JsonSchema)]).nullable());

export const ChannelsRowSchema = z.object({
  id: z.number(),
});

/** A message. */
export const MessagesRowSchema = z.object({
  id: z.number(),
});

export const ChannelsInsertSchema = z.object({
  id: z.number().optional(),
});

export const ChannelsUpdateSchema = z.object({
  id: z.number().optional(),
});

export type ChannelsRow = z.infer<typeof ChannelsRowSchema>;
export type MessagesRow = z.infer<typeof MessagesRowSchema>;
export type ChannelsInsert = z.infer<typeof ChannelsInsertSchema>;
export type ChannelsUpdate = z.infer<typeof ChannelsUpdateSchema>;

export type Channels = {
  Row: ChannelsRow;
  Insert: ChannelsInsert;
  Update: ChannelsUpdate;
};

export const ChannelsSchema = {
  Row: ChannelsRowSchema,
  Insert: ChannelsInsertSchema,
  Update: ChannelsUpdateSchema,
};
"#
        );
    }

    #[test]
    fn test_singleton_without_suffix() {
        let result = organize(
            "export const UserStatusSchema = z.union([z.literal(\"ONLINE\"), z.literal(\"OFFLINE\")]);\n",
        );
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].entity, "UserStatus");
        let out = result.render(&Naming::default(), "./types");
        assert!(out.contains("export type UserStatus = z.infer<typeof UserStatusSchema>;"));
        assert!(!out.contains("export const UserStatusSchema = {"));
    }

    #[test]
    fn test_no_json_block() {
        let result = organize("export const ShopsRowSchema = z.object({});\n");
        assert!(result.json.is_none());
        let out = result.render(&Naming::default(), "../types");
        assert_eq!(
            out,
            "import { z } from \"zod\";\nimport type { Json } from \"../types\";\n\nexport const ShopsRowSchema = z.object({});\n\nexport type ShopsRow = z.infer<typeof ShopsRowSchema>;\n"
        );
    }

    #[test]
    fn test_json_is_not_typed_or_grouped() {
        let result = organize("export const JsonSchema = z.string();\n");
        assert!(result.blocks.is_empty());
        assert!(result.groups.is_empty());
        let out = result.render(&Naming::default(), "./types");
        assert!(!out.contains("z.infer"));
    }

    #[test]
    fn test_ambiguous_unsuffixed_member() {
        let result = organize(
            "export const UsersSchema = z.object({});\nexport const UsersRowSchema = z.object({});\nexport const UsersInsertSchema = z.object({});\n",
        );
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].declaration.as_deref(), Some("UsersSchema"));

        assert!(!result.groups[0].has_pair());

        let out = result.render(&Naming::default(), "./types");
        assert!(out.contains("export type Users = z.infer<typeof UsersSchema>;"));
        assert!(!out.contains("export type Users = {"));
        assert!(!out.contains("export const UsersSchema = {"));
    }

    #[test]
    fn test_lone_update_suffix_is_flagged() {
        let result = organize(
            "export const LastUpdateSchema = z.string();\nexport const AuditRowSchema = z.object({});\n",
        );
        assert_eq!(result.groups[0].entity, "Last");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("ends in `Update`"));
    }

    #[test]
    fn test_duplicates_and_unmarked_consts() {
        let result = organize(
            "export const ARowSchema = z.string();\nexport const ARowSchema = z.number();\nexport const helper = 1;\nconst local = 2;\n",
        );
        assert_eq!(result.blocks.len(), 1);
        assert!(result.blocks[0].text.contains("z.string()"));
        let names: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| d.declaration.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["ARowSchema", "helper"]);
    }

    #[test]
    fn test_custom_suffixes_longest_match() {
        let options = ReorganizeOptions::new(
            Naming::default(),
            vec!["Row".into(), "Insert".into(), "Update".into(), "BulkInsert".into()],
        );
        assert_eq!(options.split_suffix("OrdersBulkInsert"), ("Orders", Some("BulkInsert")));
        assert_eq!(options.split_suffix("Row"), ("Row", None));
        assert_eq!(options.split_suffix("Users"), ("Users", None));
    }

    #[test]
    fn test_prefix_naming() {
        let options =
            ReorganizeOptions::new(Naming::new("z", ""), vec!["Row".into(), "Insert".into()]);
        assert_eq!(options.json_identifier, "zJson");
        let result = reorganize(
            "export const zJson = z.string();\nexport const zPostsRow = z.object({});\nexport const zPostsInsert = z.object({});\n",
            &options,
        )
        .unwrap();
        let out = result.render(&options.naming, "./types");
        assert!(out.contains("export type PostsRow = z.infer<typeof zPostsRow>;"));
        assert!(out.contains("export const zPosts = {\n  Row: zPostsRow,\n  Insert: zPostsInsert,\n};"));
    }

    #[test]
    fn test_aggregate_name_already_exported() {
        // Tables `audit` and `audit_row`
        let result = organize(
            "export const AuditRowSchema = z.object({});\n\
             export const AuditInsertSchema = z.object({});\n\
             export const AuditRowRowSchema = z.object({});\n\
             export const AuditRowInsertSchema = z.object({});\n",
        );
        let entities: Vec<_> = result.groups.iter().map(|g| g.entity.as_str()).collect();
        assert_eq!(entities, vec!["Audit", "AuditRow"]);
        assert!(result.groups[0].has_pair());
        assert!(!result.groups[1].has_pair());
        assert!(result.groups[1].name_taken);

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].stage, Stage::Reorganize);
        assert_eq!(result.diagnostics[0].declaration.as_deref(), Some("AuditRow"));

        let out = result.render(&Naming::default(), "./types");
        assert_eq!(out.matches("export type AuditRow =").count(), 1);
        assert_eq!(out.matches("export const AuditRowSchema =").count(), 1);
        assert!(out.contains("export type AuditRow = z.infer<typeof AuditRowSchema>;"));
        assert!(out.contains("export const AuditSchema = {\n  Row: AuditRowSchema,"));
    }

    #[test]
    fn test_recursive_types_are_imported() {
        let result = organize(
            "import { z } from \"zod\";\n\
             import type { Tree } from \"./types\";\n\
             export const TreeSchema: z.ZodSchema<Tree> = z.lazy(() => z.object({ children: z.array(TreeSchema) }));\n\
             export const LeafSchema = z.string();\n",
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.type_imports, vec!["Tree"]);

        let out = result.render(&Naming::default(), "./types");
        assert!(out.starts_with(
            "import { z } from \"zod\";\nimport type { Json, Tree } from \"./types\";\n"
        ));
        assert!(!out.contains("export type Tree ="));
        assert!(out.contains("export type Leaf = z.infer<typeof LeafSchema>;"));
    }
}
