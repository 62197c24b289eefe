//! TypeScript type extraction parser.
//!
//! Extracts type definitions from TypeScript source files
//! (interfaces, type aliases, enums) into the typegen IR.

use super::{ParseError, parse_jsdoc};
use crate::ir::{
    EnumDef, EnumKind, Field, IntVariant, JsDoc, Schema, StringVariant, StructDef, SyntaxError,
    Type, TypeDef, TypeDefKind,
};
use tree_sitter::{Node, Parser, Tree};

/// Create a parser configured for the TypeScript grammar.
pub fn typescript_parser() -> Result<Parser, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_typescript::language().into())
        .map_err(|e| ParseError::Init(e.to_string()))?;
    Ok(parser)
}

/// Parse TypeScript source and extract type definitions into IR.
pub fn parse_typescript_types(source: &str) -> Result<Schema, ParseError> {
    let mut parser = typescript_parser()?;
    let tree = parser.parse(source, None).ok_or(ParseError::Failed)?;

    let ctx = ExtractContext::new(source);
    Ok(ctx.extract_schema(&tree))
}

struct ExtractContext<'a> {
    source: &'a str,
}

impl<'a> ExtractContext<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Named children that carry meaning (comments are extras and can appear anywhere).
    fn type_children<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .collect()
    }

    fn extract_schema(&self, tree: &Tree) -> Schema {
        let root = tree.root_node();
        let mut schema = Schema::new();
        let mut pending_doc: Option<JsDoc> = None;

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let decl = match child.kind() {
                "comment" => {
                    pending_doc = parse_jsdoc(self.node_text(child));
                    continue;
                }
                "export_statement" => child.child_by_field_name("declaration"),
                "ERROR" => {
                    let text = self.node_text(child);
                    schema.syntax_errors.push(SyntaxError {
                        line: child.start_position().row + 1,
                        snippet: text.lines().next().unwrap_or("").trim().to_string(),
                    });
                    None
                }
                _ => Some(child),
            };

            if let Some(decl) = decl
                && let Some(mut def) = self.extract_declaration(decl)
            {
                if def.docs.is_none() {
                    def.docs = pending_doc.take();
                }
                schema.add(def);
            }
            pending_doc = None;
        }

        schema
    }

    fn extract_declaration(&self, node: Node) -> Option<TypeDef> {
        match node.kind() {
            "interface_declaration" => self.extract_interface(node),
            "type_alias_declaration" => self.extract_type_alias(node),
            "enum_declaration" => self.extract_enum(node),
            _ => None,
        }
    }

    fn extract_interface(&self, node: Node) -> Option<TypeDef> {
        let name = self.node_text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;

        if node.child_by_field_name("type_parameters").is_some() {
            return Some(TypeDef::alias(
                name,
                Type::Unsupported("generic interface".into()),
            ));
        }

        let mut cursor = node.walk();
        let extends = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "extends_type_clause");
        if extends {
            return Some(TypeDef::alias(
                name,
                Type::Unsupported("interface inheritance".into()),
            ));
        }

        let kind = match self.extract_object_type(body) {
            Type::Object {
                fields,
                index: None,
            } => TypeDefKind::Struct(StructDef { fields }),
            other => TypeDefKind::Alias(other),
        };

        Some(TypeDef {
            name,
            docs: None,
            kind,
        })
    }

    /// Read the members of an object type or interface body.
    fn extract_object_type(&self, body: Node) -> Type {
        let mut fields = Vec::new();
        let mut index = None;
        let mut pending_doc: Option<JsDoc> = None;
        let mut cursor = body.walk();

        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "comment" => {
                    pending_doc = parse_jsdoc(self.node_text(child));
                    continue;
                }
                "property_signature" => {
                    let Some(mut field) = self.extract_property_signature(child) else {
                        return Type::Unsupported("computed property name".into());
                    };
                    field.docs = pending_doc.take();
                    fields.push(field);
                }
                "index_signature" => match self.extract_index_signature(child) {
                    Ok(value) => index = Some(Box::new(value)),
                    Err(what) => return Type::Unsupported(what),
                },
                "method_signature" | "call_signature" | "construct_signature" => {
                    return Type::Unsupported("method signature".into());
                }
                _ => {}
            }
            pending_doc = None;
        }

        if fields.is_empty()
            && let Some(value) = index
        {
            return Type::Record {
                key: Box::new(Type::String),
                value,
            };
        }

        Type::Object { fields, index }
    }

    fn extract_property_signature(&self, node: Node) -> Option<Field> {
        let name = node.child_by_field_name("name")?;
        let name_str = match name.kind() {
            "property_identifier" | "number" => self.node_text(name).to_string(),
            "string" => unquote(self.node_text(name)),
            _ => return None,
        };

        // Check for optional marker (?)
        let optional = self.has_question_mark(node);

        let ty = match node.child_by_field_name("type") {
            Some(type_ann) => self.extract_type_from_annotation(type_ann),
            None => Type::Any,
        };

        Some(Field {
            name: name_str,
            ty,
            required: !optional,
            docs: None,
        })
    }

    /// `[key: string]: T` yields `T`; mapped clauses are rejected.
    fn extract_index_signature(&self, node: Node) -> Result<Type, String> {
        let children = self.type_children(node);
        if children.iter().any(|c| c.kind() == "mapped_type_clause") {
            return Err("mapped type".into());
        }
        let Some(key_type) = node
            .child_by_field_name("index_type")
            .or_else(|| children.get(1).copied())
        else {
            return Err("index signature without key type".into());
        };
        match self.extract_type(key_type) {
            Type::String | Type::Number => {}
            _ => return Err("index signature with non-primitive key".into()),
        }
        Ok(node
            .child_by_field_name("type")
            .map(|ann| self.extract_type_from_annotation(ann))
            .unwrap_or(Type::Any))
    }

    fn has_question_mark(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() && self.node_text(child) == "?" {
                return true;
            }
        }
        false
    }

    fn extract_type_from_annotation(&self, node: Node) -> Type {
        // type_annotation has a `:` child then the actual type node
        match self.type_children(node).first() {
            Some(child) => self.extract_type(*child),
            None => Type::Any,
        }
    }

    fn extract_type(&self, node: Node) -> Type {
        match node.kind() {
            "predefined_type" => self.extract_predefined_type(node),

            "type_identifier" => match self.node_text(node) {
                "Date" => Type::Date,
                "PropertyKey" => Type::Union(vec![Type::String, Type::Number]),
                name => Type::Ref(name.to_string()),
            },

            "union_type" => {
                let mut types = Vec::new();
                self.flatten_binary_type(node, "union_type", &mut types);
                Type::Union(types)
            }

            "intersection_type" => {
                let mut types = Vec::new();
                self.flatten_binary_type(node, "intersection_type", &mut types);
                Type::Intersection(types)
            }

            "array_type" => {
                // T[]
                let inner = self
                    .type_children(node)
                    .first()
                    .map(|c| self.extract_type(*c))
                    .unwrap_or(Type::Any);
                Type::Array(Box::new(inner))
            }

            "readonly_type" | "parenthesized_type" => self
                .type_children(node)
                .first()
                .map(|c| self.extract_type(*c))
                .unwrap_or(Type::Any),

            "generic_type" => self.extract_generic_type(node),

            "literal_type" => self.extract_literal_type(node),

            "tuple_type" => {
                let mut items = Vec::new();
                for child in self.type_children(node) {
                    match child.kind() {
                        "optional_type" | "rest_type" => {
                            return Type::Unsupported("optional or rest tuple element".into());
                        }
                        _ => items.push(self.extract_type(child)),
                    }
                }
                Type::Tuple(items)
            }

            "object_type" => self.extract_object_type(node),

            "lookup_type" => Type::Unsupported("indexed access type".into()),

            "function_type" | "constructor_type" => Type::Unsupported("function type".into()),

            "conditional_type" => Type::Unsupported("conditional type".into()),

            "template_literal_type" => Type::Unsupported("template literal type".into()),

            other => Type::Unsupported(format!("`{}`", other)),
        }
    }

    fn extract_predefined_type(&self, node: Node) -> Type {
        match self.node_text(node) {
            "string" => Type::String,
            "number" => Type::Number,
            "boolean" => Type::Boolean,
            "bigint" => Type::BigInt,
            "any" => Type::Any,
            "unknown" => Type::Unknown,
            "never" => Type::Never,
            "void" => Type::Void,
            "undefined" => Type::Undefined,
            "null" => Type::Null,
            "object" => Type::Record {
                key: Box::new(Type::String),
                value: Box::new(Type::Any),
            },
            other => Type::Unsupported(format!("`{}`", other)),
        }
    }

    fn flatten_binary_type(&self, node: Node, kind: &str, out: &mut Vec<Type>) {
        for child in self.type_children(node) {
            if child.kind() == kind {
                self.flatten_binary_type(child, kind, out);
            } else {
                out.push(self.extract_type(child));
            }
        }
    }

    fn extract_generic_type(&self, node: Node) -> Type {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.node_text(n))
            .unwrap_or("");

        let args: Vec<Type> = match node.child_by_field_name("type_arguments") {
            Some(ta) => self
                .type_children(ta)
                .into_iter()
                .map(|c| self.extract_type(c))
                .collect(),
            None => Vec::new(),
        };

        match name {
            "Array" | "ReadonlyArray" => {
                let inner = args.into_iter().next().unwrap_or(Type::Any);
                Type::Array(Box::new(inner))
            }
            "Record" => {
                let mut iter = args.into_iter();
                let key = iter.next().unwrap_or(Type::String);
                let value = iter.next().unwrap_or(Type::Any);
                Type::Record {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            "Readonly" => args.into_iter().next().unwrap_or(Type::Any),
            _ => Type::Unsupported(format!("generic type `{}`", name)),
        }
    }

    fn extract_literal_type(&self, node: Node) -> Type {
        let Some(child) = node.named_child(0) else {
            return Type::Unsupported("empty literal".into());
        };
        match child.kind() {
            "string" => Type::StringLiteral(double_quoted_contents(self.node_text(child))),
            "number" | "unary_expression" => {
                Type::NumberLiteral(self.node_text(child).to_string())
            }
            "true" => Type::BoolLiteral(true),
            "false" => Type::BoolLiteral(false),
            "null" => Type::Null,
            "undefined" => Type::Undefined,
            other => Type::Unsupported(format!("`{}` literal", other)),
        }
    }

    fn extract_type_alias(&self, node: Node) -> Option<TypeDef> {
        let name = self.node_text(node.child_by_field_name("name")?).to_string();

        if node.child_by_field_name("type_parameters").is_some() {
            return Some(TypeDef::alias(
                name,
                Type::Unsupported("generic type alias".into()),
            ));
        }

        let value = node.child_by_field_name("value")?;
        Some(TypeDef::alias(name, self.extract_type(value)))
    }

    fn extract_enum(&self, node: Node) -> Option<TypeDef> {
        let name = self.node_text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;

        let mut string_variants = Vec::new();
        let mut int_variants = Vec::new();
        let mut auto_index: i64 = 0;
        let mut cursor = body.walk();

        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "enum_assignment" => {
                    let member_name = child
                        .child_by_field_name("name")
                        .map(|n| self.node_text(n).to_string());
                    let Some(val_node) = child.child_by_field_name("value") else {
                        int_variants.push(IntVariant {
                            value: auto_index,
                            name: member_name,
                        });
                        auto_index += 1;
                        continue;
                    };
                    let val_text = self.node_text(val_node);
                    if val_node.kind() == "string" {
                        string_variants.push(StringVariant {
                            value: double_quoted_contents(val_text),
                        });
                    } else if let Ok(n) = val_text.parse::<i64>() {
                        int_variants.push(IntVariant {
                            value: n,
                            name: member_name,
                        });
                        auto_index = n + 1;
                    } else {
                        return Some(TypeDef::alias(
                            name,
                            Type::Unsupported("computed enum member".into()),
                        ));
                    }
                }
                "property_identifier" => {
                    // Bare enum member (no assignment)
                    int_variants.push(IntVariant {
                        value: auto_index,
                        name: Some(self.node_text(child).to_string()),
                    });
                    auto_index += 1;
                }
                _ => {}
            }
        }

        if !string_variants.is_empty() && !int_variants.is_empty() {
            return Some(TypeDef::alias(
                name,
                Type::Unsupported("heterogeneous enum".into()),
            ));
        }

        let kind = if string_variants.is_empty() {
            EnumKind::IntLiteral(int_variants)
        } else {
            EnumKind::StringLiteral(string_variants)
        };

        Some(TypeDef {
            name,
            docs: None,
            kind: TypeDefKind::Enum(EnumDef { kind }),
        })
    }
}

/// Strip the surrounding quotes of a string literal.
fn unquote(text: &str) -> String {
    if text.len() >= 2 && (text.starts_with('"') || text.starts_with('\'')) {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

/// Contents of a string literal, re-escaped for use between double quotes.
fn double_quoted_contents(text: &str) -> String {
    let inner = unquote(text);
    if !text.starts_with('\'') {
        return inner;
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Schema {
        parse_typescript_types(source).unwrap()
    }

    fn alias_type(schema: &Schema, index: usize) -> &Type {
        match &schema.definitions[index].kind {
            TypeDefKind::Alias(ty) => ty,
            other => panic!("expected Alias, got {:?}", other),
        }
    }

    #[test]
    fn test_interface() {
        let schema = parse(
            r#"
            interface User {
                id: string;
                name: string;
                age?: number;
            }
            "#,
        );
        assert_eq!(schema.definitions.len(), 1);
        let def = &schema.definitions[0];
        assert_eq!(def.name, "User");
        match &def.kind {
            TypeDefKind::Struct(s) => {
                assert_eq!(s.fields.len(), 3);
                assert_eq!(s.fields[0].name, "id");
                assert!(s.fields[0].required);
                assert_eq!(s.fields[0].ty, Type::String);
                assert_eq!(s.fields[2].name, "age");
                assert!(!s.fields[2].required);
                assert_eq!(s.fields[2].ty, Type::Number);
            }
            _ => panic!("expected Struct"),
        }
    }

    #[test]
    fn test_object_alias_without_semicolons() {
        let schema = parse(
            "export type ChannelsInsert = {\n  data?: Json | null\n  id?: number\n  slug?: string | null\n}\n",
        );
        match alias_type(&schema, 0) {
            Type::Object { fields, index } => {
                assert!(index.is_none());
                assert_eq!(fields.len(), 3);
                assert!(fields.iter().all(|f| !f.required));
                assert_eq!(
                    fields[0].ty,
                    Type::Union(vec![Type::Ref("Json".into()), Type::Null])
                );
            }
            other => panic!("expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_json_type() {
        let schema = parse(
            r#"
            export type Json =
              | string
              | number
              | boolean
              | null
              | { [key: string]: Json | undefined }
              | Json[]
            "#,
        );
        match alias_type(&schema, 0) {
            Type::Union(members) => {
                assert_eq!(members.len(), 6);
                assert_eq!(members[3], Type::Null);
                assert_eq!(
                    members[4],
                    Type::Record {
                        key: Box::new(Type::String),
                        value: Box::new(Type::Union(vec![
                            Type::Ref("Json".into()),
                            Type::Undefined
                        ])),
                    }
                );
                assert_eq!(members[5], Type::Array(Box::new(Type::Ref("Json".into()))));
            }
            other => panic!("expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_string_literal_union() {
        let schema = parse(r#"type Status = "active" | 'in"active';"#);
        assert_eq!(
            alias_type(&schema, 0),
            &Type::Union(vec![
                Type::StringLiteral("active".into()),
                Type::StringLiteral("in\\\"active".into()),
            ])
        );
    }

    #[test]
    fn test_enum_string() {
        let schema = parse(
            r#"
            enum Color {
                Red = "red",
                Green = "green",
                Blue = "blue",
            }
            "#,
        );
        match &schema.definitions[0].kind {
            TypeDefKind::Enum(EnumDef {
                kind: EnumKind::StringLiteral(variants),
            }) => {
                assert_eq!(variants.len(), 3);
                assert_eq!(variants[0].value, "red");
            }
            _ => panic!("expected StringLiteral enum"),
        }
    }

    #[test]
    fn test_enum_numeric() {
        let schema = parse(
            r#"
            enum Direction {
                Up,
                Down,
                Left = 10,
                Right,
            }
            "#,
        );
        match &schema.definitions[0].kind {
            TypeDefKind::Enum(EnumDef {
                kind: EnumKind::IntLiteral(variants),
            }) => {
                assert_eq!(variants.len(), 4);
                assert_eq!(variants[0].value, 0);
                assert_eq!(variants[0].name.as_deref(), Some("Up"));
                assert_eq!(variants[2].value, 10);
                assert_eq!(variants[3].value, 11);
            }
            _ => panic!("expected IntLiteral enum"),
        }
    }

    #[test]
    fn test_array_types() {
        let schema = parse(
            r#"
            interface Lists {
                tags: string[];
                items: Array<number>;
                pair: [string, boolean];
            }
            "#,
        );
        match &schema.definitions[0].kind {
            TypeDefKind::Struct(s) => {
                assert_eq!(s.fields[0].ty, Type::Array(Box::new(Type::String)));
                assert_eq!(s.fields[1].ty, Type::Array(Box::new(Type::Number)));
                assert_eq!(
                    s.fields[2].ty,
                    Type::Tuple(vec![Type::String, Type::Boolean])
                );
            }
            _ => panic!("expected Struct"),
        }
    }

    #[test]
    fn test_doc_comment() {
        let schema = parse(
            r#"
            /** A user in the system. */
            interface User {
                /**
                 * The user's age.
                 * @minimum 0
                 */
                age: number;
            }
            "#,
        );
        let docs = schema.definitions[0].docs.as_ref().unwrap();
        assert_eq!(docs.description, vec!["A user in the system."]);
        match &schema.definitions[0].kind {
            TypeDefKind::Struct(s) => {
                let field_docs = s.fields[0].docs.as_ref().unwrap();
                assert_eq!(field_docs.tag("minimum").unwrap().value.as_deref(), Some("0"));
            }
            _ => panic!("expected Struct"),
        }
    }

    #[test]
    fn test_unsupported_shapes() {
        let schema = parse(
            r#"
            export type Handler = (x: number) => void;
            export type Box<T> = { value: T };
            export type Pick1 = Pick<User, "id">;
            "#,
        );
        assert_eq!(schema.definitions.len(), 3);
        for i in 0..3 {
            assert!(matches!(alias_type(&schema, i), Type::Unsupported(_)));
        }
    }

    #[test]
    fn test_type_ref() {
        let schema = parse(
            r#"
            type UserId = string;
            interface User {
                id: UserId;
                created: Date;
            }
            "#,
        );
        assert_eq!(schema.definitions.len(), 2);
        match &schema.definitions[1].kind {
            TypeDefKind::Struct(s) => {
                assert_eq!(s.fields[0].ty, Type::Ref("UserId".into()));
                assert_eq!(s.fields[1].ty, Type::Date);
            }
            _ => panic!("expected Struct"),
        }
    }
}
