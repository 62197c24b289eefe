//! Zod schema generation.
//!
//! Turns IR declarations into `export const <Name>Schema = z...;` statements,
//! ordered so every schema is declared before it is used.

use crate::input::{ParseError, parse_typescript_types};
use crate::ir::{EnumDef, EnumKind, Field, JsDoc, Schema, Type, TypeDef, TypeDefKind};
use crate::traits::{ConvertError, ConvertOptions, ConvertOutput, Converter};
use crate::validate::validate_zod_source;
use std::collections::HashSet;
use std::fmt::Write;

/// Static instance of the Zod converter for the registry.
pub static ZOD_CONVERTER: ZodConverter = ZodConverter;

/// Converter producing Zod validators.
pub struct ZodConverter;

impl Converter for ZodConverter {
    fn name(&self) -> &'static str {
        "zod"
    }

    fn convert(&self, source: &str, options: &ConvertOptions) -> Result<ConvertOutput, ParseError> {
        let schema = parse_typescript_types(source)?;
        let mut output = generate_zod(&schema, options);

        if !options.skip_validation {
            output.errors.extend(validate_zod_source(&output.source)?);
        }

        Ok(output)
    }
}

/// A declaration rendered in isolation, waiting to be ordered.
struct Rendered {
    name: String,
    deps: Vec<String>,
    code: String,
}

/// Generate Zod schemas for every declaration in `schema`.
pub fn generate_zod(schema: &Schema, options: &ConvertOptions) -> ConvertOutput {
    let mut errors: Vec<ConvertError> = schema
        .syntax_errors
        .iter()
        .map(|e| ConvertError::global(format!("syntax error at line {}: {}", e.line, e.snippet)))
        .collect();

    let mut known: HashSet<&str> = HashSet::new();
    let mut rendered = Vec::new();
    let mut recursive_types = Vec::new();

    for def in &schema.definitions {
        if !known.insert(def.name.as_str()) {
            errors.push(ConvertError::new(&def.name, "declared more than once"));
        }
    }

    let mut seen = HashSet::new();
    for def in &schema.definitions {
        if !seen.insert(&def.name) {
            continue;
        }
        match render_definition(def, &known, options) {
            Ok((item, recursive)) => {
                if recursive {
                    recursive_types.push(def.name.clone());
                }
                rendered.push(item);
            }
            Err(message) => errors.push(ConvertError::new(&def.name, message)),
        }
    }

    let rendered = drop_broken_dependents(rendered, &mut errors);
    let (ordered, leftover, stalled) = order_by_dependencies(rendered, options.max_run);
    for item in leftover {
        let message = if stalled {
            format!("circular dependency through {}", item.deps.join(", "))
        } else {
            format!("dependencies not resolved within {} passes", options.max_run)
        };
        errors.push(ConvertError::new(item.name, message));
    }
    recursive_types.retain(|name| ordered.iter().any(|r| &r.name == name));

    let mut source = String::from("// Generated by supazod\nimport { z } from \"zod\";\n");
    if !recursive_types.is_empty() {
        writeln!(
            source,
            "import type {{ {} }} from \"{}\";",
            recursive_types.join(", "),
            options.types_import_path
        )
        .unwrap();
    }
    for item in &ordered {
        source.push('\n');
        source.push_str(&item.code);
        source.push('\n');
    }

    ConvertOutput { source, errors }
}

/// Remove declarations that depend on something that failed, until none remain.
fn drop_broken_dependents(
    mut items: Vec<Rendered>,
    errors: &mut Vec<ConvertError>,
) -> Vec<Rendered> {
    loop {
        let available: HashSet<String> = items.iter().map(|r| r.name.clone()).collect();
        let (ok, broken): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|r| r.deps.iter().all(|d| available.contains(d)));
        if broken.is_empty() {
            return ok;
        }
        for item in broken {
            let missing = item
                .deps
                .iter()
                .find(|d| !available.contains(*d))
                .cloned()
                .unwrap_or_default();
            errors.push(ConvertError::new(
                item.name,
                format!("depends on `{}` which could not be generated", missing),
            ));
        }
        items = ok;
    }
}

/// Emit declarations once their dependencies are emitted, in at most
/// `max_run` passes. Returns the ordered list, the leftovers, and whether the
/// last pass made no progress.
fn order_by_dependencies(
    items: Vec<Rendered>,
    max_run: usize,
) -> (Vec<Rendered>, Vec<Rendered>, bool) {
    let mut emitted: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(items.len());
    let mut pending = items;
    let mut stalled = false;

    for pass in 0..max_run.max(1) {
        if pending.is_empty() {
            break;
        }
        let before = pending.len();
        let mut remaining = Vec::new();
        for item in pending {
            if item.deps.iter().all(|d| emitted.contains(d)) {
                emitted.insert(item.name.clone());
                ordered.push(item);
            } else {
                remaining.push(item);
            }
        }
        pending = remaining;
        tracing::debug!(pass, remaining = pending.len(), "dependency pass");
        if pending.len() == before {
            stalled = true;
            break;
        }
    }

    (ordered, pending, stalled)
}

fn render_definition(
    def: &TypeDef,
    known: &HashSet<&str>,
    options: &ConvertOptions,
) -> Result<(Rendered, bool), String> {
    let mut ctx = RenderContext {
        current: &def.name,
        known,
        options,
        deps: Vec::new(),
        recursive: false,
    };

    let expr = match &def.kind {
        TypeDefKind::Struct(s) => ctx.render_object(&s.fields, None, 0)?,
        TypeDefKind::Enum(e) => render_enum(e),
        TypeDefKind::Alias(ty) => ctx.render_value(ty, true, def.docs.as_ref(), false, 0)?,
    };

    let ident = (options.schema_name)(&def.name);
    let mut code = String::new();
    if options.keep_comments
        && let Some(docs) = &def.docs
    {
        code.push_str(&render_comment(docs, 0));
    }
    if ctx.recursive {
        write!(
            code,
            "export const {}: z.ZodSchema<{}> = z.lazy(() => {});",
            ident, def.name, expr
        )
        .unwrap();
    } else {
        write!(code, "export const {} = {};", ident, expr).unwrap();
    }

    tracing::debug!(name = %def.name, schema = %ident, "rendered declaration");
    Ok((
        Rendered {
            name: def.name.clone(),
            deps: ctx.deps,
            code,
        },
        ctx.recursive,
    ))
}

struct RenderContext<'a> {
    current: &'a str,
    known: &'a HashSet<&'a str>,
    options: &'a ConvertOptions<'a>,
    deps: Vec<String>,
    recursive: bool,
}

impl RenderContext<'_> {
    /// Render a value position: the type itself, JSDoc refinements, then
    /// `.optional()` and `.nullable()` for `?:`, `| undefined` and `| null`.
    fn render_value(
        &mut self,
        ty: &Type,
        required: bool,
        docs: Option<&JsDoc>,
        drop_undefined: bool,
        indent: usize,
    ) -> Result<String, String> {
        let (mut out, nullable, undefined) = match ty {
            Type::Union(members) => self.render_union(members, indent)?,
            other => (self.render_type(other, indent)?, false, false),
        };

        let parse_tags = !self.options.skip_parse_jsdoc;
        if parse_tags && let Some(docs) = docs {
            out.push_str(&refinements(docs));
        }
        if !required || (undefined && !drop_undefined) {
            out.push_str(".optional()");
        }
        if nullable {
            out.push_str(".nullable()");
        }
        if parse_tags
            && let Some(default) = docs
                .and_then(|d| d.tag("default"))
                .and_then(|t| t.value.as_deref())
        {
            write!(out, ".default({})", default).unwrap();
        }
        Ok(out)
    }

    /// Render the non-nullish members of a union and report whether `null`
    /// and `undefined` were among them.
    fn render_union(
        &mut self,
        members: &[Type],
        indent: usize,
    ) -> Result<(String, bool, bool), String> {
        let mut nullable = false;
        let mut undefined = false;
        let mut core = Vec::new();
        for member in members {
            match member {
                Type::Null => nullable = true,
                Type::Undefined => undefined = true,
                other => core.push(other),
            }
        }

        let out = match core.as_slice() {
            [] if nullable => {
                nullable = false;
                "z.null()".to_string()
            }
            [] => {
                undefined = false;
                "z.undefined()".to_string()
            }
            [single] => self.render_type(single, indent)?,
            many => {
                let parts = many
                    .iter()
                    .map(|t| self.render_type(t, indent))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("z.union([{}])", parts.join(", "))
            }
        };
        Ok((out, nullable, undefined))
    }

    fn render_type(&mut self, ty: &Type, indent: usize) -> Result<String, String> {
        let out = match ty {
            Type::String => "z.string()".to_string(),
            Type::Number => "z.number()".to_string(),
            Type::BigInt => "z.bigint()".to_string(),
            Type::Boolean => "z.boolean()".to_string(),
            Type::Date => "z.date()".to_string(),
            Type::Null => "z.null()".to_string(),
            Type::Undefined => "z.undefined()".to_string(),
            Type::Unknown => "z.unknown()".to_string(),
            Type::Any => "z.any()".to_string(),
            Type::Never => "z.never()".to_string(),
            Type::Void => "z.void()".to_string(),

            Type::StringLiteral(s) => format!("z.literal(\"{}\")", s),
            Type::NumberLiteral(n) => format!("z.literal({})", n),
            Type::BoolLiteral(b) => format!("z.literal({})", b),

            Type::Array(inner) => {
                format!("z.array({})", self.render_value(inner, true, None, false, indent)?)
            }

            Type::Tuple(items) => {
                let parts = items
                    .iter()
                    .map(|t| self.render_value(t, true, None, false, indent))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("z.tuple([{}])", parts.join(", "))
            }

            Type::Record { key, value } => {
                let value = self.render_value(value, true, None, true, indent)?;
                match key.as_ref() {
                    Type::String => format!("z.record({})", value),
                    other => format!("z.record({}, {})", self.render_type(other, indent)?, value),
                }
            }

            Type::Object { fields, index } => self.render_object(fields, index.as_deref(), indent)?,

            Type::Union(members) => {
                self.render_value(&Type::Union(members.clone()), true, None, false, indent)?
            }

            Type::Intersection(members) => {
                let mut parts = members.iter();
                let Some(first) = parts.next() else {
                    return Ok("z.unknown()".to_string());
                };
                let mut out = self.render_value(first, true, None, false, indent)?;
                for part in parts {
                    let rendered = self.render_value(part, true, None, false, indent)?;
                    write!(out, ".and({})", rendered).unwrap();
                }
                out
            }

            Type::Ref(name) => self.render_ref(name)?,

            Type::Unsupported(what) => return Err(format!("unsupported type: {}", what)),
        };
        Ok(out)
    }

    fn render_ref(&mut self, name: &str) -> Result<String, String> {
        if name == self.current {
            self.recursive = true;
        } else if self.known.contains(name) {
            if !self.deps.iter().any(|d| d == name) {
                self.deps.push(name.to_string());
            }
        } else {
            return Err(format!("references unknown type `{}`", name));
        }
        Ok((self.options.schema_name)(name))
    }

    fn render_object(
        &mut self,
        fields: &[Field],
        index: Option<&Type>,
        indent: usize,
    ) -> Result<String, String> {
        let mut out = if fields.is_empty() {
            "z.object({})".to_string()
        } else {
            let pad = "  ".repeat(indent + 1);
            let mut out = String::from("z.object({\n");
            for field in fields {
                if self.options.keep_comments
                    && let Some(docs) = &field.docs
                {
                    out.push_str(&render_comment(docs, indent + 1));
                }
                let docs = field.docs.as_ref();
                let value = self.render_value(&field.ty, field.required, docs, false, indent + 1)?;
                writeln!(out, "{}{}: {},", pad, property_key(&field.name), value).unwrap();
            }
            out.push_str(&"  ".repeat(indent));
            out.push_str("})");
            out
        };

        if let Some(index) = index {
            let value = self.render_value(index, true, None, true, indent)?;
            write!(out, ".catchall({})", value).unwrap();
        }
        Ok(out)
    }
}

fn render_enum(def: &EnumDef) -> String {
    match &def.kind {
        EnumKind::StringLiteral(variants) if variants.is_empty() => "z.never()".to_string(),
        EnumKind::StringLiteral(variants) => {
            let values: Vec<String> = variants.iter().map(|v| format!("\"{}\"", v.value)).collect();
            format!("z.enum([{}])", values.join(", "))
        }
        EnumKind::IntLiteral(variants) => match variants.as_slice() {
            [] => "z.never()".to_string(),
            [single] => format!("z.literal({})", single.value),
            many => {
                let values: Vec<String> = many
                    .iter()
                    .map(|v| format!("z.literal({})", v.value))
                    .collect();
                format!("z.union([{}])", values.join(", "))
            }
        },
    }
}

/// Zod refinements derived from JSDoc tags.
fn refinements(docs: &JsDoc) -> String {
    let mut out = String::new();
    for tag in &docs.tags {
        match (tag.name.as_str(), tag.value.as_deref()) {
            ("minimum" | "minLength" | "minItems", Some(v)) if v.parse::<f64>().is_ok() => {
                write!(out, ".min({})", v).unwrap();
            }
            ("maximum" | "maxLength" | "maxItems", Some(v)) if v.parse::<f64>().is_ok() => {
                write!(out, ".max({})", v).unwrap();
            }
            ("format", Some("email")) => out.push_str(".email()"),
            ("format", Some("uuid")) => out.push_str(".uuid()"),
            ("format", Some("url" | "uri")) => out.push_str(".url()"),
            ("format", Some("date-time")) => out.push_str(".datetime()"),
            ("pattern", Some(pattern)) => {
                write!(out, ".regex(/{}/)", pattern.replace('/', "\\/")).unwrap();
            }
            _ => {}
        }
    }
    out
}

fn render_comment(docs: &JsDoc, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut lines = docs.description.clone();
    for tag in &docs.tags {
        match &tag.value {
            Some(value) => lines.push(format!("@{} {}", tag.name, value)),
            None => lines.push(format!("@{}", tag.name)),
        }
    }

    if let [single] = lines.as_slice() {
        return format!("{}/** {} */\n", pad, single);
    }
    let mut out = format!("{}/**\n", pad);
    for line in &lines {
        writeln!(out, "{} * {}", pad, line).unwrap();
    }
    writeln!(out, "{} */", pad).unwrap();
    out
}

/// Object key as written in generated source: bare when it is a valid
/// identifier, quoted otherwise.
fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if valid {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}
