//! Intermediate representation for type declarations.
//!
//! The TypeScript reader normalizes declarations to this IR before they are
//! handed to a validator backend.

use serde::{Deserialize, Serialize};

/// A complete set of declarations read from one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All type definitions, in source order.
    pub definitions: Vec<TypeDef>,
    /// Top-level regions the reader could not parse.
    pub syntax_errors: Vec<SyntaxError>,
}

/// A top-level region that failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxError {
    /// 1-based line where the region starts.
    pub line: usize,
    /// First line of the offending text.
    pub snippet: String,
}

/// A named type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    /// Type name (e.g., "ChannelsRow", "UserStatus").
    pub name: String,
    /// JSDoc attached to the declaration.
    pub docs: Option<JsDoc>,
    /// The type's shape.
    pub kind: TypeDefKind,
}

/// The kind of type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDefKind {
    /// An interface with named fields.
    Struct(StructDef),
    /// A TypeScript `enum`.
    Enum(EnumDef),
    /// A type alias (e.g., `type UserId = string`).
    Alias(Type),
}

/// A struct definition with named fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: Vec<Field>,
}

/// A field in an interface or object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as it appears in the source, without quotes.
    pub name: String,
    /// Field type.
    pub ty: Type,
    /// False when the property is declared with `?:`.
    pub required: bool,
    /// JSDoc attached to the property.
    pub docs: Option<JsDoc>,
}

/// A parsed `/** ... */` comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDoc {
    /// Free text before the first tag, one entry per line.
    pub description: Vec<String>,
    /// Block tags in source order.
    pub tags: Vec<JsDocTag>,
}

/// A JSDoc block tag such as `@minimum 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDocTag {
    /// Tag name without the `@`.
    pub name: String,
    /// Text following the tag name, if any.
    pub value: Option<String>,
}

/// An enum definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub kind: EnumKind,
}

/// The kind of enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnumKind {
    /// String enum (`A = "a"`).
    StringLiteral(Vec<StringVariant>),
    /// Numeric enum (`A`, `B = 2`).
    IntLiteral(Vec<IntVariant>),
}

/// A string enum variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringVariant {
    pub value: String,
}

/// An integer enum variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntVariant {
    pub value: i64,
    pub name: Option<String>,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    // Primitives
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Null,
    Undefined,
    Unknown,
    Any,
    Never,
    Void,

    // Compound
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Record {
        key: Box<Type>,
        value: Box<Type>,
    },
    /// Inline object type. `index` holds the value type of a string index
    /// signature, if one is present.
    Object {
        fields: Vec<Field>,
        index: Option<Box<Type>>,
    },
    Union(Vec<Type>),
    Intersection(Vec<Type>),

    // Reference to another type definition
    Ref(String),

    // Literal types (string contents are ready for a double-quoted literal)
    StringLiteral(String),
    NumberLiteral(String),
    BoolLiteral(bool),

    /// A shape the reader recognised but no backend can express.
    Unsupported(String),
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, def: TypeDef) {
        self.definitions.push(def);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

impl TypeDef {
    pub fn alias(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            docs: None,
            kind: TypeDefKind::Alias(ty),
        }
    }

    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            docs: None,
            kind: TypeDefKind::Struct(StructDef { fields }),
        }
    }

    /// Names of other definitions this one mentions, in first-seen order.
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        match &self.kind {
            TypeDefKind::Struct(s) => {
                for field in &s.fields {
                    field.ty.collect_refs(&mut out);
                }
            }
            TypeDefKind::Enum(_) => {}
            TypeDefKind::Alias(ty) => ty.collect_refs(&mut out),
        }
        out
    }
}

impl Field {
    pub fn required(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            docs: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            docs: None,
        }
    }
}

impl JsDoc {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty() && self.tags.is_empty()
    }

    /// Value of the first tag with the given name.
    pub fn tag(&self, name: &str) -> Option<&JsDocTag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

impl Type {
    fn collect_refs(&self, out: &mut Vec<String>) {
        match self {
            Type::Ref(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Type::Array(inner) => inner.collect_refs(out),
            Type::Tuple(items) | Type::Union(items) | Type::Intersection(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Type::Record { key, value } => {
                key.collect_refs(out);
                value.collect_refs(out);
            }
            Type::Object { fields, index } => {
                for field in fields {
                    field.ty.collect_refs(out);
                }
                if let Some(index) = index {
                    index.collect_refs(out);
                }
            }
            _ => {}
        }
    }
}
