//! Validator naming.
//!
//! A validator identifier is `<prefix><PascalName><suffix>`. The marker that
//! identifies schema declarations in converter output is the suffix, or the
//! prefix when the suffix is empty.

use convert_case::{Case, Casing};

/// Entity suffixes recognized by default.
pub const DEFAULT_SUFFIXES: [&str; 3] = ["Row", "Insert", "Update"];

/// Naming strategy from source type name to validator identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub prefix: String,
    pub suffix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: "Schema".to_string(),
        }
    }
}

impl Naming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Validator identifier for a source type name.
    pub fn schema_name(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name.to_case(Case::Pascal), self.suffix)
    }

    /// Identifier of the aggregate object for an entity. The entity name is
    /// already a marker-stripped identifier and is used as-is.
    pub fn aggregate_name(&self, entity: &str) -> String {
        format!("{}{}{}", self.prefix, entity, self.suffix)
    }

    /// The substring every validator identifier contains.
    pub fn marker(&self) -> &str {
        if self.suffix.is_empty() {
            &self.prefix
        } else {
            &self.suffix
        }
    }

    /// Strip the marker (and the prefix, when both are set) from an
    /// identifier. Returns `None` when the marker is absent or nothing
    /// remains.
    pub fn base_name(&self, identifier: &str) -> Option<String> {
        let marker = self.marker();
        if marker.is_empty() {
            return None;
        }
        let at = if self.suffix.is_empty() {
            identifier.find(marker)?
        } else {
            identifier.rfind(marker)?
        };
        let mut base = format!("{}{}", &identifier[..at], &identifier[at + marker.len()..]);
        if !self.suffix.is_empty()
            && !self.prefix.is_empty()
            && let Some(rest) = base.strip_prefix(self.prefix.as_str())
        {
            base = rest.to_string();
        }
        if base.is_empty() { None } else { Some(base) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_naming() {
        let naming = Naming::default();
        assert_eq!(naming.schema_name("channels_row"), "ChannelsRowSchema");
        assert_eq!(naming.schema_name("Json"), "JsonSchema");
        assert_eq!(naming.marker(), "Schema");
        assert_eq!(naming.base_name("ChannelsRowSchema").as_deref(), Some("ChannelsRow"));
        assert_eq!(naming.aggregate_name("Channels"), "ChannelsSchema");
    }

    #[test]
    fn test_marker_is_last_occurrence() {
        let naming = Naming::default();
        assert_eq!(
            naming.base_name("SchemaVersionsRowSchema").as_deref(),
            Some("SchemaVersionsRow")
        );
        assert_eq!(naming.base_name("Schema"), None);
        assert_eq!(naming.base_name("ChannelsRow"), None);
    }

    #[test]
    fn test_prefix_naming() {
        let naming = Naming::new("z", "");
        assert_eq!(naming.schema_name("users_row"), "zUsersRow");
        assert_eq!(naming.marker(), "z");
        assert_eq!(naming.base_name("zUsersRow").as_deref(), Some("UsersRow"));
        assert_eq!(naming.aggregate_name("Users"), "zUsers");
    }

    #[test]
    fn test_prefix_and_suffix() {
        let naming = Naming::new("Db", "Validator");
        assert_eq!(naming.schema_name("shops"), "DbShopsValidator");
        assert_eq!(naming.base_name("DbShopsRowValidator").as_deref(), Some("ShopsRow"));
    }
}
