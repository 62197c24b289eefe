//! JSDoc comment parsing.

use crate::ir::{JsDoc, JsDocTag};

/// Parse a `/** ... */` comment into description lines and block tags.
///
/// Returns `None` for line comments, plain block comments, and JSDoc
/// comments with no content.
pub fn parse_jsdoc(text: &str) -> Option<JsDoc> {
    let inner = text.trim().strip_prefix("/**")?.strip_suffix("*/")?;

    let mut doc = JsDoc::default();
    for line in inner.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.is_empty() {
            continue;
        }
        if let Some(tag) = line.strip_prefix('@') {
            let (name, value) = match tag.split_once(char::is_whitespace) {
                Some((name, value)) => (name, Some(value.trim().to_string())),
                None => (tag, None),
            };
            doc.tags.push(JsDocTag {
                name: name.to_string(),
                value: value.filter(|v| !v.is_empty()),
            });
        } else if let Some(last) = doc.tags.last_mut() {
            // Continuation of a multi-line tag value
            match &mut last.value {
                Some(value) => {
                    value.push(' ');
                    value.push_str(line);
                }
                None => last.value = Some(line.to_string()),
            }
        } else {
            doc.description.push(line.to_string());
        }
    }

    if doc.is_empty() { None } else { Some(doc) }
}
