//! Pattern-based text generation
//!
//! `Pattern` entities store a template string in their data payload under the
//! `"template"` key. Generation substitutes `{{name}}` placeholders with
//! caller-supplied variables; placeholders with no matching variable are left
//! verbatim so partially filled templates can pass through later stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data key under which a `Pattern` entity stores its template string.
pub const TEMPLATE_DATA_KEY: &str = "template";

/// Request to render a stored pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Name of the `Pattern` entity to render
    pub pattern_name: String,
    /// Variable values substituted into `{{name}}` placeholders
    pub variables: BTreeMap<String, String>,
}

impl GenerateRequest {
    /// Request with no variables
    pub fn new(pattern_name: impl Into<String>) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Add a variable
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Rendered output of a pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedOutput {
    /// The pattern that was rendered
    pub pattern: String,
    /// Rendered text, with unmatched placeholders left in place
    pub content: String,
    /// Placeholder names that had no supplied variable
    pub unresolved: Vec<String>,
}

/// Substitute `{{name}}` placeholders in `template` with `variables`.
///
/// Placeholders without a matching variable are left verbatim.
pub fn render_template(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (name, value) in variables {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

/// List the distinct `{{name}}` placeholders remaining in `text`, in order of
/// first appearance.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
        rest = &after[end + 2..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_supplied_variables() {
        let rendered = render_template("Hello {{name}}", &vars(&[("name", "World")]));
        assert_eq!(rendered, "Hello World");
    }

    #[test]
    fn test_missing_variables_stay_verbatim() {
        let rendered = render_template("Hello {{name}}", &vars(&[]));
        assert_eq!(rendered, "Hello {{name}}");
    }

    #[test]
    fn test_multiple_occurrences_and_variables() {
        let rendered = render_template(
            "{{greeting}} {{name}}, again: {{greeting}}!",
            &vars(&[("greeting", "Hi"), ("name", "Ada")]),
        );
        assert_eq!(rendered, "Hi Ada, again: Hi!");
    }

    #[test]
    fn test_unresolved_placeholders_listed_once_in_order() {
        let text = "{{a}} {{b}} {{a}} {{ c }}";
        assert_eq!(unresolved_placeholders(text), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unterminated_placeholder_is_ignored() {
        assert!(unresolved_placeholders("{{open").is_empty());
    }
}
