//! Stylesheet reference extraction
//!
//! Three kinds of reference are recognized in an XSL document:
//! - `xsl:include` / `xsl:import` hrefs
//! - global template calls, either through the dispatcher template or a
//!   legacy `<name><suffix>` template name
//! - `concat($var, 'literal')` expressions in attribute values, resolved
//!   against the document's `xsl:variable` declarations

use crate::config::GlobalTemplatesSection;
use crate::xml::dom::XmlElement;
use crate::xml::pattern::WildcardPattern;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

static CONCAT_PATTERN: Lazy<WildcardPattern> =
    Lazy::new(|| WildcardPattern::new("concat($*,*)").expect("Invalid pattern"));

const INCLUDE_ELEMENTS: [&str; 2] = ["xsl:include", "xsl:import"];

/// Global template reference found in a stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalTemplateRef {
    /// Call through the dispatcher template
    Dispatcher,
    /// Legacy call by name; the base name selects the stylesheet file
    Legacy(String),
}

/// Variable name to raw `select` (or text) value
pub type VariableTable = HashMap<String, String>;

/// hrefs of every include and import, in document order
pub fn include_hrefs(root: &XmlElement) -> Vec<String> {
    let mut hrefs = Vec::new();
    root.visit(&mut |e: &XmlElement| {
        if INCLUDE_ELEMENTS.contains(&e.name.as_str())
            && let Some(href) = e.attr("href")
        {
            hrefs.push(href.trim().to_string());
        }
    });
    hrefs
}

/// Build the variable table from `xsl:variable` declarations
pub fn variable_table(root: &XmlElement) -> VariableTable {
    let mut table = VariableTable::new();
    for var in root.find_all("xsl:variable") {
        let Some(name) = var.attr("name") else {
            continue;
        };
        let value = match var.attr("select") {
            Some(select) => select.to_string(),
            None => var.text(),
        };
        table.insert(name.trim().to_string(), value);
    }
    table
}

/// Global template calls made by the stylesheet
pub fn global_template_refs(
    root: &XmlElement,
    conventions: &GlobalTemplatesSection,
) -> Vec<GlobalTemplateRef> {
    let mut refs = Vec::new();
    for call in root.find_all("xsl:call-template") {
        let Some(name) = call.attr("name").map(str::trim) else {
            continue;
        };
        let found = if name == conventions.dispatcher {
            GlobalTemplateRef::Dispatcher
        } else if let Some(base) = name.strip_suffix(conventions.legacy_suffix.as_str())
            && !base.is_empty()
        {
            GlobalTemplateRef::Legacy(base.to_string())
        } else {
            continue;
        };
        if !refs.contains(&found) {
            refs.push(found);
        }
    }
    refs
}

/// Resolve one `concat($var, 'literal')` expression
///
/// Returns `None` when the expression has another shape, the variable is not
/// declared, or the second argument is not a literal.
pub fn resolve_concat(expression: &str, variables: &VariableTable) -> Option<String> {
    let caps = CONCAT_PATTERN.captures(expression.trim())?;
    let [name, literal] = caps.as_slice() else {
        return None;
    };
    let name = name.trim();
    let value = variables.get(name).or_else(|| {
        variables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })?;

    let literal = literal.trim();
    if !is_quoted(literal) {
        debug!("Skipping concat with non-literal argument: {}", expression);
        return None;
    }
    Some(format!("{}{}", unquote(value), unquote(literal)))
}

/// Paths produced by every resolvable concat expression in attribute values,
/// including attribute value templates (`{concat(...)}`)
pub fn concat_paths(root: &XmlElement, variables: &VariableTable) -> Vec<String> {
    let mut paths = Vec::new();
    root.visit(&mut |e: &XmlElement| {
        for (_, value) in &e.attributes {
            let value = value.trim();
            let expression = value
                .strip_prefix('{')
                .and_then(|v| v.strip_suffix('}'))
                .unwrap_or(value);
            if !expression.starts_with("concat(") {
                continue;
            }
            if let Some(path) = resolve_concat(expression, variables)
                && !paths.contains(&path)
            {
                paths.push(path);
            }
        }
    });
    paths
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')))
}

/// Trim whitespace and one level of matching quotes
fn unquote(value: &str) -> &str {
    let value = value.trim();
    if is_quoted(value) {
        value[1..value.len() - 1].trim()
    } else {
        value
    }
}
