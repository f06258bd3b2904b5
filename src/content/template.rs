//! Issue title/body templates.
//!
//! Two placeholder kinds are expanded:
//! - `{{ name }}` and `{{ <tags>name</tags> }}` for content variables; list
//!   values honour the `code`, `ol` and `ul` tags
//! - `${{ github.<prop> }}` for a fixed set of runner context values
//!
//! Unknown or blocked placeholders are left in the output unchanged.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Runner context properties a template may read.
pub const ALLOWED_GITHUB_CONTEXT: &[&str] = &[
    "workflow",
    "job",
    "action",
    "actor",
    "repository",
    "event_name",
    "ref",
    "sha",
    "run_id",
    "run_number",
    "run_attempt",
    "head_ref",
    "base_ref",
    "server_url",
    "api_url",
    "graphql_url",
];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]+)\}\}").expect("valid placeholder pattern"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_-]+").expect("valid word pattern"));

static OPENING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z0-9_]+)(?:\s[^>]*)?>|<([A-Za-z0-9_]+)$").expect("valid tag pattern")
});

static GITHUB_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*github\.([A-Za-z0-9_]+)\s*\}\}").expect("valid context pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(value: Vec<String>) -> Self {
        TemplateValue::List(value)
    }
}

pub type TemplateVars = HashMap<String, TemplateValue>;

/// Expand content variables, then whitelisted runner context values.
///
/// `context` resolves an upper-cased property name (e.g. `WORKFLOW`) to its
/// value; in production that is the `GITHUB_<PROP>` environment variable.
pub fn render_template<F>(template: &str, vars: &TemplateVars, context: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let whole = &caps[0];
        let inner = &caps[1];
        let Some(name) = variable_name(inner) else {
            return whole.to_string();
        };
        match vars.get(name) {
            None => {
                debug!("Template variable not found: {}", name);
                whole.to_string()
            }
            Some(TemplateValue::Text(text)) => text.clone(),
            Some(TemplateValue::List(items)) => format_list(items, &opening_tags(inner)),
        }
    });

    GITHUB_CONTEXT
        .replace_all(&expanded, |caps: &Captures| {
            let whole = &caps[0];
            let property = &caps[1];
            if !ALLOWED_GITHUB_CONTEXT.contains(&property.to_lowercase().as_str()) {
                warn!(
                    "Blocked access to potentially sensitive GitHub context variable: {}",
                    property
                );
                return whole.to_string();
            }
            context(&property.to_uppercase())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

/// Production context lookup: `GITHUB_<PROP>` from the environment.
pub fn env_context(property: &str) -> Option<String> {
    std::env::var(format!("GITHUB_{}", property)).ok()
}

/// First word of the placeholder that does not sit inside an angle-bracket tag.
fn variable_name(inner: &str) -> Option<&str> {
    WORD.find_iter(inner)
        .find(|word| {
            let rest = &inner[word.end()..];
            match (rest.find('>'), rest.find('<')) {
                (Some(gt), Some(lt)) => gt > lt,
                (Some(_), None) => false,
                _ => true,
            }
        })
        .map(|word| word.as_str())
}

fn opening_tags(inner: &str) -> Vec<String> {
    OPENING_TAG
        .captures_iter(inner.trim_end())
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|tag| tag.as_str().to_string())
        .collect()
}

fn format_list(items: &[String], tags: &[String]) -> String {
    let has = |tag: &str| tags.iter().any(|t| t == tag);
    let items: Vec<String> = if has("code") {
        items.iter().map(|item| format!("`{}`", item)).collect()
    } else {
        items.to_vec()
    };

    if has("ol") {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item))
            .collect::<Vec<_>>()
            .join("\n")
    } else if has("ul") {
        items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        items.join(", ")
    }
}
