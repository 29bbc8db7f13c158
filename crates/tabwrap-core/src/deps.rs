//! Dependency tracker
//!
//! For every expression-bearing object the document can produce the set of
//! other objects its expression textually references. The tracker never
//! evaluates expressions; it extracts identifier-like references and
//! resolves them against the current graph by name. Names that do not match
//! any live object become `Unresolved` entries, which is a normal state
//! while editing, not an error.
//!
//! The set is built lazily and cached on the wrapper; the cache is keyed by
//! the document's name-index version and the object's own expression
//! version, so any rename, create, delete or expression edit anywhere
//! invalidates it without eager recomputation.

use crate::model::ObjectId;

/// One tracked reference from an expression to another object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// The name resolved to a live object
    Resolved { name: String, object: ObjectId },
    /// No live object currently carries this name
    Unresolved { name: String },
}

impl Dependency {
    pub fn name(&self) -> &str {
        match self {
            Dependency::Resolved { name, .. } | Dependency::Unresolved { name } => name,
        }
    }

    pub fn object(&self) -> Option<ObjectId> {
        match self {
            Dependency::Resolved { object, .. } => Some(*object),
            Dependency::Unresolved { .. } => None,
        }
    }
}

/// Lazily-built dependency set of one expression-bearing object
#[derive(Debug, Clone)]
pub struct DependsOnList {
    pub(crate) entries: Vec<Dependency>,
    /// Document name-index version this set was built against
    pub(crate) built_names_version: u64,
    /// Object expression version this set was built against
    pub(crate) built_expr_version: u64,
}

impl DependsOnList {
    /// Entries in the order their names first appear in the expression
    pub fn entries(&self) -> &[Dependency] {
        &self.entries
    }

    /// The resolved target for a name, if present and resolved
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.iter().find(|d| d.name() == name)
    }

    /// Whether any entry is currently unresolved
    pub fn has_unresolved(&self) -> bool {
        self.entries
            .iter()
            .any(|d| matches!(d, Dependency::Unresolved { .. }))
    }
}

/// Extract identifier-like references from expression text
///
/// Recognized forms: `'quoted names'`, `[bracketed names]`, and bare
/// identifiers. Double-quoted string literals are skipped. Duplicates keep
/// their first position only.
pub(crate) fn extract_references(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                let mut name = String::new();
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    name.push(q);
                }
                push(name);
            }
            '[' => {
                let mut name = String::new();
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                    name.push(q);
                }
                push(name);
            }
            '"' => {
                // string literal, not a reference
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                name.push(c);
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                push(name);
            }
            _ => {}
        }
    }
    out
}
