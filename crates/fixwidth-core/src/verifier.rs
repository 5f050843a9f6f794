//! Definition verifier: checks references and structure before use
//!
//! References are resolved lazily, so a definition can be built in any order.
//! The verifier walks a schema subtree, a section, or a whole definition and
//! reports every problem it finds instead of stopping at the first.
//!
//! # Checks
//!
//! 1. **Resolution**: every reference and section leaf names a reachable schema
//! 2. **Cycles**: no schema reaches itself through references
//! 3. **Shadowing**: a nested schema must not hide an outer schema of the
//!    same name that a reference in the same subtree targets
//! 4. **Structure**: section output keys do not collide; empty schemas warn

use std::collections::BTreeSet;

use crate::definition::Definition;
use crate::schema::{Field, Schema, Scope};
use crate::section::{Section, SectionChild};
use crate::{Error, Result};

// ── Verification Result Types ─────────────────────────────

/// Result of verification: accumulates all diagnostics
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns only error-level diagnostics
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Returns only warning-level diagnostics
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    /// Names of every unresolved schema, in the order first reported
    pub fn unresolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for d in &self.diagnostics {
            if d.kind == DiagnosticKind::UnresolvedReference {
                if let Some(subject) = &d.subject {
                    if !names.contains(subject) {
                        names.push(subject.clone());
                    }
                }
            }
        }
        names
    }

    /// Collapse the report into one error.
    ///
    /// Only unresolved names → `UnresolvedReference`; anything else →
    /// `SchemaStructure` carrying every error message.
    pub fn into_result(self) -> Result<()> {
        let errors = self.errors();
        if errors.is_empty() {
            return Ok(());
        }
        if errors
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnresolvedReference)
        {
            return Err(Error::UnresolvedReference {
                names: self.unresolved_names(),
            });
        }
        let messages: Vec<String> = errors.iter().map(|d| d.to_string()).collect();
        Err(Error::structure(messages.join("; ")))
    }

    pub(crate) fn extend(&mut self, other: VerificationResult) {
        for d in other.diagnostics {
            if !self.diagnostics.contains(&d) {
                self.diagnostics.push(d);
            }
        }
    }

    fn add_error(&mut self, kind: DiagnosticKind, message: String, subject: Option<&str>, path: &str) {
        self.push(Severity::Error, kind, message, subject, path);
    }

    fn add_warning(&mut self, kind: DiagnosticKind, message: String, path: &str) {
        self.push(Severity::Warning, kind, message, None, path);
    }

    fn push(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        message: String,
        subject: Option<&str>,
        path: &str,
    ) {
        let diagnostic = Diagnostic {
            severity,
            kind,
            message,
            subject: subject.map(str::to_string),
            path: if path.is_empty() {
                None
            } else {
                Some(path.to_string())
            },
        };
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Name the diagnostic is about (the missing schema for unresolved references)
    pub subject: Option<String>,
    /// Dotted location of the offending field or section
    pub path: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if let Some(ref path) = self.path {
            write!(f, "{} [{}] at {}: {}", prefix, self.kind, path, self.message)
        } else {
            write!(f, "{} [{}]: {}", prefix, self.kind, self.message)
        }
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Category of verification issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnresolvedReference,
    ReferenceCycle,
    Shadowing,
    Structure,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::UnresolvedReference => write!(f, "unresolved"),
            DiagnosticKind::ReferenceCycle => write!(f, "cycle"),
            DiagnosticKind::Shadowing => write!(f, "shadowing"),
            DiagnosticKind::Structure => write!(f, "structure"),
        }
    }
}

// ── Public API ────────────────────────────────────────────

/// Verify one schema subtree declared in `scope`
pub fn verify_schema(schema: &Schema, scope: &Scope<'_>) -> VerificationResult {
    let mut result = VerificationResult::new();
    walk_schema(schema, scope, "", &mut result);
    let mut stack = vec![(schema as *const Schema, schema.name().to_string())];
    check_cycles(schema, scope, &mut stack, &mut result);
    result
}

/// Verify a section tree against the definition's schema registry
pub fn verify_section(section: &Section, definition: &Definition) -> VerificationResult {
    let mut result = VerificationResult::new();
    let path = section.name().unwrap_or("section").to_string();
    walk_section(section, definition, &path, &mut result);
    result
}

/// Verify every schema and section of a definition
pub fn verify_definition(definition: &Definition) -> VerificationResult {
    let mut result = VerificationResult::new();
    let root = Scope::root(definition);
    for schema in definition.schemas() {
        result.extend(verify_schema(schema, &root));
    }
    for section in definition.sections() {
        result.extend(verify_section(section, definition));
    }
    result
}

// ── Schema walk ───────────────────────────────────────────

fn walk_schema(schema: &Schema, scope: &Scope<'_>, parent_path: &str, result: &mut VerificationResult) {
    let path = join(parent_path, schema.name());
    let here = match scope.enter(schema) {
        Ok(here) => here,
        Err(e) => {
            result.add_error(DiagnosticKind::ReferenceCycle, e.to_string(), None, &path);
            return;
        }
    };

    if schema.fields().is_empty() {
        result.add_warning(
            DiagnosticKind::Structure,
            format!("schema '{}' has no fields and only matches empty lines", schema.name()),
            &path,
        );
    }

    let targets = referenced_names(schema);
    for field in schema.fields() {
        if let Field::Schema(nested) = field {
            if targets.contains(nested.name()) && here.lookup_outside(nested.name()).is_some() {
                result.add_error(
                    DiagnosticKind::Shadowing,
                    format!(
                        "nested schema '{}' shadows an outer schema of the same name that a reference in '{}' targets",
                        nested.name(),
                        schema.name()
                    ),
                    Some(nested.name()),
                    &path,
                );
            }
        }
    }

    for field in schema.fields() {
        match field {
            Field::Column(_) => {}
            Field::Schema(nested) => walk_schema(nested, &here, &path, result),
            Field::Reference(reference) => {
                if here.lookup(reference.target()).is_none() {
                    result.add_error(
                        DiagnosticKind::UnresolvedReference,
                        format!("cannot find schema named '{}'", reference.target()),
                        Some(reference.target()),
                        &join(&path, reference.name()),
                    );
                }
            }
        }
    }
}

/// Targets of every reference in this schema's subtree
fn referenced_names(schema: &Schema) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for field in schema.fields() {
        match field {
            Field::Reference(r) => {
                names.insert(r.target().to_string());
            }
            Field::Schema(nested) => names.extend(referenced_names(nested)),
            Field::Column(_) => {}
        }
    }
    names
}

fn check_cycles(
    schema: &Schema,
    scope: &Scope<'_>,
    stack: &mut Vec<(*const Schema, String)>,
    result: &mut VerificationResult,
) {
    let here = match scope.enter(schema) {
        Ok(here) => here,
        Err(_) => return,
    };
    for field in schema.fields() {
        match field {
            Field::Column(_) => {}
            Field::Schema(nested) => check_cycles(nested, &here, stack, result),
            Field::Reference(reference) => {
                let Some((target, enclosing)) = here.lookup(reference.target()) else {
                    continue;
                };
                let key = target as *const Schema;
                if let Some(start) = stack.iter().position(|(seen, _)| *seen == key) {
                    let mut chain: Vec<&str> = stack[start..].iter().map(|(_, n)| n.as_str()).collect();
                    chain.push(target.name());
                    result.add_error(
                        DiagnosticKind::ReferenceCycle,
                        format!("reference cycle: {}", chain.join(" -> ")),
                        Some(target.name()),
                        "",
                    );
                    continue;
                }
                stack.push((key, target.name().to_string()));
                check_cycles(target, &enclosing, stack, result);
                stack.pop();
            }
        }
    }
}

// ── Section walk ──────────────────────────────────────────

fn walk_section(section: &Section, definition: &Definition, path: &str, result: &mut VerificationResult) {
    let mut keys: Vec<&str> = Vec::new();
    for child in section.children() {
        match child {
            SectionChild::Schema(leaf) => {
                if definition.schema(leaf.target()).is_none() {
                    result.add_error(
                        DiagnosticKind::UnresolvedReference,
                        format!("cannot find schema named '{}'", leaf.target()),
                        Some(leaf.target()),
                        path,
                    );
                }
                if keys.contains(&leaf.target()) {
                    result.add_warning(
                        DiagnosticKind::Structure,
                        format!("schema '{}' appears more than once in this section", leaf.target()),
                        path,
                    );
                } else {
                    keys.push(leaf.target());
                }
            }
            SectionChild::Section(nested) => {
                let nested_path = join(path, nested.name().unwrap_or("section"));
                if let Some(name) = nested.name() {
                    if keys.contains(&name) {
                        result.add_error(
                            DiagnosticKind::Structure,
                            format!("named section '{}' collides with another output key", name),
                            Some(name),
                            path,
                        );
                    } else {
                        keys.push(name);
                    }
                }
                walk_section(nested, definition, &nested_path, result);
            }
        }
    }
    if section.children().is_empty() {
        result.add_warning(
            DiagnosticKind::Structure,
            "section has no children".to_string(),
            path,
        );
    }
}

// ── Helpers ───────────────────────────────────────────────

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::schema::Reference;
    use crate::section::SchemaRef;

    fn schema_with(name: &str, width: usize) -> Schema {
        let mut schema = Schema::new(name).unwrap();
        schema.add_column(Column::new("v", width).unwrap()).unwrap();
        schema
    }

    #[test]
    fn test_valid_definition_has_no_diagnostics() {
        let mut def = Definition::new();
        def.add_schema(schema_with("header", 3)).unwrap();
        let mut row = schema_with("row", 2);
        row.add_reference(Reference::new("header")).unwrap();
        def.add_schema(row).unwrap();
        let result = verify_definition(&def);
        assert!(result.is_valid(), "{:?}", result);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_collects_every_unresolved_reference() {
        let mut def = Definition::new();
        let mut row = schema_with("row", 2);
        row.add_reference(Reference::new("a"))
            .unwrap()
            .add_reference(Reference::new("b"))
            .unwrap();
        def.add_schema(row).unwrap();

        let result = verify_definition(&def);
        assert_eq!(result.unresolved_names(), vec!["a".to_string(), "b".to_string()]);
        match result.into_result().unwrap_err() {
            Error::UnresolvedReference { names } => assert_eq!(names.len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_forward_reference_resolves() {
        let mut def = Definition::new();
        let mut row = schema_with("row", 2);
        row.add_reference(Reference::new("later")).unwrap();
        def.add_schema(row).unwrap();
        assert!(!verify_definition(&def).is_valid());
        def.add_schema(schema_with("later", 4)).unwrap();
        assert!(verify_definition(&def).is_valid());
    }

    #[test]
    fn test_detects_reference_cycle() {
        let mut def = Definition::new();
        let mut a = schema_with("a", 1);
        a.add_reference(Reference::new("b")).unwrap();
        let mut b = schema_with("b", 1);
        b.add_reference(Reference::new("a")).unwrap();
        def.add_schema(a).unwrap();
        def.add_schema(b).unwrap();

        let result = verify_definition(&def);
        let cycles: Vec<_> = result
            .errors()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::ReferenceCycle)
            .collect();
        assert!(!cycles.is_empty());
        assert!(matches!(result.into_result(), Err(Error::SchemaStructure(_))));
    }

    #[test]
    fn test_detects_shadowing_nested_schema() {
        let mut def = Definition::new();
        def.add_schema(schema_with("money", 4)).unwrap();
        let mut invoice = schema_with("invoice", 2);
        invoice
            .add_schema(schema_with("money", 6))
            .unwrap()
            .add_reference(Reference::new("money").stored_as("total"))
            .unwrap();
        def.add_schema(invoice).unwrap();

        let result = verify_definition(&def);
        let shadowing: Vec<_> = result
            .errors()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::Shadowing)
            .collect();
        assert_eq!(shadowing.len(), 1);
        assert_eq!(shadowing[0].path.as_deref(), Some("invoice"));
    }

    #[test]
    fn test_nested_schema_without_outer_twin_is_fine() {
        let mut def = Definition::new();
        let mut invoice = schema_with("invoice", 2);
        invoice
            .add_schema(schema_with("money", 6))
            .unwrap()
            .add_reference(Reference::new("money").stored_as("total"))
            .unwrap();
        def.add_schema(invoice).unwrap();
        assert!(verify_definition(&def).is_valid());
    }

    #[test]
    fn test_section_unresolved_and_collisions() {
        let mut def = Definition::new();
        def.add_schema(schema_with("header", 3)).unwrap();
        let mut rows = Section::set().unwrap();
        rows.set_name("header").unwrap();
        rows.add_schema(SchemaRef::new("ghost"));
        let mut file = Section::sequence().unwrap();
        file.set_name("file").unwrap();
        file.add_schema(SchemaRef::new("header")).add_section(rows);

        let result = verify_section(&file, &def);
        assert_eq!(result.unresolved_names(), vec!["ghost".to_string()]);
        assert!(result
            .errors()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Structure));
    }

    #[test]
    fn test_empty_schema_warns() {
        let schema = Schema::new("blank").unwrap();
        let result = verify_schema(&schema, &Scope::standalone());
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(
            result.warnings()[0].to_string(),
            "warning [structure] at blank: schema 'blank' has no fields and only matches empty lines"
        );
    }
}
