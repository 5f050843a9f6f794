//! Schema: recursive field layout for one record kind
//!
//! A schema is an ordered list of [`Field`]s: columns, nested schemas and
//! named references to schemas declared elsewhere. References are resolved
//! lazily through a [`Scope`] chain when length, parse, format or
//! verification is requested, so a schema may reference one declared later.
//!
//! # Resolution order
//!
//! 1. nested schemas of the schema holding the reference
//! 2. nested schemas of each enclosing schema, innermost first
//! 3. the definition registry
//!
//! # Guarantees
//!
//! - Names are unique across columns, groups, nested schemas and references
//!   at one level; `spacer` is reserved.
//! - `length()` is memoized and the memo is dropped by every `&mut` method.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use once_cell::sync::Lazy;

use crate::column::{self, Column, SPACER};
use crate::definition::Definition;
use crate::options::{self, MergePolicy, OptionKind, OptionSet, OptionSpec, OptionValue, Trap, Validator};
use crate::value::Value;
use crate::verifier::{self, VerificationResult};
use crate::{Error, Result};

/// Nesting depth past which resolution is assumed to be cyclic
const MAX_DEPTH: usize = 64;

static CATALOG: Lazy<std::result::Result<OptionSet, String>> = Lazy::new(|| {
    build_catalog().map_err(|e| e.to_string())
});

fn build_catalog() -> Result<OptionSet> {
    let mut set = OptionSet::new();
    set.define(
        OptionSpec::new("name")
            .validate(options::non_blank())
            .required(),
    )?;
    set.define(
        OptionSpec::new("optional")
            .validate(options::boolean())
            .default_value(false),
    )?;
    set.define(
        OptionSpec::new("singular")
            .validate(options::boolean())
            .default_value(false),
    )?;
    set.define(OptionSpec::new("trap").validate(Validator::Kind(OptionKind::Trap)))?;
    Ok(set)
}

/// Option catalog every schema instance starts from
pub fn catalog() -> Result<&'static OptionSet> {
    CATALOG.as_ref().map_err(|e| Error::config(e.clone()))
}

/// Schema settings extracted from a finalized option set
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaConfig {
    pub name: String,
    pub optional: bool,
    pub singular: bool,
    pub trap: Option<Trap>,
}

impl SchemaConfig {
    pub fn from_options(set: &OptionSet) -> Result<Self> {
        let name = set
            .get("name")?
            .and_then(OptionValue::as_text)
            .ok_or_else(|| Error::config("schema has no name"))?
            .to_string();
        Ok(SchemaConfig {
            name,
            optional: set.get("optional")?.and_then(OptionValue::as_bool).unwrap_or(false),
            singular: set.get("singular")?.and_then(OptionValue::as_bool).unwrap_or(false),
            trap: set.get("trap")?.and_then(OptionValue::as_trap).cloned(),
        })
    }
}

// ── Scope ─────────────────────────────────────────────────

/// Lexical environment used to resolve schema references
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    definition: Option<&'a Definition>,
    schema: Option<&'a Schema>,
    parent: Option<&'a Scope<'a>>,
    depth: usize,
}

impl<'a> Scope<'a> {
    /// Top-level scope of a definition
    pub fn root(definition: &'a Definition) -> Self {
        Scope {
            definition: Some(definition),
            schema: None,
            parent: None,
            depth: 0,
        }
    }

    /// Scope with no registry; only nested schemas resolve
    pub fn standalone() -> Self {
        Scope {
            definition: None,
            schema: None,
            parent: None,
            depth: 0,
        }
    }

    /// Scope inside `schema`
    pub fn enter<'b>(&'b self, schema: &'b Schema) -> Result<Scope<'b>> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::structure(format!(
                "schema '{}' is nested more than {} levels deep; references are probably cyclic",
                schema.name(),
                MAX_DEPTH
            )));
        }
        Ok(Scope {
            definition: self.definition,
            schema: Some(schema),
            parent: Some(self),
            depth: self.depth + 1,
        })
    }

    pub fn definition(&self) -> Option<&'a Definition> {
        self.definition
    }

    /// Innermost schema of this scope, if any
    pub fn schema(&self) -> Option<&'a Schema> {
        self.schema
    }

    /// Find a schema by name; returns it with the scope it was declared in
    pub fn lookup<'s>(&'s self, name: &str) -> Option<(&'s Schema, Scope<'s>)> {
        let mut current: Option<&'s Scope<'s>> = Some(self);
        while let Some(frame) = current {
            if let Some(nested) = frame.schema.and_then(|s| s.nested(name)) {
                return Some((nested, *frame));
            }
            current = frame.parent;
        }
        let definition = self.definition?;
        let found = definition.schema(name)?;
        Some((
            found,
            Scope {
                definition: Some(definition),
                schema: None,
                parent: None,
                depth: self.depth,
            },
        ))
    }

    /// Like `lookup`, but skipping this scope's own schema
    pub(crate) fn lookup_outside<'s>(&'s self, name: &str) -> Option<&'s Schema> {
        match self.parent {
            Some(parent) => parent.lookup(name).map(|(found, _)| found),
            None => self.definition.and_then(|d| d.schema(name)),
        }
    }
}

// ── Fields ────────────────────────────────────────────────

/// Named use of a schema declared elsewhere
#[derive(Debug, Clone)]
pub struct Reference {
    name: String,
    target: String,
    overrides: OptionSet,
    derived: OnceLock<Arc<Schema>>,
}

impl Reference {
    /// Reference stored under the target's own name
    pub fn new(target: &str) -> Self {
        Reference {
            name: target.to_string(),
            target: target.to_string(),
            overrides: OptionSet::new(),
            derived: OnceLock::new(),
        }
    }

    /// Store the decoded record under `name` instead of the target name
    pub fn stored_as(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Column option applied to the target's columns that do not set it
    pub fn with_option(mut self, key: &str, value: impl Into<OptionValue>) -> Result<Self> {
        let value = value.into();
        if !column::OPTION_NAMES.contains(&key) {
            return Err(Error::config(format!(
                "Unknown column option :{} on reference '{}'",
                key, self.name
            )));
        }
        column::catalog()?.clone().set(key, value.clone())?;
        self.overrides.set_or_pend(key, value)?;
        self.derived = OnceLock::new();
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn overrides(&self) -> &OptionSet {
        &self.overrides
    }

    /// Resolve the target from the scope of the schema holding this reference
    pub fn resolve<'s>(&'s self, scope: &'s Scope<'s>) -> Result<(&'s Schema, Scope<'s>)> {
        let (target, enclosing) = scope.lookup(&self.target).ok_or_else(|| {
            Error::UnresolvedReference {
                names: vec![self.target.clone()],
            }
        })?;
        if self.overrides.is_empty() {
            return Ok((target, enclosing));
        }
        if self.derived.get().is_none() {
            let derived = target.with_column_overrides(&self.overrides)?;
            let _ = self.derived.set(Arc::new(derived));
        }
        match self.derived.get() {
            Some(derived) => Ok((derived.as_ref(), enclosing)),
            None => Ok((target, enclosing)),
        }
    }

    fn inherit(&mut self, parent: &OptionSet) -> Result<()> {
        self.overrides.merge(parent, MergePolicy::INHERIT)?;
        self.derived = OnceLock::new();
        Ok(())
    }
}

/// One entry of a schema's field list
#[derive(Debug, Clone)]
pub enum Field {
    Column(Column),
    Schema(Schema),
    Reference(Reference),
}

impl Field {
    /// Key under which this field's decoded value is stored
    pub fn name(&self) -> &str {
        match self {
            Field::Column(c) => c.name(),
            Field::Schema(s) => s.name(),
            Field::Reference(r) => r.name(),
        }
    }
}

// ── Schema ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Schema {
    options: OptionSet,
    config: SchemaConfig,
    fields: Vec<Field>,
    length: OnceLock<usize>,
}

impl Schema {
    pub fn new(name: &str) -> Result<Schema> {
        Schema::with_options(name, Vec::new())
    }

    /// Schema with options. Column options are kept pending and flow down
    /// to every column added later.
    pub fn with_options(name: &str, pairs: Vec<(String, OptionValue)>) -> Result<Schema> {
        let catalog = catalog()?;
        let mut options = catalog.clone();
        options.set("name", name)?;
        for (key, value) in pairs {
            if catalog.is_defined(&key) {
                options.set(&key, value)?;
            } else if column::OPTION_NAMES.contains(&key.as_str()) {
                options.set_or_pend(&key, value)?;
            } else {
                return Err(Error::config(format!(
                    "Unknown option :{} for schema '{}'",
                    key, name
                )));
            }
        }
        options.finalize()?;
        let config = SchemaConfig::from_options(&options)?;
        Ok(Schema {
            options,
            config,
            fields: Vec::new(),
            length: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn is_optional(&self) -> bool {
        self.config.optional
    }

    pub fn is_singular(&self) -> bool {
        self.config.singular
    }

    pub fn trap(&self) -> Option<&Trap> {
        self.config.trap.as_ref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.fields.iter().filter_map(|f| match f {
            Field::Column(c) => Some(c),
            _ => None,
        })
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.fields.iter().filter_map(|f| match f {
            Field::Reference(r) => Some(r),
            _ => None,
        })
    }

    /// Direct nested schema by name
    pub fn nested(&self, name: &str) -> Option<&Schema> {
        self.fields.iter().find_map(|f| match f {
            Field::Schema(s) if s.name() == name => Some(s),
            _ => None,
        })
    }

    // ── Builder ──

    pub fn set_optional(&mut self, optional: bool) -> Result<&mut Self> {
        self.set_option("optional", optional)
    }

    pub fn set_singular(&mut self, singular: bool) -> Result<&mut Self> {
        self.set_option("singular", singular)
    }

    pub fn set_trap(&mut self, trap: Trap) -> Result<&mut Self> {
        self.set_option("trap", trap)
    }

    fn set_option(&mut self, key: &str, value: impl Into<OptionValue>) -> Result<&mut Self> {
        self.options.set(key, value)?;
        self.config = SchemaConfig::from_options(&self.options)?;
        Ok(self)
    }

    pub fn add_column(&mut self, mut column: Column) -> Result<&mut Self> {
        if column.name() == SPACER {
            return Err(Error::structure(format!(
                "Invalid name '{}' in schema '{}': reserved for spacers",
                SPACER,
                self.name()
            )));
        }
        self.check_name(column.name())?;
        if let Some(group) = column.group() {
            self.check_group(group)?;
        }
        column.inherit(&self.options.only_pending())?;
        self.push(Field::Column(column));
        Ok(self)
    }

    pub fn add_spacer(&mut self, length: usize, padding: Option<char>) -> Result<&mut Self> {
        let mut spacer = Column::spacer(length, padding)?;
        spacer.inherit(&self.options.only_pending())?;
        self.push(Field::Column(spacer));
        Ok(self)
    }

    pub fn add_schema(&mut self, mut schema: Schema) -> Result<&mut Self> {
        self.check_name(schema.name())?;
        schema.inherit(&self.options.only_pending())?;
        self.push(Field::Schema(schema));
        Ok(self)
    }

    pub fn add_reference(&mut self, mut reference: Reference) -> Result<&mut Self> {
        self.check_name(reference.name())?;
        reference.inherit(&self.options.only_pending())?;
        self.push(Field::Reference(reference));
        Ok(self)
    }

    fn push(&mut self, field: Field) {
        self.fields.push(field);
        self.length = OnceLock::new();
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name == SPACER {
            return Err(Error::structure(format!(
                "Invalid name '{}' in schema '{}': reserved for spacers",
                name,
                self.name()
            )));
        }
        let taken = self.fields.iter().find_map(|f| match f {
            Field::Column(c) if c.is_spacer() => None,
            Field::Column(c) if c.name() == name => Some("a column"),
            Field::Column(c) if c.group() == Some(name) => Some("a group"),
            Field::Schema(s) if s.name() == name => Some("a schema"),
            Field::Reference(r) if r.name() == name => Some("a reference"),
            _ => None,
        });
        match taken {
            Some(kind) => Err(Error::structure(format!(
                "Schema '{}' already has {} named '{}'",
                self.name(),
                kind,
                name
            ))),
            None => Ok(()),
        }
    }

    fn check_group(&self, group: &str) -> Result<()> {
        if group == SPACER {
            return Err(Error::structure(format!(
                "Invalid group name '{}' in schema '{}': reserved for spacers",
                group,
                self.name()
            )));
        }
        let taken = self.fields.iter().find_map(|f| match f {
            Field::Column(c) if !c.is_spacer() && c.name() == group => Some("a column"),
            Field::Schema(s) if s.name() == group => Some("a schema"),
            Field::Reference(r) if r.name() == group => Some("a reference"),
            _ => None,
        });
        match taken {
            Some(kind) => Err(Error::structure(format!(
                "Group '{}' in schema '{}' collides with {} of the same name",
                group,
                self.name(),
                kind
            ))),
            None => Ok(()),
        }
    }

    /// Merge the parent's options into this schema and pass them down
    pub(crate) fn inherit(&mut self, parent: &OptionSet) -> Result<()> {
        self.options.merge(parent, MergePolicy::INHERIT)?;
        self.options.finalize()?;
        self.config = SchemaConfig::from_options(&self.options)?;
        let passed = self.options.only_pending();
        for field in &mut self.fields {
            match field {
                Field::Column(c) => c.inherit(&passed)?,
                Field::Schema(s) => s.inherit(&passed)?,
                Field::Reference(r) => r.inherit(&passed)?,
            }
        }
        self.length = OnceLock::new();
        Ok(())
    }

    /// Copy whose direct columns take the given options where unset
    fn with_column_overrides(&self, overrides: &OptionSet) -> Result<Schema> {
        let mut copy = self.clone();
        for field in &mut copy.fields {
            if let Field::Column(c) = field {
                if !c.is_spacer() {
                    c.inherit(overrides)?;
                }
            }
        }
        Ok(copy)
    }

    /// Drop every length memo in this subtree
    pub(crate) fn clear_memos(&mut self) {
        self.length = OnceLock::new();
        for field in &mut self.fields {
            match field {
                Field::Schema(s) => s.clear_memos(),
                Field::Reference(r) => r.derived = OnceLock::new(),
                Field::Column(_) => {}
            }
        }
    }

    // ── Layout ──

    /// Total character width; `scope` is the scope this schema is declared in
    pub fn length(&self, scope: &Scope<'_>) -> Result<usize> {
        if let Some(length) = self.length.get() {
            return Ok(*length);
        }
        let here = scope.enter(self)?;
        let mut total = 0;
        for field in &self.fields {
            total += match field {
                Field::Column(c) => c.length(),
                Field::Schema(s) => s.length(&here)?,
                Field::Reference(r) => {
                    let (target, enclosing) = r.resolve(&here)?;
                    target.length(&enclosing)?
                }
            };
        }
        let _ = self.length.set(total);
        Ok(total)
    }

    /// Whether a line has this schema's width and passes its trap
    pub fn matches(&self, scope: &Scope<'_>, line: &str) -> Result<bool> {
        if line.chars().count() != self.length(scope)? {
            return Ok(false);
        }
        Ok(self.trap().map_or(true, |trap| trap.call(line)))
    }

    /// Every unresolved reference and structural problem in this subtree
    pub fn errors(&self, scope: &Scope<'_>) -> VerificationResult {
        verifier::verify_schema(self, scope)
    }

    pub fn validate(&self, scope: &Scope<'_>) -> Result<()> {
        self.errors(scope).into_result()
    }

    // ── Parse / Format ──

    /// Decode one line into a record
    pub fn parse(&self, scope: &Scope<'_>, line: &str) -> Result<Value> {
        let chars: Vec<char> = line.chars().collect();
        self.parse_at(scope, &chars, 0)
    }

    fn parse_at(&self, scope: &Scope<'_>, chars: &[char], start: usize) -> Result<Value> {
        let here = scope.enter(self)?;
        let mut record = BTreeMap::new();
        let mut cursor = start;
        for field in &self.fields {
            match field {
                Field::Column(c) => {
                    if !c.is_spacer() {
                        let end = (cursor + c.length()).min(chars.len());
                        let slice: String = chars.get(cursor.min(end)..end).unwrap_or(&[]).iter().collect();
                        let value = c.parse(&slice, self.name())?;
                        match c.group() {
                            Some(group) => {
                                let bucket = record
                                    .entry(group.to_string())
                                    .or_insert_with(|| Value::Object(BTreeMap::new()));
                                if let Value::Object(map) = bucket {
                                    map.insert(c.name().to_string(), value);
                                }
                            }
                            None => {
                                record.insert(c.name().to_string(), value);
                            }
                        }
                    }
                    cursor += c.length();
                }
                Field::Schema(s) => {
                    record.insert(s.name().to_string(), s.parse_at(&here, chars, cursor)?);
                    cursor += s.length(&here)?;
                }
                Field::Reference(r) => {
                    let (target, enclosing) = r.resolve(&here)?;
                    record.insert(r.name().to_string(), target.parse_at(&enclosing, chars, cursor)?);
                    cursor += target.length(&enclosing)?;
                }
            }
        }
        Ok(Value::Object(record))
    }

    /// Encode a record into one line of exactly `length()` characters
    pub fn format(&self, scope: &Scope<'_>, data: &Value) -> Result<String> {
        let here = scope.enter(self)?;
        if data.as_object().is_none() {
            return Err(Error::format(
                self.name(),
                format!("expected an object, got {}", data.type_name()),
            ));
        }
        let mut line = String::new();
        for field in &self.fields {
            match field {
                Field::Column(c) if c.is_spacer() => line.push_str(&c.format(&Value::Null)?),
                Field::Column(c) => {
                    let source = match c.group() {
                        Some(group) => data.get(group),
                        None => Some(data),
                    };
                    match source.and_then(|s| s.get(c.name())) {
                        Some(value) => line.push_str(&c.format(value)?),
                        None if c.config().nil_blank => line.push_str(&c.format(&Value::Null)?),
                        None => {
                            return Err(Error::format(
                                format!("{}::{}", self.name(), c.name()),
                                "missing value for column",
                            ))
                        }
                    }
                }
                Field::Schema(s) => {
                    let value = data.get(s.name()).ok_or_else(|| missing(self, s.name()))?;
                    line.push_str(&s.format(&here, value)?);
                }
                Field::Reference(r) => {
                    let (target, enclosing) = r.resolve(&here)?;
                    let value = data.get(r.name()).ok_or_else(|| missing(self, r.name()))?;
                    line.push_str(&target.format(&enclosing, value)?);
                }
            }
        }
        Ok(line)
    }
}

fn missing(schema: &Schema, field: &str) -> Error {
    Error::format(
        format!("{}::{}", schema.name(), field),
        "missing value for nested record",
    )
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn two_columns() -> Schema {
        let mut schema = Schema::new("pair").unwrap();
        schema
            .add_column(Column::new("colA", 3).unwrap())
            .unwrap()
            .add_column(Column::new("colB", 4).unwrap())
            .unwrap();
        schema
    }

    // ── Layout ──

    #[test]
    fn test_length_sums_fields() {
        let mut schema = two_columns();
        let scope = Scope::standalone();
        assert_eq!(schema.length(&scope).unwrap(), 7);
        schema.add_spacer(2, None).unwrap();
        assert_eq!(schema.length(&scope).unwrap(), 9);
    }

    #[test]
    fn test_matches_requires_exact_length_and_trap() {
        let mut schema = two_columns();
        let scope = Scope::standalone();
        assert!(schema.matches(&scope, "ABCDEFG").unwrap());
        assert!(!schema.matches(&scope, "ABCDEF").unwrap());
        schema
            .set_trap(Trap::new("starts_with_A", |line| line.starts_with('A')))
            .unwrap();
        assert!(schema.matches(&scope, "ABCDEFG").unwrap());
        assert!(!schema.matches(&scope, "XBCDEFG").unwrap());
    }

    // ── Naming ──

    #[test]
    fn test_duplicate_names_rejected() {
        let mut schema = two_columns();
        let err = schema.add_column(Column::new("colA", 1).unwrap()).unwrap_err();
        assert!(matches!(err, Error::SchemaStructure(_)));

        let err = schema.add_schema(Schema::new("colB").unwrap()).unwrap_err();
        assert!(err.to_string().contains("a column named 'colB'"));

        let err = schema.add_reference(Reference::new("colA")).unwrap_err();
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    #[test]
    fn test_group_collisions_rejected() {
        let mut schema = two_columns();
        let grouped = Column::with_options("x", 1, vec![("group".into(), "colA".into())]).unwrap();
        assert!(schema.add_column(grouped).is_err());

        let grouped = Column::with_options("y", 1, vec![("group".into(), "meta".into())]).unwrap();
        schema.add_column(grouped).unwrap();
        let err = schema.add_column(Column::new("meta", 1).unwrap()).unwrap_err();
        assert!(err.to_string().contains("a group"));
    }

    #[test]
    fn test_reserved_spacer_name() {
        let mut schema = Schema::new("s").unwrap();
        assert!(schema.add_column(Column::new("spacer", 2).unwrap()).is_err());
        assert!(schema.add_schema(Schema::new("spacer").unwrap()).is_err());
        schema.add_spacer(2, None).unwrap().add_spacer(3, Some('-')).unwrap();
        assert_eq!(schema.fields().len(), 2);
    }

    // ── Parse / Format ──

    #[test]
    fn test_parse_two_columns() {
        let schema = two_columns();
        let parsed = schema.parse(&Scope::standalone(), "ABCDEFG").unwrap();
        assert_eq!(
            parsed,
            record(&[("colA", "ABC".into()), ("colB", "DEFG".into())])
        );
    }

    #[test]
    fn test_parse_skips_spacers_and_fills_groups() {
        let mut schema = Schema::new("row").unwrap();
        schema
            .add_column(Column::new("kind", 1).unwrap())
            .unwrap()
            .add_spacer(2, None)
            .unwrap()
            .add_column(Column::with_options("date", 4, vec![("group".into(), "meta".into())]).unwrap())
            .unwrap();
        let parsed = schema.parse(&Scope::standalone(), "H  2024").unwrap();
        assert_eq!(
            parsed,
            record(&[
                ("kind", "H".into()),
                ("meta", record(&[("date", "2024".into())])),
            ])
        );
        assert_eq!(schema.format(&Scope::standalone(), &parsed).unwrap(), "H  2024");
    }

    #[test]
    fn test_nested_schema_advances_cursor() {
        let mut inner = Schema::new("inner").unwrap();
        inner.add_column(Column::new("a", 2).unwrap()).unwrap();
        let mut outer = Schema::new("outer").unwrap();
        outer
            .add_schema(inner)
            .unwrap()
            .add_column(Column::new("b", 3).unwrap())
            .unwrap();
        let parsed = outer.parse(&Scope::standalone(), "xxyyy").unwrap();
        assert_eq!(
            parsed,
            record(&[("inner", record(&[("a", "xx".into())])), ("b", "yyy".into())])
        );
    }

    #[test]
    fn test_reference_resolves_sibling_nested_schema() {
        let mut money = Schema::new("money").unwrap();
        money.add_column(Column::new("cents", 4).unwrap()).unwrap();
        let mut outer = Schema::new("invoice").unwrap();
        outer
            .add_schema(money)
            .unwrap()
            .add_reference(Reference::new("money").stored_as("total").with_option("padding", "0").unwrap())
            .unwrap();
        let scope = Scope::standalone();
        assert_eq!(outer.length(&scope).unwrap(), 8);
        let data = record(&[
            ("money", record(&[("cents", Value::Integer(5))])),
            ("total", record(&[("cents", Value::Integer(42))])),
        ]);
        assert_eq!(outer.format(&scope, &data).unwrap(), "   50042");
    }

    #[test]
    fn test_unresolved_reference_fails_lazily() {
        let mut schema = Schema::new("s").unwrap();
        schema.add_reference(Reference::new("ghost")).unwrap();
        match schema.length(&Scope::standalone()).unwrap_err() {
            Error::UnresolvedReference { names } => assert_eq!(names, vec!["ghost".to_string()]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_format_missing_column_value() {
        let schema = two_columns();
        let err = schema
            .format(&Scope::standalone(), &record(&[("colA", "abc".into())]))
            .unwrap_err();
        assert!(err.to_string().contains("pair::colB"));
    }

    #[test]
    fn test_format_missing_nil_blank_column_is_padding() {
        let mut schema = Schema::new("s").unwrap();
        schema
            .add_column(Column::with_options("opt", 3, vec![("nil_blank".into(), true.into())]).unwrap())
            .unwrap();
        assert_eq!(schema.format(&Scope::standalone(), &record(&[])).unwrap(), "   ");
    }

    #[test]
    fn test_schema_options_flow_to_columns() {
        let mut schema =
            Schema::with_options("s", vec![("padding".into(), "0".into())]).unwrap();
        schema
            .add_column(Column::new("n", 3).unwrap())
            .unwrap()
            .add_column(Column::with_options("m", 3, vec![("padding".into(), "x".into())]).unwrap())
            .unwrap();
        let data = record(&[("n", Value::Integer(7)), ("m", Value::Integer(8))]);
        assert_eq!(schema.format(&Scope::standalone(), &data).unwrap(), "007xx8");
    }

    #[test]
    fn test_unknown_schema_option_rejected() {
        let err = Schema::with_options("s", vec![("colour".into(), "red".into())]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
