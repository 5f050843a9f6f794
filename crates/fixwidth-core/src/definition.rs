//! Definition: the registry every reference grounds out in
//!
//! A definition owns named schemas (in declaration order) and named sections.
//! It is built once through `&mut` builder calls and then shared immutably;
//! it is `Send + Sync`.
//!
//! Definition-level options are defaults for every schema (`optional`,
//! `singular`) and every column (`padding`, `align`, ...). They are held
//! pending and adopted wherever a schema or column does not set them itself.

use crate::column;
use crate::options::{OptionSet, OptionValue};
use crate::schema::{Schema, Scope};
use crate::section::Section;
use crate::verifier::{self, VerificationResult};
use crate::{Error, Result};

/// Schema options a definition may set for all of its schemas
const SCHEMA_DEFAULTS: [&str; 2] = ["optional", "singular"];

#[derive(Debug, Clone, Default)]
pub struct Definition {
    options: OptionSet,
    schemas: Vec<Schema>,
    sections: Vec<Section>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(pairs: Vec<(String, OptionValue)>) -> Result<Self> {
        let mut options = OptionSet::new();
        for (key, value) in pairs {
            if !SCHEMA_DEFAULTS.contains(&key.as_str())
                && !column::OPTION_NAMES.contains(&key.as_str())
            {
                return Err(Error::config(format!(
                    "Unknown option :{} for definition",
                    key
                )));
            }
            options.set_or_pend(&key, value)?;
        }
        Ok(Definition {
            options,
            schemas: Vec::new(),
            sections: Vec::new(),
        })
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Register a top-level schema; its options are merged with the definition's
    pub fn add_schema(&mut self, mut schema: Schema) -> Result<&mut Self> {
        if self.schema(schema.name()).is_some() {
            return Err(Error::structure(format!(
                "A schema named '{}' is already defined",
                schema.name()
            )));
        }
        schema.inherit(&self.options)?;
        self.clear_memos();
        self.schemas.push(schema);
        Ok(self)
    }

    /// Register a named top-level section
    pub fn add_section(&mut self, section: Section) -> Result<&mut Self> {
        let name = section
            .name()
            .ok_or_else(|| Error::structure("Top-level sections must be named"))?;
        if self.section(name).is_some() {
            return Err(Error::structure(format!(
                "A section named '{}' is already defined",
                name
            )));
        }
        self.sections.push(section);
        Ok(self)
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    /// Mutable access to a registered schema. Every cached length is dropped.
    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.clear_memos();
        self.schemas.iter_mut().find(|s| s.name() == name)
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == Some(name))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Root resolution scope
    pub fn scope(&self) -> Scope<'_> {
        Scope::root(self)
    }

    /// Width of a registered schema
    pub fn length(&self, name: &str) -> Result<usize> {
        let schema = self.schema(name).ok_or_else(|| Error::UnresolvedReference {
            names: vec![name.to_string()],
        })?;
        schema.length(&self.scope())
    }

    /// Every unresolved reference and structural problem in the registry
    pub fn errors(&self) -> VerificationResult {
        verifier::verify_definition(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.errors().into_result()
    }

    fn clear_memos(&mut self) {
        for schema in &mut self.schemas {
            schema.clear_memos();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::schema::Reference;
    use crate::value::Value;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_definition_is_send_sync() {
        assert_send_sync::<Definition>();
    }

    #[test]
    fn test_duplicate_schema_rejected() {
        let mut def = Definition::new();
        def.add_schema(Schema::new("a").unwrap()).unwrap();
        let err = def.add_schema(Schema::new("a").unwrap()).unwrap_err();
        assert!(matches!(err, Error::SchemaStructure(_)));
    }

    #[test]
    fn test_sections_must_be_named_and_unique() {
        let mut def = Definition::new();
        assert!(def.add_section(Section::sequence().unwrap()).is_err());
        let mut named = Section::sequence().unwrap();
        named.set_name("file").unwrap();
        def.add_section(named.clone()).unwrap();
        assert!(def.add_section(named).is_err());
        assert!(def.section("file").is_some());
    }

    #[test]
    fn test_definition_options_flow_into_columns() {
        let mut def =
            Definition::with_options(vec![("padding".into(), "0".into())]).unwrap();
        let mut schema = Schema::new("amount").unwrap();
        schema.add_column(Column::new("cents", 5).unwrap()).unwrap();
        def.add_schema(schema).unwrap();

        let data = Value::from_json(&serde_json::json!({"cents": 42}));
        let line = def
            .schema("amount")
            .unwrap()
            .format(&def.scope(), &data)
            .unwrap();
        assert_eq!(line, "00042");
    }

    #[test]
    fn test_definition_schema_defaults() {
        let mut def =
            Definition::with_options(vec![("singular".into(), true.into())]).unwrap();
        def.add_schema(Schema::new("a").unwrap()).unwrap();
        let mut explicit = Schema::new("b").unwrap();
        explicit.set_singular(false).unwrap();
        def.add_schema(explicit).unwrap();
        assert!(def.schema("a").unwrap().is_singular());
        assert!(!def.schema("b").unwrap().is_singular());
    }

    #[test]
    fn test_unknown_definition_option() {
        assert!(Definition::with_options(vec![("trap".into(), "x".into())]).is_err());
    }

    #[test]
    fn test_length_through_forward_reference() {
        let mut def = Definition::new();
        let mut row = Schema::new("row").unwrap();
        row.add_column(Column::new("id", 2).unwrap())
            .unwrap()
            .add_reference(Reference::new("money"))
            .unwrap();
        def.add_schema(row).unwrap();
        assert!(def.length("row").is_err());

        let mut money = Schema::new("money").unwrap();
        money.add_column(Column::new("cents", 6).unwrap()).unwrap();
        def.add_schema(money).unwrap();
        assert_eq!(def.length("row").unwrap(), 8);
    }

    #[test]
    fn test_schema_mut_invalidates_lengths() {
        let mut def = Definition::new();
        let mut money = Schema::new("money").unwrap();
        money.add_column(Column::new("cents", 6).unwrap()).unwrap();
        let mut row = Schema::new("row").unwrap();
        row.add_reference(Reference::new("money")).unwrap();
        def.add_schema(money).unwrap();
        def.add_schema(row).unwrap();
        assert_eq!(def.length("row").unwrap(), 6);

        def.schema_mut("money")
            .unwrap()
            .add_column(Column::new("currency", 3).unwrap())
            .unwrap();
        assert_eq!(def.length("row").unwrap(), 9);
    }
}
