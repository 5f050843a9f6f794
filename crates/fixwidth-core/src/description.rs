//! Description documents: definitions written as JSON
//!
//! A description is a serde document that is lowered onto the builder
//! operations (`add_column`, `add_spacer`, `add_schema`, `add_reference`,
//! `add_section`), so every check the builder makes applies to documents too.
//!
//! ```json
//! {
//!   "options": { "nil_blank": true },
//!   "schemas": [
//!     { "name": "header", "singular": true, "trap": { "starts_with": "H" },
//!       "fields": [
//!         { "column": "kind", "length": 1 },
//!         { "spacer": 2 },
//!         { "column": "date", "length": 8, "group": "meta" },
//!         { "reference": "amount", "schema": "money", "options": { "padding": "0" } }
//!       ] }
//!   ],
//!   "sections": [
//!     { "name": "file", "children": [ { "schema": "header" } ] }
//!   ]
//! }
//! ```
//!
//! Field entries are told apart by their key: `column`, `spacer`,
//! `reference`, or `schema` (an inline nested schema with its own `fields`).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::column::Column;
use crate::definition::Definition;
use crate::options::{Alignment, OptionValue, Trap};
use crate::schema::{Reference, Schema};
use crate::section::{SchemaRef, Section};
use crate::{Error, Result};

// ── Documents ─────────────────────────────────────────────

/// Loose option values: booleans, integers and text. Text is normalized by
/// the option's transform (`"left"` to an alignment, `"0"` to a character,
/// `"integer"` to a converter).
pub type OptionsDoc = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionDoc {
    #[serde(default)]
    pub options: OptionsDoc,
    #[serde(default)]
    pub schemas: Vec<SchemaDoc>,
    #[serde(default)]
    pub sections: Vec<SectionDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    /// `name` at top level, `schema` when nested inline
    #[serde(alias = "schema")]
    pub name: String,
    pub optional: Option<bool>,
    pub singular: Option<bool>,
    pub trap: Option<TrapDoc>,
    /// Column defaults for every column in this schema
    #[serde(default)]
    pub options: OptionsDoc,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDoc {
    Reference(ReferenceDoc),
    Column(ColumnDoc),
    Spacer(SpacerDoc),
    Schema(SchemaDoc),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDoc {
    pub column: String,
    pub length: usize,
    pub align: Option<Alignment>,
    pub padding: Option<char>,
    pub truncate: Option<bool>,
    pub nil_blank: Option<bool>,
    /// Converter name, see [`crate::convert::names`]
    pub parser: Option<String>,
    pub formatter: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpacerDoc {
    pub spacer: usize,
    pub padding: Option<char>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceDoc {
    /// Key the decoded record is stored under
    pub reference: String,
    /// Name of the schema referred to
    pub schema: String,
    #[serde(default)]
    pub options: OptionsDoc,
}

/// Declarative trap predicate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum TrapDoc {
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Regex(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionDoc {
    pub name: Option<String>,
    pub ordered: Option<bool>,
    pub repeat: Option<bool>,
    pub optional: Option<bool>,
    pub singular: Option<bool>,
    #[serde(default)]
    pub children: Vec<ChildDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChildDoc {
    Schema(LeafDoc),
    Section(NestedDoc),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafDoc {
    pub schema: String,
    pub optional: Option<bool>,
    pub singular: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestedDoc {
    pub section: SectionDoc,
}

// ── Loading ───────────────────────────────────────────────

/// Build a definition from JSON text
pub fn load_str(text: &str) -> Result<Definition> {
    let doc: DefinitionDoc = serde_json::from_str(text)
        .map_err(|e| Error::config(format!("Invalid definition document: {}", e)))?;
    doc.lower()
}

/// Build a definition from a JSON reader
pub fn load_reader<R: Read>(reader: R) -> Result<Definition> {
    let doc: DefinitionDoc = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Invalid definition document: {}", e)))?;
    doc.lower()
}

/// Build a definition from a JSON file
pub fn load_path(path: impl AsRef<Path>) -> Result<Definition> {
    let file = std::fs::File::open(path.as_ref())?;
    load_reader(std::io::BufReader::new(file))
}

// ── Lowering ──────────────────────────────────────────────

impl DefinitionDoc {
    /// Lower onto the builder operations
    pub fn lower(self) -> Result<Definition> {
        let mut definition = Definition::with_options(option_pairs(self.options)?)?;
        for schema in self.schemas {
            definition.add_schema(schema.lower()?)?;
        }
        for section in self.sections {
            definition.add_section(section.lower()?)?;
        }
        debug!(
            schemas = definition.schemas().len(),
            sections = definition.sections().len(),
            "definition loaded"
        );
        Ok(definition)
    }
}

impl SchemaDoc {
    pub fn lower(self) -> Result<Schema> {
        let mut pairs = option_pairs(self.options)?;
        push_flag(&mut pairs, "optional", self.optional);
        push_flag(&mut pairs, "singular", self.singular);
        let mut schema = Schema::with_options(&self.name, pairs)?;
        if let Some(trap) = self.trap {
            schema.set_trap(trap.lower()?)?;
        }
        for field in self.fields {
            match field {
                FieldDoc::Column(column) => schema.add_column(column.lower()?)?,
                FieldDoc::Spacer(spacer) => schema.add_spacer(spacer.spacer, spacer.padding)?,
                FieldDoc::Schema(nested) => schema.add_schema(nested.lower()?)?,
                FieldDoc::Reference(reference) => schema.add_reference(reference.lower()?)?,
            };
        }
        Ok(schema)
    }
}

impl ColumnDoc {
    pub fn lower(self) -> Result<Column> {
        let mut pairs: Vec<(String, OptionValue)> = Vec::new();
        if let Some(align) = self.align {
            pairs.push(("align".into(), align.into()));
        }
        if let Some(padding) = self.padding {
            pairs.push(("padding".into(), padding.into()));
        }
        push_flag(&mut pairs, "truncate", self.truncate);
        push_flag(&mut pairs, "nil_blank", self.nil_blank);
        for (key, value) in [
            ("parser", self.parser),
            ("formatter", self.formatter),
            ("group", self.group),
        ] {
            if let Some(value) = value {
                pairs.push((key.into(), value.into()));
            }
        }
        Column::with_options(&self.column, self.length, pairs)
    }
}

impl ReferenceDoc {
    pub fn lower(self) -> Result<Reference> {
        let mut reference = Reference::new(&self.schema).stored_as(&self.reference);
        for (key, value) in option_pairs(self.options)? {
            reference = reference.with_option(&key, value)?;
        }
        Ok(reference)
    }
}

impl TrapDoc {
    pub fn lower(self) -> Result<Trap> {
        let trap = match self {
            TrapDoc::StartsWith(prefix) => {
                Trap::new(&format!("starts_with:{}", prefix), move |line| line.starts_with(prefix.as_str()))
            }
            TrapDoc::EndsWith(suffix) => {
                Trap::new(&format!("ends_with:{}", suffix), move |line| line.ends_with(suffix.as_str()))
            }
            TrapDoc::Contains(needle) => {
                Trap::new(&format!("contains:{}", needle), move |line| line.contains(needle.as_str()))
            }
            TrapDoc::Regex(pattern) => {
                let regex = Regex::new(&pattern)
                    .map_err(|e| Error::config(format!("Invalid trap regex {:?}: {}", pattern, e)))?;
                Trap::new(&format!("regex:{}", pattern), move |line| regex.is_match(line))
            }
        };
        Ok(trap)
    }
}

impl SectionDoc {
    pub fn lower(self) -> Result<Section> {
        let mut pairs = Vec::new();
        push_flag(&mut pairs, "ordered", self.ordered);
        push_flag(&mut pairs, "repeat", self.repeat);
        push_flag(&mut pairs, "optional", self.optional);
        push_flag(&mut pairs, "singular", self.singular);
        if let Some(name) = self.name {
            pairs.push(("name".into(), name.into()));
        }
        let mut section = Section::with_options(pairs)?;
        for child in self.children {
            match child {
                ChildDoc::Schema(leaf) => {
                    let mut schema_ref = SchemaRef::new(&leaf.schema);
                    if let Some(optional) = leaf.optional {
                        schema_ref = schema_ref.optional(optional);
                    }
                    if let Some(singular) = leaf.singular {
                        schema_ref = schema_ref.singular(singular);
                    }
                    section.add_schema(schema_ref);
                }
                ChildDoc::Section(nested) => {
                    section.add_section(nested.section.lower()?);
                }
            }
        }
        Ok(section)
    }
}

fn push_flag(pairs: &mut Vec<(String, OptionValue)>, key: &str, flag: Option<bool>) {
    if let Some(flag) = flag {
        pairs.push((key.to_string(), flag.into()));
    }
}

fn option_pairs(options: OptionsDoc) -> Result<Vec<(String, OptionValue)>> {
    options
        .into_iter()
        .map(|(key, json)| {
            let value = option_value(&key, &json)?;
            Ok((key, value))
        })
        .collect()
}

fn option_value(key: &str, json: &serde_json::Value) -> Result<OptionValue> {
    match json {
        serde_json::Value::Bool(b) => Ok(OptionValue::Bool(*b)),
        serde_json::Value::String(s) => Ok(OptionValue::Text(s.clone())),
        serde_json::Value::Number(n) => n.as_i64().map(OptionValue::Int).ok_or_else(|| {
            Error::config(format!("Option :{} must be an integer, got {}", key, n))
        }),
        other => Err(Error::config(format!(
            "Option :{} must be a boolean, integer or string, got {}",
            key, other
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{self, stream::StrSource, ParseOptions};
    use crate::value::Value;

    const DOCUMENT: &str = r#"{
        "options": { "align": "right" },
        "schemas": [
            { "name": "money", "fields": [
                { "column": "cents", "length": 6, "parser": "integer" }
            ] },
            { "name": "header", "singular": true, "trap": { "starts_with": "H" }, "fields": [
                { "column": "kind", "length": 1 },
                { "spacer": 1 },
                { "column": "date", "length": 8, "group": "meta" }
            ] },
            { "name": "row", "trap": { "regex": "^R\\d" }, "fields": [
                { "column": "kind", "length": 1 },
                { "column": "id", "length": 1, "parser": "integer" },
                { "reference": "amount", "schema": "money", "options": { "padding": "0" } },
                { "schema": "flags", "fields": [ { "column": "a", "length": 1, "align": "left" } ] }
            ] }
        ],
        "sections": [
            { "name": "file", "children": [
                { "schema": "header" },
                { "section": { "ordered": false, "children": [ { "schema": "row" } ] } }
            ] }
        ]
    }"#;

    #[test]
    fn test_load_and_parse() {
        let def = load_str(DOCUMENT).unwrap();
        def.validate().unwrap();
        assert_eq!(def.length("header").unwrap(), 10);
        assert_eq!(def.length("row").unwrap(), 9);

        let input = "H 20240101\nR1000042Y";
        let out = parser::parse(&def, StrSource::new(input), &ParseOptions::default().section("file")).unwrap();
        let json = out.to_json();
        assert_eq!(json["header"]["meta"]["date"], "20240101");
        assert_eq!(json["row"][0]["id"], 1);
        assert_eq!(json["row"][0]["amount"]["cents"], 42);
        assert_eq!(json["row"][0]["flags"]["a"], "Y");
    }

    #[test]
    fn test_reference_override_formats() {
        let def = load_str(DOCUMENT).unwrap();
        let row = def.schema("row").unwrap();
        let data = Value::from_json(&serde_json::json!({
            "kind": "R", "id": 2, "amount": {"cents": 7}, "flags": {"a": "N"}
        }));
        assert_eq!(row.format(&def.scope(), &data).unwrap(), "R2000007N");
    }

    #[test]
    fn test_traps() {
        let line = "HEADER";
        assert!(TrapDoc::StartsWith("HE".into()).lower().unwrap().call(line));
        assert!(TrapDoc::EndsWith("ER".into()).lower().unwrap().call(line));
        assert!(!TrapDoc::Contains("xyz".into()).lower().unwrap().call(line));
        assert!(TrapDoc::Regex("^H.*R$".into()).lower().unwrap().call(line));
        assert!(matches!(
            TrapDoc::Regex("(".into()).lower().unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(load_str("{").is_err());
        assert!(load_str(r#"{"bogus": 1}"#).is_err());
        let long_padding = r#"{"schemas": [{"name": "a", "fields": [
            {"column": "x", "length": 2, "padding": "ab"}
        ]}]}"#;
        assert!(load_str(long_padding).is_err());
        let unknown_converter = r#"{"schemas": [{"name": "a", "fields": [
            {"column": "x", "length": 2, "parser": "roman"}
        ]}]}"#;
        assert!(matches!(load_str(unknown_converter).unwrap_err(), Error::Configuration(_)));
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let doc = r#"{"schemas": [{"name": "a", "fields": [
            {"column": "x", "length": 1},
            {"column": "x", "length": 1}
        ]}]}"#;
        assert!(matches!(load_str(doc).unwrap_err(), Error::SchemaStructure(_)));
    }

    #[test]
    fn test_load_reader() {
        let def = load_reader(DOCUMENT.as_bytes()).unwrap();
        assert_eq!(def.schemas().len(), 3);
        assert_eq!(def.sections().len(), 1);
    }
}
