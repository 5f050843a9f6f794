//! Section composition tree
//!
//! A section arranges schema references at file scope. A `Sequence` matches
//! its children in declared order; a `Set` accepts them in any order. Leaves
//! may override the target schema's `optional` and `singular` flags; nested
//! sections may be optional, repeat, and collect their output under a name.

use once_cell::sync::Lazy;

use crate::definition::Definition;
use crate::options::{self, OptionSet, OptionSpec, OptionValue};
use crate::schema::Schema;
use crate::verifier::{self, VerificationResult};
use crate::{Error, Result};

static CATALOG: Lazy<std::result::Result<OptionSet, String>> = Lazy::new(|| {
    build_catalog().map_err(|e| e.to_string())
});

fn build_catalog() -> Result<OptionSet> {
    let mut set = OptionSet::new();
    set.define(OptionSpec::new("ordered").validate(options::boolean()).default_value(true))?;
    set.define(OptionSpec::new("repeat").validate(options::boolean()).default_value(false))?;
    set.define(OptionSpec::new("optional").validate(options::boolean()).default_value(false))?;
    set.define(OptionSpec::new("singular").validate(options::boolean()).default_value(true))?;
    set.define(OptionSpec::new("name").validate(options::non_blank()))?;
    Ok(set)
}

/// Option catalog every section instance starts from
pub fn catalog() -> Result<&'static OptionSet> {
    CATALOG.as_ref().map_err(|e| Error::config(e.clone()))
}

/// Matching discipline of a section node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Sequence,
    Set,
}

/// Section settings extracted from a finalized option set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionConfig {
    pub ordered: bool,
    pub repeat: bool,
    pub optional: bool,
    /// A named, non-repeating section stores one mapping rather than a list
    pub singular: bool,
    pub name: Option<String>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        SectionConfig {
            ordered: true,
            repeat: false,
            optional: false,
            singular: true,
            name: None,
        }
    }
}

impl SectionConfig {
    pub fn from_options(set: &OptionSet) -> Result<Self> {
        let flag = |name: &str, fallback: bool| -> Result<bool> {
            Ok(set.get(name)?.and_then(OptionValue::as_bool).unwrap_or(fallback))
        };
        Ok(SectionConfig {
            ordered: flag("ordered", true)?,
            repeat: flag("repeat", false)?,
            optional: flag("optional", false)?,
            singular: flag("singular", true)?,
            name: set
                .get("name")?
                .and_then(OptionValue::as_text)
                .map(str::to_string),
        })
    }
}

/// Leaf of a section: a schema name plus local flag overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRef {
    target: String,
    optional: Option<bool>,
    singular: Option<bool>,
}

impl SchemaRef {
    pub fn new(target: &str) -> Self {
        SchemaRef {
            target: target.to_string(),
            optional: None,
            singular: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    pub fn singular(mut self, singular: bool) -> Self {
        self.singular = Some(singular);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn optional_override(&self) -> Option<bool> {
        self.optional
    }

    pub fn singular_override(&self) -> Option<bool> {
        self.singular
    }

    /// Effective optional flag: the override, else the schema's own
    pub fn is_optional(&self, schema: &Schema) -> bool {
        self.optional.unwrap_or_else(|| schema.is_optional())
    }

    /// Effective singular flag: the override, else the schema's own
    pub fn is_singular(&self, schema: &Schema) -> bool {
        self.singular.unwrap_or_else(|| schema.is_singular())
    }
}

#[derive(Debug, Clone)]
pub enum SectionChild {
    Section(Section),
    Schema(SchemaRef),
}

#[derive(Debug, Clone)]
pub struct Section {
    options: OptionSet,
    config: SectionConfig,
    children: Vec<SectionChild>,
}

impl Section {
    /// Ordered section with no children
    pub fn sequence() -> Result<Section> {
        Ok(Section {
            options: catalog()?.clone(),
            config: SectionConfig::default(),
            children: Vec::new(),
        })
    }

    /// Unordered section with no children
    pub fn set() -> Result<Section> {
        let mut section = Section::sequence()?;
        section.set_option("ordered", false)?;
        Ok(section)
    }

    pub fn with_options(pairs: Vec<(String, OptionValue)>) -> Result<Section> {
        let options = OptionSet::seeded(catalog()?, options::Seed::Pairs(pairs))?;
        if let Some(unknown) = options.pending_keys().first() {
            return Err(Error::config(format!("Unknown option :{} for section", unknown)));
        }
        let config = SectionConfig::from_options(&options)?;
        Ok(Section {
            options,
            config,
            children: Vec::new(),
        })
    }

    /// Implicit top-level sequence over every schema of a definition
    pub fn implicit(definition: &Definition) -> Result<Section> {
        let mut section = Section::sequence()?;
        for schema in definition.schemas() {
            section.add_schema(SchemaRef::new(schema.name()));
        }
        Ok(section)
    }

    /// Copy of this section that does not collect its output under a name
    pub fn anonymous(&self) -> Section {
        let mut section = self.clone();
        section.config.name = None;
        section
    }

    pub fn kind(&self) -> SectionKind {
        if self.config.ordered {
            SectionKind::Sequence
        } else {
            SectionKind::Set
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.config.name.as_deref()
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    pub fn is_optional(&self) -> bool {
        self.config.optional
    }

    pub fn is_repeat(&self) -> bool {
        self.config.repeat
    }

    /// Whether a named section's output is stored as a list
    pub fn collects_list(&self) -> bool {
        self.config.repeat || !self.config.singular
    }

    pub fn children(&self) -> &[SectionChild] {
        &self.children
    }

    // ── Builder ──

    pub fn set_name(&mut self, name: &str) -> Result<&mut Self> {
        self.set_option("name", name)
    }

    pub fn set_optional(&mut self, optional: bool) -> Result<&mut Self> {
        self.set_option("optional", optional)
    }

    pub fn set_repeat(&mut self, repeat: bool) -> Result<&mut Self> {
        self.set_option("repeat", repeat)
    }

    pub fn set_singular(&mut self, singular: bool) -> Result<&mut Self> {
        self.set_option("singular", singular)
    }

    fn set_option(&mut self, key: &str, value: impl Into<OptionValue>) -> Result<&mut Self> {
        self.options.set(key, value)?;
        self.config = SectionConfig::from_options(&self.options)?;
        Ok(self)
    }

    pub fn add_schema(&mut self, leaf: SchemaRef) -> &mut Self {
        self.children.push(SectionChild::Schema(leaf));
        self
    }

    pub fn add_section(&mut self, section: Section) -> &mut Self {
        self.children.push(SectionChild::Section(section));
        self
    }

    // ── Queries ──

    /// Target names of every leaf, depth first, in declaration order
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                SectionChild::Schema(leaf) => names.push(leaf.target()),
                SectionChild::Section(nested) => nested.collect_names(names),
            }
        }
    }

    pub fn errors(&self, definition: &Definition) -> VerificationResult {
        verifier::verify_section(self, definition)
    }

    /// Fail with every unresolved leaf name at once
    pub fn validate(&self, definition: &Definition) -> Result<()> {
        self.errors(definition).into_result()
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let seq = Section::sequence().unwrap();
        assert_eq!(seq.kind(), SectionKind::Sequence);
        assert!(!seq.is_optional());
        assert!(!seq.is_repeat());
        assert!(!seq.collects_list());
        assert_eq!(Section::set().unwrap().kind(), SectionKind::Set);
    }

    #[test]
    fn test_set_kind_survives_later_options() {
        let mut set = Section::set().unwrap();
        set.set_optional(true).unwrap().set_name("body").unwrap();
        assert_eq!(set.kind(), SectionKind::Set);
        assert!(!set.config().ordered);
        assert!(set.is_optional());
    }

    #[test]
    fn test_with_options() {
        let section = Section::with_options(vec![
            ("ordered".into(), false.into()),
            ("repeat".into(), true.into()),
            ("name".into(), "rows".into()),
        ])
        .unwrap();
        assert_eq!(section.kind(), SectionKind::Set);
        assert!(section.collects_list());
        assert_eq!(section.name(), Some("rows"));

        assert!(Section::with_options(vec![("bogus".into(), true.into())]).is_err());
        assert!(Section::with_options(vec![("repeat".into(), "yes".into())]).is_err());
    }

    #[test]
    fn test_anonymous_drops_name_only() {
        let mut named = Section::set().unwrap();
        named.set_name("rows").unwrap().set_repeat(true).unwrap();
        let plain = named.anonymous();
        assert_eq!(plain.name(), None);
        assert!(plain.is_repeat());
        assert_eq!(plain.kind(), SectionKind::Set);
    }

    #[test]
    fn test_schema_names_depth_first() {
        let mut inner = Section::set().unwrap();
        inner
            .add_schema(SchemaRef::new("detail"))
            .add_schema(SchemaRef::new("note"));
        let mut outer = Section::sequence().unwrap();
        outer
            .add_schema(SchemaRef::new("header"))
            .add_section(inner)
            .add_schema(SchemaRef::new("trailer"));
        assert_eq!(outer.schema_names(), vec!["header", "detail", "note", "trailer"]);
    }

    #[test]
    fn test_leaf_overrides() {
        let mut schema = Schema::new("row").unwrap();
        schema.set_singular(true).unwrap();
        let plain = SchemaRef::new("row");
        assert!(plain.is_singular(&schema));
        assert!(!plain.is_optional(&schema));
        let overridden = SchemaRef::new("row").singular(false).optional(true);
        assert!(!overridden.is_singular(&schema));
        assert!(overridden.is_optional(&schema));
    }

    #[test]
    fn test_validate_aggregates_unresolved() {
        let def = Definition::new();
        let mut section = Section::sequence().unwrap();
        section
            .add_schema(SchemaRef::new("a"))
            .add_schema(SchemaRef::new("b"));
        match section.validate(&def).unwrap_err() {
            Error::UnresolvedReference { names } => {
                assert_eq!(names, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
