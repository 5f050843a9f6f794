//! Generator: formats a value tree back into fixed-width text
//!
//! The generator is the inverse of the parsing engine. It walks the same
//! section tree (or the implicit sequence of every schema) and formats the
//! records it finds under each schema name.
//!
//! # Guarantees
//!
//! - **Deterministic**: records are emitted in section order, then in list order
//! - **Exact width**: every emitted line is exactly its schema's length
//! - **Complete**: a required schema with no records is an error, never a
//!   silently shorter file

use std::io::Write;

use tracing::{debug, info};

use crate::definition::Definition;
use crate::section::{Section, SectionChild};
use crate::value::Value;
use crate::{Error, Result};

// ── Public API ─────────────────────────────────────────────

/// Format `data` into lines joined by `"\n"`
///
/// `section` selects a named top-level section; without one, every schema of
/// the definition is emitted in declaration order. Records are looked up by
/// schema name, and a named nested section by its name, mirroring the shape
/// [`crate::parser::parse`] produces.
///
/// # Errors
/// `RequiredSchemaEmpty` when a required schema has no records, `Format` when
/// a record does not fit its layout.
pub fn generate(definition: &Definition, data: &Value, section: Option<&str>) -> Result<String> {
    let section = match section {
        Some(name) => definition
            .section(name)
            .ok_or_else(|| Error::UnresolvedReference {
                names: vec![name.to_string()],
            })?
            .anonymous(),
        None => Section::implicit(definition)?,
    };
    section.validate(definition)?;

    let mut lines = Vec::new();
    emit(definition, &section, data, false, &mut lines)?;
    info!(lines = lines.len(), "generate complete");
    Ok(lines.join("\n"))
}

/// Write the generated text to `writer`
pub fn write<W: Write>(
    writer: &mut W,
    definition: &Definition,
    data: &Value,
    section: Option<&str>,
) -> Result<()> {
    let text = generate(definition, data, section)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

// ── Tree walk ──────────────────────────────────────────────

/// Emit the records of one section node. `optional` is true inside an
/// optional ancestor, where a missing record is skipped instead of reported.
fn emit(
    definition: &Definition,
    section: &Section,
    data: &Value,
    optional: bool,
    lines: &mut Vec<String>,
) -> Result<()> {
    let optional = optional || section.is_optional();
    let scope = definition.scope();

    for child in section.children() {
        match child {
            SectionChild::Schema(leaf) => {
                let schema = definition.schema(leaf.target()).ok_or_else(|| {
                    Error::UnresolvedReference {
                        names: vec![leaf.target().to_string()],
                    }
                })?;
                let records = records(data.get(schema.name()), leaf.is_singular(schema));
                if records.is_empty() {
                    if optional || leaf.is_optional(schema) {
                        continue;
                    }
                    return Err(Error::RequiredSchemaEmpty {
                        schema: schema.name().to_string(),
                    });
                }
                for record in records {
                    lines.push(schema.format(&scope, record)?);
                }
                debug!(schema = schema.name(), total = lines.len(), "formatted records");
            }
            SectionChild::Section(nested) => match nested.name() {
                None => emit(definition, nested, data, optional, lines)?,
                Some(name) => {
                    let groups = records(data.get(name), false);
                    if groups.is_empty()
                        && !(optional || nested.is_optional())
                        && requires_records(definition, nested)
                    {
                        return Err(Error::RequiredSchemaEmpty {
                            schema: name.to_string(),
                        });
                    }
                    for group in groups {
                        emit(definition, nested, group, optional, lines)?;
                    }
                }
            },
        }
    }
    Ok(())
}

/// Whether a section emits nothing valid without data. A parse leaves no key
/// for a named section that took no lines, so one whose children are all
/// optional may be absent.
fn requires_records(definition: &Definition, section: &Section) -> bool {
    let mut scratch = Vec::new();
    emit(definition, section, &Value::Null, false, &mut scratch).is_err()
}

/// Records stored under one key: a single value when singular, else a list
/// (a lone mapping is treated as a one-element list)
fn records(value: Option<&Value>, singular: bool) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) if !singular => items.iter().collect(),
        Some(other) => vec![other],
    }
}

// ── Tests ──────────────────────────────────────────────────
