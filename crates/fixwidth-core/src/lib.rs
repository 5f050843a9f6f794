//! fixwidth core - declarative fixed-width record layouts
//!
//! A [`Definition`] declares record kinds ([`Schema`]s of [`Column`]s) and how
//! they are arranged in a file ([`Section`]s). The same definition drives both
//! directions: parsing text into a [`Value`] tree and generating text from one.
//!
//! # Architecture
//!
//! ```text
//! Description (JSON) ──lower──→ Definition ←── builder calls
//!                                   │
//!            ┌──────────────────────┼──────────────────────┐
//!            ↓                      ↓                      ↓
//!        Verifier           Parser (sections,         Generator
//!   (unresolved names,       backtracking over       (Value → lines)
//!    shadowing, cycles)      a LineStream)
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: the same definition and input always produce the same output
//! - **Exact width**: every formatted line is exactly its schema's length, or an error
//! - **Lazy**: input lines are pulled one at a time and released once no
//!   speculative attempt can rewind to them
//! - **Shareable**: a built definition is immutable and `Send + Sync`

pub mod column;
pub mod convert;
pub mod definition;
pub mod description;
pub mod error;
pub mod generator;
pub mod options;
pub mod parser;
pub mod schema;
pub mod section;
pub mod value;
pub mod verifier;

use std::io::{BufRead, Seek};

pub use column::Column;
pub use definition::Definition;
pub use error::{Error, LineExcerpt, Result};
pub use options::{Alignment, MergePolicy, OptionSet, OptionValue};
pub use parser::stream::{LineSource, ReaderSource, StrSource};
pub use parser::ParseOptions;
pub use schema::{Reference, Schema};
pub use section::{SchemaRef, Section};
pub use value::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Whether a string is empty or whitespace only
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Parse in-memory text
pub fn parse_str(definition: &Definition, text: &str, options: &ParseOptions) -> Result<Value> {
    parser::parse(definition, StrSource::new(text), options)
}

/// Parse from a seekable reader such as an open file
pub fn parse_reader<R: BufRead + Seek>(
    definition: &Definition,
    reader: R,
    options: &ParseOptions,
) -> Result<Value> {
    parser::parse(definition, ReaderSource::new(reader)?, options)
}

/// Format a value tree into lines joined by `"\n"`
pub fn generate(definition: &Definition, data: &Value, section: Option<&str>) -> Result<String> {
    generator::generate(definition, data, section)
}

/// Format a value tree into a writer
pub fn write<W: std::io::Write>(
    writer: &mut W,
    definition: &Definition,
    data: &Value,
    section: Option<&str>,
) -> Result<()> {
    generator::write(writer, definition, data, section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn definition() -> Definition {
        let mut def = Definition::new();
        let mut row = Schema::new("row").unwrap();
        row.add_column(Column::new("id", 3).unwrap())
            .unwrap()
            .add_spacer(1, None)
            .unwrap()
            .add_column(Column::with_options("name", 6, vec![("align".into(), "left".into())]).unwrap())
            .unwrap();
        def.add_schema(row).unwrap();
        def
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t "));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_parse_str_and_reader_agree() {
        let def = definition();
        let text = "  1 alice \n  2 bob   \n";
        let options = ParseOptions::default();
        let from_str = parse_str(&def, text, &options).unwrap();
        let from_reader = parse_reader(&def, Cursor::new(text), &options).unwrap();
        assert_eq!(from_str, from_reader);
        assert_eq!(from_str.to_json()["row"][1]["name"], "bob");
    }

    #[test]
    fn test_generate_then_parse() {
        let def = definition();
        let text = "  1 alice \n  2 bob   ";
        let parsed = parse_str(&def, text, &ParseOptions::default()).unwrap();
        assert_eq!(generate(&def, &parsed, None).unwrap(), text);

        let mut out = Vec::new();
        write(&mut out, &def, &parsed, None).unwrap();
        assert_eq!(out, text.as_bytes());
    }

    #[test]
    fn test_determinism_100_iterations() {
        let def = definition();
        let text = "  1 alice \n  2 bob   ";
        let first = parse_str(&def, text, &ParseOptions::default()).unwrap();
        for i in 0..100 {
            let again = parse_str(&def, text, &ParseOptions::default()).unwrap();
            assert_eq!(first, again, "Non-determinism at iteration {}", i);
        }
    }
}
