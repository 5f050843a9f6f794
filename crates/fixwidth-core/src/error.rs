//! Error types for fixwidth
//!
//! All fallible operations return `Result<T, Error>`.
//! Every variant names the offending option, schema or column, and the
//! parse-time variants carry an excerpt of the input line involved.

use std::fmt;

use thiserror::Error;

/// Longest input excerpt quoted in an error message
const EXCERPT_CHARS: usize = 60;

/// A line of input quoted in an error, with its 1-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineExcerpt {
    pub number: usize,
    pub text: String,
}

impl LineExcerpt {
    pub fn new(number: usize, text: &str) -> Self {
        LineExcerpt {
            number,
            text: text.to_string(),
        }
    }
}

impl fmt::Display for LineExcerpt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shown: String = self.text.chars().take(EXCERPT_CHARS).collect();
        if shown.len() < self.text.len() {
            write!(f, "line {}: '{}...'", self.number, shown)
        } else {
            write!(f, "line {}: '{}'", self.number, shown)
        }
    }
}

/// fixwidth error types
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid option definition, failed validator or missing required option
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Duplicate or reserved name inside a schema, definition or section
    #[error("Schema structure error: {0}")]
    SchemaStructure(String),

    /// Named schema references that could not be resolved
    #[error("Unresolved schema references: {}", .names.join(", "))]
    UnresolvedReference { names: Vec<String> },

    /// A column could not decode its slice of the line
    #[error("Parse error in {schema}::{column}: the value '{value}' could not be parsed: {cause}")]
    Parse {
        schema: String,
        column: String,
        value: String,
        cause: String,
    },

    /// A required schema or section could not be matched
    #[error("Missing required schema {}: {}", .schemas.join(", "), describe_line(.line))]
    MissingRequiredSchema {
        schemas: Vec<String>,
        line: Option<LineExcerpt>,
    },

    /// A singular schema matched more than once
    #[error("Singular schema '{schema}' matched again at {line}")]
    DuplicateSingularOutput { schema: String, line: LineExcerpt },

    /// Input left over after the section tree was fully consumed
    #[error("Unused input at {line}")]
    UnusedInput { line: LineExcerpt },

    /// A value could not be formatted into its fixed width
    #[error("Format error in '{target}': {message}")]
    Format { target: String, message: String },

    /// A required schema has no records to format
    #[error("Required schema '{schema}' was empty; mark it optional if this is expected")]
    RequiredSchemaEmpty { schema: String },

    /// Underlying reader or writer failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_line(line: &Option<LineExcerpt>) -> String {
    match line {
        Some(excerpt) => format!("match broke at {}", excerpt),
        None => "input ended".to_string(),
    }
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Error::SchemaStructure(message.into())
    }

    pub(crate) fn format(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Format {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for fixwidth operations
pub type Result<T> = std::result::Result<T, Error>;
