//! Column: a single fixed-width slot
//!
//! A column decodes its slice of a line into a [`Value`] and encodes a value
//! back into exactly `length` characters. Lengths are counted in characters,
//! not bytes.
//!
//! # Options
//!
//! | option      | default | meaning                                     |
//! |-------------|---------|---------------------------------------------|
//! | `align`     | right   | side carrying the value (`left`/`right`/`none`) |
//! | `padding`   | `' '`   | fill character                               |
//! | `truncate`  | false   | cut over-long values instead of failing      |
//! | `nil_blank` | false   | decode a blank slice as null                 |
//! | `parser`    | none    | custom decoder (converter name or function)  |
//! | `formatter` | none    | custom encoder (converter name or function)  |
//! | `group`     | none    | bucket name inside the decoded record        |

use once_cell::sync::Lazy;

use crate::convert;
use crate::options::{
    self, Alignment, Formatter, MergePolicy, OptionKind, OptionSet, OptionSpec, OptionValue,
    Parser, Validator,
};
use crate::value::Value;
use crate::{is_blank, Error, Result};

/// Name shared by every spacer column
pub const SPACER: &str = "spacer";

/// Option names understood by columns
pub const OPTION_NAMES: [&str; 7] = [
    "align",
    "padding",
    "truncate",
    "nil_blank",
    "parser",
    "formatter",
    "group",
];

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
        OptionSpec::new("length")
            .validate(Validator::predicate("must be a positive integer", |v| {
                v.as_int().is_some_and(|n| n > 0)
            }))
            .required(),
    )?;
    set.define(
        OptionSpec::new("align")
            .transform(options::to_alignment)
            .validate(Validator::one_of([
                Alignment::Left.into(),
                Alignment::Right.into(),
                Alignment::None.into(),
            ]))
            .default_value(Alignment::Right),
    )?;
    set.define(
        OptionSpec::new("padding")
            .transform(options::to_char)
            .validate(Validator::Kind(OptionKind::Char))
            .default_value(' '),
    )?;
    set.define(
        OptionSpec::new("truncate")
            .validate(options::boolean())
            .default_value(false),
    )?;
    set.define(
        OptionSpec::new("nil_blank")
            .validate(options::boolean())
            .default_value(false),
    )?;
    set.define(
        OptionSpec::new("parser")
            .transform(convert::to_parser)
            .validate(Validator::Kind(OptionKind::Parser)),
    )?;
    set.define(
        OptionSpec::new("formatter")
            .transform(convert::to_formatter)
            .validate(Validator::Kind(OptionKind::Formatter)),
    )?;
    set.define(
        OptionSpec::new("group")
            .validate(options::non_blank()),
    )?;
    Ok(set)
}

/// Option catalog every column instance starts from
pub fn catalog() -> Result<&'static OptionSet> {
    CATALOG.as_ref().map_err(|e| Error::config(e.clone()))
}

// ── Typed configuration ───────────────────────────────────

/// Column settings extracted from a finalized option set
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    pub length: usize,
    pub align: Alignment,
    pub padding: char,
    pub truncate: bool,
    pub nil_blank: bool,
    pub parser: Option<Parser>,
    pub formatter: Option<Formatter>,
    pub group: Option<String>,
}

impl ColumnConfig {
    pub fn from_options(set: &OptionSet) -> Result<Self> {
        let name = set
            .get("name")?
            .and_then(OptionValue::as_text)
            .ok_or_else(|| Error::config("column has no name"))?
            .to_string();
        let length = set
            .get("length")?
            .and_then(OptionValue::as_int)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::config(format!("column '{}' has no length", name)))?;
        Ok(ColumnConfig {
            length,
            align: set
                .get("align")?
                .and_then(OptionValue::as_align)
                .unwrap_or(Alignment::Right),
            padding: set
                .get("padding")?
                .and_then(OptionValue::as_char)
                .unwrap_or(' '),
            truncate: flag(set, "truncate")?,
            nil_blank: flag(set, "nil_blank")?,
            parser: set.get("parser")?.and_then(OptionValue::as_parser).cloned(),
            formatter: set
                .get("formatter")?
                .and_then(OptionValue::as_formatter)
                .cloned(),
            group: set
                .get("group")?
                .and_then(OptionValue::as_text)
                .map(str::to_string),
            name,
        })
    }
}

fn flag(set: &OptionSet, name: &str) -> Result<bool> {
    Ok(set.get(name)?.and_then(OptionValue::as_bool).unwrap_or(false))
}

// ── Column ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Column {
    options: OptionSet,
    config: ColumnConfig,
}

impl Column {
    /// Column with default options
    pub fn new(name: &str, length: usize) -> Result<Column> {
        Column::with_options(name, length, Vec::new())
    }

    /// Column with explicit options; unknown option names are rejected
    pub fn with_options(
        name: &str,
        length: usize,
        pairs: Vec<(String, OptionValue)>,
    ) -> Result<Column> {
        let mut options = catalog()?.clone();
        options.set("name", name)?;
        options.set("length", length)?;
        for (key, value) in pairs {
            if !OPTION_NAMES.contains(&key.as_str()) {
                return Err(Error::config(format!(
                    "Unknown option :{} for column '{}'",
                    key, name
                )));
            }
            options.set(&key, value)?;
        }
        Column::from_options(options)
    }

    /// Padding-only column whose decoded value is discarded
    pub fn spacer(length: usize, padding: Option<char>) -> Result<Column> {
        let mut pairs = Vec::new();
        if let Some(pad) = padding {
            pairs.push(("padding".to_string(), OptionValue::Char(pad)));
        }
        Column::with_options(SPACER, length, pairs)
    }

    fn from_options(options: OptionSet) -> Result<Column> {
        options.finalize()?;
        let config = ColumnConfig::from_options(&options)?;
        Ok(Column { options, config })
    }

    /// Take the options this column defines from its parent, keeping its own
    pub(crate) fn inherit(&mut self, parent: &OptionSet) -> Result<()> {
        let merged = self.options.merged(parent, MergePolicy::ADOPT)?;
        *self = Column::from_options(merged)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn length(&self) -> usize {
        self.config.length
    }

    pub fn config(&self) -> &ColumnConfig {
        &self.config
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn group(&self) -> Option<&str> {
        self.config.group.as_deref()
    }

    pub fn is_spacer(&self) -> bool {
        self.config.name == SPACER
    }

    /// Decode one slice of a line. `schema` names the owning schema in errors.
    pub fn parse(&self, raw: &str, schema: &str) -> Result<Value> {
        let cfg = &self.config;
        if cfg.nil_blank && is_blank(raw) {
            return Ok(Value::Null);
        }
        let aligned = match cfg.align {
            Alignment::Right => raw.trim_start_matches(cfg.padding),
            Alignment::Left => raw.trim_end_matches(cfg.padding),
            Alignment::None => raw,
        };
        match &cfg.parser {
            Some(parser) => parser.call(aligned).map_err(|cause| Error::Parse {
                schema: schema.to_string(),
                column: cfg.name.clone(),
                value: raw.to_string(),
                cause,
            }),
            None => Ok(Value::String(aligned.to_string())),
        }
    }

    /// Encode a value into exactly `length` characters
    pub fn format(&self, value: &Value) -> Result<String> {
        let cfg = &self.config;
        let text = match &cfg.formatter {
            Some(formatter) => formatter.call(value).map_err(|cause| {
                Error::format(
                    &cfg.name,
                    format!("the value {} could not be formatted: {}", value, cause),
                )
            })?,
            None => value.to_text(),
        };
        let padded = self.pad(text);
        let actual = padded.chars().count();
        if actual == cfg.length {
            return Ok(padded);
        }
        if cfg.truncate && actual > cfg.length {
            match cfg.align {
                Alignment::Right => return Ok(padded.chars().skip(actual - cfg.length).collect()),
                Alignment::Left => return Ok(padded.chars().take(cfg.length).collect()),
                Alignment::None => {}
            }
        }
        Err(Error::format(
            &cfg.name,
            format!(
                "the formatted value '{}' with alignment {} is too {}: got {} characters, expected {}",
                padded,
                cfg.align,
                if actual > cfg.length { "long" } else { "short" },
                actual,
                cfg.length
            ),
        ))
    }

    fn pad(&self, text: String) -> String {
        let cfg = &self.config;
        let width = text.chars().count();
        if width >= cfg.length {
            return text;
        }
        let fill: String = std::iter::repeat(cfg.padding)
            .take(cfg.length - width)
            .collect();
        match cfg.align {
            Alignment::Left => text + &fill,
            Alignment::Right => fill + &text,
            Alignment::None => text,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────
