//! Parsing engine: resolves a line stream against a section tree
//!
//! The engine is a recursive descent over the section tree with
//! backtracking. Every optional or repeated node, and every nested node
//! tried inside a `Set`, is attempted speculatively: the stream is
//! checkpointed and the attempt writes into a scratch frame. A failed attempt
//! rewinds the stream and drops the frame; a successful one commits the
//! stream and merges the frame into its parent.
//!
//! # Matching rules
//!
//! - **Sequence**: children in declared order. A singular leaf takes at most
//!   one line, a non-singular leaf takes consecutive matching lines. A
//!   required leaf that takes nothing stops the sequence as unmet.
//! - **Set**: each line is tested against the children in declared order
//!   until one takes it. When no child takes the line, the set ends; any
//!   required child never satisfied makes it unmet.
//! - **Repeat**: a node is attempted until an attempt fails or consumes
//!   nothing. An attempt that consumes nothing leaves no output.
//!
//! "Unmet" is an ordinary return value ([`Outcome`]); it becomes
//! [`Error::MissingRequiredSchema`] only at the top of the tree. Decoding
//! failures and duplicate singular output are hard errors at any depth.

pub mod stream;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::definition::Definition;
use crate::error::LineExcerpt;
use crate::schema::Schema;
use crate::section::{SchemaRef, Section, SectionChild, SectionKind};
use crate::value::Value;
use crate::{Error, Result};

use stream::{Line, LineSource, LineStream};

/// Options for a single parse call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail on input left over after the section tree is satisfied
    pub verify_input: bool,
    /// Drop blank lines before matching
    pub skip_blank: bool,
    /// Named top-level section to parse with; `None` means every schema in
    /// declaration order
    pub section: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            verify_input: true,
            skip_blank: false,
            section: None,
        }
    }
}

impl ParseOptions {
    pub fn section(mut self, name: &str) -> Self {
        self.section = Some(name.to_string());
        self
    }

    pub fn verify_input(mut self, verify: bool) -> Self {
        self.verify_input = verify;
        self
    }

    pub fn skip_blank(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }
}

/// Parse every line of `source` against `definition`
pub fn parse<S: LineSource>(
    definition: &Definition,
    source: S,
    options: &ParseOptions,
) -> Result<Value> {
    let section = match &options.section {
        Some(name) => definition
            .section(name)
            .ok_or_else(|| Error::UnresolvedReference {
                names: vec![name.clone()],
            })?
            .anonymous(),
        None => Section::implicit(definition)?,
    };
    section.validate(definition)?;

    let mut engine = Engine {
        definition,
        stream: LineStream::new(source, options.skip_blank),
        matched: 0,
    };
    let mut frame = Frame::root();
    if let Outcome::Unmet(unmet) = engine.node(&section, &mut frame)? {
        return Err(Error::MissingRequiredSchema {
            schemas: unmet.schemas,
            line: unmet.line,
        });
    }

    if options.verify_input {
        if let Some(line) = engine.stream.peek()? {
            return Err(Error::UnusedInput {
                line: LineExcerpt::new(line.number, &line.text),
            });
        }
    }

    info!(
        records = engine.matched,
        keys = frame.record.len(),
        "parse complete"
    );
    Ok(Value::Object(frame.record))
}

// ── Outcomes ──────────────────────────────────────────────

/// Result of matching one node
#[derive(Debug)]
enum Outcome {
    Matched,
    Unmet(Unmet),
}

/// Requirements left unsatisfied and the line where matching stopped
#[derive(Debug)]
struct Unmet {
    schemas: Vec<String>,
    line: Option<LineExcerpt>,
}

/// Result of a speculative attempt
enum Attempt {
    Taken { consumed: bool },
    Failed(Unmet),
}

// ── Output frames ─────────────────────────────────────────

type Record = BTreeMap<String, Value>;

/// Output under construction. A child frame can see its ancestors so a
/// duplicate singular record is caught when it is produced, not when merged.
struct Frame<'p> {
    record: Record,
    outer: Option<&'p Frame<'p>>,
}

impl<'p> Frame<'p> {
    fn root() -> Frame<'static> {
        Frame {
            record: Record::new(),
            outer: None,
        }
    }

    fn child(outer: &'p Frame<'p>) -> Frame<'p> {
        Frame {
            record: Record::new(),
            outer: Some(outer),
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        match self.record.get(key) {
            Some(value) => Some(value),
            None => self.outer.and_then(|outer| outer.lookup(key)),
        }
    }

    /// Store one decoded record (or named section output) under `key`
    fn store(&mut self, key: &str, singular: bool, value: Value, line: &LineExcerpt) -> Result<()> {
        match (self.lookup(key), singular) {
            (Some(_), true) | (Some(Value::Object(_)), false) => {
                return Err(Error::DuplicateSingularOutput {
                    schema: key.to_string(),
                    line: line.clone(),
                });
            }
            _ => {}
        }
        if singular {
            self.record.insert(key.to_string(), value);
            return Ok(());
        }
        match self
            .record
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
        Ok(())
    }

    /// Merge a committed child frame
    fn absorb(&mut self, record: Record) {
        for (key, value) in record {
            match (self.record.get_mut(&key), value) {
                (Some(Value::Array(items)), Value::Array(more)) => items.extend(more),
                (_, value) => {
                    self.record.insert(key, value);
                }
            }
        }
    }
}

// ── Engine ────────────────────────────────────────────────

struct Engine<'d, S> {
    definition: &'d Definition,
    stream: LineStream<S>,
    matched: usize,
}

impl<'d, S: LineSource> Engine<'d, S> {
    /// Match a node honoring its own `optional` and `repeat` flags
    fn node(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Outcome> {
        if !section.is_repeat() {
            if !section.is_optional() {
                return self.once(section, frame);
            }
            self.attempt(section, frame)?;
            return Ok(Outcome::Matched);
        }

        let mut iterations = 0;
        loop {
            match self.attempt(section, frame)? {
                Attempt::Taken { consumed: true } => iterations += 1,
                Attempt::Taken { consumed: false } => break,
                Attempt::Failed(unmet) => {
                    if iterations == 0 && !section.is_optional() {
                        return Ok(Outcome::Unmet(unmet));
                    }
                    break;
                }
            }
        }
        debug!(iterations, section = section.name().unwrap_or("-"), "repeat finished");
        Ok(Outcome::Matched)
    }

    /// Match a node once, speculatively
    fn attempt(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Attempt> {
        let before = self.stream.position();
        let checkpoint = self.stream.checkpoint();
        let mut child = Frame::child(frame);
        match self.once(section, &mut child)? {
            Outcome::Matched if self.stream.position() == before => {
                self.stream.rewind(checkpoint);
                Ok(Attempt::Taken { consumed: false })
            }
            Outcome::Matched => {
                self.stream.commit(checkpoint);
                let record = child.record;
                frame.absorb(record);
                Ok(Attempt::Taken { consumed: true })
            }
            Outcome::Unmet(unmet) => {
                self.stream.rewind(checkpoint);
                debug!(
                    position = before,
                    unmet = ?unmet.schemas,
                    "speculative attempt rewound"
                );
                Ok(Attempt::Failed(unmet))
            }
        }
    }

    /// Match a node's children once; a named node collects under its name
    /// only when it took at least one line
    fn once(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Outcome> {
        let Some(name) = section.name() else {
            return self.body(section, frame);
        };
        let before = self.stream.position();
        let start = self.excerpt()?;
        let mut inner = Frame::root();
        let outcome = self.body(section, &mut inner)?;
        if matches!(outcome, Outcome::Matched) && self.stream.position() > before {
            let line = start.unwrap_or_else(|| LineExcerpt::new(0, ""));
            frame.store(name, !section.collects_list(), Value::Object(inner.record), &line)?;
        }
        Ok(outcome)
    }

    fn body(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Outcome> {
        match section.kind() {
            SectionKind::Sequence => self.sequence(section, frame),
            SectionKind::Set => self.set(section, frame),
        }
    }

    fn sequence(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Outcome> {
        for child in section.children() {
            match child {
                SectionChild::Schema(leaf) => {
                    let schema = self.schema(leaf)?;
                    let singular = leaf.is_singular(schema);
                    let mut taken = 0;
                    while !(singular && taken == 1) {
                        match self.peek_match(schema)? {
                            Some(line) => {
                                self.take(schema, singular, &line, frame)?;
                                taken += 1;
                            }
                            None => break,
                        }
                    }
                    if taken == 0 && !leaf.is_optional(schema) {
                        return Ok(Outcome::Unmet(Unmet {
                            schemas: vec![schema.name().to_string()],
                            line: self.excerpt()?,
                        }));
                    }
                }
                SectionChild::Section(nested) => {
                    if let Outcome::Unmet(unmet) = self.node(nested, frame)? {
                        return Ok(Outcome::Unmet(unmet));
                    }
                }
            }
        }
        Ok(Outcome::Matched)
    }

    fn set(&mut self, section: &Section, frame: &mut Frame<'_>) -> Result<Outcome> {
        let children = section.children();
        let mut satisfied = vec![false; children.len()];

        while self.stream.peek()?.is_some() {
            let mut progressed = false;
            for (index, child) in children.iter().enumerate() {
                match child {
                    SectionChild::Schema(leaf) => {
                        let schema = self.schema(leaf)?;
                        if let Some(line) = self.peek_match(schema)? {
                            self.take(schema, leaf.is_singular(schema), &line, frame)?;
                            progressed = true;
                        }
                    }
                    SectionChild::Section(nested) => {
                        if let Attempt::Taken { consumed: true } = self.attempt(nested, frame)? {
                            progressed = true;
                        }
                    }
                }
                if progressed {
                    satisfied[index] = true;
                    break;
                }
            }
            if !progressed {
                break;
            }
        }

        let mut unmet = Vec::new();
        for (child, done) in children.iter().zip(&satisfied) {
            if *done {
                continue;
            }
            match child {
                SectionChild::Schema(leaf) => {
                    let schema = self.schema(leaf)?;
                    if !leaf.is_optional(schema) {
                        unmet.push(schema.name().to_string());
                    }
                }
                SectionChild::Section(nested) if !nested.is_optional() => match nested.name() {
                    Some(name) => unmet.push(name.to_string()),
                    None => unmet.extend(nested.schema_names().into_iter().map(str::to_string)),
                },
                SectionChild::Section(_) => {}
            }
        }
        if unmet.is_empty() {
            return Ok(Outcome::Matched);
        }
        Ok(Outcome::Unmet(Unmet {
            schemas: unmet,
            line: self.excerpt()?,
        }))
    }

    // ── Line helpers ──

    fn schema(&self, leaf: &SchemaRef) -> Result<&'d Schema> {
        self.definition
            .schema(leaf.target())
            .ok_or_else(|| Error::UnresolvedReference {
                names: vec![leaf.target().to_string()],
            })
    }

    /// The line at the cursor, if `schema` matches it
    fn peek_match(&mut self, schema: &Schema) -> Result<Option<Line>> {
        let definition = self.definition;
        let scope = definition.scope();
        match self.stream.peek()? {
            Some(line) if schema.matches(&scope, &line.text)? => Ok(Some(line.clone())),
            _ => Ok(None),
        }
    }

    fn take(&mut self, schema: &Schema, singular: bool, line: &Line, frame: &mut Frame<'_>) -> Result<()> {
        let value = schema.parse(&self.definition.scope(), &line.text)?;
        let excerpt = LineExcerpt::new(line.number, &line.text);
        frame.store(schema.name(), singular, value, &excerpt)?;
        self.stream.advance();
        self.matched += 1;
        debug!(schema = schema.name(), line = line.number, "matched");
        Ok(())
    }

    fn excerpt(&mut self) -> Result<Option<LineExcerpt>> {
        Ok(self
            .stream
            .peek()?
            .map(|line| LineExcerpt::new(line.number, &line.text)))
    }
}

// ── Tests ─────────────────────────────────────────────────
