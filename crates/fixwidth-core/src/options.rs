//! Options engine: validated, mergeable named attributes
//!
//! Every entity (column, schema, section, definition) is configured through an
//! [`OptionSet`]. A set starts as a clone of the entity's catalog (the
//! [`OptionSpec`]s registered for that entity kind), receives raw values, is
//! merged with its parent's set, and is finally checked for missing required
//! options. The entity then extracts a typed configuration record from it.
//!
//! # Pipeline
//!
//! `raw value → transform → validator → stored`
//!
//! Defaults travel the same pipeline when the option is defined. Values for
//! options the set does not know yet are kept as [`Slot::Pending`] and only
//! validated once the option is registered.
//!
//! # Merge precedence
//!
//! | own \ other | default            | explicit           |
//! |-------------|--------------------|--------------------|
//! | unset       | other              | other              |
//! | default     | other if `Other`   | other              |
//! | explicit    | other if `Other`   | other if `Other`   |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;
use crate::{Error, Result};

// ── Callables ─────────────────────────────────────────────

/// Signature of a custom column decoder
pub type ParserFn = dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync;
/// Signature of a custom column encoder
pub type FormatterFn = dyn Fn(&Value) -> std::result::Result<String, String> + Send + Sync;
/// Signature of a schema trap predicate
pub type TrapFn = dyn Fn(&str) -> bool + Send + Sync;
/// Signature of an option transform
pub type TransformFn =
    dyn Fn(OptionValue) -> std::result::Result<OptionValue, String> + Send + Sync;

/// A named, shareable function stored as an option value
pub struct Callable<F: ?Sized> {
    name: Arc<str>,
    func: Arc<F>,
}

pub type Parser = Callable<ParserFn>;
pub type Formatter = Callable<FormatterFn>;
pub type Trap = Callable<TrapFn>;

impl<F: ?Sized> Callable<F> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F: ?Sized> Clone for Callable<F> {
    fn clone(&self) -> Self {
        Callable {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Callable<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

impl<F: ?Sized> PartialEq for Callable<F> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && std::ptr::eq(
                Arc::as_ptr(&self.func) as *const (),
                Arc::as_ptr(&other.func) as *const (),
            )
    }
}

impl Callable<ParserFn> {
    pub fn new(
        name: &str,
        func: impl Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Callable {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, raw: &str) -> std::result::Result<Value, String> {
        (self.func)(raw)
    }
}

impl Callable<FormatterFn> {
    pub fn new(
        name: &str,
        func: impl Fn(&Value) -> std::result::Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Callable {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, value: &Value) -> std::result::Result<String, String> {
        (self.func)(value)
    }
}

impl Callable<TrapFn> {
    pub fn new(name: &str, func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Callable {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, line: &str) -> bool {
        (self.func)(line)
    }
}

// ── Option Values ─────────────────────────────────────────

/// Which side of a column carries the value (and which side is padded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    None,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Alignment::Left => write!(f, "left"),
            Alignment::Right => write!(f, "right"),
            Alignment::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "left" => Ok(Alignment::Left),
            "right" => Ok(Alignment::Right),
            "none" => Ok(Alignment::None),
            other => Err(format!("unknown alignment '{}'", other)),
        }
    }
}

/// A single option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Char(char),
    Text(String),
    Align(Alignment),
    Parser(Parser),
    Formatter(Formatter),
    Trap(Trap),
}

/// The variant of an [`OptionValue`], used by kind validators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Char,
    Text,
    Align,
    Parser,
    Formatter,
    Trap,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            OptionKind::Bool => "boolean",
            OptionKind::Int => "integer",
            OptionKind::Char => "character",
            OptionKind::Text => "text",
            OptionKind::Align => "alignment",
            OptionKind::Parser => "parser",
            OptionKind::Formatter => "formatter",
            OptionKind::Trap => "trap",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Char(c) => write!(f, "{:?}", c),
            OptionValue::Text(s) => write!(f, "{:?}", s),
            OptionValue::Align(a) => write!(f, "{}", a),
            OptionValue::Parser(p) => write!(f, "{:?}", p),
            OptionValue::Formatter(p) => write!(f, "{:?}", p),
            OptionValue::Trap(p) => write!(f, "{:?}", p),
        }
    }
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Char(_) => OptionKind::Char,
            OptionValue::Text(_) => OptionKind::Text,
            OptionValue::Align(_) => OptionKind::Align,
            OptionValue::Parser(_) => OptionKind::Parser,
            OptionValue::Formatter(_) => OptionKind::Formatter,
            OptionValue::Trap(_) => OptionKind::Trap,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            OptionValue::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_align(&self) -> Option<Alignment> {
        match self {
            OptionValue::Align(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_parser(&self) -> Option<&Parser> {
        match self {
            OptionValue::Parser(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_formatter(&self) -> Option<&Formatter> {
        match self {
            OptionValue::Formatter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_trap(&self) -> Option<&Trap> {
        match self {
            OptionValue::Trap(p) => Some(p),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        OptionValue::Int(i)
    }
}

impl From<usize> for OptionValue {
    fn from(i: usize) -> Self {
        OptionValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<char> for OptionValue {
    fn from(c: char) -> Self {
        OptionValue::Char(c)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<Alignment> for OptionValue {
    fn from(a: Alignment) -> Self {
        OptionValue::Align(a)
    }
}

impl From<Parser> for OptionValue {
    fn from(p: Parser) -> Self {
        OptionValue::Parser(p)
    }
}

impl From<Formatter> for OptionValue {
    fn from(p: Formatter) -> Self {
        OptionValue::Formatter(p)
    }
}

impl From<Trap> for OptionValue {
    fn from(p: Trap) -> Self {
        OptionValue::Trap(p)
    }
}

// ── Validators ────────────────────────────────────────────

/// Constraint checked after an option value has been transformed
#[derive(Clone)]
pub enum Validator {
    /// Value must equal one of the listed values
    OneOf(Vec<OptionValue>),
    /// Value must be of the given kind
    Kind(OptionKind),
    /// Value must equal exactly this value
    Equals(OptionValue),
    /// Arbitrary predicate with a human-readable description
    Predicate {
        description: String,
        check: Arc<dyn Fn(&OptionValue) -> bool + Send + Sync>,
    },
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Validator::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Validator::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Validator::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Validator::Predicate { description, .. } => {
                f.debug_tuple("Predicate").field(description).finish()
            }
        }
    }
}

impl Validator {
    pub fn one_of(values: impl IntoIterator<Item = OptionValue>) -> Self {
        Validator::OneOf(values.into_iter().collect())
    }

    pub fn predicate(
        description: &str,
        check: impl Fn(&OptionValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Validator::Predicate {
            description: description.to_string(),
            check: Arc::new(check),
        }
    }

    /// Check `value` for option `key`, producing the constraint message on failure
    fn check(&self, key: &str, value: &OptionValue) -> std::result::Result<(), String> {
        match self {
            Validator::OneOf(values) => {
                if values.contains(value) {
                    return Ok(());
                }
                let listed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                Err(format!(
                    ":{} must be one of [{}], got '{}'",
                    key,
                    listed.join(", "),
                    value
                ))
            }
            Validator::Kind(kind) => {
                if value.kind() == *kind {
                    return Ok(());
                }
                Err(format!(":{} must be a {}, got '{}'", key, kind, value))
            }
            Validator::Equals(expected) => {
                if value == expected {
                    return Ok(());
                }
                Err(format!(":{} must equal {}, got '{}'", key, expected, value))
            }
            Validator::Predicate { description, check } => {
                if check(value) {
                    return Ok(());
                }
                Err(format!(
                    "'{}' is an invalid value for :{} ({})",
                    value, key, description
                ))
            }
        }
    }
}

// ── Option Specs ──────────────────────────────────────────

/// Definition of a single option: transform, validator, default, required flag
#[derive(Clone)]
pub struct OptionSpec {
    name: String,
    transform: Option<Arc<TransformFn>>,
    validator: Option<Validator>,
    default: Option<OptionValue>,
    required: bool,
}

impl fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("name", &self.name)
            .field("transform", &self.transform.is_some())
            .field("validator", &self.validator)
            .field("default", &self.default)
            .field("required", &self.required)
            .finish()
    }
}

impl OptionSpec {
    pub fn new(name: &str) -> Self {
        OptionSpec {
            name: name.to_string(),
            transform: None,
            validator: None,
            default: None,
            required: false,
        }
    }

    pub fn transform(
        mut self,
        f: impl Fn(OptionValue) -> std::result::Result<OptionValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Raw default; it is transformed and validated when the option is defined
    pub fn default_value(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform then the validator over a raw value
    pub fn prepare(&self, raw: OptionValue) -> Result<OptionValue> {
        let shown = raw.to_string();
        let value = match &self.transform {
            Some(transform) => transform(raw).map_err(|cause| {
                Error::config(format!(
                    "Could not set option :{} to '{}': {}",
                    self.name, shown, cause
                ))
            })?,
            None => raw,
        };
        if let Some(validator) = &self.validator {
            validator.check(&self.name, &value).map_err(Error::config)?;
        }
        Ok(value)
    }
}

// ── Option Sets ───────────────────────────────────────────

/// The state of one option within a set
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    /// Value given explicitly for this instance
    Explicit(OptionValue),
    /// Inherited default (from the option spec or from a merge)
    Default(OptionValue),
    /// Neither value nor default
    Unset,
}

impl Setting {
    pub fn value(&self) -> Option<&OptionValue> {
        match self {
            Setting::Explicit(v) | Setting::Default(v) => Some(v),
            Setting::Unset => None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Setting::Explicit(_))
    }

    fn prepared(&self, spec: &OptionSpec) -> Result<Setting> {
        Ok(match self {
            Setting::Explicit(v) => Setting::Explicit(spec.prepare(v.clone())?),
            Setting::Default(v) => Setting::Default(spec.prepare(v.clone())?),
            Setting::Unset => Setting::Unset,
        })
    }
}

/// One entry of an [`OptionSet`]
#[derive(Debug, Clone)]
pub enum Slot {
    /// A defined option with its validated setting
    Registered {
        spec: Arc<OptionSpec>,
        setting: Setting,
    },
    /// A not-yet-defined option holding an unvalidated raw setting
    Pending(Setting),
}

/// Which side wins a merge conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    Own,
    Other,
}

/// What to do with options the receiving set has not defined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Copy the option spec and setting across
    Import,
    /// Fail the merge
    Raise,
    /// Drop the option
    Skip,
    /// Keep the raw setting for a later definition
    Pending,
}

/// Precedence policy for [`OptionSet::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    pub prefer: Prefer,
    pub missing: Missing,
}

impl MergePolicy {
    /// Child inherits from its parent: own settings win, unknown options wait
    pub const INHERIT: MergePolicy = MergePolicy {
        prefer: Prefer::Own,
        missing: Missing::Pending,
    };

    /// Column picks up only the options it defines from its schema
    pub const ADOPT: MergePolicy = MergePolicy {
        prefer: Prefer::Own,
        missing: Missing::Skip,
    };

    /// Whole copy of another set
    pub const COPY: MergePolicy = MergePolicy {
        prefer: Prefer::Other,
        missing: Missing::Import,
    };
}

/// How a fresh set is seeded from its catalog
pub enum Seed<'a> {
    /// Raw key/value pairs, each passed through `set` (unknown keys pend)
    Pairs(Vec<(String, OptionValue)>),
    /// Another set merged in with the given policy
    Merge(&'a OptionSet, MergePolicy),
}

/// Per-instance option store
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    slots: BTreeMap<String, Slot>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an instance from a catalog and a seed, then check requirements
    pub fn seeded(catalog: &OptionSet, seed: Seed<'_>) -> Result<OptionSet> {
        let mut set = catalog.clone();
        match seed {
            Seed::Pairs(pairs) => set.apply_pairs(pairs)?,
            Seed::Merge(other, policy) => set.merge(other, policy)?,
        }
        set.finalize()?;
        Ok(set)
    }

    /// Register an option. Its default (and any pending value) is prepared now.
    pub fn define(&mut self, spec: OptionSpec) -> Result<()> {
        let key = spec.name.clone();
        let pending = match self.slots.get(&key) {
            Some(Slot::Registered { .. }) => {
                return Err(Error::config(format!(
                    "Option :{} is already defined!",
                    key
                )));
            }
            Some(Slot::Pending(setting)) => Some(setting.clone()),
            None => None,
        };
        let mut setting = match &spec.default {
            Some(default) => Setting::Default(spec.prepare(default.clone())?),
            None => Setting::Unset,
        };
        if let Some(pending) = pending {
            if let Some(adopted) = resolve(&setting, &pending, Prefer::Other) {
                setting = adopted.prepared(&spec)?;
            }
        }
        self.slots.insert(
            key,
            Slot::Registered {
                spec: Arc::new(spec),
                setting,
            },
        );
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Registered { .. }))
    }

    /// Names of all defined options
    pub fn keys(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Registered { .. }))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Names of all pending (not yet defined) options
    pub fn pending_keys(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copy holding only the pending entries; this is what a parent passes down
    pub fn only_pending(&self) -> OptionSet {
        OptionSet {
            slots: self
                .slots
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
                .map(|(key, slot)| (key.clone(), slot.clone()))
                .collect(),
        }
    }

    /// The raw pending setting for an option not yet defined
    pub fn pending(&self, name: &str) -> Option<&Setting> {
        match self.slots.get(name) {
            Some(Slot::Pending(setting)) => Some(setting),
            _ => None,
        }
    }

    pub fn setting(&self, name: &str) -> Result<&Setting> {
        match self.slots.get(name) {
            Some(Slot::Registered { setting, .. }) => Ok(setting),
            _ => Err(undefined(name)),
        }
    }

    /// Explicit value, else default, else `None`
    pub fn get(&self, name: &str) -> Result<Option<&OptionValue>> {
        Ok(self.setting(name)?.value())
    }

    /// Set an explicit value; the option must be defined
    pub fn set(&mut self, name: &str, raw: impl Into<OptionValue>) -> Result<()> {
        match self.slots.get_mut(name) {
            Some(Slot::Registered { spec, setting }) => {
                *setting = Setting::Explicit(spec.prepare(raw.into())?);
                Ok(())
            }
            _ => Err(undefined(name)),
        }
    }

    /// Set an explicit value, or keep it pending when the option is unknown
    pub fn set_or_pend(&mut self, name: &str, raw: impl Into<OptionValue>) -> Result<()> {
        if self.is_defined(name) {
            return self.set(name, raw);
        }
        self.slots
            .insert(name.to_string(), Slot::Pending(Setting::Explicit(raw.into())));
        Ok(())
    }

    pub fn apply_pairs(&mut self, pairs: Vec<(String, OptionValue)>) -> Result<()> {
        for (key, value) in pairs {
            self.set_or_pend(&key, value)?;
        }
        Ok(())
    }

    /// Mark an option as mandatory
    pub fn require(&mut self, name: &str) -> Result<()> {
        match self.slots.get_mut(name) {
            Some(Slot::Registered { spec, .. }) => {
                Arc::make_mut(spec).required = true;
                Ok(())
            }
            _ => Err(undefined(name)),
        }
    }

    /// Required options lacking both an explicit value and a default
    pub fn missing(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Registered {
                    spec,
                    setting: Setting::Unset,
                } if spec.required => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fail with every missing required option at once
    pub fn finalize(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::config(format!(
            "The following required options are missing: [{}]",
            missing.join(", ")
        )))
    }

    /// Copy of this set with `other` merged in
    pub fn merged(&self, other: &OptionSet, policy: MergePolicy) -> Result<OptionSet> {
        let mut copy = self.clone();
        copy.merge(other, policy)?;
        Ok(copy)
    }

    /// Merge `other` into this set following `policy`
    pub fn merge(&mut self, other: &OptionSet, policy: MergePolicy) -> Result<()> {
        for (key, incoming) in &other.slots {
            let own_pending = match self.slots.get_mut(key) {
                Some(Slot::Registered { spec, setting }) => {
                    let offered = match incoming {
                        Slot::Registered { setting, .. } => setting,
                        Slot::Pending(setting) => setting,
                    };
                    if let Some(adopted) = resolve(setting, offered, policy.prefer) {
                        *setting = adopted.prepared(spec)?;
                    }
                    continue;
                }
                Some(Slot::Pending(own)) => Some(own.clone()),
                None => None,
            };
            match policy.missing {
                Missing::Import => {
                    if let Slot::Registered { spec, .. } = incoming {
                        self.slots.insert(key.clone(), incoming.clone());
                        if let Some(own) = own_pending {
                            self.merge_pending_into(key, spec, &own)?;
                        }
                    }
                }
                Missing::Raise => {
                    return Err(Error::config(format!("Cannot merge option :{}", key)));
                }
                Missing::Skip => {}
                Missing::Pending => {
                    let offered = match incoming {
                        Slot::Registered { setting, .. } => setting,
                        Slot::Pending(setting) => setting,
                    };
                    let next = match &own_pending {
                        Some(own) => resolve(own, offered, policy.prefer),
                        None => Some(offered.clone()),
                    };
                    if let Some(next) = next {
                        if next != Setting::Unset {
                            self.slots.insert(key.clone(), Slot::Pending(next));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn merge_pending_into(&mut self, key: &str, spec: &OptionSpec, own: &Setting) -> Result<()> {
        if let Some(Slot::Registered { setting, .. }) = self.slots.get_mut(key) {
            if let Some(adopted) = resolve(setting, own, Prefer::Other) {
                *setting = adopted.prepared(spec)?;
            }
        }
        Ok(())
    }
}

/// Decide which setting survives a merge; `None` keeps `own`
fn resolve(own: &Setting, offered: &Setting, prefer: Prefer) -> Option<Setting> {
    match (own, offered) {
        (_, Setting::Unset) => None,
        (Setting::Unset, _) => Some(offered.clone()),
        (Setting::Default(_), Setting::Explicit(_)) => Some(offered.clone()),
        (Setting::Default(_), Setting::Default(_))
        | (Setting::Explicit(_), Setting::Explicit(_))
        | (Setting::Explicit(_), Setting::Default(_)) => {
            if prefer == Prefer::Other {
                Some(offered.clone())
            } else {
                None
            }
        }
    }
}

fn undefined(name: &str) -> Error {
    Error::config(format!("Option '{}' is not defined!", name))
}

// ── Common transforms ─────────────────────────────────────

/// Text (`"left"`, `"right"`, `"none"`) to an alignment
pub fn to_alignment(value: OptionValue) -> std::result::Result<OptionValue, String> {
    match value {
        OptionValue::Text(s) => s.parse::<Alignment>().map(OptionValue::Align),
        other => Ok(other),
    }
}

/// Single-character text to a padding character
pub fn to_char(value: OptionValue) -> std::result::Result<OptionValue, String> {
    match value {
        OptionValue::Text(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(OptionValue::Char(c)),
                _ => Err(format!("expected a single character, got {:?}", s)),
            }
        }
        other => Ok(other),
    }
}

/// Names must be non-blank
pub fn non_blank() -> Validator {
    Validator::predicate("must not be blank", |value| {
        value.as_text().is_some_and(|s| !crate::is_blank(s))
    })
}

/// Booleans only
pub fn boolean() -> Validator {
    Validator::one_of([OptionValue::Bool(true), OptionValue::Bool(false)])
}

// ── Tests ─────────────────────────────────────────────────
