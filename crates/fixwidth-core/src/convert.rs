//! Named converters: built-in column parse and format functions
//!
//! Description documents select custom column codecs by name. The registry is
//! built once on first use.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::options::{Formatter, OptionValue, Parser};
use crate::value::Value;

static PARSERS: Lazy<BTreeMap<&'static str, Parser>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    map.insert(
        "integer",
        Parser::new("integer", |raw| {
            let text = raw.trim();
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("invalid integer {:?}: {}", text, e))
        }),
    );
    map.insert(
        "float",
        Parser::new("float", |raw| {
            let text = raw.trim();
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("invalid float {:?}: {}", text, e))
        }),
    );
    map.insert(
        "trim",
        Parser::new("trim", |raw| Ok(Value::String(raw.trim().to_string()))),
    );
    map.insert(
        "upcase",
        Parser::new("upcase", |raw| Ok(Value::String(raw.to_uppercase()))),
    );
    map.insert(
        "downcase",
        Parser::new("downcase", |raw| Ok(Value::String(raw.to_lowercase()))),
    );
    map
});

static FORMATTERS: Lazy<BTreeMap<&'static str, Formatter>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    map.insert(
        "integer",
        Formatter::new("integer", |value| match value {
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| i.to_string())
                .map_err(|e| format!("invalid integer {:?}: {}", s, e)),
            Value::Null => Ok(String::new()),
            other => Err(format!("cannot format {} as integer", other.type_name())),
        }),
    );
    map.insert(
        "float",
        Formatter::new("float", |value| match value {
            Value::Float(f) => Ok(f.to_string()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(format!("cannot format {} as float", other.type_name())),
        }),
    );
    map.insert(
        "trim",
        Formatter::new("trim", |value| Ok(value.to_text().trim().to_string())),
    );
    map.insert(
        "upcase",
        Formatter::new("upcase", |value| Ok(value.to_text().to_uppercase())),
    );
    map.insert(
        "downcase",
        Formatter::new("downcase", |value| Ok(value.to_text().to_lowercase())),
    );
    map
});

/// Look up a built-in parser by name
pub fn parser(name: &str) -> Option<Parser> {
    PARSERS.get(name).cloned()
}

/// Look up a built-in formatter by name
pub fn formatter(name: &str) -> Option<Formatter> {
    FORMATTERS.get(name).cloned()
}

/// Names of every built-in converter
pub fn names() -> Vec<&'static str> {
    PARSERS.keys().copied().collect()
}

/// Option transform: text names a registered parser
pub fn to_parser(value: OptionValue) -> std::result::Result<OptionValue, String> {
    match value {
        OptionValue::Text(name) => parser(&name)
            .map(OptionValue::Parser)
            .ok_or_else(|| format!("no converter named '{}'", name)),
        other => Ok(other),
    }
}

/// Option transform: text names a registered formatter
pub fn to_formatter(value: OptionValue) -> std::result::Result<OptionValue, String> {
    match value {
        OptionValue::Text(name) => formatter(&name)
            .map(OptionValue::Formatter)
            .ok_or_else(|| format!("no converter named '{}'", name)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parser() {
        let p = parser("integer").unwrap();
        assert_eq!(p.call("  42").unwrap(), Value::Integer(42));
        assert!(p.call("4x2").is_err());
    }

    #[test]
    fn test_integer_formatter_accepts_numeric_strings() {
        let f = formatter("integer").unwrap();
        assert_eq!(f.call(&Value::Integer(7)).unwrap(), "7");
        assert_eq!(f.call(&Value::String(" 12".into())).unwrap(), "12");
        assert!(f.call(&Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_registry_lookup_is_shared() {
        assert_eq!(parser("upcase"), parser("upcase"));
        assert!(parser("nope").is_none());
        assert!(names().contains(&"downcase"));
    }

    #[test]
    fn test_to_parser_transform() {
        let converted = to_parser(OptionValue::Text("trim".into())).unwrap();
        assert!(matches!(converted, OptionValue::Parser(_)));
        assert!(to_parser(OptionValue::Text("bogus".into())).is_err());
    }
}
