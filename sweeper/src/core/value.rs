//! Configuration value model shared by every compiler stage.
//!
//! Sweep files are dynamically typed, so values are carried as a tagged
//! union and every stage pattern-matches on the variant. Mappings keep
//! insertion order: expansion order and command-line flag order both follow
//! the order in which keys were written.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Insertion-ordered configuration mapping.
pub type Config = IndexMap<String, Value>;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(Config),
    /// Deferred random draw; only exists between directive parsing and
    /// combination building.
    Distribution(DistributionToken),
}

/// Supported sampling distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Uniform,
    LogUniform,
}

impl DistributionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionKind::Uniform => "uniform",
            DistributionKind::LogUniform => "loguniform",
        }
    }
}

/// Description of one random draw over `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DistributionToken {
    pub kind: DistributionKind,
    pub low: f64,
    pub high: f64,
}

impl DistributionToken {
    /// Map a unit draw `u ∈ [0, 1)` onto this distribution.
    ///
    /// Log-uniform draws are linear in the log domain.
    pub fn sample(&self, unit: f64) -> f64 {
        match self.kind {
            DistributionKind::Uniform => self.low + (self.high - self.low) * unit,
            DistributionKind::LogUniform => {
                let low = self.low.ln();
                let high = self.high.ln();
                (low + (high - low) * unit).exp()
            }
        }
    }
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Distribution(_) => "distribution",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Config> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// String form used when a value is interpolated through a reference token.
    ///
    /// Floats use the compact numeric rule of [`format_reference_float`];
    /// everything else uses its natural form.
    pub fn reference_string(&self) -> String {
        match self {
            Value::Float(value) => format_reference_float(*value),
            other => other.to_string(),
        }
    }
}

/// Format a float for reference interpolation.
///
/// Fixed two-decimal notation when `0.01 <= |v| < 100` or `v == 0`, otherwise
/// two-decimal scientific notation with a signed exponent of at least two
/// digits (`5.50e-03`).
pub fn format_reference_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (0.01..100.0).contains(&magnitude) {
        return format!("{value:.2}");
    }
    let rendered = format!("{value:.2e}");
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => rendered,
    }
}

/// Natural string form: what a flag value looks like on the command line.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) => f.write_str(text),
            Value::Integer(value) => write!(f, "{value}"),
            // Debug keeps the trailing `.0` on integral floats.
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (index, (key, item)) in map.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                f.write_str("}")
            }
            Value::Distribution(token) => {
                write!(f, "{}({:?}, {:?})", token.kind.as_str(), token.low, token.high)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Config> for Value {
    fn from(map: Config) -> Self {
        Value::Map(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(text) => serializer.serialize_str(text),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, item) in map {
                    out.serialize_entry(key, item)?;
                }
                out.end()
            }
            Value::Distribution(token) => token.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Field name `toml` uses to smuggle a datetime through serde.
const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, bool, list or table")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Integer(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        match i64::try_from(value) {
            Ok(value) => Ok(Value::Integer(value)),
            Err(_) => Ok(Value::Float(value as f64)),
        }
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::String(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Config::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(key) = access.next_key::<String>()? {
            // `toml` hands dates and datetimes over as a one-entry map.
            if map.is_empty() && key == TOML_DATETIME_FIELD {
                let text: String = access.next_value()?;
                return Ok(Value::String(text));
            }
            let item = access.next_value()?;
            map.insert(key, item);
        }
        Ok(Value::Map(map))
    }
}
