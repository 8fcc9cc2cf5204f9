//! Attribute keys and values, and the limits applied to attribute sets.
use std::borrow::Cow;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Maximum number of attributes per record.
pub(crate) const OTEL_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_ATTRIBUTE_COUNT_LIMIT";
/// Default maximum number of attributes per record.
pub(crate) const OTEL_ATTRIBUTE_COUNT_LIMIT_DEFAULT: usize = 128;
/// Maximum length, in characters, of string attribute values.
pub(crate) const OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT";

/// The key part of attribute [KeyValue] pairs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Create a new `Key`.
    pub fn new(value: impl Into<Key>) -> Self {
        value.into()
    }

    /// Create a new const `Key`.
    pub const fn from_static_str(value: &'static str) -> Self {
        Key(Cow::Borrowed(value))
    }

    /// Returns a reference to the underlying key name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Key {
    fn from(key_str: &'static str) -> Self {
        Key(Cow::Borrowed(key_str))
    }
}

impl From<String> for Key {
    fn from(string: String) -> Self {
        Key(Cow::Owned(string))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{:?}", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// A [Value::Array] containing homogeneous values.
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
    /// Array of bools
    Bool(Vec<bool>),
    /// Array of integers
    I64(Vec<i64>),
    /// Array of floats
    F64(Vec<f64>),
    /// Array of strings
    String(Vec<Cow<'static, str>>),
}

/// The value part of attribute [KeyValue] pairs.
///
/// `U64` exists so producers can hand over unsigned counters unchanged; the
/// wire format only carries signed integers, so values above `i64::MAX` are
/// dropped by the encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// bool values
    Bool(bool),
    /// i64 values
    I64(i64),
    /// u64 values
    U64(u64),
    /// f64 values
    F64(f64),
    /// String values
    String(Cow<'static, str>),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of homogeneous values
    Array(Array),
}

macro_rules! from_values {
   (
        $(
            ($t:ty, $val:expr);
        )+
    ) => {
        $(
            impl From<$t> for Value {
                fn from(t: $t) -> Self {
                    $val(t)
                }
            }
        )+
    }
}

from_values!(
    (bool, Value::Bool);
    (i64, Value::I64);
    (u64, Value::U64);
    (f64, Value::F64);
    (Vec<u8>, Value::Bytes);
    (Array, Value::Array);
);

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::String(Cow::Borrowed(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Cow::Owned(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(fmt, "{v}"),
            Value::I64(v) => write!(fmt, "{v}"),
            Value::U64(v) => write!(fmt, "{v}"),
            Value::F64(v) => write!(fmt, "{v}"),
            Value::String(v) => fmt.write_str(v),
            Value::Bytes(v) => write!(fmt, "{v:?}"),
            Value::Array(v) => write!(fmt, "{v:?}"),
        }
    }
}

/// A key-value pair describing an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    /// The attribute name
    pub key: Key,

    /// The attribute value
    pub value: Value,
}

impl KeyValue {
    /// Create a new `KeyValue` pair.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Value of a log record body or of a nested log attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyValue {
    /// An integer value
    Int(i64),
    /// A double value
    Double(f64),
    /// A string value
    String(Cow<'static, str>),
    /// A boolean value
    Boolean(bool),
    /// A byte array
    Bytes(Vec<u8>),
    /// An array of `AnyValue` values
    ListAny(Vec<AnyValue>),
    /// An ordered list of key-value pairs
    Map(Vec<(Key, AnyValue)>),
}

impl From<&'static str> for AnyValue {
    fn from(s: &'static str) -> Self {
        AnyValue::String(Cow::Borrowed(s))
    }
}

impl From<String> for AnyValue {
    fn from(s: String) -> Self {
        AnyValue::String(Cow::Owned(s))
    }
}

impl From<i64> for AnyValue {
    fn from(v: i64) -> Self {
        AnyValue::Int(v)
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        AnyValue::Double(v)
    }
}

impl From<bool> for AnyValue {
    fn from(v: bool) -> Self {
        AnyValue::Boolean(v)
    }
}

/// Caps on the number of attributes per record and the length of string values.
///
/// The defaults are read from `OTEL_ATTRIBUTE_COUNT_LIMIT` (128) and
/// `OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT` (unlimited).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeLimits {
    /// Attributes beyond this count are dropped.
    pub max_count: usize,
    /// String values longer than this many characters are truncated.
    pub max_value_length: Option<usize>,
}

impl Default for AttributeLimits {
    fn default() -> Self {
        AttributeLimits {
            max_count: OTEL_ATTRIBUTE_COUNT_LIMIT_DEFAULT,
            max_value_length: None,
        }
        .init_from_env_vars()
    }
}

impl AttributeLimits {
    /// No limit on count or length.
    pub fn unlimited() -> Self {
        AttributeLimits {
            max_count: usize::MAX,
            max_value_length: None,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(count) = env::var(OTEL_ATTRIBUTE_COUNT_LIMIT)
            .ok()
            .and_then(|v| usize::from_str(v.trim()).ok())
        {
            self.max_count = count;
        }
        if let Some(length) = env::var(OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT)
            .ok()
            .and_then(|v| usize::from_str(v.trim()).ok())
        {
            self.max_value_length = Some(length);
        }
        self
    }

    /// Apply these limits to `attributes`, returning the kept attributes and
    /// the number that were dropped.
    ///
    /// A repeated key replaces the earlier value in place and is not counted
    /// as dropped.
    pub fn apply(&self, attributes: impl IntoIterator<Item = KeyValue>) -> (Vec<KeyValue>, u32) {
        let mut kept: Vec<KeyValue> = Vec::new();
        let mut dropped = 0u32;
        for mut kv in attributes {
            if let Some(max_len) = self.max_value_length {
                truncate_value(&mut kv.value, max_len);
            }
            if let Some(existing) = kept.iter_mut().find(|e| e.key == kv.key) {
                existing.value = kv.value;
            } else if kept.len() < self.max_count {
                kept.push(kv);
            } else {
                dropped = dropped.saturating_add(1);
            }
        }
        (kept, dropped)
    }
}

fn truncate_value(value: &mut Value, max_len: usize) {
    match value {
        Value::String(s) => truncate_str(s, max_len),
        Value::Array(Array::String(values)) => {
            for s in values.iter_mut() {
                truncate_str(s, max_len);
            }
        }
        _ => {}
    }
}

fn truncate_str(s: &mut Cow<'static, str>, max_chars: usize) {
    let cut = s.char_indices().nth(max_chars).map(|(idx, _)| idx);
    if let Some(idx) = cut {
        match s {
            Cow::Borrowed(b) => {
                let b: &'static str = *b;
                *s = Cow::Borrowed(&b[..idx]);
            }
            Cow::Owned(o) => o.truncate(idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_drop_excess_attributes() {
        let limits = AttributeLimits {
            max_count: 2,
            max_value_length: None,
        };
        let (kept, dropped) = limits.apply([
            KeyValue::new("a", 1_i64),
            KeyValue::new("b", 2_i64),
            KeyValue::new("c", 3_i64),
            KeyValue::new("d", 4_i64),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(kept[1].key.as_str(), "b");
    }

    #[test]
    fn duplicate_key_replaces_value() {
        let limits = AttributeLimits {
            max_count: 1,
            max_value_length: None,
        };
        let (kept, dropped) = limits.apply([KeyValue::new("a", 1_i64), KeyValue::new("a", 2_i64)]);
        assert_eq!(kept, vec![KeyValue::new("a", 2_i64)]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn strings_truncate_on_char_boundary() {
        let limits = AttributeLimits {
            max_count: 10,
            max_value_length: Some(3),
        };
        let (kept, _) = limits.apply([
            KeyValue::new("s", "héllo"),
            KeyValue::new("owned", String::from("abcdef")),
            KeyValue::new(
                "arr",
                Array::String(vec![Cow::Borrowed("xyzw"), Cow::Borrowed("q")]),
            ),
            KeyValue::new("n", 123456_i64),
        ]);
        assert_eq!(kept[0].value, Value::from("hél"));
        assert_eq!(kept[1].value, Value::from("abc"));
        assert_eq!(
            kept[2].value,
            Value::Array(Array::String(vec![Cow::Borrowed("xyz"), Cow::Borrowed("q")]))
        );
        assert_eq!(kept[3].value, Value::I64(123456));
    }

    #[test]
    fn limits_from_env() {
        temp_env::with_vars(
            [
                (OTEL_ATTRIBUTE_COUNT_LIMIT, Some("5")),
                (OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT, Some("16")),
            ],
            || {
                let limits = AttributeLimits::default();
                assert_eq!(limits.max_count, 5);
                assert_eq!(limits.max_value_length, Some(16));
            },
        );
        temp_env::with_vars_unset(
            [OTEL_ATTRIBUTE_COUNT_LIMIT, OTEL_ATTRIBUTE_VALUE_LENGTH_LIMIT],
            || {
                let limits = AttributeLimits::default();
                assert_eq!(limits.max_count, OTEL_ATTRIBUTE_COUNT_LIMIT_DEFAULT);
                assert_eq!(limits.max_value_length, None);
            },
        );
    }
}
