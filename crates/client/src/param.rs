//! Event parameter values
//!
//! Dynamic parameter trees for callers that build events from data rather
//! than from fixed push sequences. Entries keep insertion order so the wire
//! output is deterministic.

use chrono::{DateTime, FixedOffset};

use crate::buffer::Buffer;

/// A single parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Timestamp(DateTime<FixedOffset>),
    /// Nested object
    Map(EventParams),
    /// Array; empty lists are omitted from the event
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Write this value into `buffer` under `name`
    pub fn push_into<B: Buffer + ?Sized>(&self, buffer: &mut B, name: Option<&str>) {
        match self {
            Self::String(v) => buffer.push_string(v, name),
            Self::Int(v) => buffer.push_int(*v, name),
            Self::Int64(v) => buffer.push_int64(*v, name),
            Self::Float(v) => buffer.push_float(*v, name),
            Self::Double(v) => buffer.push_double(*v, name),
            Self::Bool(v) => buffer.push_bool(*v, name),
            Self::Timestamp(v) => buffer.push_timestamp(v, name),
            Self::Map(params) => {
                buffer.push_object_start(name);
                for (key, value) in params.iter() {
                    value.push_into(buffer, Some(key));
                }
                buffer.push_object_end();
            }
            Self::List(items) => {
                if items.is_empty() {
                    return;
                }
                buffer.push_array_start(name.unwrap_or_default());
                for item in items {
                    item.push_into(buffer, None);
                }
                buffer.push_array_end();
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DateTime<FixedOffset>> for ParamValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<EventParams> for ParamValue {
    fn from(v: EventParams) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        Self::List(v)
    }
}

/// Ordered parameter map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventParams {
    entries: Vec<(String, ParamValue)>,
}

impl EventParams {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((key.into(), value.into()));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for EventParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
