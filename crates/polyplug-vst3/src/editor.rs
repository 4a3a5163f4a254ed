//! Messages exchanged with the plugin editor.
//!
//! The editor runs on its own side of a message channel. Messages are
//! identified by name and carry a small bag of typed attributes.
//!
//! | name            | direction        | attributes                          |
//! |-----------------|------------------|-------------------------------------|
//! | `init`          | both             | `sample_rate` (float, outgoing)     |
//! | `ready`         | editor → plugin  |                                     |
//! | `idle`          | editor → plugin  |                                     |
//! | `close`         | editor → plugin  |                                     |
//! | `parameter-set` | both             | `index` (int), `value` (float)      |
//! | `state-set`     | both             | `key` (string), `value` (string)    |
//! | `midi`          | editor → plugin  | `data` (binary, 1-3 bytes)          |

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const MSG_INIT: &str = "init";
pub const MSG_READY: &str = "ready";
pub const MSG_IDLE: &str = "idle";
pub const MSG_CLOSE: &str = "close";
pub const MSG_PARAMETER_SET: &str = "parameter-set";
pub const MSG_STATE_SET: &str = "state-set";
pub const MSG_MIDI: &str = "midi";

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
}

/// A named message with attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorMessage {
    pub name: String,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl EditorMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push((key.into(), value));
        self
    }

    /// `parameter-set` for a raw index and plain value.
    pub fn parameter_set(index: u32, value: f64) -> Self {
        Self::new(MSG_PARAMETER_SET)
            .with("index", AttributeValue::Int(index as i64))
            .with("value", AttributeValue::Float(value))
    }

    /// `state-set` for a key and value.
    pub fn state_set(key: &str, value: &str) -> Self {
        Self::new(MSG_STATE_SET)
            .with("key", AttributeValue::String(key.to_string()))
            .with("value", AttributeValue::String(value.to_string()))
    }

    fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.attribute(key)? {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float attribute; integer attributes are widened.
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.attribute(key)? {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.attribute(key)? {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn binary(&self, key: &str) -> Option<&[u8]> {
        match self.attribute(key)? {
            AttributeValue::Binary(v) => Some(v),
            _ => None,
        }
    }
}

/// Flag + value pairs written by the processing side and polled by the
/// editor side.
///
/// Each slot stores an `f64` as bits in an `AtomicU64`. Setting a slot
/// overwrites any value not yet taken.
#[derive(Debug)]
pub struct ChangedValues {
    slots: Vec<(AtomicBool, AtomicU64)>,
}

impl ChangedValues {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|_| (AtomicBool::new(false), AtomicU64::new(0)))
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Publish a new value for `index`.
    #[inline]
    pub fn set(&self, index: usize, value: f64) {
        if let Some((flag, bits)) = self.slots.get(index) {
            bits.store(value.to_bits(), Ordering::Relaxed);
            flag.store(true, Ordering::Release);
        }
    }

    /// Take the pending value for `index`, clearing its flag.
    #[inline]
    pub fn take(&self, index: usize) -> Option<f64> {
        let (flag, bits) = self.slots.get(index)?;
        if flag.swap(false, Ordering::Acquire) {
            Some(f64::from_bits(bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    /// Take every pending value, in index order.
    pub fn drain(&self, mut f: impl FnMut(usize, f64)) {
        for index in 0..self.slots.len() {
            if let Some(value) = self.take(index) {
                f(index, value);
            }
        }
    }
}
