//! Write targets: where parsed values end up.

use std::collections::BTreeMap;

use crate::value::{FromValue, Value, ValueType};

// ============================================================================
// Destination
// ============================================================================

/// A slot in the target object graph that an option or the positional
/// arguments write to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    path: String,
    value_type: ValueType,
    multi_valued: bool,
}

impl Destination {
    /// Overwritten by every occurrence; the last one wins.
    pub fn single(path: &str, value_type: ValueType) -> Self {
        Destination {
            path: path.to_string(),
            value_type,
            multi_valued: false,
        }
    }

    /// Accumulates every occurrence in encounter order.
    pub fn multi(path: &str, value_type: ValueType) -> Self {
        Destination {
            path: path.to_string(),
            value_type,
            multi_valued: true,
        }
    }

    /// Presence-only boolean.
    pub fn flag(path: &str) -> Self {
        Self::single(path, ValueType::Bool)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    pub fn write<T: Target + ?Sized>(&self, target: &mut T, value: Value) -> Result<(), String> {
        if self.multi_valued {
            target.append(&self.path, value)
        } else {
            target.set(&self.path, value)
        }
    }
}

// ============================================================================
// Target
// ============================================================================

/// Receiver of parsed values for one command invocation.
///
/// A fresh target is created for every parse and only written once the whole
/// argument vector has been accepted.
pub trait Target {
    /// Store a single-valued destination, replacing any previous value.
    fn set(&mut self, path: &str, value: Value) -> Result<(), String>;

    /// Push onto a multi-valued destination.
    fn append(&mut self, path: &str, value: Value) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Single(Value),
    Multi(Vec<Value>),
}

/// Path-keyed target used by [`Cli::parse`](crate::Cli::parse).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    slots: BTreeMap<String, Slot>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed value at `path`. For a multi-valued slot this is the last value.
    pub fn get<T: FromValue>(&self, path: &str) -> Option<T> {
        self.value(path).and_then(T::from_value)
    }

    /// Every value at `path` that converts to `T`, in write order.
    pub fn get_all<T: FromValue>(&self, path: &str) -> Vec<T> {
        match self.slots.get(path) {
            Some(Slot::Single(v)) => T::from_value(v).into_iter().collect(),
            Some(Slot::Multi(vs)) => vs.iter().filter_map(T::from_value).collect(),
            None => Vec::new(),
        }
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        match self.slots.get(path)? {
            Slot::Single(v) => Some(v),
            Slot::Multi(vs) => vs.last(),
        }
    }

    pub fn is_present(&self, path: &str) -> bool {
        self.slots.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Target for Values {
    fn set(&mut self, path: &str, value: Value) -> Result<(), String> {
        if let Some(Slot::Multi(_)) = self.slots.get(path) {
            return Err("destination is multi-valued".to_string());
        }
        self.slots.insert(path.to_string(), Slot::Single(value));
        Ok(())
    }

    fn append(&mut self, path: &str, value: Value) -> Result<(), String> {
        match self
            .slots
            .entry(path.to_string())
            .or_insert_with(|| Slot::Multi(Vec::new()))
        {
            Slot::Multi(values) => {
                values.push(value);
                Ok(())
            }
            Slot::Single(_) => Err("destination is single-valued".to_string()),
        }
    }
}
