//! Generic decoded message trees.
//!
//! A [`Tree`] maps field numbers to the values found for them, in order of
//! first appearance. A number seen once holds a single value; a number seen
//! more than once holds every occurrence in encounter order. Trees are
//! immutable once built; [`TreeBuilder`] is the only way to make one.

use crate::value::Value;
use crate::wire::RawField;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// The values recorded for one field number
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// The field appeared once
    Single(Value),
    /// The field appeared more than once
    Repeated(Vec<Value>),
}

impl Entry {
    /// All occurrences, in encounter order
    pub fn values(&self) -> &[Value] {
        match self {
            Entry::Single(value) => std::slice::from_ref(value),
            Entry::Repeated(values) => values,
        }
    }

    /// The first occurrence
    pub fn first(&self) -> Option<&Value> {
        self.values().first()
    }

    fn push(&mut self, value: Value) {
        match self {
            Entry::Repeated(values) => values.push(value),
            Entry::Single(first) => {
                let first = std::mem::replace(first, Value::Integer(0));
                *self = Entry::Repeated(vec![first, value]);
            }
        }
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Single(value) => value.serialize(serializer),
            Entry::Repeated(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// An ordered mapping from field number to [`Entry`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    fields: Vec<(u32, Entry)>,
}

impl Tree {
    /// An empty tree
    pub const fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Number of distinct field numbers
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the tree holds no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The entry recorded for `number`
    pub fn get(&self, number: u32) -> Option<&Entry> {
        self.fields
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, entry)| entry)
    }

    /// The first value recorded for `number`
    pub fn first(&self, number: u32) -> Option<&Value> {
        self.get(number).and_then(Entry::first)
    }

    /// Every value recorded for `number`; empty if the field is absent
    pub fn values(&self, number: u32) -> &[Value] {
        self.get(number).map(Entry::values).unwrap_or_default()
    }

    /// Follows `path` through nested messages, taking the first value at
    /// each step.
    ///
    /// `tree.path(&[15, 1])` is field 1 of the message in field 15.
    pub fn path(&self, path: &[u32]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut tree = self;
        for number in parents {
            tree = tree.first(*number)?.as_message()?;
        }
        tree.first(*last)
    }

    /// Field numbers and entries, in order of first appearance
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Entry)> + '_ {
        self.fields.iter().map(|(n, entry)| (*n, entry))
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (number, entry) in &self.fields {
            map.serialize_entry(&number.to_string(), entry)?;
        }
        map.end()
    }
}

/// Accumulates field values into a [`Tree`]
#[derive(Debug, Default)]
pub struct TreeBuilder {
    fields: Vec<(u32, Entry)>,
    index: HashMap<u32, usize>,
}

impl TreeBuilder {
    /// Creates an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of field `number`
    pub fn push(&mut self, number: u32, value: Value) {
        match self.index.get(&number) {
            Some(&i) => self.fields[i].1.push(value),
            None => {
                self.index.insert(number, self.fields.len());
                self.fields.push((number, Entry::Single(value)));
            }
        }
    }

    /// Returns true if nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finishes the tree
    pub fn build(self) -> Tree {
        Tree {
            fields: self.fields,
        }
    }
}

impl FromIterator<(u32, Value)> for Tree {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        let mut builder = TreeBuilder::new();
        for (number, value) in iter {
            builder.push(number, value);
        }
        builder.build()
    }
}

/// Group materialized fields by field number.
pub fn build<'a>(fields: impl IntoIterator<Item = (RawField<'a>, Value)>) -> Tree {
    fields
        .into_iter()
        .map(|(field, value)| (field.number, value))
        .collect()
}
