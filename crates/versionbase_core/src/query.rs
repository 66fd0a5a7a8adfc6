//! Caller-supplied predicate and projection for `find_items`.
//!
//! The engine never interprets query text. Callers hand it a value that can
//! test an item and a value that can turn an item into a result; closures
//! work for both.

use crate::item::Item;
use serde_json::Value;

/// Decides whether an item is part of a `find_items` result.
pub trait ItemFilter {
    /// Returns true if `item` matches.
    fn matches(&self, item: &Item) -> bool;
}

/// Turns a matching item into a `find_items` result entry.
pub trait ItemProjection {
    /// Projects `item`.
    fn project(&self, item: &Item) -> Value;
}

impl<F> ItemFilter for F
where
    F: Fn(&Item) -> bool,
{
    fn matches(&self, item: &Item) -> bool {
        self(item)
    }
}

impl<F> ItemProjection for F
where
    F: Fn(&Item) -> Value,
{
    fn project(&self, item: &Item) -> Value {
        self(item)
    }
}

/// Filter that accepts every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl ItemFilter for MatchAll {
    fn matches(&self, _item: &Item) -> bool {
        true
    }
}

/// Projection that returns the whole record, stamps included.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeItem;

impl ItemProjection for WholeItem {
    fn project(&self, item: &Item) -> Value {
        item.to_value()
    }
}
