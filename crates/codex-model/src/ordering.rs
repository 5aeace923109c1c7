//! Sibling ordering policy
//!
//! Ordering is decided per sibling list and nowhere else: a list is
//! [`OrderMode::Keyed`] as soon as one sibling carries an explicit `order`,
//! otherwise array position is authoritative. A parent's mode never leaks
//! into its children's lists.

use crate::document::ChildNode;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Key used for siblings without an explicit order in a keyed list
pub const UNORDERED: i64 = i64::MAX;

/// Anything that can sit in an ordered sibling list
pub trait Ordered {
    /// Explicit order key, if any
    fn order_key(&self) -> Option<i64>;

    /// Name used to break order-key ties
    fn sort_name(&self) -> Cow<'_, str>;

    /// Nested sibling list, ordered independently
    fn nested_mut(&mut self) -> Option<&mut Vec<Self>>
    where
        Self: Sized,
    {
        None
    }
}

/// How one sibling list is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// No sibling has an order key: array position is the order
    Positional,
    /// At least one sibling has an order key
    Keyed,
}

impl OrderMode {
    /// Mode of a sibling list
    #[must_use]
    pub fn of<T: Ordered>(siblings: &[T]) -> Self {
        if siblings.iter().any(|s| s.order_key().is_some()) {
            Self::Keyed
        } else {
            Self::Positional
        }
    }
}

/// Policy comparison: order key ascending (missing keys last), then name
///
/// Callers sort stably, so full ties keep their original array position.
pub fn compare<T: Ordered>(a: &T, b: &T) -> Ordering {
    let key = |n: &T| n.order_key().unwrap_or(UNORDERED);
    key(a)
        .cmp(&key(b))
        .then_with(|| a.sort_name().cmp(&b.sort_name()))
}

/// Order one sibling list in place, returning the mode that applied
pub fn sort_siblings<T: Ordered>(siblings: &mut [T]) -> OrderMode {
    let mode = OrderMode::of(siblings);
    if mode == OrderMode::Keyed {
        siblings.sort_by(compare);
    }
    mode
}

/// Order one sibling list
#[must_use]
pub fn order<T: Ordered>(mut siblings: Vec<T>) -> Vec<T> {
    sort_siblings(&mut siblings);
    siblings
}

/// Order a list and, independently, every list nested below it
pub fn order_tree<T: Ordered>(siblings: &mut [T]) {
    sort_siblings(siblings);
    for sibling in siblings.iter_mut() {
        if let Some(nested) = sibling.nested_mut() {
            order_tree(nested);
        }
    }
}

impl Ordered for ChildNode {
    fn order_key(&self) -> Option<i64> {
        self.order()
    }

    fn sort_name(&self) -> Cow<'_, str> {
        self.display_name()
    }

    fn nested_mut(&mut self) -> Option<&mut Vec<Self>> {
        self.children_mut()
    }
}
