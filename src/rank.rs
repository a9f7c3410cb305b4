//! Stable score-based ranking of merged search results.
//!
//! [`WeightedList`] orders `(score, payload)` pairs by descending score
//! with a stable sort, so equal-score ties keep their insertion order.
//! Ties commonly come from same-provider results that are already in a
//! meaningful order; stability here is a hard requirement, not an
//! optimization.

use std::cmp::Ordering;

/// A list of scored payloads with stable descending ordering.
pub struct WeightedList<T> {
    entries: Vec<(f64, T)>,
}

impl<T> WeightedList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a payload with its score.
    pub fn push(&mut self, score: f64, value: T) {
        self.entries.push((score, value));
    }

    /// Sort by score, highest first. Equal scores keep insertion order.
    ///
    /// `Vec::sort_by` is a stable sort, which is what makes the tie
    /// guarantee hold. NaN scores compare as equal and stay put.
    pub fn sort_descending(&mut self) {
        self.entries
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    }

    /// Reverse the current order in place.
    pub fn reverse(&mut self) {
        self.entries.reverse();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no entries have been pushed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the list, yielding payloads in the current order.
    pub fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

impl<T> Default for WeightedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_scores_sort_strictly_descending() {
        let mut list = WeightedList::new();
        list.push(0.5, "c");
        list.push(1.5, "a");
        list.push(1.0, "b");
        list.sort_descending();
        assert_eq!(list.into_values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut list = WeightedList::new();
        list.push(1.0, "first");
        list.push(2.0, "top");
        list.push(1.0, "second");
        list.push(1.0, "third");
        list.sort_descending();
        assert_eq!(list.into_values(), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn reverse_flips_order() {
        let mut list = WeightedList::new();
        list.push(2.0, "a");
        list.push(1.0, "b");
        list.sort_descending();
        list.reverse();
        assert_eq!(list.into_values(), vec!["b", "a"]);
    }

    #[test]
    fn nan_scores_do_not_panic_or_reorder() {
        let mut list = WeightedList::new();
        list.push(f64::NAN, "x");
        list.push(1.0, "y");
        list.push(f64::NAN, "z");
        list.sort_descending();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn empty_list_is_empty() {
        let list: WeightedList<&str> = WeightedList::new();
        assert!(list.is_empty());
        assert!(list.into_values().is_empty());
    }
}
