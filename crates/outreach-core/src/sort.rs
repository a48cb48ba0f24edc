//! Sort keys shared by the server's ORDER BY and client-side re-sorting.
//!
//! The SQLite backend orders rows in SQL; a client that already holds a set
//! of pages re-sorts them in memory through [`sort_by_field`]. Both sides
//! derive their keys from the same rules so a collection sorted by either
//! looks the same.

use std::cmp::Ordering;

use crate::query::SortOrder;

/// Unicode case folding used for every case-insensitive comparison, both
/// here and in the SQLite backend's `fold()` SQL function.
pub fn fold_case(s: &str) -> String { s.to_lowercase() }

/// Anything with a stable integer identity.
pub trait Identified {
  fn id(&self) -> i64;
}

/// A comparable projection of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
  /// Case-folded text.
  Text(String),
  Int(i64),
  Float(f64),
}

impl SortValue {
  /// Case-fold `s` for name-like comparisons.
  pub fn folded(s: &str) -> Self { Self::Text(fold_case(s)) }

  fn rank(&self) -> u8 {
    match self {
      Self::Text(_) => 0,
      Self::Int(_) => 1,
      Self::Float(_) => 2,
    }
  }

  /// Total order over sort values; mixed variants order by variant.
  pub fn compare(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Self::Text(a), Self::Text(b)) => a.cmp(b),
      (Self::Int(a), Self::Int(b)) => a.cmp(b),
      (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
      (a, b) => a.rank().cmp(&b.rank()),
    }
  }
}

/// A record that can be ordered by any of a fixed set of fields.
pub trait Sortable {
  type Field: Copy;

  fn sort_value(&self, field: Self::Field) -> SortValue;
}

/// Stable in-place sort. Items with equal keys keep their current relative
/// order in both directions, so ascending and descending are exact mirrors
/// whenever all keys are distinct.
pub fn sort_by_field<T: Sortable>(items: &mut [T], field: T::Field, order: SortOrder) {
  items.sort_by(|a, b| {
    let ord = a.sort_value(field).compare(&b.sort_value(field));
    match order {
      SortOrder::Asc => ord,
      SortOrder::Desc => ord.reverse(),
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  struct Row {
    id:   i64,
    name: &'static str,
  }

  impl Sortable for Row {
    type Field = ();

    fn sort_value(&self, _: ()) -> SortValue { SortValue::folded(self.name) }
  }

  fn rows(names: &[&'static str]) -> Vec<Row> {
    names
      .iter()
      .enumerate()
      .map(|(i, n)| Row { id: i as i64, name: n })
      .collect()
  }

  #[test]
  fn ascending_and_descending_mirror_for_distinct_keys() {
    let mut asc = rows(&["carol", "Alice", "bob", "Dave"]);
    sort_by_field(&mut asc, (), SortOrder::Asc);
    let mut desc = asc.clone();
    sort_by_field(&mut desc, (), SortOrder::Desc);

    let names: Vec<_> = asc.iter().map(|r| r.name).collect();
    assert_eq!(names, ["Alice", "bob", "carol", "Dave"]);
    desc.reverse();
    assert_eq!(asc, desc);
  }

  #[test]
  fn ties_keep_original_order() {
    let mut items = rows(&["same", "Same", "other", "SAME"]);
    sort_by_field(&mut items, (), SortOrder::Asc);
    let ids: Vec<_> = items.iter().map(|r| r.id).collect();
    assert_eq!(ids, [2, 0, 1, 3]);

    let mut items = rows(&["same", "Same", "other", "SAME"]);
    sort_by_field(&mut items, (), SortOrder::Desc);
    let ids: Vec<_> = items.iter().map(|r| r.id).collect();
    assert_eq!(ids, [0, 1, 3, 2]);
  }

  #[test]
  fn folding_covers_non_ascii_letters() {
    assert_eq!(fold_case("ÉDITIONS Ölund"), "éditions ölund");
    let mut items = rows(&["Émile", "zoe", "Adam", "émilie"]);
    sort_by_field(&mut items, (), SortOrder::Asc);
    let names: Vec<_> = items.iter().map(|r| r.name).collect();
    assert_eq!(names, ["Adam", "zoe", "Émile", "émilie"]);
  }

  #[test]
  fn float_compare_is_total() {
    assert_eq!(SortValue::Float(1.5).compare(&SortValue::Float(0.5)), Ordering::Greater);
    assert_eq!(SortValue::Int(0).compare(&SortValue::Int(0)), Ordering::Equal);
  }
}
