//! Bulk ingestion — create-or-skip classification.
//!
//! The classification pass is pure: it partitions an ordered batch into
//! records to create, records skipped as duplicates, and records rejected by
//! validation. Backends run it against a snapshot of existing duplicate keys
//! inside the same transaction as the inserts, so the check and the creates
//! are observed atomically by other writers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One record or many. A single JSON object is treated as a one-element
/// batch; processing follows input order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> OneOrMany<T> {
  pub fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::One(item) => vec![item],
      OneOrMany::Many(items) => items,
    }
  }
}

/// A record refused by validation, carried back with its reason. Distinct
/// from a skip: a skip is a successful no-op, a rejection is a per-record
/// failure.
#[derive(Debug, Clone, Serialize)]
pub struct Rejected<I> {
  pub record: I,
  pub reason: String,
}

/// The partitioned result of a bulk call. Relative input order is preserved
/// within each partition.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome<T, I> {
  pub created:  Vec<T>,
  pub skipped:  Vec<I>,
  pub rejected: Vec<Rejected<I>>,
}

/// Classification output; `to_create` still needs identifiers and
/// timestamps assigned by the store.
#[derive(Debug)]
pub struct Classified<I> {
  pub to_create: Vec<I>,
  pub skipped:   Vec<I>,
  pub rejected:  Vec<Rejected<I>>,
}

/// Partition `inputs` in order.
///
/// `existing` holds the duplicate keys already present for the tenant; keys
/// of records classified for creation are added to it as they are seen, so
/// duplicates *within* the batch collapse to a single create. A record with
/// no duplicate key (`key_of` returns `None`) is always created.
pub fn classify<I>(
  inputs:   Vec<I>,
  existing: &mut HashSet<String>,
  key_of:   impl Fn(&I) -> Option<String>,
  validate: impl Fn(&I) -> Result<(), Error>,
) -> Classified<I> {
  let mut to_create = Vec::new();
  let mut skipped = Vec::new();
  let mut rejected = Vec::new();

  for input in inputs {
    if let Err(reason) = validate(&input) {
      rejected.push(Rejected { record: input, reason: reason.to_string() });
      continue;
    }
    match key_of(&input) {
      Some(key) if existing.contains(&key) => skipped.push(input),
      Some(key) => {
        existing.insert(key);
        to_create.push(input);
      }
      None => to_create.push(input),
    }
  }

  Classified { to_create, skipped, rejected }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lower(s: &&str) -> Option<String> { Some(s.to_lowercase()) }

  fn accept(_: &&str) -> Result<(), Error> { Ok(()) }

  #[test]
  fn single_object_normalises_to_one_element_batch() {
    let one: OneOrMany<u32> = serde_json::from_str("7").unwrap();
    let many: OneOrMany<u32> = serde_json::from_str("[1,2]").unwrap();
    assert_eq!(one.into_vec(), vec![7]);
    assert_eq!(many.into_vec(), vec![1, 2]);
  }

  #[test]
  fn duplicates_against_existing_keys_are_skipped() {
    let mut existing = HashSet::from(["ada@example.com".to_string()]);
    let out = classify(vec!["Ada@Example.com", "new@example.com"], &mut existing, lower, accept);
    assert_eq!(out.skipped, vec!["Ada@Example.com"]);
    assert_eq!(out.to_create, vec!["new@example.com"]);
    assert!(out.rejected.is_empty());
  }

  #[test]
  fn duplicates_within_the_batch_collapse_to_one_create() {
    let mut existing = HashSet::new();
    let out = classify(vec!["a@x.com", "A@X.COM"], &mut existing, lower, accept);
    assert_eq!(out.to_create, vec!["a@x.com"]);
    assert_eq!(out.skipped, vec!["A@X.COM"]);
  }

  #[test]
  fn keyless_records_always_create() {
    let mut existing = HashSet::new();
    let out = classify(vec!["x", "x"], &mut existing, |_| None, accept);
    assert_eq!(out.to_create.len(), 2);
    assert!(out.skipped.is_empty());
  }

  #[test]
  fn rejections_do_not_abort_later_records() {
    let mut existing = HashSet::new();
    let out = classify(
      vec!["ok-1", "bad", "ok-2"],
      &mut existing,
      |_| None,
      |s| {
        if *s == "bad" {
          Err(Error::Validation("missing required field: name".into()))
        } else {
          Ok(())
        }
      },
    );
    assert_eq!(out.to_create, vec!["ok-1", "ok-2"]);
    assert_eq!(out.rejected.len(), 1);
    assert_eq!(out.rejected[0].record, "bad");
    assert!(out.rejected[0].reason.contains("name"));
  }
}
