//! Tuning knobs: duplicate predicates and the contact-delete cascade.
//!
//! The duplicate predicate is a declared policy value per resource type, not
//! hard-wired into the ingestion engine, so it can be adjusted against real
//! traffic without touching the engine itself.

use serde::{Deserialize, Serialize};

use crate::{contact::ContactDraft, deal::DealDraft};

/// Duplicate predicate for contacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactDedup {
  /// Case-insensitive email match. Contacts without an email carry no
  /// duplicate key and are always created.
  #[default]
  EmailInsensitive,
  /// No deduplication; every valid record is created.
  Never,
}

impl ContactDedup {
  pub fn key(&self, draft: &ContactDraft) -> Option<String> {
    draft.email.as_deref().and_then(|email| self.key_for_email(email))
  }

  /// The key a stored record with this email would carry.
  pub fn key_for_email(&self, email: &str) -> Option<String> {
    match self {
      ContactDedup::EmailInsensitive => Some(email.to_lowercase()),
      ContactDedup::Never => None,
    }
  }
}

/// Duplicate predicate for deals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealDedup {
  /// Exact match on the title+stage pair.
  #[default]
  TitleStage,
  /// No deduplication; every valid record is created.
  Never,
}

impl DealDedup {
  pub fn key(&self, draft: &DealDraft) -> Option<String> {
    match (&draft.title, &draft.stage) {
      (Some(title), Some(stage)) => self.key_for(title, stage),
      _ => None,
    }
  }

  /// The key a stored record with this title+stage pair would carry.
  /// The \x1f separator keeps ("a:b", "c") and ("a", "b:c") distinct.
  pub fn key_for(&self, title: &str, stage: &str) -> Option<String> {
    match self {
      DealDedup::TitleStage => Some(format!("{title}\u{1f}{stage}")),
      DealDedup::Never => None,
    }
  }
}

/// What happens to deals referencing a contact when that contact is deleted.
/// Either way the step runs in the same transaction as the contact removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
  /// Delete the referencing deals along with the contact.
  #[default]
  DeleteDeals,
  /// Clear the reference and leave the deals intact.
  DetachDeals,
}

/// The full policy bundle a store is constructed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePolicy {
  #[serde(default)]
  pub contact_dedup: ContactDedup,
  #[serde(default)]
  pub deal_dedup:    DealDedup,
  #[serde(default)]
  pub cascade:       CascadePolicy,
}
