//! Deal — a pipeline opportunity, optionally tied to a contact in the same
//! tenant.
//!
//! `stage` is a free-form label (an open pipeline vocabulary), not an enum
//! enforced by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, contact::bump_updated_at};

/// A stored deal. Identifier and timestamps are store-assigned.
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
  pub id:         Uuid,
  #[serde(skip_serializing)]
  pub tenant_id:  Uuid,
  pub title:      String,
  pub stage:      String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value:      Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_id: Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:      Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// Client-supplied input for deal creation.
///
/// `contact_id` stays a string here so a malformed reference inside a bulk
/// batch is rejected per-record rather than failing the whole request during
/// deserialisation; same reasoning as [`ContactDraft`](crate::contact::ContactDraft)
/// for the required fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stage:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value:      Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:      Option<String>,
}

impl DealDraft {
  /// Parse the optional contact reference. `Ok(None)` when absent.
  pub fn contact_ref(&self) -> Result<Option<Uuid>> {
    match self.contact_id.as_deref() {
      None => Ok(None),
      Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| {
        Error::Reference(format!("malformed contact reference: {raw:?}"))
      }),
    }
  }

  /// Check required fields and value bounds. Does not resolve the contact
  /// reference against the store; the backend does that inside the same
  /// transaction as the insert.
  pub fn validate(&self) -> Result<()> {
    match &self.title {
      Some(title) if !title.trim().is_empty() => {}
      Some(_) => return Err(Error::Validation("title must not be empty".into())),
      None => return Err(Error::Validation("missing required field: title".into())),
    }
    match &self.stage {
      Some(stage) if !stage.trim().is_empty() => {}
      Some(_) => return Err(Error::Validation("stage must not be empty".into())),
      None => return Err(Error::Validation("missing required field: stage".into())),
    }
    if let Some(value) = self.value
      && !(value.is_finite() && value >= 0.0)
    {
      return Err(Error::Validation(format!(
        "value must be a non-negative number, got {value}"
      )));
    }
    self.contact_ref()?;
    Ok(())
  }

  /// Consume the draft and produce a stored record. The caller must have
  /// resolved `contact_id` within the owning tenant already.
  pub fn into_record(self, tenant_id: Uuid) -> Result<Deal> {
    let contact_id = self.contact_ref()?;
    let title = match self.title {
      Some(title) if !title.trim().is_empty() => title,
      _ => return Err(Error::Validation("missing required field: title".into())),
    };
    let stage = match self.stage {
      Some(stage) if !stage.trim().is_empty() => stage,
      _ => return Err(Error::Validation("missing required field: stage".into())),
    };
    let now = Utc::now();
    Ok(Deal {
      id: Uuid::new_v4(),
      tenant_id,
      title,
      stage,
      value: self.value,
      priority: self.priority,
      contact_id,
      notes: self.notes,
      created_at: now,
      updated_at: now,
    })
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// Partial update for a deal. A supplied `contact_id` must re-resolve within
/// the tenant at write time; the backend checks that before persisting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealPatch {
  pub title:      Option<String>,
  pub stage:      Option<String>,
  pub value:      Option<f64>,
  pub priority:   Option<String>,
  pub contact_id: Option<String>,
  pub notes:      Option<String>,
}

impl DealPatch {
  /// Parse the supplied contact reference, if any.
  pub fn contact_ref(&self) -> Result<Option<Uuid>> {
    match self.contact_id.as_deref() {
      None => Ok(None),
      Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| {
        Error::Reference(format!("malformed contact reference: {raw:?}"))
      }),
    }
  }

  /// Merge supplied fields into `deal`, re-validating touched constrained
  /// fields, and bump `updated_at`.
  pub fn apply(self, deal: &mut Deal) -> Result<()> {
    let contact_id = self.contact_ref()?;
    if let Some(title) = self.title {
      if title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
      }
      deal.title = title;
    }
    if let Some(stage) = self.stage {
      if stage.trim().is_empty() {
        return Err(Error::Validation("stage must not be empty".into()));
      }
      deal.stage = stage;
    }
    if let Some(value) = self.value {
      if !(value.is_finite() && value >= 0.0) {
        return Err(Error::Validation(format!(
          "value must be a non-negative number, got {value}"
        )));
      }
      deal.value = Some(value);
    }
    if let Some(priority) = self.priority {
      deal.priority = Some(priority);
    }
    if let Some(id) = contact_id {
      deal.contact_id = Some(id);
    }
    if let Some(notes) = self.notes {
      deal.notes = Some(notes);
    }
    deal.updated_at = bump_updated_at(deal.updated_at);
    Ok(())
  }
}
