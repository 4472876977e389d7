//! Contact — a person record owned by a tenant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A stored contact. Identifier and timestamps are store-assigned; clients
/// can never set them.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
  pub id:         Uuid,
  #[serde(skip_serializing)]
  pub tenant_id:  Uuid,
  pub name:       String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:      Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// Client-supplied input for contact creation.
///
/// `name` is required but modelled as `Option` so that a record missing it
/// inside a bulk batch becomes a per-record rejection instead of failing the
/// whole request at the deserialisation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:    Option<String>,
}

impl ContactDraft {
  /// Check required fields. Invariant: a draft that passes converts cleanly
  /// via [`into_record`](Self::into_record).
  pub fn validate(&self) -> Result<()> {
    match &self.name {
      Some(name) if !name.trim().is_empty() => Ok(()),
      Some(_) => Err(Error::Validation("name must not be empty".into())),
      None => Err(Error::Validation("missing required field: name".into())),
    }
  }

  /// Consume the draft and produce a stored record with a fresh identifier
  /// and store-assigned timestamps.
  pub fn into_record(self, tenant_id: Uuid) -> Result<Contact> {
    let name = match self.name {
      Some(name) if !name.trim().is_empty() => name,
      _ => return Err(Error::Validation("missing required field: name".into())),
    };
    let now = Utc::now();
    Ok(Contact {
      id: Uuid::new_v4(),
      tenant_id,
      name,
      email: self.email,
      phone: self.phone,
      company: self.company,
      role: self.role,
      location: self.location,
      notes: self.notes,
      created_at: now,
      updated_at: now,
    })
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// Partial update: only supplied fields change, omitted fields retain their
/// prior value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
  pub company:  Option<String>,
  pub role:     Option<String>,
  pub location: Option<String>,
  pub notes:    Option<String>,
}

impl ContactPatch {
  /// Merge supplied fields into `contact`, re-validating touched constrained
  /// fields, and bump `updated_at`.
  pub fn apply(self, contact: &mut Contact) -> Result<()> {
    if let Some(name) = self.name {
      if name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty".into()));
      }
      contact.name = name;
    }
    if let Some(email) = self.email {
      contact.email = Some(email);
    }
    if let Some(phone) = self.phone {
      contact.phone = Some(phone);
    }
    if let Some(company) = self.company {
      contact.company = Some(company);
    }
    if let Some(role) = self.role {
      contact.role = Some(role);
    }
    if let Some(location) = self.location {
      contact.location = Some(location);
    }
    if let Some(notes) = self.notes {
      contact.notes = Some(notes);
    }
    contact.updated_at = bump_updated_at(contact.updated_at);
    Ok(())
  }
}

/// `updated_at` must strictly increase across updates, even when two updates
/// land within the clock's resolution.
pub fn bump_updated_at(prev: DateTime<Utc>) -> DateTime<Utc> {
  std::cmp::max(Utc::now(), prev + Duration::microseconds(1))
}
