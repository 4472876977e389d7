//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; UUIDs as hyphenated lowercase
//! strings.

use chrono::{DateTime, Utc};
use orbit_core::{
  contact::Contact,
  deal::Deal,
  tenant::{ApiKey, Tenant, TenantProfile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `tenants` row.
pub struct RawTenant {
  pub tenant_id:  String,
  pub email:      String,
  pub api_key:    String,
  pub created_at: String,
}

impl RawTenant {
  pub fn into_tenant(self) -> Result<Tenant> {
    Ok(Tenant {
      id:         decode_uuid(&self.tenant_id)?,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }

  pub fn into_profile(self) -> Result<TenantProfile> {
    Ok(TenantProfile {
      id:         decode_uuid(&self.tenant_id)?,
      email:      self.email,
      api_key:    ApiKey::from(self.api_key),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id: String,
  pub tenant_id:  String,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub company:    Option<String>,
  pub role:       Option<String>,
  pub location:   Option<String>,
  pub notes:      Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawContact {
  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:         decode_uuid(&self.contact_id)?,
      tenant_id:  decode_uuid(&self.tenant_id)?,
      name:       self.name,
      email:      self.email,
      phone:      self.phone,
      company:    self.company,
      role:       self.role,
      location:   self.location,
      notes:      self.notes,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `deals` row.
pub struct RawDeal {
  pub deal_id:    String,
  pub tenant_id:  String,
  pub title:      String,
  pub stage:      String,
  pub value:      Option<f64>,
  pub priority:   Option<String>,
  pub contact_id: Option<String>,
  pub notes:      Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawDeal {
  pub fn into_deal(self) -> Result<Deal> {
    let contact_id = self.contact_id.as_deref().map(decode_uuid).transpose()?;
    Ok(Deal {
      id:         decode_uuid(&self.deal_id)?,
      tenant_id:  decode_uuid(&self.tenant_id)?,
      title:      self.title,
      stage:      self.stage,
      value:      self.value,
      priority:   self.priority,
      contact_id,
      notes:      self.notes,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
