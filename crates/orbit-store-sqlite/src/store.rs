//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::{collections::HashSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use orbit_core::{
  bulk::{self, BulkOutcome},
  contact::{Contact, ContactDraft, ContactPatch},
  deal::{Deal, DealDraft, DealPatch},
  policy::{CascadePolicy, ContactDedup, DealDedup, StorePolicy},
  store::{ContactRemoval, RecordStore},
  tenant::{ApiKey, Tenant, TenantProfile, digest_of},
};

use crate::{
  encode::{RawContact, RawDeal, RawTenant, encode_dt, encode_uuid, decode_uuid},
  schema::SCHEMA,
  Error, Result,
};

const CONTACT_COLS: &str =
  "contact_id, tenant_id, name, email, phone, company, role, location, notes, \
   created_at, updated_at";

const DEAL_COLS: &str =
  "deal_id, tenant_id, title, stage, value, priority, contact_id, notes, \
   created_at, updated_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Orbit record store backed by a single SQLite file.
///
/// All access is funnelled through one connection thread, so every mutation
/// (each a single transaction) is serialised against every other. The
/// duplicate check inside a bulk create and the cascade step inside a
/// contact delete are therefore atomic with their writes.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: StorePolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default policies and run
  /// schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StorePolicy::default()).await
  }

  /// Open (or create) a store at `path` with explicit dedup/cascade
  /// policies.
  pub async fn open_with(path: impl AsRef<Path>, policy: StorePolicy) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, policy };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StorePolicy::default()).await
  }

  /// In-memory store with explicit policies.
  pub async fn open_in_memory_with(policy: StorePolicy) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, policy };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn read_tenant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTenant> {
  Ok(RawTenant {
    tenant_id:  row.get(0)?,
    email:      row.get(1)?,
    api_key:    row.get(2)?,
    created_at: row.get(3)?,
  })
}

fn read_contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawContact> {
  Ok(RawContact {
    contact_id: row.get(0)?,
    tenant_id:  row.get(1)?,
    name:       row.get(2)?,
    email:      row.get(3)?,
    phone:      row.get(4)?,
    company:    row.get(5)?,
    role:       row.get(6)?,
    location:   row.get(7)?,
    notes:      row.get(8)?,
    created_at: row.get(9)?,
    updated_at: row.get(10)?,
  })
}

fn read_deal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDeal> {
  Ok(RawDeal {
    deal_id:    row.get(0)?,
    tenant_id:  row.get(1)?,
    title:      row.get(2)?,
    stage:      row.get(3)?,
    value:      row.get(4)?,
    priority:   row.get(5)?,
    contact_id: row.get(6)?,
    notes:      row.get(7)?,
    created_at: row.get(8)?,
    updated_at: row.get(9)?,
  })
}

// ─── In-transaction helpers ──────────────────────────────────────────────────

fn insert_contact(conn: &rusqlite::Connection, contact: &Contact) -> Result<()> {
  conn.execute(
    "INSERT INTO contacts (
       contact_id, tenant_id, name, email, phone, company, role, location,
       notes, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      encode_uuid(contact.id),
      encode_uuid(contact.tenant_id),
      contact.name,
      contact.email,
      contact.phone,
      contact.company,
      contact.role,
      contact.location,
      contact.notes,
      encode_dt(contact.created_at),
      encode_dt(contact.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_deal(conn: &rusqlite::Connection, deal: &Deal) -> Result<()> {
  conn.execute(
    "INSERT INTO deals (
       deal_id, tenant_id, title, stage, value, priority, contact_id, notes,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(deal.id),
      encode_uuid(deal.tenant_id),
      deal.title,
      deal.stage,
      deal.value,
      deal.priority,
      deal.contact_id.map(encode_uuid),
      deal.notes,
      encode_dt(deal.created_at),
      encode_dt(deal.updated_at),
    ],
  )?;
  Ok(())
}

/// Duplicate keys of the tenant's stored contacts, under `policy`.
fn existing_contact_keys(
  conn:      &rusqlite::Connection,
  tenant_id: &str,
  policy:    ContactDedup,
) -> Result<HashSet<String>> {
  if policy == ContactDedup::Never {
    return Ok(HashSet::new());
  }
  let mut stmt = conn.prepare(
    "SELECT email FROM contacts WHERE tenant_id = ?1 AND email IS NOT NULL",
  )?;
  let emails = stmt
    .query_map(params![tenant_id], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(
    emails
      .iter()
      .filter_map(|email| policy.key_for_email(email))
      .collect(),
  )
}

/// Duplicate keys of the tenant's stored deals, under `policy`.
fn existing_deal_keys(
  conn:      &rusqlite::Connection,
  tenant_id: &str,
  policy:    DealDedup,
) -> Result<HashSet<String>> {
  if policy == DealDedup::Never {
    return Ok(HashSet::new());
  }
  let mut stmt =
    conn.prepare("SELECT title, stage FROM deals WHERE tenant_id = ?1")?;
  let pairs = stmt
    .query_map(params![tenant_id], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(
    pairs
      .iter()
      .filter_map(|(title, stage)| policy.key_for(title, stage))
      .collect(),
  )
}

/// The tenant's contact ids, for resolving deal references.
fn tenant_contact_ids(
  conn:      &rusqlite::Connection,
  tenant_id: &str,
) -> Result<HashSet<Uuid>> {
  let mut stmt =
    conn.prepare("SELECT contact_id FROM contacts WHERE tenant_id = ?1")?;
  let ids = stmt
    .query_map(params![tenant_id], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  ids.iter().map(|id| decode_uuid(id)).collect()
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Identity & keys ───────────────────────────────────────────────────────

  async fn create_tenant(&self, email: String) -> Result<(Tenant, ApiKey)> {
    let tenant = Tenant { id: Uuid::new_v4(), email, created_at: Utc::now() };
    let key = ApiKey::generate();

    let id_str     = encode_uuid(tenant.id);
    let email_str  = tenant.email.clone();
    let key_str    = key.as_str().to_owned();
    let digest_str = key.digest();
    let at_str     = encode_dt(tenant.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tenants (tenant_id, email, api_key, key_digest, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, email_str, key_str, digest_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok((tenant, key))
  }

  async fn resolve_key(&self, candidate: &str) -> Result<Uuid> {
    // Lookup is by SHA-256 digest, so no raw-key comparison happens here.
    let digest = digest_of(candidate);

    let row: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT tenant_id FROM tenants WHERE key_digest = ?1",
              params![digest],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match row {
      Some(id) => Ok(decode_uuid(&id)?),
      None => Err(Error::Core(orbit_core::Error::Unauthorized)),
    }
  }

  async fn rotate_key(&self, tenant_id: Uuid) -> Result<ApiKey> {
    let key = ApiKey::generate();

    let key_str    = key.as_str().to_owned();
    let digest_str = key.digest();
    let id_str     = encode_uuid(tenant_id);

    // A single UPDATE: the swap commits atomically, so the old key stops
    // resolving the instant this returns.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE tenants SET api_key = ?1, key_digest = ?2 WHERE tenant_id = ?3",
          params![key_str, digest_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(orbit_core::Error::NotFound(format!(
        "tenant {tenant_id}"
      ))));
    }
    Ok(key)
  }

  async fn profile(&self, tenant_id: Uuid) -> Result<TenantProfile> {
    let id_str = encode_uuid(tenant_id);

    let raw: Option<RawTenant> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT tenant_id, email, api_key, created_at FROM tenants
               WHERE tenant_id = ?1",
              params![id_str],
              read_tenant_row,
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_profile(),
      None => Err(Error::Core(orbit_core::Error::NotFound(format!(
        "tenant {tenant_id}"
      )))),
    }
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn list_contacts(&self, tenant_id: Uuid) -> Result<Vec<Contact>> {
    let id_str = encode_uuid(tenant_id);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLS} FROM contacts
           WHERE tenant_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(params![id_str], read_contact_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn get_contact(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Contact>> {
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLS} FROM contacts
                 WHERE tenant_id = ?1 AND contact_id = ?2"
              ),
              params![tenant_str, id_str],
              read_contact_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn create_contacts(
    &self,
    tenant_id: Uuid,
    drafts: Vec<ContactDraft>,
  ) -> Result<BulkOutcome<Contact, ContactDraft>> {
    let policy     = self.policy.contact_dedup;
    let tenant_str = encode_uuid(tenant_id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = (|| -> Result<BulkOutcome<Contact, ContactDraft>> {
          let mut existing = existing_contact_keys(&tx, &tenant_str, policy)?;

          let classified = bulk::classify(
            drafts,
            &mut existing,
            |draft| policy.key(draft),
            |draft| draft.validate(),
          );

          let mut created = Vec::with_capacity(classified.to_create.len());
          for draft in classified.to_create {
            let contact = draft.into_record(tenant_id)?;
            insert_contact(&tx, &contact)?;
            created.push(contact);
          }

          Ok(BulkOutcome {
            created,
            skipped: classified.skipped,
            rejected: classified.rejected,
          })
        })();
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn update_contact(
    &self,
    tenant_id: Uuid,
    id: Uuid,
    patch: ContactPatch,
  ) -> Result<Option<Contact>> {
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = (|| -> Result<Option<Contact>> {
          let raw = tx
            .query_row(
              &format!(
                "SELECT {CONTACT_COLS} FROM contacts
                 WHERE tenant_id = ?1 AND contact_id = ?2"
              ),
              params![tenant_str, id_str],
              read_contact_row,
            )
            .optional()?;

          let Some(raw) = raw else { return Ok(None) };
          let mut contact = raw.into_contact()?;
          patch.apply(&mut contact)?;

          tx.execute(
            "UPDATE contacts SET
               name = ?1, email = ?2, phone = ?3, company = ?4, role = ?5,
               location = ?6, notes = ?7, updated_at = ?8
             WHERE tenant_id = ?9 AND contact_id = ?10",
            params![
              contact.name,
              contact.email,
              contact.phone,
              contact.company,
              contact.role,
              contact.location,
              contact.notes,
              encode_dt(contact.updated_at),
              tenant_str,
              id_str,
            ],
          )?;
          Ok(Some(contact))
        })();
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn delete_contact(
    &self,
    tenant_id: Uuid,
    id: Uuid,
  ) -> Result<Option<ContactRemoval>> {
    let cascade    = self.policy.cascade;
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = (|| -> Result<Option<ContactRemoval>> {
          let exists: Option<bool> = tx
            .query_row(
              "SELECT 1 FROM contacts WHERE tenant_id = ?1 AND contact_id = ?2",
              params![tenant_str, id_str],
              |_| Ok(true),
            )
            .optional()?;
          if exists.is_none() {
            return Ok(None);
          }

          let removal = match cascade {
            CascadePolicy::DeleteDeals => {
              let n = tx.execute(
                "DELETE FROM deals WHERE tenant_id = ?1 AND contact_id = ?2",
                params![tenant_str, id_str],
              )?;
              ContactRemoval { deals_deleted: n, deals_detached: 0 }
            }
            CascadePolicy::DetachDeals => {
              let now_str = encode_dt(Utc::now());
              let n = tx.execute(
                "UPDATE deals SET contact_id = NULL, updated_at = ?3
                 WHERE tenant_id = ?1 AND contact_id = ?2",
                params![tenant_str, id_str, now_str],
              )?;
              ContactRemoval { deals_deleted: 0, deals_detached: n }
            }
          };

          tx.execute(
            "DELETE FROM contacts WHERE tenant_id = ?1 AND contact_id = ?2",
            params![tenant_str, id_str],
          )?;
          Ok(Some(removal))
        })();
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  // ── Deals ─────────────────────────────────────────────────────────────────

  async fn list_deals(&self, tenant_id: Uuid) -> Result<Vec<Deal>> {
    let id_str = encode_uuid(tenant_id);

    let raws: Vec<RawDeal> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DEAL_COLS} FROM deals
           WHERE tenant_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(params![id_str], read_deal_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDeal::into_deal).collect()
  }

  async fn get_deal(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Deal>> {
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    let raw: Option<RawDeal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DEAL_COLS} FROM deals
                 WHERE tenant_id = ?1 AND deal_id = ?2"
              ),
              params![tenant_str, id_str],
              read_deal_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDeal::into_deal).transpose()
  }

  async fn create_deals(
    &self,
    tenant_id: Uuid,
    drafts: Vec<DealDraft>,
  ) -> Result<BulkOutcome<Deal, DealDraft>> {
    let policy     = self.policy.deal_dedup;
    let tenant_str = encode_uuid(tenant_id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = (|| -> Result<BulkOutcome<Deal, DealDraft>> {
          let mut existing = existing_deal_keys(&tx, &tenant_str, policy)?;
          let contacts = tenant_contact_ids(&tx, &tenant_str)?;

          let classified = bulk::classify(
            drafts,
            &mut existing,
            |draft| policy.key(draft),
            |draft| {
              draft.validate()?;
              if let Some(contact_id) = draft.contact_ref()?
                && !contacts.contains(&contact_id)
              {
                return Err(orbit_core::Error::Reference(format!(
                  "unknown contact: {contact_id}"
                )));
              }
              Ok(())
            },
          );

          let mut created = Vec::with_capacity(classified.to_create.len());
          for draft in classified.to_create {
            let deal = draft.into_record(tenant_id)?;
            insert_deal(&tx, &deal)?;
            created.push(deal);
          }

          Ok(BulkOutcome {
            created,
            skipped: classified.skipped,
            rejected: classified.rejected,
          })
        })();
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn update_deal(
    &self,
    tenant_id: Uuid,
    id: Uuid,
    patch: DealPatch,
  ) -> Result<Option<Deal>> {
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = (|| -> Result<Option<Deal>> {
          let raw = tx
            .query_row(
              &format!(
                "SELECT {DEAL_COLS} FROM deals
                 WHERE tenant_id = ?1 AND deal_id = ?2"
              ),
              params![tenant_str, id_str],
              read_deal_row,
            )
            .optional()?;

          let Some(raw) = raw else { return Ok(None) };
          let mut deal = raw.into_deal()?;

          // A changed reference must still resolve within the tenant.
          if let Some(contact_id) = patch.contact_ref()? {
            let found: Option<bool> = tx
              .query_row(
                "SELECT 1 FROM contacts WHERE tenant_id = ?1 AND contact_id = ?2",
                params![tenant_str, encode_uuid(contact_id)],
                |_| Ok(true),
              )
              .optional()?;
            if found.is_none() {
              return Err(Error::Core(orbit_core::Error::Reference(format!(
                "unknown contact: {contact_id}"
              ))));
            }
          }

          patch.apply(&mut deal)?;

          tx.execute(
            "UPDATE deals SET
               title = ?1, stage = ?2, value = ?3, priority = ?4,
               contact_id = ?5, notes = ?6, updated_at = ?7
             WHERE tenant_id = ?8 AND deal_id = ?9",
            params![
              deal.title,
              deal.stage,
              deal.value,
              deal.priority,
              deal.contact_id.map(encode_uuid),
              deal.notes,
              encode_dt(deal.updated_at),
              tenant_str,
              id_str,
            ],
          )?;
          Ok(Some(deal))
        })();
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  async fn delete_deal(&self, tenant_id: Uuid, id: Uuid) -> Result<bool> {
    let tenant_str = encode_uuid(tenant_id);
    let id_str     = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM deals WHERE tenant_id = ?1 AND deal_id = ?2",
          params![tenant_str, id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}
