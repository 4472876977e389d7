//! The `RecordStore` trait and supporting result types.
//!
//! The trait is implemented by storage backends (e.g. `orbit-store-sqlite`).
//! The HTTP layer (`orbit-api`) depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  bulk::BulkOutcome,
  contact::{Contact, ContactDraft, ContactPatch},
  deal::{Deal, DealDraft, DealPatch},
  tenant::{ApiKey, Tenant, TenantProfile},
};

/// The result of deleting a contact; exactly one of the deal counters is
/// nonzero depending on the cascade policy.
#[derive(Debug, Clone, Copy)]
pub struct ContactRemoval {
  pub deals_deleted:  usize,
  pub deals_detached: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Orbit record store backend.
///
/// Every operation is tenant-scoped: a record owned by another tenant is
/// indistinguishable from one that does not exist. Within a tenant, mutating
/// operations are serialised against each other, so the duplicate check in a
/// bulk create and the cascade step in a contact delete are atomic with
/// their writes.
///
/// None of the mutations are idempotent; a caller that retries after a
/// timeout may double-submit. Key rotation in particular mints a further
/// distinct key on every call.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Identity & keys ───────────────────────────────────────────────────

  /// Create a tenant and issue its first API key. This is the out-of-band
  /// administrative entry point; it is never reachable through the
  /// authenticated surface.
  fn create_tenant(
    &self,
    email: String,
  ) -> impl Future<Output = Result<(Tenant, ApiKey), Self::Error>> + Send + '_;

  /// Resolve a presented key to its owning tenant, or fail with the
  /// `Unauthorized` taxonomy error. Never-issued and rotated-away keys are
  /// indistinguishable to the caller.
  fn resolve_key<'a>(
    &'a self,
    candidate: &'a str,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + 'a;

  /// Replace the tenant's key with a freshly generated one. The old key
  /// stops resolving before this returns.
  fn rotate_key(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<ApiKey, Self::Error>> + Send + '_;

  /// The authenticated caller's own account view.
  fn profile(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<TenantProfile, Self::Error>> + Send + '_;

  // ── Contacts ──────────────────────────────────────────────────────────

  /// All contacts for the tenant, in insertion order.
  fn list_contacts(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// `None` if the id is unknown within the tenant's scope.
  fn get_contact(
    &self,
    tenant_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Bulk create-or-skip. The duplicate check and the inserts happen in one
  /// transaction; a skip or per-record rejection never aborts the batch.
  fn create_contacts(
    &self,
    tenant_id: Uuid,
    drafts: Vec<ContactDraft>,
  ) -> impl Future<Output = Result<BulkOutcome<Contact, ContactDraft>, Self::Error>>
  + Send
  + '_;

  /// Merge supplied fields; `None` if the id is unknown within the tenant.
  fn update_contact(
    &self,
    tenant_id: Uuid,
    id: Uuid,
    patch: ContactPatch,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Delete a contact, applying the cascade policy to referencing deals in
  /// the same transaction. `None` if the id is unknown within the tenant.
  fn delete_contact(
    &self,
    tenant_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ContactRemoval>, Self::Error>> + Send + '_;

  // ── Deals ─────────────────────────────────────────────────────────────

  /// All deals for the tenant, in insertion order.
  fn list_deals(
    &self,
    tenant_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Deal>, Self::Error>> + Send + '_;

  /// `None` if the id is unknown within the tenant's scope.
  fn get_deal(
    &self,
    tenant_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Deal>, Self::Error>> + Send + '_;

  /// Bulk create-or-skip. A contact reference that does not resolve within
  /// the tenant rejects that record, not the batch.
  fn create_deals(
    &self,
    tenant_id: Uuid,
    drafts: Vec<DealDraft>,
  ) -> impl Future<Output = Result<BulkOutcome<Deal, DealDraft>, Self::Error>>
  + Send
  + '_;

  /// Merge supplied fields; a changed `contact_id` must re-resolve within
  /// the tenant. `None` if the id is unknown within the tenant.
  fn update_deal(
    &self,
    tenant_id: Uuid,
    id: Uuid,
    patch: DealPatch,
  ) -> impl Future<Output = Result<Option<Deal>, Self::Error>> + Send + '_;

  /// `false` if the id is unknown within the tenant.
  fn delete_deal(
    &self,
    tenant_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
