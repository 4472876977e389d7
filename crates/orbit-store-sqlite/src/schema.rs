//! SQL schema for the Orbit SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tenants (
    tenant_id   TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    api_key     TEXT NOT NULL,           -- current key, 'zero_' + 64 hex chars
    key_digest  TEXT NOT NULL UNIQUE,    -- SHA-256 hex of api_key; resolve() looks up here
    created_at  TEXT NOT NULL            -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id  TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL REFERENCES tenants(tenant_id),
    name        TEXT NOT NULL,
    email       TEXT,
    phone       TEXT,
    company     TEXT,
    role        TEXT,
    location    TEXT,
    notes       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deals (
    deal_id     TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL REFERENCES tenants(tenant_id),
    title       TEXT NOT NULL,
    stage       TEXT NOT NULL,           -- free-form pipeline label
    value       REAL,                    -- non-negative when present
    priority    TEXT,
    contact_id  TEXT REFERENCES contacts(contact_id),
    notes       TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contacts_tenant_idx ON contacts(tenant_id);
CREATE INDEX IF NOT EXISTS deals_tenant_idx    ON deals(tenant_id);
CREATE INDEX IF NOT EXISTS deals_contact_idx   ON deals(contact_id);

PRAGMA user_version = 1;
";
