//! SQL schema for the Outreach SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Campaign statistics have no columns here: lead counts and response rates
//! are computed from `leads` on every read.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,   -- stored lower-cased
    email_verified INTEGER NOT NULL DEFAULT 0,
    image          TEXT,
    created_at     TEXT NOT NULL,          -- RFC 3339 UTC, fixed width
    updated_at     TEXT NOT NULL
);

-- Only the SHA-256 digest of the bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    token       TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at  TEXT NOT NULL,
    ip_address  TEXT,
    user_agent  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id          TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL,
    provider_id TEXT NOT NULL,             -- 'credential' for email/password
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    password    TEXT,                      -- argon2 PHC string
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (provider_id, account_id)
);

CREATE TABLE IF NOT EXISTS campaigns (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 160),
    status      TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'active', 'paused', 'completed')),
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (name, user_id)
);

CREATE TABLE IF NOT EXISTS leads (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    designation     TEXT NOT NULL,
    email           TEXT NOT NULL,
    company         TEXT,
    status          TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'contacted', 'responded', 'converted')),
    last_contact_at TEXT,
    avatar_url      TEXT,
    campaign_id     INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_user_idx   ON sessions(user_id);
CREATE INDEX IF NOT EXISTS campaigns_user_idx  ON campaigns(user_id);
CREATE INDEX IF NOT EXISTS leads_campaign_idx  ON leads(campaign_id);
CREATE INDEX IF NOT EXISTS leads_status_idx    ON leads(status);

PRAGMA user_version = 1;
";
