//! SQL schema for the Criador SQLite store.
//!
//! Executed once at connection startup. The schema version is recorded in
//! `PRAGMA user_version`; there is no migration history yet.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    subject_id        TEXT PRIMARY KEY,
    email             TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash     TEXT NOT NULL,   -- argon2 PHC string
    email_confirmed   INTEGER NOT NULL DEFAULT 0,
    confirmation_hash TEXT,            -- sha256 hex of the outstanding token
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token       TEXT PRIMARY KEY,
    csrf_token  TEXT NOT NULL,
    subject_id  TEXT NOT NULL REFERENCES identities(subject_id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS breeds (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

-- owner_subject_id refers to identities, which may live in another store.
CREATE TABLE IF NOT EXISTS breeders (
    id               INTEGER PRIMARY KEY,
    name             TEXT NOT NULL,
    commercial_name  TEXT,
    address          TEXT NOT NULL,
    postal_code      TEXT NOT NULL,
    phone            TEXT,
    email            TEXT NOT NULL,
    owner_subject_id TEXT
);

CREATE TABLE IF NOT EXISTS breeder_breeds (
    breeder_id  INTEGER NOT NULL REFERENCES breeders(id) ON DELETE CASCADE,
    breed_id    INTEGER NOT NULL REFERENCES breeds(id),
    PRIMARY KEY (breeder_id, breed_id)
);

CREATE TABLE IF NOT EXISTS animals (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    sex             TEXT NOT NULL CHECK (sex IN ('M', 'F')),
    birth_date      TEXT NOT NULL,             -- YYYY-MM-DD
    purchase_date   TEXT,
    purchase_price  INTEGER NOT NULL DEFAULT 0 CHECK (purchase_price >= 0),  -- cents
    registry_number TEXT,
    breed_id        INTEGER NOT NULL REFERENCES breeds(id),
    breeder_id      INTEGER NOT NULL REFERENCES breeders(id),
    version         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS photos (
    id               INTEGER PRIMARY KEY,
    animal_id        INTEGER NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
    filename         TEXT NOT NULL,
    storage_location TEXT NOT NULL,
    captured_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS breeders_owner_idx ON breeders(owner_subject_id);
CREATE INDEX IF NOT EXISTS animals_breeder_idx ON animals(breeder_id);
CREATE INDEX IF NOT EXISTS photos_animal_idx  ON photos(animal_id);
CREATE INDEX IF NOT EXISTS sessions_subject_idx ON sessions(subject_id);
CREATE INDEX IF NOT EXISTS sessions_created_idx ON sessions(created_at);

PRAGMA user_version = 1;
";
