//! SQL schema for the EduTrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS guardians (
    guardian_id     TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    -- Cache over fee_records; written only by the ledger recompute.
    pending_amount  TEXT NOT NULL DEFAULT '0',
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id   TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    roll_number  TEXT NOT NULL UNIQUE,
    grade        TEXT NOT NULL,
    section      TEXT NOT NULL,
    guardian_id  TEXT REFERENCES guardians(guardian_id) ON DELETE SET NULL,
    -- Cache over fee_records; written only by the ledger recompute.
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fee_records (
    fee_id      TEXT PRIMARY KEY,
    student_id  TEXT NOT NULL REFERENCES students(student_id) ON DELETE CASCADE,
    period      TEXT NOT NULL,   -- YYYY-MM; displayed as MM/YYYY
    amount      TEXT NOT NULL,   -- decimal string
    status      TEXT NOT NULL DEFAULT 'unpaid'
                CHECK (status IN ('unpaid', 'paid', 'overdue', 'waived')),
    due_date    TEXT NOT NULL,
    paid_date   TEXT,
    remarks     TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (student_id, period)
);

CREATE TABLE IF NOT EXISTS topics (
    topic_id         TEXT PRIMARY KEY,
    owner_id         TEXT NOT NULL,
    parent_id        TEXT REFERENCES topics(topic_id) ON DELETE CASCADE,
    title            TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    resources        TEXT NOT NULL DEFAULT '',
    sort_order       INTEGER NOT NULL DEFAULT 0,
    status           TEXT NOT NULL DEFAULT 'upcoming'
                     CHECK (status IN ('not_started', 'upcoming', 'in_progress', 'completed')),
    subject          TEXT NOT NULL DEFAULT '',
    grade            TEXT NOT NULL DEFAULT '',
    estimated_hours  INTEGER,
    test_date        TEXT,
    test_title       TEXT NOT NULL DEFAULT '',
    test_duration    INTEGER,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    CHECK (parent_id IS NULL OR parent_id != topic_id)
);

CREATE INDEX IF NOT EXISTS students_guardian_idx ON students(guardian_id);
CREATE INDEX IF NOT EXISTS fees_period_idx       ON fee_records(period);
CREATE INDEX IF NOT EXISTS fees_status_idx       ON fee_records(status);
CREATE INDEX IF NOT EXISTS topics_owner_idx      ON topics(owner_id);
CREATE INDEX IF NOT EXISTS topics_parent_idx     ON topics(parent_id);

PRAGMA user_version = 1;
";
