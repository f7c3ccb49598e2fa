//! v001 -- Initial schema creation.
//!
//! Accounts and sessions back authentication; the remaining tables hold the
//! patient and clinic data.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts (credentials) and sessions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    email         TEXT NOT NULL UNIQUE,        -- trimmed, lower-case
    password_hash TEXT NOT NULL,               -- hex PBKDF2 output
    salt          TEXT NOT NULL,               -- hex
    created_at    TEXT NOT NULL                -- RFC-3339
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY NOT NULL,      -- hex SHA-256 of the bearer token
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

-- ----------------------------------------------------------------
-- Profiles (one per account, never hard-deleted)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id                    TEXT PRIMARY KEY NOT NULL,  -- = accounts.id
    name                  TEXT NOT NULL,
    email                 TEXT NOT NULL,
    role                  TEXT NOT NULL CHECK (role IN ('patient', 'clinic')),
    age                   INTEGER,
    condition             TEXT,
    clinic_name           TEXT,
    crm                   TEXT,
    specialty             TEXT,
    doctor_code           TEXT UNIQUE,
    notifications_enabled INTEGER NOT NULL DEFAULT 1,
    share_data            INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL,

    FOREIGN KEY (id) REFERENCES accounts(id)
);

-- ----------------------------------------------------------------
-- Medications and their dose times
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS medications (
    id            TEXT PRIMARY KEY NOT NULL,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    dosage        TEXT NOT NULL,
    frequency     TEXT NOT NULL,               -- free-text label, e.g. '8/8h'
    instructions  TEXT,
    start_date    TEXT NOT NULL,               -- YYYY-MM-DD
    end_date      TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    schedule_from TEXT NOT NULL,               -- no dose slot before this instant
    created_at    TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES profiles(id)
);

CREATE INDEX IF NOT EXISTS idx_medications_user ON medications(user_id, is_active);

CREATE TABLE IF NOT EXISTS medication_times (
    id            TEXT PRIMARY KEY NOT NULL,
    medication_id TEXT NOT NULL,
    time_of_day   TEXT NOT NULL,               -- HH:MM

    UNIQUE (medication_id, time_of_day),
    FOREIGN KEY (medication_id) REFERENCES medications(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Dose logs: one row per scheduled dose
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS medication_logs (
    id             TEXT PRIMARY KEY NOT NULL,
    medication_id  TEXT NOT NULL,
    user_id        TEXT NOT NULL,
    scheduled_time TEXT NOT NULL,
    taken_at       TEXT,
    status         TEXT NOT NULL DEFAULT 'pending'
                   CHECK (status IN ('pending', 'taken', 'skipped', 'missed')),

    UNIQUE (medication_id, scheduled_time),
    FOREIGN KEY (medication_id) REFERENCES medications(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_logs_user_time
    ON medication_logs(user_id, scheduled_time);

-- ----------------------------------------------------------------
-- Vitals: columns used depend on the type
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS vitals (
    id          TEXT PRIMARY KEY NOT NULL,
    user_id     TEXT NOT NULL,
    type        TEXT NOT NULL
                CHECK (type IN ('blood_pressure', 'weight', 'heart_rate', 'glucose')),
    systolic    INTEGER,
    diastolic   INTEGER,
    value       REAL,
    unit        TEXT,
    recorded_at TEXT NOT NULL,
    notes       TEXT,

    CHECK (
        (type = 'blood_pressure'
            AND systolic IS NOT NULL AND diastolic IS NOT NULL
            AND value IS NULL AND unit IS NULL)
        OR
        (type <> 'blood_pressure'
            AND systolic IS NULL AND diastolic IS NULL
            AND value IS NOT NULL AND unit IS NOT NULL)
    ),
    FOREIGN KEY (user_id) REFERENCES profiles(id)
);

CREATE INDEX IF NOT EXISTS idx_vitals_user_type_time
    ON vitals(user_id, type, recorded_at DESC);

-- ----------------------------------------------------------------
-- Patient -> clinician data sharing
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS patient_doctor_sharing (
    id         TEXT PRIMARY KEY NOT NULL,
    patient_id TEXT NOT NULL,
    doctor_id  TEXT NOT NULL,
    shared_at  TEXT NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,

    FOREIGN KEY (patient_id) REFERENCES profiles(id),
    FOREIGN KEY (doctor_id)  REFERENCES profiles(id)
);

-- At most one active grant per pair; revoked rows are kept.
CREATE UNIQUE INDEX IF NOT EXISTS idx_sharing_active_pair
    ON patient_doctor_sharing(patient_id, doctor_id) WHERE is_active = 1;

CREATE INDEX IF NOT EXISTS idx_sharing_doctor
    ON patient_doctor_sharing(doctor_id, is_active);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
