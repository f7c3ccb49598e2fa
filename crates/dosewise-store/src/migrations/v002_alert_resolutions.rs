use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS alert_resolutions (
    doctor_id   TEXT NOT NULL,                -- FK -> profiles(id)
    alert_id    TEXT NOT NULL,                -- e.g. 'bp_<patient uuid>'
    resolved_at TEXT NOT NULL,

    PRIMARY KEY (doctor_id, alert_id),
    FOREIGN KEY (doctor_id) REFERENCES profiles(id)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
