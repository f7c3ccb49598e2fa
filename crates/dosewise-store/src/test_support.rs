//! Fixtures for the store's unit tests.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::ts;
use crate::database::Database;
use crate::models::{Medication, MedicationInput, NewAccount, Profile, RoleDetails};

pub(crate) fn patient(db: &Database, name: &str) -> Profile {
    let details = RoleDetails::Patient {
        age: Some(50),
        condition: None,
    };
    let email = format!("{}@example.com", name.to_lowercase());
    db.create_account(&NewAccount {
        email: &email,
        password_hash: "00",
        salt: "00",
        name,
        details: &details,
    })
    .unwrap()
}

pub(crate) fn clinic(db: &Database, clinic_name: &str, crm: &str) -> Profile {
    let details = RoleDetails::Clinic {
        clinic_name: clinic_name.to_string(),
        crm: crm.to_string(),
        specialty: None,
    };
    let email = format!("{}@clinic.example.com", Uuid::new_v4().simple());
    db.create_account(&NewAccount {
        email: &email,
        password_hash: "00",
        salt: "00",
        name: "Dr. Test",
        details: &details,
    })
    .unwrap()
}

pub(crate) fn medication_input(name: &str, frequency: &str) -> MedicationInput {
    MedicationInput {
        name: name.to_string(),
        dosage: "1 tablet".to_string(),
        frequency: frequency.to_string(),
        instructions: None,
        start_date: Utc::now().date_naive(),
        end_date: None,
        custom_times: Vec::new(),
    }
}

/// Insert a pending log directly, bypassing the schedule procedures.
pub(crate) fn insert_log(db: &Database, med: &Medication, scheduled: DateTime<Utc>) -> Uuid {
    let id = Uuid::new_v4();
    db.conn()
        .execute(
            "INSERT INTO medication_logs (id, medication_id, user_id, scheduled_time, status)
             VALUES (?1, ?2, ?3, ?4, 'pending')",
            params![
                id.to_string(),
                med.id.to_string(),
                med.user_id.to_string(),
                ts(&scheduled)
            ],
        )
        .unwrap();
    id
}
