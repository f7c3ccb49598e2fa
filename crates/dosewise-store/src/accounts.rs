//! Credentials and sessions.
//!
//! Password hashing happens in the server; this module only stores the
//! derived key, the salt and hashed session tokens.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::codec::{now, ts, ts_at, uuid_at};
use crate::database::Database;
use crate::error::{conflict_on, not_found, Result, StoreError};
use crate::models::{AccountCredentials, NewAccount, Profile, RoleDetails, SessionRecord};
use crate::profiles::generate_doctor_code;

/// Conflict rule reported when an e-mail is already registered.
pub const EMAIL_TAKEN: &str = "accounts.email";

impl Database {
    /// Create the account and its profile in one transaction.  Clinic
    /// profiles get a freshly generated doctor code.
    ///
    /// The e-mail is expected to be normalized already.  A duplicate yields
    /// `StoreError::Conflict(EMAIL_TAKEN)` and nothing is written.
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<Profile> {
        let tx = self.conn().unchecked_transaction()?;

        let id = Uuid::new_v4();
        let created_at = now();

        tx.execute(
            "INSERT INTO accounts (id, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                account.email,
                account.password_hash,
                account.salt,
                ts(&created_at),
            ],
        )
        .map_err(conflict_on(EMAIL_TAKEN))?;

        let mut profile = Profile {
            id,
            name: account.name.trim().to_string(),
            email: account.email.to_string(),
            role: account.details.role(),
            age: None,
            condition: None,
            clinic_name: None,
            crm: None,
            specialty: None,
            doctor_code: None,
            notifications_enabled: true,
            share_data: false,
            created_at,
            updated_at: created_at,
        };

        match account.details {
            RoleDetails::Patient { age, condition } => {
                profile.age = *age;
                profile.condition = condition.clone();
            }
            RoleDetails::Clinic {
                clinic_name,
                crm,
                specialty,
            } => {
                profile.doctor_code = Some(generate_doctor_code(&tx, crm, clinic_name)?);
                profile.clinic_name = Some(clinic_name.trim().to_string());
                profile.crm = Some(crm.trim().to_string());
                profile.specialty = specialty.clone();
            }
        }

        tx.execute(
            "INSERT INTO profiles (id, name, email, role, age, condition, clinic_name, crm,
                                   specialty, doctor_code, notifications_enabled, share_data,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id.to_string(),
                profile.name,
                profile.email,
                profile.role.as_str(),
                profile.age,
                profile.condition,
                profile.clinic_name,
                profile.crm,
                profile.specialty,
                profile.doctor_code,
                profile.notifications_enabled,
                profile.share_data,
                ts(&profile.created_at),
                ts(&profile.updated_at),
            ],
        )?;

        tx.commit()?;

        tracing::info!(user_id = %id, role = %profile.role, "account created");
        Ok(profile)
    }

    pub fn credentials_by_email(&self, email: &str) -> Result<AccountCredentials> {
        self.conn()
            .query_row(
                "SELECT id, email, password_hash, salt FROM accounts WHERE email = ?1",
                params![email],
                |row| {
                    Ok(AccountCredentials {
                        user_id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        salt: row.get(3)?,
                    })
                },
            )
            .map_err(not_found)
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token_hash, user_id.to_string(), ts(&now()), ts(&expires_at)],
        )?;
        Ok(())
    }

    /// Resolve a token hash to its account.  Expired sessions are treated as
    /// absent.
    pub fn find_session(
        &self,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>> {
        self.conn()
            .query_row(
                "SELECT s.user_id, a.email, s.expires_at
                 FROM sessions s JOIN accounts a ON a.id = s.user_id
                 WHERE s.token_hash = ?1 AND s.expires_at > ?2",
                params![token_hash, ts(&at)],
                |row| {
                    Ok(SessionRecord {
                        user_id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        expires_at: ts_at(row, 2)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
        Ok(affected > 0)
    }

    pub fn purge_expired_sessions(&self, at: DateTime<Utc>) -> Result<usize> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", params![ts(&at)])?;
        Ok(affected)
    }
}
