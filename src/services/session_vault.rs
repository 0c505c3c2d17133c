//! Session Vault for Linkshelf.
//!
//! Keeps the last auth session across restarts: serialized to JSON, sealed with
//! AES-256-GCM through [`SessionCipher`] and stored in SQLite, one row per
//! backend project.
//!
//! The sealing key comes from a secret the host supplies (a user passphrase or
//! raw key bytes from the OS keychain). Passphrases are stretched with a random
//! salt kept in `vault_salt`, created on first use for each project.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::params;

use crate::database::connection::Database;
use crate::services::crypto_service::{generate_salt, SessionCipher};
use crate::types::errors::VaultError;
use crate::types::sealed::EncryptedData;
use crate::types::session::Session;

/// Trait defining persisted-session operations.
pub trait SessionVaultTrait {
    fn save(&self, session: &Session) -> Result<(), VaultError>;
    fn load(&self) -> Result<Option<Session>, VaultError>;
    fn clear(&self) -> Result<(), VaultError>;
}

/// Session vault backed by SQLite.
///
/// The connection sits behind a mutex so the vault can be shared with the
/// async HTTP adapter.
pub struct SessionVault {
    db: Mutex<Database>,
    cipher: SessionCipher,
    project: String,
}

impl SessionVault {
    /// Creates a vault for `project` (the backend URL) keyed by `passphrase`.
    pub fn new(db: Database, project: &str, passphrase: &str) -> Result<Self, VaultError> {
        let salt = get_or_create_salt(&db, project)?;
        let cipher = SessionCipher::derive(passphrase, &salt)
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;
        Ok(Self {
            db: Mutex::new(db),
            cipher,
            project: project.to_string(),
        })
    }

    /// Creates a vault for `project` sealed with a 32-byte `key`.
    pub fn with_key(db: Database, project: &str, key: &[u8]) -> Result<Self, VaultError> {
        let cipher =
            SessionCipher::from_key(key).map_err(|e| VaultError::CryptoError(e.to_string()))?;
        Ok(Self {
            db: Mutex::new(db),
            cipher,
            project: project.to_string(),
        })
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, rusqlite::Error>,
    ) -> Result<T, VaultError> {
        let db = self
            .db
            .lock()
            .map_err(|e| VaultError::DatabaseError(e.to_string()))?;
        f(&db).map_err(|e| VaultError::DatabaseError(e.to_string()))
    }
}

/// Reads the project's salt, generating and storing one on first use.
fn get_or_create_salt(db: &Database, project: &str) -> Result<Vec<u8>, VaultError> {
    let existing = db.connection().query_row(
        "SELECT salt FROM vault_salt WHERE project = ?1",
        params![project],
        |row| row.get::<_, Vec<u8>>(0),
    );
    match existing {
        Ok(salt) => return Ok(salt),
        Err(rusqlite::Error::QueryReturnedNoRows) => {}
        Err(e) => return Err(VaultError::DatabaseError(e.to_string())),
    }

    let salt = generate_salt().map_err(|e| VaultError::CryptoError(e.to_string()))?;
    db.connection()
        .execute(
            "INSERT INTO vault_salt (project, salt, created_at) VALUES (?1, ?2, ?3)",
            params![project, salt, now_secs()],
        )
        .map_err(|e| VaultError::DatabaseError(e.to_string()))?;
    Ok(salt)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl SessionVaultTrait for SessionVault {
    /// Replaces the stored session for this project.
    fn save(&self, session: &Session) -> Result<(), VaultError> {
        let json = serde_json::to_vec(session)
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;
        let sealed = self
            .cipher
            .seal(&json)
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;
        let now = now_secs();

        self.with_db(|db| {
            db.connection().execute(
                "INSERT OR REPLACE INTO auth_session (project, encrypted_data, iv, auth_tag, user_id, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.project,
                    sealed.ciphertext,
                    sealed.iv,
                    sealed.auth_tag,
                    session.user_id(),
                    now
                ],
            )
        })?;
        tracing::debug!(user_id = session.user_id(), "session persisted");
        Ok(())
    }

    /// Loads the stored session, if any.
    fn load(&self) -> Result<Option<Session>, VaultError> {
        let row = self.with_db(|db| {
            let result = db.connection().query_row(
                "SELECT encrypted_data, iv, auth_tag FROM auth_session WHERE project = ?1",
                params![self.project],
                |row| {
                    Ok(EncryptedData {
                        ciphertext: row.get(0)?,
                        iv: row.get(1)?,
                        auth_tag: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(sealed) => Ok(Some(sealed)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;

        let Some(sealed) = row else {
            return Ok(None);
        };

        let json = self
            .cipher
            .open(&sealed)
            .map_err(|e| VaultError::CryptoError(e.to_string()))?;
        let session: Session = serde_json::from_slice(&json)
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;
        Ok(Some(session))
    }

    /// Removes the stored session for this project.
    fn clear(&self) -> Result<(), VaultError> {
        self.with_db(|db| {
            db.connection().execute(
                "DELETE FROM auth_session WHERE project = ?1",
                params![self.project],
            )
        })?;
        Ok(())
    }
}
