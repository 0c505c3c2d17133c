//! Unit tests for the SessionVault: encrypted persistence of the auth session.

use linkshelf::database::Database;
use linkshelf::services::session_vault::{SessionVault, SessionVaultTrait};
use linkshelf::testing::sample_session;
use linkshelf::types::errors::VaultError;
use tempfile::TempDir;

const PROJECT: &str = "https://proj.supabase.co";
const ANON_KEY: &str = "public-anon-key";
const SECRET: &str = "correct horse battery staple";

fn vault() -> SessionVault {
    let db = Database::open_in_memory().unwrap();
    SessionVault::new(db, PROJECT, SECRET).unwrap()
}

fn stored_salt(db: &Database) -> Vec<u8> {
    db.connection()
        .query_row("SELECT salt FROM vault_salt WHERE project = ?1", [PROJECT], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_load_when_empty_returns_none() {
    let vault = vault();
    assert_eq!(vault.load().unwrap(), None);
}

#[test]
fn test_save_then_load_restores_session() {
    let vault = vault();
    let mut session = sample_session("u1");
    session.expires_at = Some(1_900_000_000);

    vault.save(&session).unwrap();
    assert_eq!(vault.load().unwrap(), Some(session));
}

#[test]
fn test_save_replaces_previous_session() {
    let vault = vault();
    vault.save(&sample_session("u1")).unwrap();
    vault.save(&sample_session("u2")).unwrap();

    let loaded = vault.load().unwrap().unwrap();
    assert_eq!(loaded.user_id(), "u2");
}

#[test]
fn test_clear_removes_session() {
    let vault = vault();
    vault.save(&sample_session("u1")).unwrap();
    vault.clear().unwrap();
    assert_eq!(vault.load().unwrap(), None);
}

#[test]
fn test_tokens_are_not_stored_in_plaintext() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    let vault = SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    vault.save(&sample_session("u1")).unwrap();

    let raw = Database::open(&path).unwrap();
    let blob: Vec<u8> = raw
        .connection()
        .query_row("SELECT encrypted_data FROM auth_session", [], |row| row.get(0))
        .unwrap();
    let needle = b"token-u1";
    assert!(
        !blob.windows(needle.len()).any(|w| w == needle),
        "access token must not appear in the stored blob"
    );
}

#[test]
fn test_other_key_cannot_open_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");

    let vault = SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    vault.save(&sample_session("u1")).unwrap();

    let other = SessionVault::new(Database::open(&path).unwrap(), PROJECT, "another secret").unwrap();
    assert!(matches!(other.load(), Err(VaultError::CryptoError(_))));
}

#[test]
fn test_projects_are_isolated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");

    let a = SessionVault::new(Database::open(&path).unwrap(), "https://a.supabase.co", SECRET).unwrap();
    let b = SessionVault::new(Database::open(&path).unwrap(), "https://b.supabase.co", SECRET).unwrap();
    a.save(&sample_session("u1")).unwrap();

    assert_eq!(b.load().unwrap(), None);
    assert!(a.load().unwrap().is_some());
}

#[test]
fn test_public_settings_cannot_open_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");

    let vault = SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    vault.save(&sample_session("u1")).unwrap();

    // Everything a copy of settings.json reveals.
    let guess = format!("{}|{}", PROJECT, ANON_KEY);
    for passphrase in [guess.as_str(), ANON_KEY, PROJECT] {
        let reader = SessionVault::new(Database::open(&path).unwrap(), PROJECT, passphrase).unwrap();
        assert!(reader.load().is_err(), "{} must not open the session", passphrase);
    }
}

#[test]
fn test_reopen_with_same_secret_restores_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");

    {
        let vault = SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
        vault.save(&sample_session("u1")).unwrap();
    }

    let vault = SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    assert_eq!(vault.load().unwrap().map(|s| s.user.id), Some("u1".to_string()));
}

#[test]
fn test_salt_is_random_per_database() {
    let dir = TempDir::new().unwrap();
    let a_path = dir.path().join("a.db");
    let b_path = dir.path().join("b.db");
    SessionVault::new(Database::open(&a_path).unwrap(), PROJECT, SECRET).unwrap();
    SessionVault::new(Database::open(&b_path).unwrap(), PROJECT, SECRET).unwrap();

    let a = stored_salt(&Database::open(&a_path).unwrap());
    let b = stored_salt(&Database::open(&b_path).unwrap());
    assert_eq!(a.len(), 16);
    assert_ne!(a, b);
}

#[test]
fn test_salt_is_kept_across_opens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    let first = stored_salt(&Database::open(&path).unwrap());

    SessionVault::new(Database::open(&path).unwrap(), PROJECT, SECRET).unwrap();
    assert_eq!(stored_salt(&Database::open(&path).unwrap()), first);
}

#[test]
fn test_empty_passphrase_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    assert!(matches!(
        SessionVault::new(db, PROJECT, ""),
        Err(VaultError::CryptoError(_))
    ));
}

#[test]
fn test_raw_key_vault_roundtrip() {
    let vault = SessionVault::with_key(Database::open_in_memory().unwrap(), PROJECT, &[9u8; 32]).unwrap();
    vault.save(&sample_session("u1")).unwrap();
    assert_eq!(vault.load().unwrap(), Some(sample_session("u1")));
}

#[test]
fn test_raw_key_must_be_32_bytes() {
    let result = SessionVault::with_key(Database::open_in_memory().unwrap(), PROJECT, &[9u8; 16]);
    assert!(matches!(result, Err(VaultError::CryptoError(_))));
}
