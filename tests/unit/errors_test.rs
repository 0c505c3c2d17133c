use linkshelf::types::errors::*;

// === AuthError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(
        AuthError::NetworkError("timed out".to_string()).to_string(),
        "Auth network error: timed out"
    );
    assert_eq!(
        AuthError::Rejected("401: invalid grant".to_string()).to_string(),
        "Auth request rejected: 401: invalid grant"
    );
    assert_eq!(
        AuthError::InvalidCallback("missing fragment".to_string()).to_string(),
        "Invalid OAuth callback: missing fragment"
    );
    assert_eq!(AuthError::SessionExpired.to_string(), "Session expired");
    assert_eq!(
        AuthError::StorageError("locked".to_string()).to_string(),
        "Session storage error: locked"
    );
}

#[test]
fn auth_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(AuthError::SessionExpired);
    assert!(err.source().is_none());
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::NetworkError("connection reset".to_string()).to_string(),
        "Store network error: connection reset"
    );
    assert_eq!(
        StoreError::RequestFailed {
            status: 403,
            message: "row-level security".to_string()
        }
        .to_string(),
        "Store request failed (403): row-level security"
    );
    assert_eq!(
        StoreError::DecodeError("missing field `title`".to_string()).to_string(),
        "Store decode error: missing field `title`"
    );
    assert_eq!(
        StoreError::Unauthorized("Session expired".to_string()).to_string(),
        "Store request unauthorized: Session expired"
    );
}

#[test]
fn store_error_is_comparable() {
    let a = StoreError::NetworkError("x".to_string());
    assert_eq!(a.clone(), a);
    assert_ne!(a, StoreError::DecodeError("x".to_string()));
}

// === RealtimeError Tests ===

#[test]
fn realtime_error_display_variants() {
    assert_eq!(
        RealtimeError::SubscribeFailed("table must not be empty".to_string()).to_string(),
        "Realtime subscribe failed: table must not be empty"
    );
    assert_eq!(
        RealtimeError::ChannelNotFound("c-1".to_string()).to_string(),
        "Realtime channel not found: c-1"
    );
}

// === CryptoError Tests ===

#[test]
fn crypto_error_display_variants() {
    assert_eq!(
        CryptoError::KeyDerivation("bad salt".to_string()).to_string(),
        "Key derivation failed: bad salt"
    );
    assert_eq!(
        CryptoError::Encryption("data too large".to_string()).to_string(),
        "Encryption failed: data too large"
    );
    assert_eq!(
        CryptoError::Decryption("invalid tag".to_string()).to_string(),
        "Decryption failed: invalid tag"
    );
    assert_eq!(
        CryptoError::InvalidKey("wrong length".to_string()).to_string(),
        "Invalid key: wrong length"
    );
}

// === VaultError Tests ===

#[test]
fn vault_error_display_variants() {
    assert_eq!(
        VaultError::SerializationError("eof".to_string()).to_string(),
        "Session serialization error: eof"
    );
    assert_eq!(
        VaultError::DatabaseError("disk full".to_string()).to_string(),
        "Session database error: disk full"
    );
    assert_eq!(
        VaultError::CryptoError("tag mismatch".to_string()).to_string(),
        "Session crypto error: tag mismatch"
    );
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("permission denied".to_string()).to_string(),
        "Settings I/O error: permission denied"
    );
    assert_eq!(
        SettingsError::SerializationError("trailing comma".to_string()).to_string(),
        "Settings serialization error: trailing comma"
    );
    assert_eq!(
        SettingsError::InvalidKey("auth.nope".to_string()).to_string(),
        "Invalid settings key: auth.nope"
    );
    assert_eq!(
        SettingsError::InvalidValue("backend.url is not set".to_string()).to_string(),
        "Invalid settings value: backend.url is not set"
    );
}

#[test]
fn settings_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(SettingsError::InvalidKey("k".to_string()));
    assert!(err.source().is_none());
}
