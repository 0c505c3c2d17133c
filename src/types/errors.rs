use std::fmt;

// === AuthError ===

/// Errors reported by the authentication collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The auth endpoint could not be reached.
    NetworkError(String),
    /// The auth endpoint rejected the request.
    Rejected(String),
    /// The OAuth callback did not carry a usable session.
    InvalidCallback(String),
    /// The stored session expired and could not be refreshed.
    SessionExpired,
    /// Persisting or loading the local session failed.
    StorageError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NetworkError(msg) => write!(f, "Auth network error: {}", msg),
            AuthError::Rejected(msg) => write!(f, "Auth request rejected: {}", msg),
            AuthError::InvalidCallback(msg) => write!(f, "Invalid OAuth callback: {}", msg),
            AuthError::SessionExpired => write!(f, "Session expired"),
            AuthError::StorageError(msg) => write!(f, "Session storage error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

// === StoreError ===

/// Errors reported by the data store collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached.
    NetworkError(String),
    /// The store answered with a non-success status.
    RequestFailed { status: u16, message: String },
    /// A row could not be decoded into the expected shape.
    DecodeError(String),
    /// The session could not be refreshed before the request.
    Unauthorized(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NetworkError(msg) => write!(f, "Store network error: {}", msg),
            StoreError::RequestFailed { status, message } => {
                write!(f, "Store request failed ({}): {}", status, message)
            }
            StoreError::DecodeError(msg) => write!(f, "Store decode error: {}", msg),
            StoreError::Unauthorized(msg) => write!(f, "Store request unauthorized: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === RealtimeError ===

/// Errors reported by the realtime feed collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeError {
    /// The subscription could not be opened.
    SubscribeFailed(String),
    /// No channel with the given ID is open.
    ChannelNotFound(String),
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealtimeError::SubscribeFailed(msg) => {
                write!(f, "Realtime subscribe failed: {}", msg)
            }
            RealtimeError::ChannelNotFound(id) => write!(f, "Realtime channel not found: {}", id),
        }
    }
}

impl std::error::Error for RealtimeError {}

// === CryptoError ===

/// Errors related to cryptographic operations.
#[derive(Debug)]
pub enum CryptoError {
    /// Failed to derive encryption key.
    KeyDerivation(String),
    /// Encryption operation failed.
    Encryption(String),
    /// Decryption operation failed.
    Decryption(String),
    /// The provided key is invalid.
    InvalidKey(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::KeyDerivation(msg) => write!(f, "Key derivation failed: {}", msg),
            CryptoError::Encryption(msg) => write!(f, "Encryption failed: {}", msg),
            CryptoError::Decryption(msg) => write!(f, "Decryption failed: {}", msg),
            CryptoError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

// === VaultError ===

/// Errors related to the persisted session vault.
#[derive(Debug)]
pub enum VaultError {
    /// Failed to serialize or deserialize session data.
    SerializationError(String),
    /// Database operation failed.
    DatabaseError(String),
    /// Cryptographic operation failed during session encryption/decryption.
    CryptoError(String),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::SerializationError(msg) => {
                write!(f, "Session serialization error: {}", msg)
            }
            VaultError::DatabaseError(msg) => write!(f, "Session database error: {}", msg),
            VaultError::CryptoError(msg) => write!(f, "Session crypto error: {}", msg),
        }
    }
}

impl std::error::Error for VaultError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}
