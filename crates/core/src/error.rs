//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Decoding and extraction errors
//! - [`StorageError`] - Database/repository errors
//! - [`ChainError`] - Blockchain RPC errors
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Business logic and domain rule violations.
///
/// Three variants are fatal for the batch being processed (see
/// [`DomainError::is_fatal`]): an unknown runtime schema version, a payload
/// that does not fit the layout registered for its version, and a block
/// without timestamp. Everything else is contained to a single call.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No registered decoder matches the runtime version of a payload.
    ///
    /// The decoder table is out of date, the data itself is not invalid.
    #[error("Unsupported spec version {spec_version} for {name}")]
    UnsupportedSpecVersion {
        /// Logical call/event name (e.g. `Balances.Transfer`).
        name: String,
        /// Runtime spec version of the block carrying the payload.
        spec_version: u32,
    },

    /// A payload does not have the exact field set of the schema row its
    /// runtime version selected.
    ///
    /// The runtime changed the layout without a new row being appended.
    #[error("Layout mismatch for {name} {version} at spec version {spec_version}: {reason}")]
    LayoutMismatch {
        name: String,
        /// Label of the selected row (e.g. `v1000`).
        version: &'static str,
        spec_version: u32,
        reason: String,
    },

    /// Block is missing its timestamp.
    #[error("Malformed block {0}: missing timestamp")]
    MalformedBlock(u64),

    /// An event the policy relies on was not emitted.
    #[error("Missing expected event {event} for call {call}")]
    MissingExpectedEvent {
        /// Name of the event that was looked for.
        event: &'static str,
        /// Call or extrinsic the event was expected on.
        call: String,
    },

    /// Data decoding/deserialization failed.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Invariant broken inside the pipeline.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Whether this error must abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSpecVersion { .. }
                | Self::LayoutMismatch { .. }
                | Self::MalformedBlock(_)
        )
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Chain Errors
// =============================================================================

/// Blockchain RPC and connectivity errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// WebSocket connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// RPC request failed.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Block subscription failed or disconnected.
    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    /// Block could not be fetched.
    #[error("Block fetch error at hash {hash}: {message}")]
    BlockFetchError {
        /// Block hash that failed to fetch.
        hash: String,
        /// Error details.
        message: String,
    },
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::IndexerService`].
/// It wraps all lower-level errors and adds indexer-specific variants.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Domain logic error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Blockchain connectivity error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Connected chain doesn't match stored data.
    ///
    /// This is a fatal error that requires manual intervention.
    #[error("Chain mismatch: connected to {connected} but database contains data for {expected}")]
    ChainMismatch {
        /// Genesis hash of connected chain.
        connected: String,
        /// Genesis hash expected by database.
        expected: String,
    },

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Indexer shutdown requested")]
    ShutdownRequested,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    #[test]
    fn test_error_conversion_chain() {
        let storage_err = StorageError::QueryError("db failed".into());
        let domain_err: DomainError = storage_err.into();
        let indexer_err: IndexerError = domain_err.into();
        assert!(indexer_err.to_string().contains("db failed"));

        let chain_err = ChainError::RpcError("rpc failed".into());
        let indexer_err: IndexerError = chain_err.into();
        assert!(indexer_err.to_string().contains("rpc failed"));
    }

    // Seules les erreurs de version, de layout et de bloc malformé arrêtent le batch
    #[test]
    fn test_fatal_classification() {
        let unsupported = DomainError::UnsupportedSpecVersion {
            name: "Balances.Transfer".into(),
            spec_version: 7,
        };
        assert!(unsupported.is_fatal());
        assert!(DomainError::MalformedBlock(12).is_fatal());
        let mismatch = DomainError::LayoutMismatch {
            name: "Balances.Transfer".into(),
            version: "v1000",
            spec_version: 3000,
            reason: "expected 3 fields, got 4".into(),
        };
        assert!(mismatch.is_fatal());

        let missing = DomainError::MissingExpectedEvent {
            event: "Balances.Withdraw",
            call: "0x00".into(),
        };
        assert!(!missing.is_fatal());
        assert!(!DomainError::DecodingError("bad".into()).is_fatal());
    }

    #[test]
    fn test_unsupported_version_message_names_payload() {
        let err = DomainError::UnsupportedSpecVersion {
            name: "Members.MemberRemarked".into(),
            spec_version: 999,
        };
        let msg = err.to_string();
        assert!(msg.contains("Members.MemberRemarked") && msg.contains("999"));
    }

    #[test]
    fn test_chain_mismatch_includes_hashes() {
        let err = IndexerError::ChainMismatch {
            connected: "0xaaa".into(),
            expected: "0xbbb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("0xaaa") && msg.contains("0xbbb"));
    }
}
