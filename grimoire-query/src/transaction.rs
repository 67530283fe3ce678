//! Transaction configuration and lifecycle.
//!
//! Transactions are opened through [`Repo::transaction`](crate::repo::Repo::transaction),
//! which commits when the callback returns `Ok` and rolls back otherwise.
//! Descriptors created from the transaction's repo may request row locks.
//!
//! ```rust
//! use grimoire_query::{IsolationLevel, TransactionConfig};
//! use std::time::Duration;
//!
//! let config = TransactionConfig::new()
//!     .isolation(IsolationLevel::Serializable)
//!     .timeout(Duration::from_secs(5))
//!     .read_only();
//!
//! assert_eq!(config.isolation, IsolationLevel::Serializable);
//! assert!(config.is_read_only());
//! ```

use std::time::Duration;

use tracing::debug;

use crate::error::{QueryResult, translate_result};
use crate::traits::QueryEngine;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// No dirty reads.
    #[default]
    ReadCommitted,
    /// No non-repeatable reads.
    RepeatableRead,
    /// Full serializability.
    Serializable,
}

impl IsolationLevel {
    /// Standard name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// Access mode for transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Read-write access.
    #[default]
    ReadWrite,
    /// Read-only access.
    ReadOnly,
}

impl AccessMode {
    /// Standard name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadWrite => "READ WRITE",
            Self::ReadOnly => "READ ONLY",
        }
    }
}

/// Options handed to [`QueryEngine::begin`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Isolation level.
    pub isolation: IsolationLevel,
    /// Access mode.
    pub access_mode: AccessMode,
    /// Timeout for the transaction.
    pub timeout: Option<Duration>,
    /// Whether to defer constraint checking.
    pub deferrable: bool,
}

impl TransactionConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Make the transaction read-only.
    pub fn read_only(self) -> Self {
        self.access_mode(AccessMode::ReadOnly)
    }

    /// Make the transaction deferrable.
    pub fn deferrable(mut self) -> Self {
        self.deferrable = true;
        self
    }

    /// Whether the transaction is read-only.
    pub fn is_read_only(&self) -> bool {
        self.access_mode == AccessMode::ReadOnly
    }
}

/// An open transaction on an engine.
///
/// Consumed by [`commit`](Self::commit) or [`rollback`](Self::rollback).
#[derive(Debug)]
pub struct Transaction<'e, E: QueryEngine> {
    engine: &'e E,
    config: TransactionConfig,
}

impl<'e, E: QueryEngine> Transaction<'e, E> {
    /// Open a transaction.
    pub async fn begin(engine: &'e E, config: TransactionConfig) -> QueryResult<Self> {
        debug!(
            isolation = config.isolation.as_str(),
            access_mode = config.access_mode.as_str(),
            "transaction begin"
        );
        translate_result(engine.begin(&config).await, None)?;
        Ok(Self { engine, config })
    }

    /// The configuration the transaction was opened with.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Commit.
    pub async fn commit(self) -> QueryResult<()> {
        debug!("transaction commit");
        translate_result(self.engine.commit().await, None)
    }

    /// Roll back.
    pub async fn rollback(self) -> QueryResult<()> {
        debug!("transaction rollback");
        translate_result(self.engine.rollback().await, None)
    }
}
