//! Transaction boundary.
//!
//! Store and search operations never begin or commit transactions of their
//! own; they run against whatever connection the caller hands them. The
//! boundary here wraps one request's worth of operations in a single
//! `BEGIN IMMEDIATE` unit: commit on success, rollback on any error. A
//! transaction dropped mid-flight (caller panic, cancelled request) rolls
//! back, so no partial writes ever become visible.

use rusqlite::{Transaction, TransactionBehavior};

use crate::{errors::StoreError, store::Store};

impl Store {
    /// Opens an immediate-mode transaction on the store's connection.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, StoreError> {
        self.connection_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| StoreError::transaction(e.to_string()))
    }

    /// Runs `f` inside a single transaction, committing when it returns
    /// `Ok` and rolling back the entire unit when it returns `Err`.
    pub fn with_transaction<T>(
        &mut self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| StoreError::transaction(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    return Err(StoreError::transaction(format!(
                        "{err}; rollback failed: {rollback}"
                    )));
                }
                Err(err)
            }
        }
    }
}
